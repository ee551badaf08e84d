//! Dedicated writer task for outbound commands.
//!
//! Commands are queued on an unbounded mpsc channel and written by a single
//! task, so enqueueing never blocks the read loop or a handler, and the
//! bytes reach the socket in exactly the order they were queued.
//!
//! # Architecture
//!
//! ```text
//! send_command ─┐
//! auth reply   ─┼─► mpsc::UnboundedSender<Bytes> ─► Writer Task ─► Socket
//! handlers     ─┘
//! ```

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{EventSocketError, Result};

/// Maximum commands to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 64;

/// Handle for queueing encoded commands on the writer task.
///
/// Cheaply cloneable. Dropping every handle ends the writer task.
#[derive(Debug, Clone)]
pub(crate) struct WriterHandle {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl WriterHandle {
    /// Queue bytes for writing.
    ///
    /// Fails only once the writer task has stopped.
    pub(crate) fn send(&self, bytes: Bytes) -> Result<()> {
        self.tx
            .send(bytes)
            .map_err(|_| EventSocketError::ConnectionClosed)
    }
}

/// Spawn the writer task and return a handle for queueing commands.
///
/// The task ends cleanly when every handle is dropped, or with an error
/// when the socket rejects a write.
pub(crate) fn spawn_writer_task<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Main writer loop - receives commands and writes them to the socket.
async fn writer_loop<W>(mut rx: mpsc::UnboundedReceiver<Bytes>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(bytes) => bytes,
            None => {
                // Channel closed, clean shutdown
                let _ = writer.shutdown().await;
                return Ok(());
            }
        };

        // Collect additional ready commands (non-blocking)
        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);

        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(bytes) => batch.push(bytes),
                Err(_) => break,
            }
        }

        if let Err(e) = write_batch(&mut writer, &batch).await {
            tracing::warn!("Write failed: {}", e);
            return Err(e);
        }
    }
}

/// Write a batch using scatter/gather I/O (write_vectored), continuing
/// after partial writes.
async fn write_batch<W>(writer: &mut W, batch: &[Bytes]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let total_size: usize = batch.iter().map(Bytes::len).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(EventSocketError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }
        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build IoSlice array for the data after the first `skip_bytes` bytes.
fn build_remaining_slices(batch: &[Bytes], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len());
    let mut offset = 0;

    for bytes in batch {
        let end = offset + bytes.len();
        if skip_bytes < end && !bytes.is_empty() {
            let start = skip_bytes.saturating_sub(offset);
            slices.push(IoSlice::new(&bytes[start..]));
        }
        offset = end;
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_writer_handle_send() {
        let (client, mut server) = duplex(4096);
        let (handle, _task) = spawn_writer_task(client);

        handle.send(Bytes::from_static(b"noevent\n\n")).unwrap();

        let mut buf = vec![0u8; 9];
        server.read_exact(&mut buf).await.unwrap();

        assert_eq!(&buf, b"noevent\n\n");
    }

    #[tokio::test]
    async fn test_writer_preserves_order() {
        let (client, mut server) = duplex(4096);
        let (handle, _task) = spawn_writer_task(client);

        let mut expected = Vec::new();
        for i in 0..100 {
            let command = format!("api echo {}\n\n", i);
            expected.extend_from_slice(command.as_bytes());
            handle.send(Bytes::from(command)).unwrap();
        }

        let mut buf = vec![0u8; expected.len()];
        tokio::time::timeout(Duration::from_secs(5), server.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(buf, expected);
    }

    #[tokio::test]
    async fn test_writer_shutdown_on_channel_close() {
        let (client, mut server) = duplex(4096);
        let (handle, task) = spawn_writer_task(client);

        drop(handle);

        let result = task.await.unwrap();
        assert!(result.is_ok());

        // Peer sees EOF
        let mut buf = Vec::new();
        server.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_send_after_writer_stopped() {
        let (client, server) = duplex(64);
        let (handle, task) = spawn_writer_task(client);
        drop(server);

        // The first write hits the closed pipe and stops the task
        handle.send(Bytes::from_static(b"exit\n\n")).unwrap();
        assert!(task.await.unwrap().is_err());

        assert!(matches!(
            handle.send(Bytes::from_static(b"exit\n\n")),
            Err(EventSocketError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_build_remaining_slices_no_skip() {
        let batch = vec![Bytes::from_static(b"abc"), Bytes::from_static(b"de")];

        let slices = build_remaining_slices(&batch, 0);
        assert_eq!(slices.len(), 2);
    }

    #[test]
    fn test_build_remaining_slices_partial() {
        let batch = vec![Bytes::from_static(b"abc"), Bytes::from_static(b"de")];

        let slices = build_remaining_slices(&batch, 2);
        assert_eq!(slices.len(), 2);
        assert_eq!(&*slices[0], b"c");
        assert_eq!(&*slices[1], b"de");

        let slices = build_remaining_slices(&batch, 3);
        assert_eq!(slices.len(), 1);
        assert_eq!(&*slices[0], b"de");
    }

    #[tokio::test]
    async fn test_write_batch_multiple() {
        let mut buf = Cursor::new(Vec::new());
        let batch: Vec<_> = (0..5).map(|_| Bytes::from_static(b"log 7\n\n")).collect();

        write_batch(&mut buf, &batch).await.unwrap();

        assert_eq!(buf.into_inner(), b"log 7\n\n".repeat(5));
    }
}
