//! Connector trait and the default TCP implementation.
//!
//! # Example
//!
//! ```ignore
//! use eventsocket_client::transport::{Connector, TcpConnector};
//!
//! let connector = TcpConnector::new("127.0.0.1", 8021);
//! let stream = connector.connect().await?;
//! let (reader, writer) = stream.into_split();
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::Result;

/// Boxed future returned by [`Connector::connect`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read half of a transport.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of a transport.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open byte stream, already split into halves.
pub struct TransportStream {
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl TransportStream {
    /// Wrap a read half and a write half.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Wrap a single bidirectional stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer)
    }

    /// Split into read and write halves.
    pub fn into_split(self) -> (BoxedReader, BoxedWriter) {
        (self.reader, self.writer)
    }
}

impl fmt::Debug for TransportStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportStream").finish_non_exhaustive()
    }
}

impl From<TcpStream> for TransportStream {
    fn from(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }
}

/// Opens transports on demand. Called once per connection attempt.
pub trait Connector: Send + Sync + 'static {
    /// Open a new transport.
    fn connect(&self) -> BoxFuture<'static, Result<TransportStream>>;

    /// Human-readable target for logs.
    fn describe(&self) -> String {
        String::from("custom transport")
    }
}

/// Plain TCP connector.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    /// Create a connector for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Target host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Target port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> BoxFuture<'static, Result<TransportStream>> {
        let addr = (self.host.clone(), self.port);
        Box::pin(async move {
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            Ok(TransportStream::from(stream))
        })
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
