//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: Need a complete header block (up to `\n\n`)
//! - `WaitingForBody`: Headers parsed, need `Content-Length` more bytes
//!
//! A message is only emitted once its body is complete.
//!
//! # Example
//!
//! ```
//! use eventsocket_client::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Data arrives in chunks from the socket
//! assert!(buffer.push(b"Content-Type: log/data\nContent-Length: 5\n\nhe").unwrap().is_empty());
//! let messages = buffer.push(b"llo").unwrap();
//!
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].body(), b"hello");
//! ```

use bytes::{Buf, Bytes, BytesMut};

use super::wire_format::{
    find_terminator, header_names, parse_header_block, Headers, DEFAULT_MAX_BODY_SIZE,
    HEADER_TERMINATOR,
};
use super::Message;
use crate::error::{EventSocketError, Result};

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header block.
    WaitingForHeader,
    /// Headers parsed, waiting for body bytes.
    WaitingForBody { headers: Headers, length: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete messages.
///
/// Uses a state machine to handle partial reads efficiently.
/// All data is stored in a single `BytesMut` buffer to minimize allocations.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Bytes already searched for a terminator without success.
    scanned: usize,
    /// Maximum allowed body size.
    max_body_size: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max body: 64MB.
    pub fn new() -> Self {
        Self::with_max_body(DEFAULT_MAX_BODY_SIZE)
    }

    /// Create a new frame buffer with custom max body size.
    pub fn with_max_body(max_body_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
            scanned: 0,
            max_body_size,
        }
    }

    /// Push data into the buffer and extract all complete messages.
    ///
    /// Returns the messages completed by this chunk, in stream order.
    /// Incomplete data is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns error if a `Content-Length` header is not a valid length or
    /// exceeds the maximum body size. The stream cannot be resynchronized
    /// after that.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Message>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();

        while let Some(message) = self.try_extract_one()? {
            messages.push(message);
        }

        Ok(messages)
    }

    /// Try to extract a single message from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(message))` if a complete message was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on an unusable `Content-Length`
    fn try_extract_one(&mut self) -> Result<Option<Message>> {
        loop {
            match &self.state {
                State::WaitingForHeader => {
                    // Terminator may straddle the previous scan boundary
                    let from = self.scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
                    let end = match find_terminator(&self.buffer[from..]) {
                        Some(pos) => from + pos,
                        None => {
                            self.scanned = self.buffer.len();
                            return Ok(None);
                        }
                    };
                    self.scanned = 0;

                    // Empty header block: heartbeat, skip it
                    if end == 0 {
                        self.buffer.advance(HEADER_TERMINATOR.len());
                        continue;
                    }

                    let headers = parse_header_block(&self.buffer[..end]);
                    self.buffer.advance(end + HEADER_TERMINATOR.len());

                    // No Content-Length means no body
                    let length = match headers.get(header_names::CONTENT_LENGTH) {
                        Some(raw) => self.parse_content_length(raw)?,
                        None => 0,
                    };

                    if length == 0 {
                        return Ok(Some(Message::new(headers, Bytes::new())));
                    }

                    // Body may already be buffered
                    self.state = State::WaitingForBody { headers, length };
                }

                State::WaitingForBody { length, .. } => {
                    if self.buffer.len() < *length {
                        return Ok(None);
                    }

                    let body = self.buffer.split_to(*length).freeze();
                    let headers = match std::mem::replace(&mut self.state, State::WaitingForHeader) {
                        State::WaitingForBody { headers, .. } => headers,
                        State::WaitingForHeader => Headers::new(),
                    };

                    return Ok(Some(Message::new(headers, body)));
                }
            }
        }
    }

    fn parse_content_length(&self, raw: &str) -> Result<usize> {
        let length: usize = raw.trim().parse().map_err(|_| {
            EventSocketError::Protocol(format!("Invalid Content-Length: {:?}", raw))
        })?;

        if length > self.max_body_size {
            return Err(EventSocketError::Protocol(format!(
                "Body size {} exceeds maximum {}",
                length, self.max_body_size
            )));
        }

        Ok(length)
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.state = State::WaitingForHeader;
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
