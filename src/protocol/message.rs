//! Decoded message with typed accessors.
//!
//! Represents one complete frame: its header map and its (possibly empty)
//! body. Uses `bytes::Bytes` for zero-copy body sharing.
//!
//! # Example
//!
//! ```
//! use eventsocket_client::protocol::{build_frame, FrameBuffer};
//!
//! let bytes = build_frame(&[("Content-Type", "api/response")], b"+OK");
//! let mut buffer = FrameBuffer::new();
//! let messages = buffer.push(&bytes).unwrap();
//!
//! assert_eq!(messages[0].content_type(), Some("api/response"));
//! assert_eq!(messages[0].body(), b"+OK");
//! ```

use bytes::Bytes;

use super::wire_format::{header_names, Headers, ReplyStatus, HEADER_TERMINATOR};

/// A complete protocol message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Parsed header block.
    pub headers: Headers,
    /// Body bytes (empty when no `Content-Length` was sent).
    pub body: Bytes,
}

impl Message {
    /// Create a new message from headers and body.
    pub fn new(headers: Headers, body: Bytes) -> Self {
        Self { headers, body }
    }

    /// Look up a header value.
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The `Content-Type` discriminator, if present.
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.header(header_names::CONTENT_TYPE)
    }

    /// The background job identifier, if present.
    #[inline]
    pub fn job_uuid(&self) -> Option<&str> {
        self.header(header_names::JOB_UUID)
    }

    /// Parsed `Reply-Text` status.
    pub fn reply_status(&self) -> ReplyStatus {
        ReplyStatus::parse(self.header(header_names::REPLY_TEXT))
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text (lossy).
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Build a complete frame as a single byte vector.
///
/// Writes the given headers in order. A non-empty body gets a
/// `Content-Length` header appended automatically.
///
/// # Example
///
/// ```
/// use eventsocket_client::protocol::build_frame;
///
/// let bytes = build_frame(&[("Content-Type", "auth/request")], b"");
/// assert_eq!(bytes, b"Content-Type: auth/request\n\n");
/// ```
pub fn build_frame(headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64 + body.len());

    for (key, value) in headers {
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.push(b'\n');
    }

    if !body.is_empty() {
        buf.extend_from_slice(
            format!("{}: {}\n", header_names::CONTENT_LENGTH, body.len()).as_bytes(),
        );
    }

    // Header lines already end in '\n'; one more closes the block.
    if headers.is_empty() && body.is_empty() {
        buf.extend_from_slice(HEADER_TERMINATOR);
    } else {
        buf.push(b'\n');
    }
    buf.extend_from_slice(body);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_message_accessors() {
        let msg = Message::new(
            headers(&[
                ("Content-Type", "command/reply"),
                ("Reply-Text", "+OK Job-UUID: 42"),
                ("Job-UUID", "42"),
            ]),
            Bytes::new(),
        );

        assert_eq!(msg.content_type(), Some("command/reply"));
        assert_eq!(msg.job_uuid(), Some("42"));
        assert!(msg.reply_status().success);
        assert!(msg.body().is_empty());
        assert_eq!(msg.header("Missing"), None);
    }

    #[test]
    fn test_message_without_reply_text_is_failure() {
        let msg = Message::new(headers(&[("Content-Type", "command/reply")]), Bytes::new());

        let status = msg.reply_status();
        assert!(!status.success);
        assert_eq!(status.text, None);
    }

    #[test]
    fn test_body_text() {
        let msg = Message::new(Headers::new(), Bytes::from_static(b"hello"));
        assert_eq!(msg.body_text(), "hello");
    }

    #[test]
    fn test_build_frame_headers_only() {
        let bytes = build_frame(&[("A", "1"), ("B", "2")], b"");
        assert_eq!(bytes, b"A: 1\nB: 2\n\n");
    }

    #[test]
    fn test_build_frame_with_body() {
        let bytes = build_frame(&[("Content-Type", "log/data")], b"hello");
        assert_eq!(
            bytes,
            b"Content-Type: log/data\nContent-Length: 5\n\nhello".to_vec()
        );
    }

    #[test]
    fn test_build_frame_empty() {
        assert_eq!(build_frame(&[], b""), b"\n\n");
    }
}
