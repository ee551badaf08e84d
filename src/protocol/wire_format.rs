//! Wire format encoding and decoding.
//!
//! A frame is a block of `Key: value` lines terminated by a blank line,
//! optionally followed by exactly `Content-Length` body bytes:
//! ```text
//! Content-Type: command/reply\n
//! Reply-Text: +OK accepted\n
//! \n
//! ```
//!
//! Commands travel the other way as a single line followed by the same
//! blank-line terminator.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

/// Terminates a header block and every outbound command.
pub const HEADER_TERMINATOR: &[u8] = b"\n\n";

/// Default maximum body size (64 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Header map of a decoded frame.
///
/// Keys are case-sensitive. When a header block repeats a key, the last
/// occurrence wins.
pub type Headers = HashMap<String, String>;

/// Well-known `Content-Type` values.
pub mod content_types {
    /// Server asks the client to authenticate.
    pub const AUTH_REQUEST: &str = "auth/request";
    /// Reply to the oldest outstanding command.
    pub const COMMAND_REPLY: &str = "command/reply";
    /// JSON event envelope.
    pub const EVENT_JSON: &str = "text/event-json";
    /// Server is about to close the socket.
    pub const DISCONNECT_NOTICE: &str = "text/disconnect-notice";
    /// Reply body of a blocking `api` command.
    pub const API_RESPONSE: &str = "api/response";
    /// Log line pushed after `log <level>`.
    pub const LOG_DATA: &str = "log/data";
}

/// Well-known header and event field names.
pub mod header_names {
    /// Primary dispatch discriminator.
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// Body length in bytes.
    pub const CONTENT_LENGTH: &str = "Content-Length";
    /// Status line of a `command/reply`.
    pub const REPLY_TEXT: &str = "Reply-Text";
    /// Background job identifier.
    pub const JOB_UUID: &str = "Job-UUID";
    /// Event name inside a JSON event.
    pub const EVENT_NAME: &str = "Event-Name";
    /// Embedded body of a JSON event.
    pub const EVENT_BODY: &str = "_body";
}

/// Event name carrying the result of a `bgapi` command.
pub const BACKGROUND_JOB_EVENT: &str = "BACKGROUND_JOB";

/// Status token of a successful reply.
pub const STATUS_OK: &str = "+OK";

/// Parse a single header line of the form `Key: value`.
///
/// The key is a run of non-whitespace characters ending in `:`, followed by
/// exactly one space and a non-empty value. The value stops at the first
/// carriage return. Anything else yields `None`.
pub fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let key_end = line.find(char::is_whitespace).unwrap_or(line.len());
    let key = line[..key_end].strip_suffix(':')?;
    if key.is_empty() {
        return None;
    }

    let rest = line[key_end..].strip_prefix(' ')?;
    let value = rest.split('\r').next().unwrap_or_default();
    if value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a header block (without its terminator) into a header map.
///
/// Malformed lines are skipped. Repeated keys overwrite earlier ones.
pub fn parse_header_block(block: &[u8]) -> Headers {
    let text = String::from_utf8_lossy(block);
    let mut headers = Headers::new();

    for line in text.split('\n') {
        if let Some((key, value)) = parse_header_line(line) {
            headers.insert(key.to_string(), value.to_string());
        }
    }

    headers
}

/// Encode a command line for the wire (appends the terminator).
///
/// # Example
///
/// ```
/// use eventsocket_client::protocol::encode_command;
///
/// assert_eq!(&encode_command("auth secret")[..], b"auth secret\n\n");
/// ```
pub fn encode_command(command: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(command.len() + HEADER_TERMINATOR.len());
    buf.put_slice(command.as_bytes());
    buf.put_slice(HEADER_TERMINATOR);
    buf.freeze()
}

/// Outcome parsed from a reply status line (`Reply-Text` or a job `_body`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyStatus {
    /// `true` when the status token is `+OK`.
    pub success: bool,
    /// Text following the status token on the same line, if any.
    pub text: Option<String>,
}

impl ReplyStatus {
    /// Parse a status line such as `+OK accepted` or `-ERR invalid command`.
    ///
    /// The first whitespace-delimited token is the status. One optional
    /// whitespace character separates it from the remainder, which runs to
    /// the end of the line. Missing, empty or whitespace-led input is a
    /// failure with no text.
    ///
    /// # Example
    ///
    /// ```
    /// use eventsocket_client::protocol::ReplyStatus;
    ///
    /// let status = ReplyStatus::parse(Some("+OK Job-UUID: 1234"));
    /// assert!(status.success);
    /// assert_eq!(status.text.as_deref(), Some("Job-UUID: 1234"));
    /// ```
    pub fn parse(line: Option<&str>) -> Self {
        let line = line.unwrap_or_default();
        let token_end = line.find(char::is_whitespace).unwrap_or(line.len());
        if token_end == 0 {
            return Self::failure();
        }

        let (token, rest) = line.split_at(token_end);

        // `rest` is empty or starts with the separator
        let mut chars = rest.chars();
        chars.next();
        let remainder = chars
            .as_str()
            .split(['\n', '\r'])
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            success: token == STATUS_OK,
            text: remainder,
        }
    }

    fn failure() -> Self {
        Self {
            success: false,
            text: None,
        }
    }
}

/// Find the first header terminator in `buf`.
pub(crate) fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_line() {
        assert_eq!(
            parse_header_line("Content-Type: command/reply"),
            Some(("Content-Type", "command/reply"))
        );
        assert_eq!(
            parse_header_line("Reply-Text: +OK Job-UUID: abc"),
            Some(("Reply-Text", "+OK Job-UUID: abc"))
        );
    }

    #[test]
    fn test_parse_header_line_rejects_malformed() {
        assert_eq!(parse_header_line(""), None);
        assert_eq!(parse_header_line("no colon here"), None);
        assert_eq!(parse_header_line("Key:value"), None);
        assert_eq!(parse_header_line("Key: "), None);
        assert_eq!(parse_header_line(": value"), None);
        assert_eq!(parse_header_line(" Key: value"), None);
        assert_eq!(parse_header_line("Key\t: value"), None);
    }

    #[test]
    fn test_parse_header_line_keeps_extra_spaces_and_strips_cr() {
        assert_eq!(parse_header_line("Key:  padded"), Some(("Key", " padded")));
        assert_eq!(parse_header_line("Key: value\r"), Some(("Key", "value")));
        assert_eq!(parse_header_line("a:b: c"), Some(("a:b", "c")));
    }

    #[test]
    fn test_parse_header_block_last_wins() {
        let headers = parse_header_block(b"A: 1\ngarbage\nB: 2\nA: 3");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["A"], "3");
        assert_eq!(headers["B"], "2");
    }

    #[test]
    fn test_encode_command() {
        assert_eq!(&encode_command("noevent")[..], b"noevent\n\n");
        assert_eq!(&encode_command("")[..], b"\n\n");
    }

    #[test]
    fn test_reply_status_ok_with_text() {
        let status = ReplyStatus::parse(Some("+OK accepted"));
        assert!(status.success);
        assert_eq!(status.text.as_deref(), Some("accepted"));
    }

    #[test]
    fn test_reply_status_ok_without_text() {
        let status = ReplyStatus::parse(Some("+OK"));
        assert!(status.success);
        assert_eq!(status.text, None);
    }

    #[test]
    fn test_reply_status_error() {
        let status = ReplyStatus::parse(Some("-ERR invalid"));
        assert!(!status.success);
        assert_eq!(status.text.as_deref(), Some("invalid"));
    }

    #[test]
    fn test_reply_status_missing_or_blank() {
        assert_eq!(ReplyStatus::parse(None), ReplyStatus::failure());
        assert_eq!(ReplyStatus::parse(Some("")), ReplyStatus::failure());
        assert_eq!(ReplyStatus::parse(Some(" +OK")), ReplyStatus::failure());
    }

    #[test]
    fn test_reply_status_stops_at_line_end() {
        let status = ReplyStatus::parse(Some("+OK 7f4c\n"));
        assert_eq!(status.text.as_deref(), Some("7f4c"));

        let status = ReplyStatus::parse(Some("+OK\nsecond line"));
        assert!(status.success);
        assert_eq!(status.text.as_deref(), Some("second line"));
    }

    #[test]
    fn test_reply_status_requires_exact_ok_token() {
        assert!(!ReplyStatus::parse(Some("+OKAY")).success);
        assert!(!ReplyStatus::parse(Some("+ok")).success);
    }

    #[test]
    fn test_find_terminator() {
        assert_eq!(find_terminator(b"A: 1\n\nrest"), Some(4));
        assert_eq!(find_terminator(b"\n\n"), Some(0));
        assert_eq!(find_terminator(b"A: 1\n"), None);
    }
}
