//! Protocol module - wire format, framing, and message types.
//!
//! This module implements the text protocol spoken on the socket:
//! - `Key: value` header blocks terminated by a blank line
//! - Frame buffer for accumulating partial reads
//! - Message struct with typed accessors

mod frame_buffer;
mod message;
mod wire_format;

pub use frame_buffer::FrameBuffer;
pub use message::{build_frame, Message};
pub use wire_format::{
    content_types, encode_command, header_names, parse_header_block, parse_header_line,
    Headers, ReplyStatus, BACKGROUND_JOB_EVENT, DEFAULT_MAX_BODY_SIZE, HEADER_TERMINATOR,
    STATUS_OK,
};
