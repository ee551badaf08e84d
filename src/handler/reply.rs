//! Command replies and the callbacks that receive them.

use bytes::Bytes;

use crate::codec::Event;
use crate::protocol::{Headers, Message, ReplyStatus};

/// Callback invoked once with the reply to a command.
pub type ReplyCallback = Box<dyn FnOnce(CommandReply) + Send + 'static>;

/// Outcome of a command, delivered either by a `command/reply` message or,
/// for background jobs, by the matching `BACKGROUND_JOB` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Headers of the message that completed the command.
    pub headers: Headers,
    /// Body of the message that completed the command.
    pub body: Bytes,
    /// `true` when the status token was `+OK`.
    pub success: bool,
    /// Text following the status token, if any.
    pub text: Option<String>,
}

impl CommandReply {
    /// Build a reply from a `command/reply` message (status from `Reply-Text`).
    pub fn from_reply(message: &Message) -> Self {
        Self::with_status(message, message.reply_status())
    }

    /// Build a reply from a background job event (status from `_body`).
    pub fn from_job(message: &Message, event: &Event) -> Self {
        Self::with_status(message, ReplyStatus::parse(event.body()))
    }

    fn with_status(message: &Message, status: ReplyStatus) -> Self {
        Self {
            headers: message.headers.clone(),
            body: message.body.clone(),
            success: status.success,
            text: status.text,
        }
    }

    /// Look up a header of the completing message.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Text following the status token, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}
