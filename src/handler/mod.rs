//! Handler module - reply correlation and handler dispatch tables.
//!
//! Provides:
//! - [`HandlerRegistry`] - control handlers by [`ControlKey`], event handlers by name
//! - [`CommandReply`] - what a command callback receives
//! - the FIFO pending-command queue and background job map used by the client
//!
//! # Example
//!
//! ```ignore
//! use eventsocket_client::handler::ControlKey;
//!
//! client.on(ControlKey::Connect, |_| println!("ready"));
//! client.on_event("CHANNEL_HANGUP", |event, _| {
//!     println!("hangup: {:?}", event.get("Hangup-Cause"));
//! });
//! ```

mod correlation;
mod registry;
mod reply;

pub(crate) use correlation::{Correlator, PendingCommand, Resolution};
pub use registry::{ControlHandler, ControlKey, EventHandler, HandlerRegistry};
pub use reply::{CommandReply, ReplyCallback};
