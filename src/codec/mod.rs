//! Codec module - decoding of structured message bodies.
//!
//! - [`JsonCodec`] - JSON using `serde_json`, for `text/event-json` bodies
//! - [`Event`] - the decoded event envelope
//!
//! # Design
//!
//! Codecs are implemented as marker structs with static methods rather than trait objects.

mod json;

pub use json::{Event, JsonCodec};
