//! # eventsocket-client
//!
//! Async client for text-framed event socket control protocols, as spoken by
//! telephony switches.
//!
//! One TCP connection carries three kinds of traffic:
//!
//! - **Commands** and their `command/reply` answers, matched in FIFO order
//! - **Background jobs** (`bgapi`), whose result arrives later as a
//!   `BACKGROUND_JOB` event correlated by `Job-UUID`
//! - **Events** pushed by the server after an `event json ...` subscription
//!
//! The client authenticates when the server asks (`auth/request`) and
//! reconnects with exponential backoff whenever the connection drops.
//!
//! ## Example
//!
//! ```ignore
//! use eventsocket_client::{Client, ControlKey};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::new("127.0.0.1", 8021, "ClueCon");
//!
//!     let subscriber = client.clone();
//!     client.on(ControlKey::Connect, move |_| {
//!         let _ = subscriber.event("CHANNEL_CREATE BACKGROUND_JOB", |_| {});
//!     });
//!     client.on_event("CHANNEL_CREATE", |event, _| {
//!         println!("channel {:?}", event.get("Unique-ID"));
//!     });
//!
//!     client.connect();
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod reconnect;
pub mod transport;

mod client;
mod writer;

pub use client::{Client, ClientBuilder, ConnectionStatus};
pub use codec::Event;
pub use config::ClientConfig;
pub use error::{EventSocketError, Result};
pub use handler::{CommandReply, ControlKey};
pub use protocol::Message;
pub use reconnect::ReconnectConfig;
