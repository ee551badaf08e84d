//! Client configuration.
//!
//! Defaults match a stock event socket listener on the local machine.

use crate::protocol::DEFAULT_MAX_BODY_SIZE;
use crate::reconnect::ReconnectConfig;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default event socket port.
pub const DEFAULT_PORT: u16 = 8021;

/// Default event socket password.
pub const DEFAULT_PASSWORD: &str = "ClueCon";

/// Default size of the socket read buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for a [`Client`](crate::Client).
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Credential sent as `auth <password>`.
    pub password: String,
    /// Reconnect backoff.
    pub reconnect: ReconnectConfig,
    /// Bytes requested per socket read.
    pub read_buffer_size: usize,
    /// Largest accepted `Content-Length`.
    pub max_body_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: DEFAULT_PASSWORD.to_string(),
            reconnect: ReconnectConfig::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("reconnect", &self.reconnect)
            .field("read_buffer_size", &self.read_buffer_size)
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}
