//! Error types for eventsocket-client.

use thiserror::Error;

/// Main error type for all event socket operations.
#[derive(Debug, Error)]
pub enum EventSocketError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error (event bodies).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (unparseable Content-Length, oversized body, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No transport is open, so nothing can be written.
    #[error("Not connected")]
    NotConnected,

    /// Connection closed before the operation completed.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using EventSocketError.
pub type Result<T> = std::result::Result<T, EventSocketError>;
