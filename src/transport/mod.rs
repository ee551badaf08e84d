//! Transport module - the byte stream underneath the protocol.
//!
//! The client only needs to open a connection and get a read half and a
//! write half. [`Connector`] abstracts that so tests (or TLS wrappers) can
//! supply their own streams.

mod tcp;

pub use tcp::{BoxFuture, BoxedReader, BoxedWriter, Connector, TcpConnector, TransportStream};
