//! Handler registry for dispatching decoded messages.
//!
//! Two independent tables, each holding one handler per key:
//! - control handlers keyed by [`ControlKey`] (content types and
//!   connection lifecycle signals)
//! - event handlers keyed by the JSON event's `Event-Name`
//!
//! Registering a handler replaces and returns the previous one, so callers
//! can save and later restore it.
//!
//! # Example
//!
//! ```
//! use eventsocket_client::handler::{ControlKey, HandlerRegistry};
//!
//! let mut registry = HandlerRegistry::new();
//!
//! registry.on(ControlKey::Connect, |_msg| println!("connected"));
//! registry.on_event("CHANNEL_ANSWER", |event, _msg| {
//!     println!("answered: {:?}", event.get("Unique-ID"));
//! });
//!
//! assert!(registry.control(&ControlKey::Connect).is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::Event;
use crate::protocol::{content_types, Message};

/// Handler for control messages and lifecycle signals.
///
/// Lifecycle signals (`Connect`, `Disconnect`) receive an empty message;
/// `Error` receives the failed authentication reply.
pub type ControlHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// Handler for JSON events; receives the decoded event and its envelope.
pub type EventHandler = Arc<dyn Fn(&Event, &Message) + Send + Sync>;

/// Key of the control handler table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlKey {
    /// Authentication succeeded.
    Connect,
    /// A connected session ended.
    Disconnect,
    /// Authentication was rejected.
    Error,
    /// `auth/request`
    AuthRequest,
    /// `command/reply`
    CommandReply,
    /// `text/event-json`
    EventJson,
    /// `text/disconnect-notice`
    DisconnectNotice,
    /// `api/response`
    ApiResponse,
    /// `log/data`
    LogData,
    /// Any other content type.
    Other(String),
}

impl ControlKey {
    /// Map a `Content-Type` value to its key.
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type {
            content_types::AUTH_REQUEST => Self::AuthRequest,
            content_types::COMMAND_REPLY => Self::CommandReply,
            content_types::EVENT_JSON => Self::EventJson,
            content_types::DISCONNECT_NOTICE => Self::DisconnectNotice,
            content_types::API_RESPONSE => Self::ApiResponse,
            content_types::LOG_DATA => Self::LogData,
            other => Self::Other(other.to_string()),
        }
    }

    /// Content type this key stands for, `None` for lifecycle signals.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Connect | Self::Disconnect | Self::Error => None,
            Self::AuthRequest => Some(content_types::AUTH_REQUEST),
            Self::CommandReply => Some(content_types::COMMAND_REPLY),
            Self::EventJson => Some(content_types::EVENT_JSON),
            Self::DisconnectNotice => Some(content_types::DISCONNECT_NOTICE),
            Self::ApiResponse => Some(content_types::API_RESPONSE),
            Self::LogData => Some(content_types::LOG_DATA),
            Self::Other(content_type) => Some(content_type),
        }
    }
}

impl From<&str> for ControlKey {
    fn from(content_type: &str) -> Self {
        Self::from_content_type(content_type)
    }
}

/// Registry of control and event handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    control: HashMap<ControlKey, ControlHandler>,
    events: HashMap<String, EventHandler>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a control handler, returning the one it replaces.
    pub fn on<F>(&mut self, key: ControlKey, handler: F) -> Option<ControlHandler>
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.control.insert(key, Arc::new(handler))
    }

    /// Install (or with `None`, remove) a control handler, returning the
    /// previous one. Used to restore a handler saved from [`on`](Self::on).
    pub fn replace(
        &mut self,
        key: ControlKey,
        handler: Option<ControlHandler>,
    ) -> Option<ControlHandler> {
        match handler {
            Some(handler) => self.control.insert(key, handler),
            None => self.control.remove(&key),
        }
    }

    /// Register an event handler, returning the one it replaces.
    pub fn on_event<F>(&mut self, name: &str, handler: F) -> Option<EventHandler>
    where
        F: Fn(&Event, &Message) + Send + Sync + 'static,
    {
        self.events.insert(name.to_string(), Arc::new(handler))
    }

    /// Install (or with `None`, remove) an event handler, returning the
    /// previous one.
    pub fn replace_event(
        &mut self,
        name: &str,
        handler: Option<EventHandler>,
    ) -> Option<EventHandler> {
        match handler {
            Some(handler) => self.events.insert(name.to_string(), handler),
            None => self.events.remove(name),
        }
    }

    /// Get the control handler for a key.
    pub fn control(&self, key: &ControlKey) -> Option<ControlHandler> {
        self.control.get(key).cloned()
    }

    /// Get the event handler for an event name.
    pub fn event(&self, name: &str) -> Option<EventHandler> {
        self.events.get(name).cloned()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("control", &self.control.keys().collect::<Vec<_>>())
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_register_returns_previous() {
        let mut registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(registry.on(ControlKey::Connect, |_| {}).is_none());

        let counter = calls.clone();
        let previous = registry.on(ControlKey::Connect, move |_| {
            counter.fetch_add(10, Ordering::SeqCst);
        });
        assert!(previous.is_some());

        // restore the first handler
        let second = registry.replace(ControlKey::Connect, previous);
        second.unwrap()(&Message::default());
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_replace_none_removes() {
        let mut registry = HandlerRegistry::new();
        registry.on(ControlKey::LogData, |_| {});

        assert!(registry.replace(ControlKey::LogData, None).is_some());
        assert!(registry.control(&ControlKey::LogData).is_none());
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let mut registry = HandlerRegistry::new();
        registry.on_event("connect", |_, _| {});

        assert!(registry.control(&ControlKey::Connect).is_none());
        assert!(registry.control(&ControlKey::from("connect")).is_none());
        assert!(registry.event("connect").is_some());
    }

    #[test]
    fn test_event_handler_replace() {
        let mut registry = HandlerRegistry::new();

        assert!(registry.on_event("HEARTBEAT", |_, _| {}).is_none());
        assert!(registry.on_event("HEARTBEAT", |_, _| {}).is_some());
        assert!(registry.replace_event("HEARTBEAT", None).is_some());
        assert!(registry.event("HEARTBEAT").is_none());
    }

    #[test]
    fn test_control_key_from_content_type() {
        assert_eq!(ControlKey::from("auth/request"), ControlKey::AuthRequest);
        assert_eq!(ControlKey::from("command/reply"), ControlKey::CommandReply);
        assert_eq!(ControlKey::from("text/event-json"), ControlKey::EventJson);
        assert_eq!(
            ControlKey::from("text/disconnect-notice"),
            ControlKey::DisconnectNotice
        );
        assert_eq!(
            ControlKey::from("text/rude-rejection"),
            ControlKey::Other("text/rude-rejection".to_string())
        );
    }

    #[test]
    fn test_control_key_content_type() {
        assert_eq!(ControlKey::Connect.content_type(), None);
        assert_eq!(ControlKey::LogData.content_type(), Some("log/data"));
        assert_eq!(
            ControlKey::Other("x/y".to_string()).content_type(),
            Some("x/y")
        );
    }
}
