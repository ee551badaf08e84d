//! Client builder and connection runtime.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the target
//! and handlers. The [`Client`] manages the connection lifecycle:
//! 1. Open the transport
//! 2. Answer `auth/request` with `auth <password>`
//! 3. Read messages and dispatch them (replies, background jobs, events)
//! 4. On close, reconnect with exponential backoff
//!
//! All reads, decoding and dispatch for one connection run on a single
//! task. Handlers and reply callbacks are invoked with no internal lock
//! held, so they may send further commands.
//!
//! # Example
//!
//! ```ignore
//! use eventsocket_client::{Client, ControlKey};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .host("10.0.0.5")
//!         .password("ClueCon")
//!         .on(ControlKey::Connect, |_| println!("authenticated"))
//!         .on_event("CHANNEL_CREATE", |event, _| {
//!             println!("new channel {:?}", event.get("Unique-ID"));
//!         })
//!         .build();
//!
//!     client.connect();
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::codec::{Event, JsonCodec};
use crate::config::ClientConfig;
use crate::error::{EventSocketError, Result};
use crate::handler::{
    CommandReply, ControlHandler, ControlKey, Correlator, EventHandler, HandlerRegistry,
    PendingCommand, Resolution,
};
use crate::protocol::{encode_command, FrameBuffer, Message, BACKGROUND_JOB_EVENT};
use crate::reconnect::{Backoff, ReconnectConfig, RetryTimer};
use crate::transport::{BoxedReader, Connector, TcpConnector};
use crate::writer::{spawn_writer_task, WriterHandle};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No transport open.
    Disconnected,
    /// Transport is opening, or open and waiting for `auth/request`.
    Connecting,
    /// `auth` sent, waiting for its reply.
    AuthPending,
    /// Authenticated.
    Connected,
    /// `exit` acknowledged, waiting for the transport to close.
    Closing,
}

/// Builder for configuring and creating a client.
pub struct ClientBuilder {
    config: ClientConfig,
    connector: Option<Box<dyn Connector>>,
    registry: HandlerRegistry,
}

impl ClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            connector: None,
            registry: HandlerRegistry::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the password sent on `auth/request`.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    /// Set the reconnect backoff.
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.config.reconnect = reconnect;
        self
    }

    /// Set the first reconnect delay.
    ///
    /// Default: 1 second
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect.base_delay = delay;
        self
    }

    /// Set the reconnect delay cap.
    ///
    /// Default: 30 seconds
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect.max_delay = delay;
        self
    }

    /// Set the socket read buffer size.
    ///
    /// Default: 64KB
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size.max(1);
        self
    }

    /// Set the largest accepted message body.
    ///
    /// Default: 64MB
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Use a custom transport instead of TCP to `host:port`.
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Box::new(connector));
        self
    }

    /// Register a control handler.
    pub fn on<F>(mut self, key: ControlKey, handler: F) -> Self
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.registry.on(key, handler);
        self
    }

    /// Register an event handler.
    pub fn on_event<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&Event, &Message) + Send + Sync + 'static,
    {
        self.registry.on_event(name, handler);
        self
    }

    /// Build the client. Nothing is opened until [`Client::connect`].
    pub fn build(self) -> Client {
        let connector = self.connector.unwrap_or_else(|| {
            Box::new(TcpConnector::new(self.config.host.clone(), self.config.port))
        });

        let state = ConnectionState {
            status: ConnectionStatus::Disconnected,
            authenticated: false,
            writer: None,
            correlator: Correlator::new(),
            backoff: Backoff::new(&self.config.reconnect),
            retry: RetryTimer::new(),
            generation: 0,
            read_task: None,
            shut_down: false,
        };

        Client {
            shared: Arc::new(Shared {
                config: self.config,
                connector,
                state: Mutex::new(state),
                handlers: Mutex::new(self.registry),
            }),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable connection state, guarded by one lock.
struct ConnectionState {
    status: ConnectionStatus,
    /// Authenticated at some point during the current transport session.
    authenticated: bool,
    writer: Option<WriterHandle>,
    correlator: Correlator,
    backoff: Backoff,
    retry: RetryTimer,
    /// Bumped for every transport; closes from older transports are ignored.
    generation: u64,
    read_task: Option<JoinHandle<()>>,
    shut_down: bool,
}

struct Shared {
    config: ClientConfig,
    connector: Box<dyn Connector>,
    state: Mutex<ConnectionState>,
    handlers: Mutex<HandlerRegistry>,
}

/// An event socket client.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a TCP client for `host:port` authenticating with `password`.
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        ClientBuilder::new()
            .host(host)
            .port(port)
            .password(password)
            .build()
    }

    /// Open the transport in the background.
    ///
    /// A no-op unless the client is disconnected (or after
    /// [`shutdown`](Self::shutdown)). Must be called from within a tokio
    /// runtime. Failures are retried with backoff.
    pub fn connect(&self) {
        self.shared.connect();
    }

    /// Whether the client is authenticated.
    pub fn connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock_state().status
    }

    /// Number of commands waiting for a reply.
    pub fn pending_commands(&self) -> usize {
        self.shared.lock_state().correlator.pending_len()
    }

    /// Number of background jobs waiting for their completion event.
    pub fn background_jobs(&self) -> usize {
        self.shared.lock_state().correlator.jobs_len()
    }

    /// Send a command; `callback` receives its reply.
    ///
    /// Replies are matched to commands strictly in send order. If the reply
    /// announces a background job (`+OK` with `Job-UUID`), the callback
    /// fires later, when the `BACKGROUND_JOB` event arrives.
    ///
    /// # Errors
    ///
    /// `NotConnected` if no transport is open; the callback is dropped.
    pub fn send_command<F>(&self, command: &str, callback: F) -> Result<()>
    where
        F: FnOnce(CommandReply) + Send + 'static,
    {
        self.shared
            .send(command, PendingCommand::Callback(Box::new(callback)))
    }

    /// Send a command and wait for its reply.
    ///
    /// There is no timeout: if the server never answers, this waits until
    /// the connection drops.
    pub async fn request(&self, command: &str) -> Result<CommandReply> {
        let (tx, rx) = oneshot::channel();
        self.send_command(command, move |reply| {
            let _ = tx.send(reply);
        })?;
        rx.await.map_err(|_| EventSocketError::ConnectionClosed)
    }

    /// `log <level>`: start receiving `log/data` messages.
    pub fn log<F>(&self, level: &str, callback: F) -> Result<()>
    where
        F: FnOnce(CommandReply) + Send + 'static,
    {
        self.send_command(&format!("log {}", level), callback)
    }

    /// `nolog`: stop log delivery.
    pub fn nolog<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce(CommandReply) + Send + 'static,
    {
        self.send_command("nolog", callback)
    }

    /// `event json <types>`: subscribe to events (space separated, or `ALL`).
    pub fn event<F>(&self, types: &str, callback: F) -> Result<()>
    where
        F: FnOnce(CommandReply) + Send + 'static,
    {
        self.send_command(&format!("event json {}", types), callback)
    }

    /// `nixevent <types>`: unsubscribe from some events.
    pub fn nixevent<F>(&self, types: &str, callback: F) -> Result<()>
    where
        F: FnOnce(CommandReply) + Send + 'static,
    {
        self.send_command(&format!("nixevent {}", types), callback)
    }

    /// `noevent`: unsubscribe from all events.
    pub fn noevent<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce(CommandReply) + Send + 'static,
    {
        self.send_command("noevent", callback)
    }

    /// `bgapi <command>`: run a command as a background job.
    ///
    /// The callback fires with the job result once the `BACKGROUND_JOB`
    /// event arrives. Requires a subscription to `BACKGROUND_JOB` events.
    pub fn bgapi<F>(&self, command: &str, callback: F) -> Result<()>
    where
        F: FnOnce(CommandReply) + Send + 'static,
    {
        self.send_command(&format!("bgapi {}", command), callback)
    }

    /// `exit`: ask the server to close the session.
    ///
    /// The reply moves the client to `Closing`. The transport close that
    /// follows is handled like any other close, including the reconnect.
    /// Use [`shutdown`](Self::shutdown) to stop for good.
    pub fn exit(&self) -> Result<()> {
        self.shared.send("exit", PendingCommand::Exit)
    }

    /// Close the transport and stop reconnecting. Pending callbacks are
    /// dropped. Later calls to [`connect`](Self::connect) are no-ops.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Register a control handler, returning the one it replaces.
    pub fn on<F>(&self, key: ControlKey, handler: F) -> Option<ControlHandler>
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.shared.lock_handlers().on(key, handler)
    }

    /// Install (or remove, with `None`) a control handler, returning the
    /// previous one.
    pub fn replace(&self, key: ControlKey, handler: Option<ControlHandler>) -> Option<ControlHandler> {
        self.shared.lock_handlers().replace(key, handler)
    }

    /// Register an event handler, returning the one it replaces.
    pub fn on_event<F>(&self, name: &str, handler: F) -> Option<EventHandler>
    where
        F: Fn(&Event, &Message) + Send + Sync + 'static,
    {
        self.shared.lock_handlers().on_event(name, handler)
    }

    /// Install (or remove, with `None`) an event handler, returning the
    /// previous one.
    pub fn replace_event(&self, name: &str, handler: Option<EventHandler>) -> Option<EventHandler> {
        self.shared.lock_handlers().replace_event(name, handler)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("target", &self.shared.connector.describe())
            .field("status", &self.status())
            .finish()
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_handlers(&self) -> MutexGuard<'_, HandlerRegistry> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(self: &Arc<Self>) {
        let generation = {
            let mut state = self.lock_state();
            if state.shut_down {
                tracing::debug!("connect() ignored after shutdown");
                return;
            }
            if state.status != ConnectionStatus::Disconnected {
                tracing::debug!("connect() ignored while {:?}", state.status);
                return;
            }
            state.status = ConnectionStatus::Connecting;
            state.generation += 1;
            state.generation
        };

        tracing::info!("Connecting to {}...", self.connector.describe());

        let shared = self.clone();
        let task = tokio::spawn(async move { shared.run_connection(generation).await });

        let mut state = self.lock_state();
        if state.generation == generation {
            state.read_task = Some(task);
        }
    }

    /// Open the transport, run the read loop, then handle the close.
    async fn run_connection(self: Arc<Self>, generation: u64) {
        let stream = match self.connector.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Connection to {} failed: {}", self.connector.describe(), e);
                self.handle_close(generation);
                return;
            }
        };

        let (reader, write_half) = stream.into_split();
        let (writer, mut writer_task) = spawn_writer_task(write_half);

        {
            let mut state = self.lock_state();
            if state.generation != generation {
                return;
            }
            state.writer = Some(writer);
        }

        tracing::info!("Connected to {}", self.connector.describe());

        // A failed write closes the connection just like a failed read
        let result = tokio::select! {
            result = self.read_loop(reader) => result,
            joined = &mut writer_task => match joined {
                Ok(result) => result,
                Err(_) => Err(EventSocketError::ConnectionClosed),
            },
        };

        if let Err(e) = result {
            tracing::warn!("Connection error: {}", e);
        }

        self.handle_close(generation);
    }

    /// Main read loop - reads bytes, decodes messages and dispatches them.
    async fn read_loop(self: &Arc<Self>, mut reader: BoxedReader) -> Result<()> {
        let mut frame_buffer = FrameBuffer::with_max_body(self.config.max_body_size);
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => return Ok(()), // Connection closed
                Ok(n) => n,
                Err(e) => return Err(EventSocketError::Io(e)),
            };

            let messages = frame_buffer.push(&buf[..n])?;

            for message in messages {
                self.dispatch(&message);
            }
        }
    }

    /// Route one decoded message.
    ///
    /// `auth/request`, `command/reply` and `text/event-json` are processed
    /// here first; a control handler registered for the content type (any
    /// content type) runs afterwards.
    fn dispatch(self: &Arc<Self>, message: &Message) {
        let Some(content_type) = message.content_type() else {
            tracing::debug!("Dropping message without Content-Type");
            return;
        };

        let key = ControlKey::from_content_type(content_type);
        match key {
            ControlKey::AuthRequest => self.handle_auth_request(),
            ControlKey::CommandReply => self.handle_command_reply(message),
            ControlKey::EventJson => self.handle_event(message),
            _ => {}
        }

        let handler = self.lock_handlers().control(&key);
        match handler {
            Some(handler) => handler(message),
            None => tracing::trace!("No handler for {}", content_type),
        }
    }

    fn handle_auth_request(&self) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        state.status = ConnectionStatus::AuthPending;

        let Some(writer) = state.writer.as_ref() else {
            return;
        };

        let command = encode_command(&format!("auth {}", self.config.password));
        match writer.send(command) {
            Ok(()) => state.correlator.push(PendingCommand::Authenticate),
            Err(e) => tracing::warn!("Failed to send auth: {}", e),
        }
    }

    fn handle_command_reply(self: &Arc<Self>, message: &Message) {
        let resolution = self.lock_state().correlator.resolve_reply(message);

        match resolution {
            Resolution::Unmatched => {
                tracing::debug!("Dropping command/reply with no pending command");
            }
            Resolution::Deferred(job_uuid) => {
                tracing::debug!("Command continues as background job {}", job_uuid);
            }
            Resolution::Ready(PendingCommand::Authenticate, reply) => {
                self.handle_auth_reply(message, &reply);
            }
            Resolution::Ready(PendingCommand::Exit, _) => {
                self.lock_state().status = ConnectionStatus::Closing;
                tracing::info!("Exit acknowledged, waiting for close");
            }
            Resolution::Ready(PendingCommand::Callback(callback), reply) => callback(reply),
        }
    }

    fn handle_auth_reply(&self, message: &Message, reply: &CommandReply) {
        if !reply.success {
            tracing::warn!(
                "Authentication failed: {}",
                reply.text().unwrap_or("no reason given")
            );
            self.emit(&ControlKey::Error, message);
            return;
        }

        {
            let mut state = self.lock_state();
            state.status = ConnectionStatus::Connected;
            state.authenticated = true;
            state.backoff.reset();
            state.retry.cancel();
        }

        tracing::info!("Authenticated successfully");
        self.emit(&ControlKey::Connect, &Message::default());
    }

    fn handle_event(&self, message: &Message) {
        let event: Event = match JsonCodec::decode(message.body()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Dropping undecodable event: {}", e);
                return;
            }
        };

        match event.name() {
            Some(BACKGROUND_JOB_EVENT) => {
                let completed = self.lock_state().correlator.complete_job(message, &event);
                match completed {
                    Some((callback, reply)) => callback(reply),
                    None => tracing::debug!(
                        "Ignoring BACKGROUND_JOB for untracked job {:?}",
                        event.job_uuid()
                    ),
                }
            }
            Some(name) => {
                let handler = self.lock_handlers().event(name);
                match handler {
                    Some(handler) => handler(&event, message),
                    None => tracing::trace!("No handler for event {}", name),
                }
            }
            None => tracing::debug!("Dropping event without Event-Name"),
        }
    }

    /// Invoke a control handler, if one is registered.
    fn emit(&self, key: &ControlKey, message: &Message) {
        let handler = self.lock_handlers().control(key);
        if let Some(handler) = handler {
            handler(message);
        }
    }

    fn handle_close(self: &Arc<Self>, generation: u64) {
        let (was_authenticated, reconnect) = {
            let mut state = self.lock_state();
            if state.generation != generation {
                return;
            }
            let was_authenticated = state.authenticated;
            state.status = ConnectionStatus::Disconnected;
            state.authenticated = false;
            state.writer = None;
            state.correlator.clear();
            state.read_task = None;
            (was_authenticated, !state.shut_down)
        };

        if was_authenticated {
            tracing::info!("Disconnected from {}", self.connector.describe());
            self.emit(&ControlKey::Disconnect, &Message::default());
        }

        if reconnect {
            self.schedule_reconnect();
        }
    }

    /// Arm the retry timer unless one is already armed.
    fn schedule_reconnect(self: &Arc<Self>) {
        let mut state = self.lock_state();
        if state.shut_down || state.retry.is_armed() {
            return;
        }

        let delay = state.backoff.next_delay();
        tracing::info!("Reconnecting in {:?}...", delay);

        let shared = Arc::downgrade(self);
        state.retry.arm(delay, move |epoch| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let fired = shared.lock_state().retry.take_fired(epoch);
            if fired {
                shared.connect();
            }
        });
    }

    fn send(&self, command: &str, pending: PendingCommand) -> Result<()> {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let writer = state.writer.as_ref().ok_or(EventSocketError::NotConnected)?;
        writer.send(encode_command(command))?;
        state.correlator.push(pending);

        tracing::debug!("Sent command: {}", command);
        Ok(())
    }

    fn shutdown(&self) {
        let (read_task, was_authenticated) = {
            let mut state = self.lock_state();
            state.shut_down = true;
            state.retry.cancel();
            state.generation += 1;
            state.status = ConnectionStatus::Disconnected;
            state.writer = None;
            state.correlator.clear();
            let was_authenticated = std::mem::take(&mut state.authenticated);
            (state.read_task.take(), was_authenticated)
        };

        if let Some(task) = read_task {
            task.abort();
        }

        tracing::info!("Client shut down");

        if was_authenticated {
            self.emit(&ControlKey::Disconnect, &Message::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let client = ClientBuilder::new().build();
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
        assert!(!client.connected());
    }

    #[test]
    fn test_builder_configuration() {
        let client = Client::builder()
            .host("10.1.2.3")
            .port(9000)
            .password("secret")
            .base_delay(Duration::from_millis(250))
            .max_delay(Duration::from_secs(5))
            .read_buffer_size(1024)
            .max_body_size(4096)
            .build();

        let config = client.config();
        assert_eq!(config.host, "10.1.2.3");
        assert_eq!(config.port, 9000);
        assert_eq!(config.password, "secret");
        assert_eq!(config.reconnect.base_delay, Duration::from_millis(250));
        assert_eq!(config.reconnect.max_delay, Duration::from_secs(5));
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(config.max_body_size, 4096);
    }

    #[test]
    fn test_new_uses_tcp_target() {
        let client = Client::new("pbx.local", 8021, "ClueCon");
        let debug = format!("{:?}", client);
        assert!(debug.contains("pbx.local:8021"));
    }

    #[test]
    fn test_send_without_transport() {
        let client = Client::builder().build();

        let result = client.send_command("status", |_| {});

        assert!(matches!(result, Err(EventSocketError::NotConnected)));
        assert_eq!(client.pending_commands(), 0);
        assert!(matches!(client.exit(), Err(EventSocketError::NotConnected)));
    }

    #[test]
    fn test_handler_registration_returns_previous() {
        let client = Client::builder()
            .on(ControlKey::Connect, |_| {})
            .on_event("HEARTBEAT", |_, _| {})
            .build();

        assert!(client.on(ControlKey::Connect, |_| {}).is_some());
        assert!(client.on(ControlKey::Disconnect, |_| {}).is_none());
        assert!(client.on_event("HEARTBEAT", |_, _| {}).is_some());
        assert!(client.replace_event("HEARTBEAT", None).is_some());
        assert!(client.on_event("HEARTBEAT", |_, _| {}).is_none());
    }

    #[tokio::test]
    async fn test_connect_ignored_after_shutdown() {
        let client = Client::builder().build();
        client.shutdown();

        client.connect();

        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }
}
