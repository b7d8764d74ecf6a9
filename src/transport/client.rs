//! Single-attempt transport client.
//!
//! A [`TransportClient`] owns one socket for one connection attempt. It never
//! retries: once it reaches `Closed` or `Error` it is done, and whoever wants to
//! try again builds a new one (see [`BackoffScheduler`](crate::backoff::BackoffScheduler)
//! for when).

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::connection::ConnectionState;
use super::error::{TransportError, TransportResult};
use super::socket::{Connector, EventSink, Payload, SocketEvent, SocketHandle, TransportOptions};
use crate::core::Enqueuer;

/// Callback for a completed open.
pub type OnConnected = Box<dyn FnMut() + Send>;

/// Callback for a received frame.
pub type OnMessage = Box<dyn FnMut(Bytes) + Send>;

/// Callback for a transport failure.
pub type OnError = Box<dyn FnMut(String) + Send>;

/// Callback for a close, with the close code.
pub type OnClose = Box<dyn FnMut(u16) + Send>;

/// The four outcomes a caller hears about, passed once at `connect`.
///
/// Unset handlers do nothing.
pub struct Handlers {
    on_connected: OnConnected,
    on_message: OnMessage,
    on_error: OnError,
    on_close: OnClose,
}

impl Default for Handlers {
    fn default() -> Self {
        Self::new()
    }
}

impl Handlers {
    /// Handlers that ignore every event.
    pub fn new() -> Self {
        Self {
            on_connected: Box::new(|| {}),
            on_message: Box::new(|_| {}),
            on_error: Box::new(|_| {}),
            on_close: Box::new(|_| {}),
        }
    }

    /// Set the open handler.
    pub fn on_connected<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_connected = Box::new(f);
        self
    }

    /// Set the message handler.
    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: FnMut(Bytes) + Send + 'static,
    {
        self.on_message = Box::new(f);
        self
    }

    /// Set the failure handler.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        self.on_error = Box::new(f);
        self
    }

    /// Set the close handler.
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: FnMut(u16) + Send + 'static,
    {
        self.on_close = Box::new(f);
        self
    }

    pub(crate) fn connected(&mut self) {
        (self.on_connected)()
    }

    pub(crate) fn message(&mut self, bytes: Bytes) {
        (self.on_message)(bytes)
    }

    pub(crate) fn error(&mut self, reason: String) {
        (self.on_error)(reason)
    }

    pub(crate) fn close(&mut self, code: u16) {
        (self.on_close)(code)
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers").finish_non_exhaustive()
    }
}

/// Socket and lifecycle state, guarded together.
struct Link {
    state: ConnectionState,
    address: Option<String>,
    socket: Option<Box<dyn SocketHandle>>,
}

struct Shared {
    link: Mutex<Link>,
    /// Separate lock so handlers may call `send`/`close` on this client.
    handlers: Mutex<Option<Handlers>>,
}

/// One socket, one lifecycle.
///
/// All four callbacks run through the [`Enqueuer`] given at construction, so
/// state changes and callbacks happen on the application's dispatch context
/// rather than the socket's task.
///
/// # Example
///
/// ```ignore
/// let (dispatcher, mut queue) = signal_relay::host::dispatcher();
/// let client = TransportClient::new(Arc::new(WsConnector::current()), Arc::new(dispatcher));
///
/// client.connect(
///     "wss://signal.example.com",
///     Handlers::new()
///         .on_connected(|| println!("open"))
///         .on_message(|bytes| println!("got {} bytes", bytes.len()))
///         .on_close(|code| println!("closed: {code}")),
/// )?;
///
/// loop {
///     queue.drain();
///     // ...
/// }
/// ```
pub struct TransportClient {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    enqueuer: Arc<dyn Enqueuer>,
    options: TransportOptions,
}

impl TransportClient {
    /// Create a client with default options.
    pub fn new(connector: Arc<dyn Connector>, enqueuer: Arc<dyn Enqueuer>) -> Self {
        Self::with_options(connector, enqueuer, TransportOptions::default())
    }

    /// Create a client with explicit options.
    pub fn with_options(
        connector: Arc<dyn Connector>,
        enqueuer: Arc<dyn Enqueuer>,
        options: TransportOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                link: Mutex::new(Link {
                    state: ConnectionState::NotConnected,
                    address: None,
                    socket: None,
                }),
                handlers: Mutex::new(None),
            }),
            connector,
            enqueuer,
            options,
        }
    }

    /// Start connecting to `address`.
    ///
    /// Returns immediately; the outcome arrives through `handlers`. Fails if the
    /// client has already been used.
    pub fn connect(&self, address: &str, handlers: Handlers) -> TransportResult<()> {
        {
            let mut link = self.shared.link.lock();
            if !link.state.can_transition_to(ConnectionState::Connecting) {
                error!(
                    address,
                    state = %link.state,
                    "connect called on a transport client that was already used"
                );
                return Err(TransportError::InvalidState {
                    operation: "connect",
                    expected: ConnectionState::NotConnected,
                    actual: link.state,
                });
            }
            link.state = ConnectionState::Connecting;
            link.address = Some(address.to_owned());
        }
        *self.shared.handlers.lock() = Some(handlers);

        // Held across `open` so no event can be applied before the handle is stored
        let mut link = self.shared.link.lock();
        if !link.state.is_active() {
            debug!(state = %link.state, "client closed before the socket was opened");
            return Ok(());
        }
        info!(address, "connecting");
        let socket = self
            .connector
            .open(address, &self.options, self.event_sink());
        link.socket = Some(socket);
        Ok(())
    }

    /// Send a frame.
    ///
    /// Dropped with a warning unless the client is `Connected`. Nothing is
    /// buffered for later.
    pub fn send(&self, payload: impl Into<Payload>) {
        let payload = payload.into();
        let mut link = self.shared.link.lock();

        if link.state != ConnectionState::Connected {
            warn!(
                state = %link.state,
                len = payload.len(),
                "dropping outbound message, transport not connected"
            );
            return;
        }

        match link.socket.as_mut() {
            Some(socket) => socket.send(payload),
            None => warn!(len = payload.len(), "dropping outbound message, no socket"),
        }
    }

    /// Close the client.
    ///
    /// Requests an orderly socket close if one is live, releases the socket and
    /// moves to `Closed`. Safe to call any number of times.
    pub fn close(&self) {
        let socket = {
            let mut link = self.shared.link.lock();
            let socket = if link.state.is_active() {
                link.socket.take()
            } else {
                None
            };
            if link.state != ConnectionState::Closed {
                debug!(from = %link.state, "closing transport client");
            }
            link.state = ConnectionState::Closed;
            socket
        };

        if let Some(mut socket) = socket {
            socket.close();
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.link.lock().state
    }

    /// Address passed to `connect`, if it was called.
    pub fn address(&self) -> Option<String> {
        self.shared.link.lock().address.clone()
    }

    /// Options this client was built with.
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Sink that re-routes socket events through the enqueuer.
    fn event_sink(&self) -> EventSink {
        let shared = Arc::downgrade(&self.shared);
        let enqueuer = Arc::clone(&self.enqueuer);

        EventSink::new(move |event| {
            let shared = shared.clone();
            enqueuer.enqueue(Box::new(move || match shared.upgrade() {
                Some(shared) => shared.dispatch(event),
                None => debug!(?event, "transport client dropped, discarding event"),
            }));
        })
    }
}

impl Shared {
    /// Apply a socket event on the dispatch context.
    fn dispatch(&self, event: SocketEvent) {
        let mut link = self.link.lock();

        match event {
            SocketEvent::Open => {
                if !link.state.can_transition_to(ConnectionState::Connected) {
                    debug!(state = %link.state, "discarding open event");
                    return;
                }
                link.state = ConnectionState::Connected;
                info!(address = link.address.as_deref().unwrap_or_default(), "connected");
                drop(link);
                self.with_handlers(Handlers::connected);
            }
            SocketEvent::Message(bytes) => {
                if link.state != ConnectionState::Connected {
                    debug!(state = %link.state, len = bytes.len(), "discarding inbound message");
                    return;
                }
                drop(link);
                self.with_handlers(|h| h.message(bytes));
            }
            SocketEvent::Error(reason) => {
                if !link.state.can_transition_to(ConnectionState::Error) {
                    debug!(state = %link.state, %reason, "discarding error event");
                    return;
                }
                link.state = ConnectionState::Error;
                let socket = link.socket.take();
                drop(link);
                drop(socket);
                warn!(%reason, "transport error");
                self.with_handlers(|h| h.error(reason));
            }
            SocketEvent::Close(code) => {
                if !link.state.can_transition_to(ConnectionState::Closed) {
                    debug!(state = %link.state, code, "discarding close event");
                    return;
                }
                link.state = ConnectionState::Closed;
                let socket = link.socket.take();
                drop(link);
                drop(socket);
                info!(code, "connection closed");
                self.with_handlers(|h| h.close(code));
            }
        }
    }

    fn with_handlers(&self, f: impl FnOnce(&mut Handlers)) {
        if let Some(handlers) = self.handlers.lock().as_mut() {
            f(handlers);
        }
    }
}

impl fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let link = self.shared.link.lock();
        f.debug_struct("TransportClient")
            .field("state", &link.state)
            .field("address", &link.address)
            .field("options", &self.options)
            .finish()
    }
}
