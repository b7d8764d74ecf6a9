//! Reconnecting signaling channel.
//!
//! Wires a fresh [`TransportClient`] per attempt to one long-lived
//! [`BackoffScheduler`]: a successful open resets the backoff, an error or a
//! close reports a failure and schedules the next attempt.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::config::ChannelConfig;
use crate::backoff::BackoffScheduler;
use crate::core::{DelayCaller, Enqueuer, RelayError};
use crate::signaling::SignalingMessage;
use crate::transport::{
    ConnectionState, Connector, Handlers, Payload, TransportClient, TransportError,
    TransportResult,
};

struct Inner {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    enqueuer: Arc<dyn Enqueuer>,
    backoff: BackoffScheduler,
    /// Application handlers, shared by every attempt.
    handlers: Mutex<Handlers>,
    current: Mutex<Option<Arc<TransportClient>>>,
    stopped: AtomicBool,
    attempts: AtomicU64,
}

/// A signaling channel that keeps itself connected.
///
/// Every reconnect goes through the [`BackoffScheduler`], so the application
/// sees each attempt: `on_error`/`on_close` fire for every lost connection and
/// `on_connected` for every new one. Messages sent while disconnected are
/// dropped, not queued.
///
/// # Example
///
/// ```ignore
/// let config = ChannelConfigBuilder::new()
///     .address("wss://signal.example.com")
///     .build()?;
/// let (dispatcher, queue) = signal_relay::host::dispatcher();
/// let channel = SignalingChannel::websocket(
///     config,
///     Arc::new(dispatcher),
///     Handlers::new().on_message(|bytes| handle_signal(&bytes)),
/// );
/// channel.start()?;
/// tokio::spawn(queue.run());
/// ```
pub struct SignalingChannel {
    inner: Arc<Inner>,
}

impl SignalingChannel {
    /// Create a channel from its collaborators. Nothing happens until `start`.
    pub fn new(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
        enqueuer: Arc<dyn Enqueuer>,
        timer: Arc<dyn DelayCaller>,
        handlers: Handlers,
    ) -> Self {
        let backoff = BackoffScheduler::with_bounds(timer, config.min_delay(), config.max_delay());
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                enqueuer,
                backoff,
                handlers: Mutex::new(handlers),
                current: Mutex::new(None),
                stopped: AtomicBool::new(true),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Create a WebSocket channel on the current tokio runtime.
    ///
    /// Retry timers fire through `enqueuer`, like every other callback.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[cfg(feature = "websocket")]
    #[cfg_attr(docsrs, doc(cfg(feature = "websocket")))]
    pub fn websocket(config: ChannelConfig, enqueuer: Arc<dyn Enqueuer>, handlers: Handlers) -> Self {
        let connector = Arc::new(crate::transport::WsConnector::current());
        let timer = Arc::new(crate::host::TokioDelayCaller::current(Arc::clone(&enqueuer)));
        Self::new(config, connector, enqueuer, timer, handlers)
    }

    /// Start connecting.
    ///
    /// Fails if the channel already has a live connection attempt.
    pub fn start(&self) -> TransportResult<()> {
        if let Some(client) = self.inner.current.lock().as_ref() {
            let state = client.state();
            if state.is_active() {
                warn!(%state, "start called on a running signaling channel");
                return Err(TransportError::InvalidState {
                    operation: "start",
                    expected: ConnectionState::NotConnected,
                    actual: state,
                });
            }
        }

        self.inner.stopped.store(false, Ordering::SeqCst);
        self.inner.backoff.cancel();
        Inner::attempt(&self.inner);
        Ok(())
    }

    /// Stop the channel: cancel any pending retry and close the connection.
    ///
    /// No handler fires for this close. `start` may be called again later.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.backoff.cancel();
        let client = self.inner.current.lock().clone();
        if let Some(client) = client {
            client.close();
        }
        info!(address = %self.inner.config.address, "signaling channel stopped");
    }

    /// Send a frame on the current connection. Dropped if not connected.
    pub fn send(&self, payload: impl Into<Payload>) {
        let client = self.inner.current.lock().clone();
        match client {
            Some(client) => client.send(payload),
            None => warn!("dropping outbound message, signaling channel not started"),
        }
    }

    /// Encode and send a signaling message.
    ///
    /// Unlike [`send`](Self::send), reports when the message could not go out:
    /// an encoding failure, or no connected transport.
    pub fn send_message(&self, message: &SignalingMessage) -> Result<(), RelayError> {
        let payload = message.to_payload()?;
        let client = self.inner.current.lock().clone();
        let state = client
            .as_ref()
            .map_or(ConnectionState::NotConnected, |client| client.state());
        match client {
            Some(client) if state == ConnectionState::Connected => {
                client.send(payload);
                Ok(())
            }
            _ => Err(TransportError::InvalidState {
                operation: "send_message",
                expected: ConnectionState::Connected,
                actual: state,
            }
            .into()),
        }
    }

    /// State of the current connection attempt.
    pub fn state(&self) -> ConnectionState {
        self.inner
            .current
            .lock()
            .as_ref()
            .map_or(ConnectionState::NotConnected, |client| client.state())
    }

    /// Failures since the last successful open.
    pub fn failure_count(&self) -> u32 {
        self.inner.backoff.failure_count()
    }

    /// Whether a reconnect is scheduled.
    pub fn retry_pending(&self) -> bool {
        self.inner.backoff.pending()
    }

    /// Connection attempts made so far.
    pub fn attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::Relaxed)
    }

    /// Channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }
}

impl Inner {
    /// Open a new transport client for the next attempt.
    fn attempt(self: &Arc<Self>) {
        if self.stopped.load(Ordering::SeqCst) {
            debug!("channel stopped, skipping connection attempt");
            return;
        }

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let client = Arc::new(TransportClient::with_options(
            Arc::clone(&self.connector),
            Arc::clone(&self.enqueuer),
            self.config.transport_options(),
        ));
        *self.current.lock() = Some(Arc::clone(&client));

        info!(address = %self.config.address, attempt, "opening signaling connection");
        if let Err(e) = client.connect(&self.config.address, self.attempt_handlers()) {
            error!(error = %e, "fresh transport client refused to connect");
        }
    }

    /// Per-attempt handlers that feed the backoff and forward to the application.
    fn attempt_handlers(self: &Arc<Self>) -> Handlers {
        let on_connected = Arc::downgrade(self);
        let on_message = Arc::downgrade(self);
        let on_error = Arc::downgrade(self);
        let on_close = Arc::downgrade(self);

        Handlers::new()
            .on_connected(move || {
                if let Some(inner) = on_connected.upgrade() {
                    inner.backoff.on_success();
                    inner.handlers.lock().connected();
                }
            })
            .on_message(move |bytes: Bytes| {
                if let Some(inner) = on_message.upgrade() {
                    inner.handlers.lock().message(bytes);
                }
            })
            .on_error(move |reason| {
                if let Some(inner) = on_error.upgrade() {
                    inner.handlers.lock().error(reason);
                    inner.schedule_reconnect();
                }
            })
            .on_close(move |code| {
                if let Some(inner) = on_close.upgrade() {
                    inner.handlers.lock().close(code);
                    inner.schedule_reconnect();
                }
            })
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let delay = self.backoff.retry_after_failure(move || {
            if let Some(inner) = weak.upgrade() {
                inner.attempt();
            }
        });
        info!(
            delay_ms = delay.as_millis() as u64,
            failures = self.backoff.failure_count(),
            "signaling connection lost, reconnect scheduled"
        );
    }
}

impl std::fmt::Debug for SignalingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingChannel")
            .field("address", &self.inner.config.address)
            .field("state", &self.state())
            .field("failures", &self.failure_count())
            .field("retry_pending", &self.retry_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::client::ChannelConfigBuilder;
    use crate::core::CLOSE_NORMAL;
    use crate::host::{dispatcher, DispatchQueue, ManualClock};
    use crate::transport::SocketEvent;
    use crate::transport::testing::{Event, MockConnector, record};

    struct Rig {
        channel: SignalingChannel,
        connector: Arc<MockConnector>,
        clock: Arc<ManualClock>,
        queue: DispatchQueue,
        events: Arc<Mutex<Vec<Event>>>,
    }

    fn rig() -> Rig {
        let config = ChannelConfigBuilder::new()
            .address("ws://signal.test")
            .min_delay(Duration::from_millis(500))
            .max_delay(Duration::from_millis(5000))
            .build()
            .unwrap();
        let connector = Arc::new(MockConnector::default());
        let clock = Arc::new(ManualClock::new());
        let (tx, queue) = dispatcher();
        let (events, handlers) = record();

        let channel = SignalingChannel::new(
            config,
            connector.clone(),
            Arc::new(tx),
            clock.clone(),
            handlers,
        );
        Rig {
            channel,
            connector,
            clock,
            queue,
            events,
        }
    }

    #[test]
    fn test_start_connects_once() {
        let mut rig = rig();
        assert_eq!(rig.channel.state(), ConnectionState::NotConnected);

        rig.channel.start().unwrap();
        assert_eq!(rig.channel.state(), ConnectionState::Connecting);
        assert!(rig.channel.start().is_err());

        rig.connector.emit(SocketEvent::Open);
        rig.queue.drain();
        assert_eq!(rig.channel.state(), ConnectionState::Connected);
        assert_eq!(rig.connector.opened().len(), 1);
        assert_eq!(*rig.events.lock(), vec![Event::Connected]);
    }

    #[test]
    fn test_failures_back_off_then_reconnect() {
        let mut rig = rig();
        rig.channel.start().unwrap();

        // Three failed attempts: retries due after 500, 1000, 2000 ms
        for (n, wait) in [500u64, 1000, 2000].into_iter().enumerate() {
            rig.connector.emit(SocketEvent::Error("refused".into()));
            rig.queue.drain();
            assert_eq!(rig.channel.state(), ConnectionState::Error);
            assert!(rig.channel.retry_pending());
            assert_eq!(rig.channel.failure_count(), n as u32 + 1);

            // Not yet
            rig.clock.advance(Duration::from_millis(wait - 1));
            assert_eq!(rig.connector.opened().len(), n + 1);

            rig.clock.advance(Duration::from_millis(1));
            assert_eq!(rig.connector.opened().len(), n + 2);
            assert_eq!(rig.channel.state(), ConnectionState::Connecting);
        }

        rig.connector.emit(SocketEvent::Open);
        rig.queue.drain();
        assert_eq!(rig.channel.failure_count(), 0);
        assert!(!rig.channel.retry_pending());
        assert_eq!(rig.channel.attempts(), 4);
    }

    #[test]
    fn test_peer_close_triggers_reconnect() {
        let mut rig = rig();
        rig.channel.start().unwrap();
        rig.connector.emit(SocketEvent::Open);
        rig.queue.drain();

        rig.channel.send("ping");
        assert_eq!(rig.connector.sent(), vec![Payload::from("ping")]);

        rig.connector.emit(SocketEvent::Close(CLOSE_NORMAL));
        rig.queue.drain();
        assert_eq!(rig.channel.state(), ConnectionState::Closed);
        assert!(rig.channel.retry_pending());

        // Dropped while disconnected
        rig.channel.send("lost");
        assert_eq!(rig.connector.sent().len(), 1);

        rig.clock.advance(Duration::from_millis(500));
        rig.connector.emit(SocketEvent::Open);
        rig.queue.drain();

        assert_eq!(
            *rig.events.lock(),
            vec![Event::Connected, Event::Closed(CLOSE_NORMAL), Event::Connected]
        );
    }

    #[test]
    fn test_stop_prevents_reconnect() {
        let mut rig = rig();
        rig.channel.start().unwrap();
        rig.connector.emit(SocketEvent::Error("refused".into()));
        rig.queue.drain();
        assert!(rig.channel.retry_pending());

        rig.channel.stop();
        assert!(!rig.channel.retry_pending());

        rig.clock.advance(Duration::from_secs(60));
        assert_eq!(rig.connector.opened().len(), 1);
    }

    #[test]
    fn test_stop_while_connected_is_silent() {
        let mut rig = rig();
        rig.channel.start().unwrap();
        rig.connector.emit(SocketEvent::Open);
        rig.queue.drain();

        rig.channel.stop();
        assert_eq!(rig.channel.state(), ConnectionState::Closed);
        assert_eq!(rig.connector.close_requests(), 1);

        rig.connector.emit(SocketEvent::Close(CLOSE_NORMAL));
        rig.queue.drain();
        assert!(!rig.channel.retry_pending());
        assert_eq!(*rig.events.lock(), vec![Event::Connected]);

        // Restartable
        rig.channel.start().unwrap();
        assert_eq!(rig.connector.opened().len(), 2);
    }

    #[test]
    fn test_send_message_requires_connection() {
        let mut rig = rig();
        let offer = SignalingMessage::offer("c1", "v=0");

        rig.channel.start().unwrap();
        let err = rig.channel.send_message(&offer).unwrap_err();
        assert!(matches!(
            err,
            RelayError::Transport(TransportError::InvalidState {
                actual: ConnectionState::Connecting,
                ..
            })
        ));

        rig.connector.emit(SocketEvent::Open);
        rig.queue.drain();
        rig.channel.send_message(&offer).unwrap();
        assert_eq!(rig.connector.sent(), vec![offer.to_payload().unwrap()]);
    }

    #[test]
    fn test_send_before_start_is_dropped() {
        let rig = rig();
        rig.channel.send("nobody home");
        assert!(rig.connector.sent().is_empty());
    }
}
