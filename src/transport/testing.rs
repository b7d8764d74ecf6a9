//! In-memory connector for unit tests.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use super::client::Handlers;
use super::socket::{Connector, EventSink, Payload, SocketEvent, SocketHandle, TransportOptions};

/// What a test handler observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Connected,
    Message(Bytes),
    Error(String),
    Closed(u16),
}

/// Handlers that append every callback to a shared log.
pub(crate) fn record() -> (Arc<Mutex<Vec<Event>>>, Handlers) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
    let handlers = Handlers::new()
        .on_connected(move || a.lock().push(Event::Connected))
        .on_message(move |bytes| b.lock().push(Event::Message(bytes)))
        .on_error(move |reason| c.lock().push(Event::Error(reason)))
        .on_close(move |code| d.lock().push(Event::Closed(code)));
    (log, handlers)
}

#[derive(Default)]
struct Wire {
    opened: Vec<String>,
    sinks: Vec<EventSink>,
    sent: Vec<Payload>,
    close_requests: usize,
}

/// Connector whose sockets are driven by the test.
///
/// `emit` reports an event on the most recently opened socket.
#[derive(Default)]
pub(crate) struct MockConnector {
    wire: Arc<Mutex<Wire>>,
}

impl MockConnector {
    pub(crate) fn emit(&self, event: SocketEvent) {
        let sink = self.wire.lock().sinks.last().cloned();
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    pub(crate) fn opened(&self) -> Vec<String> {
        self.wire.lock().opened.clone()
    }

    pub(crate) fn sent(&self) -> Vec<Payload> {
        self.wire.lock().sent.clone()
    }

    pub(crate) fn close_requests(&self) -> usize {
        self.wire.lock().close_requests
    }
}

impl Connector for MockConnector {
    fn open(
        &self,
        address: &str,
        _options: &TransportOptions,
        events: EventSink,
    ) -> Box<dyn SocketHandle> {
        let mut wire = self.wire.lock();
        wire.opened.push(address.to_owned());
        wire.sinks.push(events);
        Box::new(MockSocket {
            wire: Arc::clone(&self.wire),
        })
    }
}

struct MockSocket {
    wire: Arc<Mutex<Wire>>,
}

impl SocketHandle for MockSocket {
    fn send(&mut self, payload: Payload) {
        self.wire.lock().sent.push(payload);
    }

    fn close(&mut self) {
        self.wire.lock().close_requests += 1;
    }
}
