//! WebSocket connector over tokio-tungstenite.
//!
//! Each opened socket gets one tokio task that owns the stream. Outbound frames
//! reach it over an unbounded channel; inbound frames and lifecycle outcomes go
//! straight to the [`EventSink`].

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{Connector as TlsConnector, connect_async_tls_with_config};
use tracing::{debug, trace};

use super::socket::{
    Connector, EventSink, Payload, SecureTransport, SocketEvent, SocketHandle, TransportOptions,
};
use crate::core::{CLOSE_ABNORMAL, CLOSE_NO_STATUS, CLOSE_NORMAL};

/// Opens `ws://` and `wss://` sockets on a tokio runtime.
#[derive(Debug, Clone)]
pub struct WsConnector {
    runtime: Handle,
}

impl WsConnector {
    /// Spawn socket tasks on the given runtime.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Spawn socket tasks on the runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Connector for WsConnector {
    fn open(
        &self,
        address: &str,
        options: &TransportOptions,
        events: EventSink,
    ) -> Box<dyn SocketHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.runtime
            .spawn(run_socket(address.to_owned(), options.clone(), events, rx));
        Box::new(WsHandle { tx })
    }
}

/// Instruction from the transport client to the socket task.
#[derive(Debug)]
enum Command {
    Send(Payload),
    Close,
}

/// Outbound half handed back to the transport client.
struct WsHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SocketHandle for WsHandle {
    fn send(&mut self, payload: Payload) {
        if self.tx.send(Command::Send(payload)).is_err() {
            debug!("socket task gone, dropping outbound message");
        }
    }

    fn close(&mut self) {
        // Task already finished if this fails, which is the same outcome
        let _ = self.tx.send(Command::Close);
    }
}

/// Build the TLS connector for the requested protocol selection.
///
/// `None` lets tokio-tungstenite use its default rustls configuration.
fn tls_connector(mode: SecureTransport) -> Option<TlsConnector> {
    match mode {
        SecureTransport::Default => None,
        SecureTransport::Tls12Only => {
            let roots = rustls::RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect(),
            };
            let config =
                rustls::ClientConfig::builder_with_protocol_versions(&[&rustls::version::TLS12])
                    .with_root_certificates(roots)
                    .with_no_client_auth();
            Some(TlsConnector::Rustls(Arc::new(config)))
        }
    }
}

fn to_message(payload: Payload) -> Message {
    match payload {
        Payload::Text(text) => Message::Text(text),
        Payload::Binary(bytes) => Message::Binary(bytes.to_vec()),
    }
}

/// Socket task: connect, then pump both directions until one side ends.
async fn run_socket(
    address: String,
    options: TransportOptions,
    events: EventSink,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let config = WebSocketConfig {
        max_message_size: Some(options.max_message_size),
        ..WebSocketConfig::default()
    };
    let connector = tls_connector(options.secure_transport);

    let connecting = connect_async_tls_with_config(address.as_str(), Some(config), false, connector);
    tokio::pin!(connecting);

    // Watch for a close while the handshake is still running
    let stream = loop {
        tokio::select! {
            result = &mut connecting => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    events.emit(SocketEvent::Error(format!("failed to connect to {address}: {e}")));
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Send(_)) => debug!(%address, "dropping outbound message, handshake pending"),
                Some(Command::Close) | None => {
                    debug!(%address, "close requested during handshake");
                    events.emit(SocketEvent::Close(CLOSE_NORMAL));
                    return;
                }
            },
        }
    };
    events.emit(SocketEvent::Open);

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(payload)) => {
                    if let Err(e) = write.send(to_message(payload)).await {
                        events.emit(SocketEvent::Error(format!("send failed: {e}")));
                        return;
                    }
                }
                // Client released the handle or asked to close
                Some(Command::Close) | None => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "".into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!(%address, error = %e, "close frame not sent");
                    }
                    events.emit(SocketEvent::Close(CLOSE_NORMAL));
                    return;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => events.emit(SocketEvent::Message(Bytes::from(text))),
                Some(Ok(Message::Binary(bytes))) => events.emit(SocketEvent::Message(Bytes::from(bytes))),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map_or(CLOSE_NO_STATUS, |f| f.code.into());
                    // Flush the close reply tungstenite queued for the peer
                    if let Err(e) = write.close().await {
                        debug!(%address, error = %e, "close reply not flushed");
                    }
                    events.emit(SocketEvent::Close(code));
                    return;
                }
                Some(Ok(other)) => trace!(?other, "control frame"),
                Some(Err(e)) => {
                    events.emit(SocketEvent::Error(e.to_string()));
                    return;
                }
                None => {
                    events.emit(SocketEvent::Close(CLOSE_ABNORMAL));
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    use crate::host::{dispatcher, DispatchQueue};
    use crate::transport::testing::{Event, record};
    use crate::transport::{ConnectionState, TransportClient};

    /// Accept one connection, echo one message, then close normally.
    async fn echo_once_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            if let Some(Ok(msg)) = ws.next().await {
                ws.send(msg).await.unwrap();
            }
            ws.close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            }))
            .await
            .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        format!("ws://{addr}")
    }

    /// Pump the queue until `done` holds for the recorded events.
    async fn pump_until(
        queue: &mut DispatchQueue,
        events: &Arc<Mutex<Vec<Event>>>,
        done: impl Fn(&[Event]) -> bool,
    ) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(&events.lock()) {
                assert!(queue.run_next().await);
            }
        })
        .await
        .expect("timed out waiting for transport events");
    }

    #[tokio::test]
    async fn test_echo_then_server_close() {
        let url = echo_once_server().await;
        let (tx, mut queue) = dispatcher();
        let client = TransportClient::new(Arc::new(WsConnector::current()), Arc::new(tx));
        let (events, handlers) = record();

        client.connect(&url, handlers).unwrap();
        pump_until(&mut queue, &events, |e| e.contains(&Event::Connected)).await;
        assert_eq!(client.state(), ConnectionState::Connected);

        client.send("ping");
        pump_until(&mut queue, &events, |e| {
            e.iter().any(|ev| matches!(ev, Event::Closed(_)))
        })
        .await;

        assert_eq!(
            *events.lock(),
            vec![
                Event::Connected,
                Event::Message(Bytes::from_static(b"ping")),
                Event::Closed(CLOSE_NORMAL),
            ]
        );
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_connection_refused_reports_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut queue) = dispatcher();
        let client = TransportClient::new(Arc::new(WsConnector::current()), Arc::new(tx));
        let (events, handlers) = record();

        client.connect(&format!("ws://{addr}"), handlers).unwrap();
        pump_until(&mut queue, &events, |e| !e.is_empty()).await;

        assert!(matches!(events.lock()[0], Event::Error(_)));
        assert_eq!(client.state(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn test_invalid_url_reports_error() {
        let (tx, mut queue) = dispatcher();
        let client = TransportClient::new(Arc::new(WsConnector::current()), Arc::new(tx));
        let (events, handlers) = record();

        client.connect("not a url", handlers).unwrap();
        pump_until(&mut queue, &events, |e| !e.is_empty()).await;
        assert_eq!(client.state(), ConnectionState::Error);
    }

    #[test]
    fn test_tls12_connector_builds() {
        assert!(tls_connector(SecureTransport::Default).is_none());
        assert!(matches!(
            tls_connector(SecureTransport::Tls12Only),
            Some(TlsConnector::Rustls(_))
        ));
    }

    #[tokio::test]
    async fn test_close_during_handshake_is_prompt() {
        // Accepts TCP but never answers the upgrade request
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_tcp, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut socket = WsConnector::current().open(
            &format!("ws://{addr}"),
            &TransportOptions::default(),
            EventSink::new(move |event| {
                let _ = event_tx.send(event);
            }),
        );
        socket.close();

        let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .expect("close not seen while handshake pending");
        assert_eq!(event, Some(SocketEvent::Close(CLOSE_NORMAL)));
    }

    #[tokio::test]
    async fn test_peer_close_is_answered() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.close(None).await.unwrap();
            let reply = ws.next().await;
            let _ = reply_tx.send(matches!(reply, Some(Ok(Message::Close(_)))));
        });

        let (tx, mut queue) = dispatcher();
        let client = TransportClient::new(Arc::new(WsConnector::current()), Arc::new(tx));
        let (events, handlers) = record();

        client.connect(&format!("ws://{addr}"), handlers).unwrap();
        pump_until(&mut queue, &events, |e| {
            e.iter().any(|ev| matches!(ev, Event::Closed(_)))
        })
        .await;

        assert_eq!(*events.lock(), vec![Event::Connected, Event::Closed(CLOSE_NO_STATUS)]);
        let answered = tokio::time::timeout(Duration::from_secs(5), reply_rx)
            .await
            .expect("server never heard back")
            .unwrap();
        assert!(answered);
    }
}
