//! Transport capability and its WebSocket implementation.
//!
//! A transport opens duplex connections. Each connection is represented by a
//! [`ConnectionHandle`]: events flow out of it, `ping`/`close` commands flow
//! in. Dropping the event receiver detaches every listener; dropping the whole
//! handle tears the connection down.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};

/// Something that happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// An application message, decoded as text.
    Message(String),
    /// A pong answering one of our pings.
    Pong,
    /// The connection failed. Always followed by `Closed`.
    Error(String),
    /// The connection is gone. Last event of every connection.
    Closed,
}

/// Request sent to a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Ping,
    Close,
}

/// Opens connections to a gateway.
pub trait Transport: Send + Sync {
    /// Start opening a connection to `address`, authenticating with `credential`.
    ///
    /// Errors returned here mean the attempt could not even be initiated.
    /// Failures of the attempt itself are reported as events on the handle.
    fn open(&self, address: &str, credential: &str) -> Result<ConnectionHandle>;
}

/// Our end of one connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    commands: mpsc::UnboundedSender<TransportCommand>,
}

impl ConnectionHandle {
    pub fn new(
        events: mpsc::UnboundedReceiver<TransportEvent>,
        commands: mpsc::UnboundedSender<TransportCommand>,
    ) -> Self {
        Self {
            events: Some(events),
            commands,
        }
    }

    pub fn ping(&self) {
        // A connection that already went away has nothing to ping
        let _ = self.commands.send(TransportCommand::Ping);
    }

    pub fn close(&self) {
        let _ = self.commands.send(TransportCommand::Close);
    }

    /// Stop receiving events from this connection.
    pub fn remove_all_listeners(&mut self) {
        self.events = None;
    }

    pub fn is_listening(&self) -> bool {
        self.events.is_some()
    }

    /// Next event, or `None` once the connection stopped producing them.
    ///
    /// Never resolves while the handle is detached.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => std::future::pending().await,
        }
    }
}

/// WebSocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WsTransport {
    connect_timeout: Option<Duration>,
}

impl WsTransport {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }
}

impl From<&GatewayConfig> for WsTransport {
    fn from(config: &GatewayConfig) -> Self {
        Self::new(config.connect_timeout_secs.map(Duration::from_secs))
    }
}

impl Transport for WsTransport {
    /// Must be called from within a Tokio runtime.
    fn open(&self, address: &str, credential: &str) -> Result<ConnectionHandle> {
        let request = build_request(address, credential)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket(request, self.connect_timeout, event_tx, command_rx));

        Ok(ConnectionHandle::new(event_rx, command_tx))
    }
}

/// Build the upgrade request carrying the `Authorization` header.
fn build_request(address: &str, credential: &str) -> Result<Request> {
    let mut request = address
        .into_client_request()
        .map_err(|e| GatewayError::InvalidAddress(format!("{}: {}", address, e)))?;

    let value = HeaderValue::from_str(credential)
        .map_err(|e| GatewayError::InvalidCredential(e.to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, value);

    Ok(request)
}

/// Drive one WebSocket connection until it ends or its handle is dropped.
async fn run_socket(
    request: Request,
    connect_timeout: Option<Duration>,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
) {
    let uri = request.uri().to_string();

    let ws_stream = tokio::select! {
        result = open_socket(request, connect_timeout) => match result {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                tracing::debug!("Gateway connection to {} failed: {}", uri, e);
                let _ = events.send(TransportEvent::Error(e.to_string()));
                let _ = events.send(TransportEvent::Closed);
                return;
            }
        },
        _ = wait_for_close(&mut commands) => {
            tracing::debug!("Gateway connection to {} abandoned before it opened", uri);
            let _ = events.send(TransportEvent::Closed);
            return;
        }
    };
    tracing::debug!("WebSocket connected to {}", uri);

    let (mut write, mut read) = ws_stream.split();

    let outcome: Result<()> = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(TransportCommand::Ping) => {
                    if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                        break Err(e.into());
                    }
                }
                // Explicit close or the handle was dropped
                Some(TransportCommand::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    break Ok(());
                }
            },

            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    let _ = events.send(TransportEvent::Message(text));
                }
                Some(Ok(Message::Pong(_))) => {
                    let _ = events.send(TransportEvent::Pong);
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("Gateway sent close frame: {:?}", frame);
                    break Ok(());
                }
                Some(Ok(_)) => {} // Pings are answered by tungstenite
                Some(Err(e)) => break Err(e.into()),
                None => break Ok(()),
            },
        }
    };

    if let Err(e) = outcome {
        let _ = events.send(TransportEvent::Error(e.to_string()));
    }
    let _ = events.send(TransportEvent::Closed);
}

async fn open_socket(
    request: Request,
    connect_timeout: Option<Duration>,
) -> Result<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
> {
    let connect = connect_async(request);

    let (ws_stream, _) = match connect_timeout {
        Some(limit) => timeout(limit, connect).await.map_err(|_| {
            GatewayError::Transport(format!("Connection timed out after {:?}", limit))
        })??,
        None => connect.await?,
    };

    Ok(ws_stream)
}

/// Resolve once the handle asks for a close or goes away. Pings are dropped.
async fn wait_for_close(commands: &mut mpsc::UnboundedReceiver<TransportCommand>) {
    loop {
        match commands.recv().await {
            Some(TransportCommand::Ping) => continue,
            Some(TransportCommand::Close) | None => return,
        }
    }
}
