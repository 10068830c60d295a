//! Gateway WebSocket client for agent-gateway communication.
//!
//! This module keeps a single authenticated link to the gateway alive:
//! handshake acknowledgment, ping/pong heartbeats and bounded reconnection.

mod connection;
mod logger;
mod timer;
mod transport;

pub use connection::{ConnectionPhase, GatewayConnection, HeartbeatState, ReconnectState, COMPONENT};
pub use logger::{Logger, Severity, TracingLogger};
pub use timer::Timer;
pub use transport::{ConnectionHandle, Transport, TransportCommand, TransportEvent, WsTransport};
