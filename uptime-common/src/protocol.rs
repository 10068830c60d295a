//! Wire types for gateway-agent communication.
//!
//! The gateway speaks very little application protocol. Once the WebSocket
//! upgrade completes, the gateway sends a single JSON handshake acknowledgment:
//!
//! ```json
//! { "connected": true }
//! ```
//!
//! Everything else on the wire is transport-level ping/pong. Any other JSON
//! payload is accepted and kept as a generic value so the agent can log it.
//!
//! # Security
//!
//! The agent authenticates through the `Authorization` header of the upgrade
//! request, never inside a payload. Use `wss://` in production.

use serde::{Deserialize, Serialize};

/// Handshake acknowledgment sent by the gateway after the upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeAck {
    /// Whether the gateway accepted the agent.
    pub connected: bool,
}

/// A payload received from the gateway, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayPayload {
    /// A JSON object carrying a boolean `connected` field.
    Handshake(HandshakeAck),
    /// Any other valid JSON.
    Other(serde_json::Value),
}

impl GatewayPayload {
    /// Parse a raw text payload.
    ///
    /// Fails only when the payload is not valid JSON.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        match value.get("connected").and_then(serde_json::Value::as_bool) {
            Some(connected) => Ok(GatewayPayload::Handshake(HandshakeAck { connected })),
            None => Ok(GatewayPayload::Other(value)),
        }
    }

    /// The handshake acknowledgment, if this payload is one.
    pub fn as_handshake(&self) -> Option<HandshakeAck> {
        match self {
            GatewayPayload::Handshake(ack) => Some(*ack),
            GatewayPayload::Other(_) => None,
        }
    }
}
