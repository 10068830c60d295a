//! Uptime Common Types
//!
//! Shared types used by the uptime agent and anything that talks to the gateway.

pub mod protocol;

pub use protocol::{GatewayPayload, HandshakeAck};
