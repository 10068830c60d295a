//! Uptime Agent - keeps a supervised WebSocket link to the uptime gateway.

pub mod config;
pub mod error;
pub mod gateway;
pub mod test_util;

pub use config::{Config, ConnectionTimings, GatewayConfig, LoggingConfig};
pub use error::{GatewayError, Result};
pub use gateway::{ConnectionPhase, GatewayConnection, Logger, Severity, TracingLogger, WsTransport};
