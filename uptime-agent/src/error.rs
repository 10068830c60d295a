//! Error types for the uptime agent.

/// Errors raised while initiating or driving a gateway connection.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid gateway address: {0}")]
    InvalidAddress(String),

    #[error("Invalid gateway credential: {0}")]
    InvalidCredential(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        GatewayError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
