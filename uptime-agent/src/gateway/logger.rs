//! Operator-facing log output for gateway events.

/// Severity of an operator-facing log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// Sink for operator-facing messages.
///
/// Fire-and-forget: implementations must not fail or block.
pub trait Logger: Send + Sync {
    fn emit(&self, component: &str, message: &str, severity: Severity);
}

/// Logger that forwards entries to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn emit(&self, component: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Success => tracing::info!(component = %component, "{}", message),
            Severity::Error => tracing::error!(component = %component, "{}", message),
        }
    }
}
