use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::gateway::{ConnectionHandle, Logger, Severity, Transport, TransportCommand, TransportEvent};

pub fn test_gateway_config() -> GatewayConfig {
    GatewayConfig {
        host: "ws://localhost:8081/ws".to_string(),
        identify: "test-identify".to_string(),
        reconnect_interval_secs: 30,
        max_reconnect_tries: 3,
        heartbeat_interval_secs: 45,
        heartbeat_timeout_secs: 90,
        connect_timeout_secs: None,
    }
}

/// A log entry captured by [`RecordingLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub component: String,
    pub message: String,
    pub severity: Severity,
}

/// Logger that keeps every entry in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Whether some entry contains `needle` with the given severity.
    pub fn contains(&self, needle: &str, severity: Severity) -> bool {
        self.count(needle, severity) > 0
    }

    pub fn count(&self, needle: &str, severity: Severity) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.severity == severity && e.message.contains(needle))
            .count()
    }
}

impl Logger for RecordingLogger {
    fn emit(&self, component: &str, message: &str, severity: Severity) {
        self.entries.lock().unwrap().push(LogEntry {
            component: component.to_string(),
            message: message.to_string(),
            severity,
        });
    }
}

/// The far end of a connection opened through [`MockTransport`].
struct MockPeer {
    address: String,
    credential: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    commands: mpsc::UnboundedReceiver<TransportCommand>,
}

#[derive(Default)]
struct MockState {
    peers: Vec<MockPeer>,
    fail_open: bool,
}

/// In-memory transport. Clones share the same state.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `open` fail to initiate.
    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().unwrap().fail_open = fail;
    }

    /// Number of `open` calls, failed ones included.
    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().peers.len()
    }

    pub fn last_open(&self) -> Option<(String, String)> {
        let state = self.state.lock().unwrap();
        state
            .peers
            .last()
            .map(|p| (p.address.clone(), p.credential.clone()))
    }

    /// Deliver an event on the connection opened by the `index`-th `open` call.
    ///
    /// Returns false once that connection's listeners are gone.
    pub fn emit(&self, index: usize, event: TransportEvent) -> bool {
        let state = self.state.lock().unwrap();
        state
            .peers
            .get(index)
            .is_some_and(|p| p.events.send(event).is_ok())
    }

    /// Drain the commands sent to the `index`-th connection so far.
    pub fn commands(&self, index: usize) -> Vec<TransportCommand> {
        let mut state = self.state.lock().unwrap();
        let mut commands = Vec::new();
        if let Some(peer) = state.peers.get_mut(index) {
            while let Ok(command) = peer.commands.try_recv() {
                commands.push(command);
            }
        }
        commands
    }
}

impl Transport for MockTransport {
    fn open(&self, address: &str, credential: &str) -> Result<ConnectionHandle> {
        let mut state = self.state.lock().unwrap();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        state.peers.push(MockPeer {
            address: address.to_string(),
            credential: credential.to_string(),
            events: event_tx,
            commands: command_rx,
        });

        if state.fail_open {
            return Err(GatewayError::InvalidAddress(address.to_string()));
        }
        Ok(ConnectionHandle::new(event_rx, command_tx))
    }
}
