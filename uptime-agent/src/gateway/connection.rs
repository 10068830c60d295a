//! Gateway connection state machine.
//!
//! The connection reacts to two kinds of input: events from the current
//! transport handle and firings of its two recurring timers (heartbeat and
//! reconnect). Every reaction takes the current time explicitly, which keeps
//! the state machine deterministic; [`GatewayConnection::run`] is the async
//! driver that feeds it real events and real time.

use std::sync::Arc;
use std::time::Instant;

use uptime_common::{GatewayPayload, HandshakeAck};

use crate::config::{ConnectionTimings, GatewayConfig};

use super::logger::{Logger, Severity};
use super::timer::Timer;
use super::transport::{ConnectionHandle, Transport, TransportEvent};

/// Component tag used for every operator-facing log entry.
pub const COMPONENT: &str = "Gateway";

/// Where the connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Nothing attempted yet.
    Idle,
    /// A connection was initiated, no accepted handshake yet.
    Connecting,
    /// The gateway acknowledged the handshake.
    Open,
    /// The link dropped and a reconnect timer is pending.
    ReconnectWaiting,
    /// Reconnect attempts ran out. Only a manual `connect()` leaves this phase.
    ReconnectExhausted,
}

/// Liveness tracking for the current connection.
#[derive(Debug, Default)]
pub struct HeartbeatState {
    last_heartbeat_at: Option<Instant>,
    timer: Timer,
}

/// Progress of the current reconnect campaign.
#[derive(Debug, Default)]
pub struct ReconnectState {
    tries: u32,
    timer: Timer,
}

impl ReconnectState {
    pub fn tries(&self) -> u32 {
        self.tries
    }

    /// A campaign is active exactly while its timer is pending.
    pub fn is_active(&self) -> bool {
        self.timer.is_scheduled()
    }

    fn reset(&mut self) {
        self.timer.cancel();
        self.tries = 0;
    }
}

/// Which recurring timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Heartbeat,
    Reconnect,
}

/// A single supervised link to the gateway.
pub struct GatewayConnection<T: Transport> {
    config: GatewayConfig,
    timings: ConnectionTimings,
    transport: T,
    logger: Arc<dyn Logger>,
    handle: Option<ConnectionHandle>,
    phase: ConnectionPhase,
    heartbeat: HeartbeatState,
    reconnect: ReconnectState,
}

impl<T: Transport> GatewayConnection<T> {
    pub fn new(config: GatewayConfig, transport: T, logger: Arc<dyn Logger>) -> Self {
        let timings = ConnectionTimings::from(&config);
        Self {
            config,
            timings,
            transport,
            logger,
            handle: None,
            phase: ConnectionPhase::Idle,
            heartbeat: HeartbeatState::default(),
            reconnect: ReconnectState::default(),
        }
    }

    /// Override the timer settings derived from the config.
    pub fn with_timings(mut self, timings: ConnectionTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn reconnect(&self) -> &ReconnectState {
        &self.reconnect
    }

    pub fn last_heartbeat_at(&self) -> Option<Instant> {
        self.heartbeat.last_heartbeat_at
    }

    pub fn is_heartbeat_scheduled(&self) -> bool {
        self.heartbeat.timer.is_scheduled()
    }

    /// Whether events from a connection can still arrive.
    pub fn is_listening(&self) -> bool {
        self.handle.as_ref().is_some_and(ConnectionHandle::is_listening)
    }

    /// Nothing can happen anymore: no live listener and no pending timer.
    pub fn is_idle(&self) -> bool {
        !self.is_listening()
            && !self.heartbeat.timer.is_scheduled()
            && !self.reconnect.timer.is_scheduled()
    }

    /// Earliest pending timer firing.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.heartbeat.timer.deadline(), self.reconnect.timer.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Open a new connection to the configured gateway, replacing the current one.
    ///
    /// Failing to initiate the attempt is logged and changes nothing else; in
    /// particular it never schedules a retry.
    pub fn connect(&mut self, now: Instant) {
        match self.transport.open(&self.config.host, &self.config.identify) {
            Ok(handle) => {
                tracing::info!("Connecting to gateway at {}", self.config.host);
                self.handle = Some(handle);
                self.phase = ConnectionPhase::Connecting;
                self.load_connection(now);
            }
            Err(e) => {
                self.log(
                    &format!("Failed to connect to the gateway server: {}", e),
                    Severity::Error,
                );
            }
        }
    }

    /// React to an event of the current connection.
    pub fn handle_event(&mut self, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Pong => {
                self.heartbeat.last_heartbeat_at = Some(now);
            }
            TransportEvent::Error(error) => {
                self.log(
                    &format!(
                        "An error has occurred while connecting to the gateway server: {}",
                        error
                    ),
                    Severity::Error,
                );
                self.on_link_lost(now);
            }
            TransportEvent::Closed => {
                self.log("Gateway connection closed.", Severity::Error);
                self.on_link_lost(now);

                self.heartbeat.timer.cancel();
                // A closed connection produces nothing further
                if let Some(handle) = self.handle.as_mut() {
                    handle.remove_all_listeners();
                }
            }
        }
    }

    /// Fire every timer that is due at `now`, each at most once.
    pub fn fire_due_timers(&mut self, now: Instant) {
        let mut heartbeat_fired = false;
        let mut reconnect_fired = false;

        loop {
            let heartbeat = (!heartbeat_fired && self.heartbeat.timer.is_due(now))
                .then(|| self.heartbeat.timer.deadline())
                .flatten();
            let reconnect = (!reconnect_fired && self.reconnect.timer.is_due(now))
                .then(|| self.reconnect.timer.deadline())
                .flatten();

            let kind = match (heartbeat, reconnect) {
                (Some(h), Some(r)) if h < r => TimerKind::Heartbeat,
                (_, Some(_)) => TimerKind::Reconnect,
                (Some(_), None) => TimerKind::Heartbeat,
                (None, None) => break,
            };

            match kind {
                TimerKind::Heartbeat => {
                    heartbeat_fired = true;
                    self.heartbeat.timer.rearm(now);
                    self.on_heartbeat_tick(now);
                }
                TimerKind::Reconnect => {
                    reconnect_fired = true;
                    self.reconnect.timer.rearm(now);
                    self.on_reconnect_tick(now);
                }
            }
        }
    }

    /// Connect and supervise the link until nothing is left to wait on.
    ///
    /// Returns once reconnect attempts are exhausted (or the very first
    /// connection could not be initiated) and the last connection is gone.
    pub async fn run(&mut self) {
        self.connect(Instant::now());

        while !self.is_idle() {
            let deadline = self.next_deadline();

            let step = tokio::select! {
                event = next_event(&mut self.handle) => Step::Event(event),
                _ = sleep_until(deadline) => Step::Timers,
            };

            let now = Instant::now();
            match step {
                Step::Event(Some(event)) => self.handle_event(event, now),
                // Transport went away without a close event
                Step::Event(None) => self.handle_event(TransportEvent::Closed, now),
                Step::Timers => self.fire_due_timers(now),
            }
        }

        tracing::info!("Gateway client stopped in phase {:?}", self.phase);
    }

    fn load_connection(&mut self, now: Instant) {
        self.load_heartbeat(now);
    }

    fn load_heartbeat(&mut self, now: Instant) {
        self.heartbeat.last_heartbeat_at = Some(now);
        self.heartbeat.timer = Timer::every(self.timings.heartbeat_interval, now);
    }

    fn on_message(&mut self, text: &str) {
        tracing::debug!("Received gateway message: {}", text);

        let payload = match GatewayPayload::parse(text) {
            Ok(payload) => payload,
            Err(e) => {
                self.log(
                    &format!("Received a malformed message from the gateway server: {}", e),
                    Severity::Error,
                );
                return;
            }
        };

        match payload.as_handshake() {
            Some(HandshakeAck { connected: true }) => {
                self.log("Gateway connection established.", Severity::Success);
                self.reconnect.reset();
                self.phase = ConnectionPhase::Open;
            }
            Some(HandshakeAck { connected: false }) => {
                self.log("Gateway connection failed.", Severity::Error);
            }
            None => {}
        }
    }

    /// Shared reaction to `error` and `close`.
    fn on_link_lost(&mut self, now: Instant) {
        if self.phase == ConnectionPhase::ReconnectExhausted {
            return;
        }

        if !self.reconnect.is_active() {
            self.try_reconnect(now);
        } else {
            self.phase = ConnectionPhase::ReconnectWaiting;
        }
    }

    fn try_reconnect(&mut self, now: Instant) {
        if let Some(handle) = self.handle.as_mut() {
            handle.remove_all_listeners();
        }
        // The detached connection can no longer report its close
        self.heartbeat.timer.cancel();

        self.reconnect.timer = Timer::every(self.timings.reconnect_interval, now);
        self.phase = ConnectionPhase::ReconnectWaiting;
        tracing::info!(
            "Reconnecting to gateway every {} seconds",
            self.timings.reconnect_interval.as_secs_f64()
        );
    }

    fn on_reconnect_tick(&mut self, now: Instant) {
        if self.reconnect.tries > self.timings.max_reconnect_tries {
            self.reconnect.timer.cancel();
            self.phase = ConnectionPhase::ReconnectExhausted;
            self.log(
                &format!(
                    "Failed to reconnect after {} attempts, reconnect manually.",
                    self.reconnect.tries
                ),
                Severity::Error,
            );
            return;
        }

        self.reconnect.tries += 1;
        tracing::info!("Reconnect attempt {}", self.reconnect.tries);
        self.connect(now);
    }

    fn on_heartbeat_tick(&mut self, now: Instant) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        handle.ping();

        if let Some(last) = self.heartbeat.last_heartbeat_at {
            let silence = now.saturating_duration_since(last);
            if silence > self.timings.heartbeat_timeout {
                tracing::warn!(
                    "No pong from gateway for {} seconds, closing connection",
                    silence.as_secs()
                );
                handle.close();
            }
        }
    }

    fn log(&self, message: &str, severity: Severity) {
        self.logger.emit(COMPONENT, message, severity);
    }
}

enum Step {
    Event(Option<TransportEvent>),
    Timers,
}

async fn next_event(handle: &mut Option<ConnectionHandle>) -> Option<TransportEvent> {
    match handle.as_mut() {
        Some(handle) => handle.next_event().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{test_gateway_config, MockTransport, RecordingLogger};
    use crate::gateway::TransportCommand;
    use std::time::Duration;

    const HANDSHAKE_OK: &str = r#"{"connected":true}"#;
    const HANDSHAKE_REJECTED: &str = r#"{"connected":false}"#;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn setup() -> (GatewayConnection<MockTransport>, MockTransport, Arc<RecordingLogger>) {
        let transport = MockTransport::new();
        let logger = Arc::new(RecordingLogger::new());
        let conn = GatewayConnection::new(test_gateway_config(), transport.clone(), logger.clone());
        (conn, transport, logger)
    }

    /// Fire every timer deadline up to and including `until`.
    fn advance(conn: &mut GatewayConnection<MockTransport>, until: Instant) {
        while let Some(at) = conn.next_deadline() {
            if at > until {
                break;
            }
            conn.fire_due_timers(at);
        }
    }

    #[test]
    fn test_connect_opens_with_credentials() {
        let (mut conn, transport, _logger) = setup();
        let t0 = Instant::now();

        conn.connect(t0);

        assert_eq!(transport.open_count(), 1);
        let (address, credential) = transport.last_open().unwrap();
        assert_eq!(address, "ws://localhost:8081/ws");
        assert_eq!(credential, "test-identify");
        assert_eq!(conn.phase(), ConnectionPhase::Connecting);
        assert_eq!(conn.last_heartbeat_at(), Some(t0));
        assert!(conn.is_heartbeat_scheduled());
        assert!(conn.is_listening());
    }

    #[test]
    fn test_connect_initiation_failure_does_not_retry() {
        let (mut conn, transport, logger) = setup();
        transport.set_fail_open(true);
        let t0 = Instant::now();

        conn.connect(t0);

        assert_eq!(conn.phase(), ConnectionPhase::Idle);
        assert!(!conn.reconnect().is_active());
        assert!(conn.next_deadline().is_none());
        assert!(conn.is_idle());
        assert!(logger.contains("Failed to connect to the gateway server", Severity::Error));

        advance(&mut conn, t0 + secs(600));
        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_handshake_accepted_resets_campaign() {
        let (mut conn, transport, logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);

        conn.handle_event(TransportEvent::Closed, t0 + secs(1));
        assert!(conn.reconnect().is_active());
        advance(&mut conn, t0 + secs(61));
        assert_eq!(conn.reconnect().tries(), 2);
        assert_eq!(transport.open_count(), 3);

        conn.handle_event(TransportEvent::Message(HANDSHAKE_OK.to_string()), t0 + secs(62));

        assert_eq!(conn.reconnect().tries(), 0);
        assert!(!conn.reconnect().is_active());
        assert_eq!(conn.phase(), ConnectionPhase::Open);
        assert!(logger.contains("Gateway connection established.", Severity::Success));

        // The cancelled reconnect timer never fires again
        advance(&mut conn, t0 + secs(300));
        assert_eq!(transport.open_count(), 3);
    }

    #[test]
    fn test_handshake_rejected_does_not_reconnect() {
        let (mut conn, transport, logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);

        conn.handle_event(
            TransportEvent::Message(HANDSHAKE_REJECTED.to_string()),
            t0 + secs(1),
        );

        assert!(logger.contains("Gateway connection failed.", Severity::Error));
        assert!(!conn.reconnect().is_active());
        assert_eq!(conn.phase(), ConnectionPhase::Connecting);
        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_other_and_malformed_messages_are_ignored() {
        let (mut conn, _transport, logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);

        conn.handle_event(TransportEvent::Message(r#"{"type":"notice"}"#.to_string()), t0);
        assert!(logger.entries().is_empty());

        conn.handle_event(TransportEvent::Message("garbage".to_string()), t0);
        assert_eq!(logger.entries().len(), 1);
        assert!(logger.contains("malformed message", Severity::Error));

        assert_eq!(conn.phase(), ConnectionPhase::Connecting);
        assert!(!conn.reconnect().is_active());
        assert!(conn.is_listening());
    }

    /// Transport whose connections end without ever reporting `Closed`.
    #[derive(Clone, Default)]
    struct SilentDropTransport {
        opens: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Transport for SilentDropTransport {
        fn open(&self, _address: &str, _credential: &str) -> crate::error::Result<ConnectionHandle> {
            self.opens.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let (_event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
            let (command_tx, _command_rx) = tokio::sync::mpsc::unbounded_channel();
            Ok(ConnectionHandle::new(event_rx, command_tx))
        }
    }

    #[tokio::test]
    async fn test_run_treats_ended_event_stream_as_close() {
        let transport = SilentDropTransport::default();
        let logger = Arc::new(RecordingLogger::new());
        let timings = ConnectionTimings {
            reconnect_interval: Duration::from_millis(10),
            ..ConnectionTimings::default()
        };
        let mut conn = GatewayConnection::new(test_gateway_config(), transport.clone(), logger.clone())
            .with_timings(timings);

        tokio::time::timeout(secs(5), conn.run()).await.unwrap();

        // Every vanished connection goes through the close reaction and the
        // campaign runs to exhaustion instead of stopping silently
        assert_eq!(conn.phase(), ConnectionPhase::ReconnectExhausted);
        assert_eq!(conn.reconnect().tries(), 4);
        assert_eq!(transport.opens.load(std::sync::atomic::Ordering::SeqCst), 5);
        assert!(logger.count("Gateway connection closed.", Severity::Error) >= 1);
        assert_eq!(logger.count("reconnect manually", Severity::Error), 1);
        assert!(!conn.is_heartbeat_scheduled());
    }

    #[test]
    fn test_error_then_close_starts_single_campaign() {
        let (mut conn, transport, logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);

        conn.handle_event(TransportEvent::Error("connection reset".to_string()), t0);
        assert!(conn.reconnect().is_active());
        assert_eq!(conn.phase(), ConnectionPhase::ReconnectWaiting);
        // Listeners of the abandoned connection are detached
        assert!(!conn.is_listening());
        assert!(!conn.is_heartbeat_scheduled());
        assert!(logger.contains("connection reset", Severity::Error));

        conn.handle_event(TransportEvent::Closed, t0);
        conn.handle_event(TransportEvent::Error("again".to_string()), t0);
        assert_eq!(conn.next_deadline(), Some(t0 + secs(30)));

        // One tick, one attempt
        advance(&mut conn, t0 + secs(30));
        assert_eq!(transport.open_count(), 2);
        assert_eq!(conn.reconnect().tries(), 1);
    }

    #[test]
    fn test_failed_attempts_during_campaign_do_not_stack() {
        let (mut conn, transport, _logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);
        conn.handle_event(TransportEvent::Closed, t0);

        advance(&mut conn, t0 + secs(30));
        assert_eq!(conn.phase(), ConnectionPhase::Connecting);
        conn.handle_event(TransportEvent::Error("refused".to_string()), t0 + secs(30));
        conn.handle_event(TransportEvent::Closed, t0 + secs(30));

        assert!(conn.reconnect().is_active());
        assert_eq!(conn.phase(), ConnectionPhase::ReconnectWaiting);
        assert_eq!(conn.next_deadline(), Some(t0 + secs(60)));
        assert_eq!(transport.open_count(), 2);
    }

    #[test]
    fn test_campaign_exhausts_after_tries_exceed_limit() {
        let (mut conn, transport, logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);
        conn.handle_event(TransportEvent::Message(HANDSHAKE_OK.to_string()), t0);
        conn.handle_event(TransportEvent::Closed, t0 + secs(1));

        let mut tick_at = t0 + secs(1);
        for expected_tries in 1..=4 {
            tick_at += secs(30);
            conn.fire_due_timers(tick_at);
            assert_eq!(conn.reconnect().tries(), expected_tries);
            assert!(conn.reconnect().is_active());
            // Every attempt fails
            conn.handle_event(TransportEvent::Error("refused".to_string()), tick_at);
            conn.handle_event(TransportEvent::Closed, tick_at);
        }
        // Initial connect plus four reconnects
        assert_eq!(transport.open_count(), 5);

        tick_at += secs(30);
        conn.fire_due_timers(tick_at);

        assert_eq!(conn.phase(), ConnectionPhase::ReconnectExhausted);
        assert!(!conn.reconnect().is_active());
        assert_eq!(conn.reconnect().tries(), 4);
        assert!(logger.contains("reconnect manually", Severity::Error));
        assert!(conn.is_idle());

        advance(&mut conn, tick_at + secs(3600));
        assert_eq!(transport.open_count(), 5);
    }

    #[test]
    fn test_events_after_exhaustion_do_not_restart_campaign() {
        let (mut conn, transport, _logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);
        conn.handle_event(TransportEvent::Closed, t0);

        // Attempts whose connections never report back
        advance(&mut conn, t0 + secs(150));
        assert_eq!(conn.phase(), ConnectionPhase::ReconnectExhausted);
        assert!(conn.is_listening());

        conn.handle_event(TransportEvent::Closed, t0 + secs(151));
        assert_eq!(conn.phase(), ConnectionPhase::ReconnectExhausted);
        assert!(!conn.reconnect().is_active());
        assert!(conn.is_idle());
        assert_eq!(transport.open_count(), 5);
    }

    #[test]
    fn test_manual_connect_after_exhaustion() {
        let (mut conn, transport, _logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);
        conn.handle_event(TransportEvent::Closed, t0);
        advance(&mut conn, t0 + secs(150));
        assert_eq!(conn.phase(), ConnectionPhase::ReconnectExhausted);

        conn.connect(t0 + secs(200));
        conn.handle_event(
            TransportEvent::Message(HANDSHAKE_OK.to_string()),
            t0 + secs(201),
        );

        assert_eq!(conn.phase(), ConnectionPhase::Open);
        assert_eq!(conn.reconnect().tries(), 0);
        assert_eq!(transport.open_count(), 6);
    }

    #[test]
    fn test_heartbeat_pings_every_interval() {
        let (mut conn, transport, _logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);

        conn.handle_event(TransportEvent::Pong, t0 + secs(40));
        advance(&mut conn, t0 + secs(45));
        conn.handle_event(TransportEvent::Pong, t0 + secs(46));
        advance(&mut conn, t0 + secs(90));

        assert_eq!(
            transport.commands(0),
            vec![TransportCommand::Ping, TransportCommand::Ping]
        );
        assert_eq!(conn.last_heartbeat_at(), Some(t0 + secs(46)));
    }

    #[test]
    fn test_stale_heartbeat_forces_close() {
        let (mut conn, transport, _logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);

        // 90 seconds of silence is still tolerated
        advance(&mut conn, t0 + secs(90));
        assert_eq!(
            transport.commands(0),
            vec![TransportCommand::Ping, TransportCommand::Ping]
        );

        advance(&mut conn, t0 + secs(135));
        assert_eq!(
            transport.commands(0),
            vec![TransportCommand::Ping, TransportCommand::Close]
        );

        conn.handle_event(TransportEvent::Closed, t0 + secs(135));
        assert!(!conn.is_heartbeat_scheduled());
        assert!(conn.reconnect().is_active());
    }

    #[test]
    fn test_pong_postpones_stale_close() {
        let (mut conn, transport, _logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);

        conn.handle_event(TransportEvent::Pong, t0 + secs(80));
        advance(&mut conn, t0 + secs(135));
        assert!(!transport.commands(0).contains(&TransportCommand::Close));

        advance(&mut conn, t0 + secs(180));
        assert_eq!(transport.commands(0).last(), Some(&TransportCommand::Close));
    }

    #[test]
    fn test_close_cancels_heartbeat() {
        let (mut conn, transport, logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);
        conn.handle_event(TransportEvent::Message(HANDSHAKE_OK.to_string()), t0);

        conn.handle_event(TransportEvent::Closed, t0 + secs(10));
        assert!(!conn.is_heartbeat_scheduled());
        assert!(logger.contains("Gateway connection closed.", Severity::Error));

        // Only the reconnect timer remains
        assert_eq!(conn.next_deadline(), Some(t0 + secs(40)));
        advance(&mut conn, t0 + secs(39));
        assert!(transport.commands(0).is_empty());
    }

    #[test]
    fn test_reconnect_starts_fresh_heartbeat() {
        let (mut conn, transport, _logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);
        conn.handle_event(TransportEvent::Closed, t0);

        advance(&mut conn, t0 + secs(30));
        assert_eq!(conn.last_heartbeat_at(), Some(t0 + secs(30)));
        assert!(conn.is_heartbeat_scheduled());
        conn.handle_event(TransportEvent::Message(HANDSHAKE_OK.to_string()), t0 + secs(31));

        advance(&mut conn, t0 + secs(75));
        assert!(transport.commands(0).is_empty());
        assert_eq!(transport.commands(1), vec![TransportCommand::Ping]);
    }

    #[test]
    fn test_at_most_one_campaign_for_any_event_sequence() {
        let (mut conn, _transport, _logger) = setup();
        let t0 = Instant::now();
        conn.connect(t0);

        let events = [
            TransportEvent::Error("a".to_string()),
            TransportEvent::Closed,
            TransportEvent::Closed,
            TransportEvent::Error("b".to_string()),
        ];
        let mut now = t0;
        for (i, event) in events.into_iter().cycle().take(12).enumerate() {
            now += secs(7);
            conn.handle_event(event, now);
            if i % 3 == 0 {
                conn.fire_due_timers(now);
            }
            // A single reconnect deadline at most, never stacked
            assert!(conn.reconnect().is_active() || conn.phase() == ConnectionPhase::ReconnectExhausted);
        }
        assert!(conn.reconnect().tries() <= 4);
    }
}
