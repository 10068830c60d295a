//! Recurring timer entries for the gateway reactor.

use std::time::{Duration, Instant};

/// A recurring timer that is either idle or scheduled for its next firing.
///
/// Scheduling replaces the previous entry and cancelling an idle timer is a
/// no-op, so there is never more than one pending firing per timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timer {
    #[default]
    Idle,
    Scheduled { next_at: Instant, period: Duration },
}

impl Timer {
    /// A timer first firing one `period` after `now`, then every `period`.
    pub fn every(period: Duration, now: Instant) -> Self {
        Timer::Scheduled {
            next_at: now + period,
            period,
        }
    }

    pub fn cancel(&mut self) {
        *self = Timer::Idle;
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, Timer::Scheduled { .. })
    }

    /// When the timer fires next, if it is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Timer::Scheduled { next_at, .. } => Some(*next_at),
            Timer::Idle => None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|at| at <= now)
    }

    /// Move a fired timer to its next slot. Idle timers stay idle.
    pub fn rearm(&mut self, now: Instant) {
        if let Timer::Scheduled { next_at, period } = self {
            *next_at = now + *period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_schedules_one_period_ahead() {
        let now = Instant::now();
        let timer = Timer::every(Duration::from_secs(30), now);

        assert!(timer.is_scheduled());
        assert_eq!(timer.deadline(), Some(now + Duration::from_secs(30)));
        assert!(!timer.is_due(now + Duration::from_secs(29)));
        assert!(timer.is_due(now + Duration::from_secs(30)));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut timer = Timer::every(Duration::from_secs(1), Instant::now());
        timer.cancel();
        timer.cancel();

        assert_eq!(timer, Timer::Idle);
        assert!(timer.deadline().is_none());
        assert!(!timer.is_due(Instant::now() + Duration::from_secs(60)));
    }

    #[test]
    fn test_rearm() {
        let now = Instant::now();
        let mut timer = Timer::every(Duration::from_secs(45), now);
        let fired_at = now + Duration::from_secs(45);
        timer.rearm(fired_at);
        assert_eq!(timer.deadline(), Some(now + Duration::from_secs(90)));

        let mut idle = Timer::Idle;
        idle.rearm(now);
        assert_eq!(idle, Timer::Idle);
    }
}
