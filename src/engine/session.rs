//! Connection status state machine and reconnect backoff policy.

use std::time::Duration;

/// Initial delay before a reconnect attempt, doubled per failed cycle.
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Ceiling on the reconnect delay.
const MAX_BACKOFF: Duration = Duration::from_millis(30_000);

/// Lifecycle of the streaming session.
///
/// `Idle → Connecting → Connected → Subscribed → (Disconnected | Error) →
/// Connecting → …`, terminal only on an explicit caller disconnect, which
/// returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Connecting,
    Connected,
    Subscribed,
    Disconnected,
    Error,
}

impl SessionStatus {
    /// Lower-case name for logs and status messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Subscribed => "subscribed",
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Error => "error",
        }
    }
}

/// Computes the delay before reconnect attempt number `attempt` (0-based):
/// `min(1s × 2^attempt, 30s)`.
pub fn backoff_delay(attempt: u32) -> Duration {
    INITIAL_BACKOFF
        .checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}

/// Tracks the adapter's status and reconnect attempt counter.
#[derive(Debug)]
pub struct Session {
    status: SessionStatus,
    attempt: u32,
}

impl Session {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            attempt: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Moves to `next`, returning it when the status actually changed.
    pub fn transition(&mut self, next: SessionStatus) -> Option<SessionStatus> {
        if self.status == next {
            return None;
        }
        self.status = next;
        Some(next)
    }

    /// Delay before the next reconnect; bumps the attempt counter.
    pub fn next_backoff(&mut self) -> Duration {
        let delay = backoff_delay(self.attempt);
        self.attempt += 1;
        delay
    }

    /// Called on a successful transport open; resets the backoff ladder.
    pub fn opened(&mut self) {
        self.attempt = 0;
    }

    /// Full reset on explicit disconnect.
    pub fn reset(&mut self) {
        self.status = SessionStatus::Idle;
        self.attempt = 0;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_capped() {
        assert_eq!(backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(4), Duration::from_millis(16_000));
        assert_eq!(backoff_delay(5), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(20), Duration::from_millis(30_000));
        // Far past the shift width the cap must still hold.
        assert_eq!(backoff_delay(200), Duration::from_millis(30_000));
    }

    #[test]
    fn attempt_counter_advances_and_resets() {
        let mut session = Session::new();
        assert_eq!(session.next_backoff(), Duration::from_millis(1000));
        assert_eq!(session.next_backoff(), Duration::from_millis(2000));
        assert_eq!(session.next_backoff(), Duration::from_millis(4000));

        session.opened();
        assert_eq!(session.next_backoff(), Duration::from_millis(1000));
    }

    #[test]
    fn transition_reports_changes_only() {
        let mut session = Session::new();
        assert_eq!(
            session.transition(SessionStatus::Connecting),
            Some(SessionStatus::Connecting)
        );
        assert_eq!(session.transition(SessionStatus::Connecting), None);
        assert_eq!(
            session.transition(SessionStatus::Connected),
            Some(SessionStatus::Connected)
        );
        assert_eq!(session.status(), SessionStatus::Connected);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut session = Session::new();
        session.transition(SessionStatus::Subscribed);
        session.next_backoff();
        session.reset();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.next_backoff(), Duration::from_millis(1000));
    }
}
