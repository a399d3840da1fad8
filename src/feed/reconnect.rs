//! Connection lifecycle and reconnect backoff, independent of any socket.

use crate::config::ReconnectPolicy;
use std::time::Duration;

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Endpoint going away.
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close frame carried no status code.
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Connection dropped without a close frame, or never established.
pub const CLOSE_ABNORMAL: u16 = 1006;

pub fn is_normal_close(code: u16) -> bool {
    matches!(code, CLOSE_NORMAL | CLOSE_GOING_AWAY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What to do after the socket closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Retry { delay: Duration, attempt: u32 },
    Stop,
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    attempts: u32,
    policy: ReconnectPolicy,
}

impl ConnectionMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Move to `Connecting`. Returns false, changing nothing, while a socket is
    /// still connecting or open.
    pub fn begin_connect(&mut self) -> bool {
        if self.state != ConnectionState::Disconnected {
            return false;
        }
        self.state = ConnectionState::Connecting;
        true
    }

    pub fn opened(&mut self) {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
    }

    /// Record a closure with `code` and decide whether to reconnect.
    ///
    /// Abnormal closures retry after `2^attempt * base_delay` until
    /// `max_attempts` retries have been scheduled; then the counter resets and
    /// the cycle stops.
    pub fn closed(&mut self, code: u16) -> CloseDecision {
        self.state = ConnectionState::Disconnected;
        if is_normal_close(code) {
            return CloseDecision::Stop;
        }
        if self.attempts >= self.policy.max_attempts {
            self.attempts = 0;
            return CloseDecision::Stop;
        }
        let attempt = self.attempts;
        let delay = self.policy.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        self.attempts += 1;
        CloseDecision::Retry { delay, attempt }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> ConnectionMachine {
        ConnectionMachine::new(ReconnectPolicy::default())
    }

    #[test]
    fn abnormal_closes_back_off_exponentially_then_stop() {
        let mut m = machine();
        for attempt in 0..5u32 {
            assert!(m.begin_connect());
            let decision = m.closed(CLOSE_ABNORMAL);
            assert_eq!(
                decision,
                CloseDecision::Retry {
                    delay: Duration::from_millis(2u64.pow(attempt) * 1000),
                    attempt,
                }
            );
        }
        assert_eq!(m.attempts(), 5);
        assert!(m.begin_connect());
        assert_eq!(m.closed(4000), CloseDecision::Stop);
        assert_eq!(m.attempts(), 0);
        assert_eq!(m.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn normal_codes_never_retry() {
        for code in [CLOSE_NORMAL, CLOSE_GOING_AWAY] {
            let mut m = machine();
            m.begin_connect();
            m.opened();
            assert_eq!(m.closed(code), CloseDecision::Stop);
        }
        assert!(!is_normal_close(CLOSE_NO_STATUS));
        assert!(!is_normal_close(CLOSE_ABNORMAL));
    }

    #[test]
    fn successful_open_resets_attempts() {
        let mut m = machine();
        m.begin_connect();
        m.closed(CLOSE_ABNORMAL);
        m.begin_connect();
        m.closed(CLOSE_ABNORMAL);
        assert_eq!(m.attempts(), 2);

        m.begin_connect();
        m.opened();
        assert_eq!(m.attempts(), 0);
        assert!(matches!(
            m.closed(CLOSE_ABNORMAL),
            CloseDecision::Retry { attempt: 0, .. }
        ));
    }

    #[test]
    fn connect_is_a_no_op_unless_closed() {
        let mut m = machine();
        assert!(m.begin_connect());
        assert!(!m.begin_connect());
        assert_eq!(m.state(), ConnectionState::Connecting);
        m.opened();
        assert!(!m.begin_connect());
        assert_eq!(m.state(), ConnectionState::Connected);
        m.closed(CLOSE_NORMAL);
        assert!(m.begin_connect());
    }

    #[test]
    fn base_delay_is_configurable() {
        let mut m = ConnectionMachine::new(ReconnectPolicy {
            base_delay: Duration::from_millis(50),
            max_attempts: 2,
        });
        assert!(matches!(m.closed(CLOSE_ABNORMAL), CloseDecision::Retry { delay, .. } if delay == Duration::from_millis(50)));
        assert!(matches!(m.closed(CLOSE_ABNORMAL), CloseDecision::Retry { delay, .. } if delay == Duration::from_millis(100)));
        assert_eq!(m.closed(CLOSE_ABNORMAL), CloseDecision::Stop);
    }
}
