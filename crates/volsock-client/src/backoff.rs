use std::time::Duration;

use volsock_config::ReconnectConfig;

/// Delay before the next reconnect attempt.
///
/// Reset to zero whenever a connection opens. Each close schedules a retry
/// after the current delay (or `floor` while it is zero) and then grows the
/// delay by `increment`, never past `cap`.
#[derive(Debug, Clone)]
pub struct RetryDelay {
    current: Duration,
    floor: Duration,
    increment: Duration,
    cap: Duration,
}

impl RetryDelay {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            current: config.initial(),
            floor: config.floor(),
            increment: config.increment(),
            cap: config.cap(),
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = Duration::ZERO;
    }

    /// Delay for the retry being scheduled now. Grows the delay for the one after.
    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.current.is_zero() {
            self.floor
        } else {
            self.current
        };
        if self.current < self.cap {
            self.current = (self.current + self.increment).min(self.cap);
        }
        delay
    }
}
