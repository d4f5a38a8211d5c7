use std::time::Duration;

/// Decides whether and when to retry after an unexpected close
///
/// `attempt` counts consecutive failures since the last successful open,
/// starting at 0.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before retry number `attempt`, or `None` to give up
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Exponential backoff reconnection strategy
///
/// Delays between reconnection attempts grow exponentially:
/// initial_delay * 2^attempt, capped at max_delay
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    /// `max_attempts: None` retries forever
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let factor = 2u64.checked_pow(attempt.min(63) as u32).unwrap_or(u64::MAX);
        let delay = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Some(Duration::from_millis(delay.min(self.max_delay.as_millis() as u64)))
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Fixed delay reconnection strategy
///
/// Always waits the same amount of time between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl Default for FixedDelay {
    /// Five attempts, five seconds apart
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Some(5))
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Never reconnect strategy
///
/// The client will not attempt to reconnect after disconnection
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }
}

/// Consecutive-failure counter driven by a [`ReconnectionStrategy`]
///
/// Reset to zero on every successful open. Each unexpected close asks the
/// strategy for a delay; once the strategy refuses, the tracker stays
/// exhausted until the next successful open.
pub struct ReconnectTracker {
    strategy: Box<dyn ReconnectionStrategy>,
    attempts: usize,
}

impl ReconnectTracker {
    pub fn new(strategy: Box<dyn ReconnectionStrategy>) -> Self {
        Self {
            strategy,
            attempts: 0,
        }
    }

    /// Number of retries scheduled since the last successful open
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Transport opened, the full retry budget is available again
    pub fn on_open(&mut self) {
        self.attempts = 0;
    }

    /// Connection dropped (or a dial failed) without an explicit close.
    ///
    /// Returns the delay before the next attempt and counts that attempt,
    /// or `None` when the budget is spent.
    pub fn on_unexpected_close(&mut self) -> Option<Duration> {
        let delay = self.strategy.next_delay(self.attempts)?;
        self.attempts += 1;
        Some(delay)
    }

    pub fn is_exhausted(&self) -> bool {
        !self.strategy.should_reconnect(self.attempts)
    }
}

impl std::fmt::Debug for ReconnectTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectTracker")
            .field("attempts", &self.attempts)
            .finish()
    }
}
