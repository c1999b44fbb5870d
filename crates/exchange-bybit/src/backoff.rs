//! Exponential reconnect backoff.

use std::time::Duration;

const MIN_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Exponential backoff: starts at 1s, doubles per failure, capped at 60s.
/// Reset whenever a connection reaches the subscribed state.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { current: MIN_DELAY }
    }
}

impl Backoff {
    /// Creates a backoff at its minimum delay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the delay to sleep before the next attempt and doubles the
    /// stored delay, capped at the maximum.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_DELAY);
        delay
    }

    /// Resets to the minimum delay.
    pub fn reset(&mut self) {
        self.current = MIN_DELAY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_consecutive_failures() {
        let mut backoff = Backoff::new();

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_caps_at_sixty_seconds() {
        let mut backoff = Backoff::new();

        let mut last = Duration::ZERO;
        for _ in 0..10 {
            last = backoff.next_delay();
        }

        assert_eq!(last, Duration::from_secs(60));
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    }

    #[test]
    fn test_reset_returns_to_minimum() {
        let mut backoff = Backoff::new();

        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }
}
