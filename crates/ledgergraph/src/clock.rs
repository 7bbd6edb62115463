//! The clock seam: `Transaction::created_at` comes from here rather than
//! an inline `chrono::Utc::now()` call, so tests can hand `Db` a fixed
//! timestamp instead of asserting against wall-clock output.

use std::fmt;

/// Supplies the RFC3339 timestamp stamped onto each committed transaction.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_rfc3339(&self) -> String;
}

/// The default clock: the actual system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

/// A clock that always returns the same timestamp. Used by tests that
/// assert on `created_at`.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl FixedClock {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self(timestamp.into())
    }
}

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_always_returns_same_value() {
        let clock = FixedClock::new("2024-01-01T00:00:00Z");
        assert_eq!(clock.now_rfc3339(), "2024-01-01T00:00:00Z");
        assert_eq!(clock.now_rfc3339(), clock.now_rfc3339());
    }
}
