/// Counts consecutive failures of a recurring operation.
///
/// Retries always happen on the fixed poll interval; the count only feeds
/// logging so an operator can tell a blip from a refresh token that has
/// stopped working.
#[derive(Debug, Clone, Default)]
pub struct FailureTracker {
    consecutive_failures: u32,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self {
            consecutive_failures: 0,
        }
    }

    /// Resets the counter, returning how many failures preceded this success.
    pub fn record_success(&mut self) -> u32 {
        std::mem::take(&mut self.consecutive_failures)
    }

    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
