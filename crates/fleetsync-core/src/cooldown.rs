use std::time::Duration;

use crate::clock::Timestamp;

/// Minimum spacing between two accepted reconfigurations.
#[derive(Debug, Clone, Copy)]
pub struct CooldownGate {
    interval: chrono::Duration,
}

impl CooldownGate {
    /// Create a gate with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Get the interval as a std duration.
    pub fn interval(&self) -> Duration {
        self.interval.to_std().unwrap_or(Duration::MAX)
    }

    /// Earliest time the next action is allowed.
    pub fn reopens_at(&self, last_action: Timestamp) -> Timestamp {
        last_action
            .checked_add_signed(self.interval)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }

    /// Check whether an action is allowed at `now`.
    ///
    /// With no recorded action the gate is open.
    pub fn permits(&self, last_action: Option<Timestamp>, now: Timestamp) -> bool {
        match last_action {
            Some(last) => now >= self.reopens_at(last),
            None => true,
        }
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(180))
    }
}
