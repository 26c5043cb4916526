use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconciliation timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Seconds between reconciliation cycles.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Minimum seconds between two restarts of the managed process.
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            cooldown_secs: default_cooldown(),
        }
    }
}

fn default_interval() -> u64 {
    60
}

fn default_cooldown() -> u64 {
    180 // 3 minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_watch_config() {
        let config = WatchConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.cooldown(), Duration::from_secs(180));
    }

    #[test]
    fn test_parse_watch_config() {
        let config: WatchConfig = toml::from_str("interval_secs = 15").unwrap();
        assert_eq!(config.interval_secs, 15);
        assert_eq!(config.cooldown_secs, 180);
    }
}
