use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ElectionError;

/// Timing knobs for a single peer, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    pub election_timeout_min: u64,
    pub election_timeout_max: u64,
    pub heartbeat_interval: u64,
    /// Upper bound on a single receive wait, so timers are re-checked even when idle.
    pub receive_timeout: u64,
}

impl ElectionConfig {
    pub fn new(
        election_timeout_min: u64,
        election_timeout_max: u64,
        heartbeat_interval: u64,
    ) -> Self {
        Self {
            election_timeout_min,
            election_timeout_max,
            heartbeat_interval,
            ..Self::default()
        }
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }

    pub fn receive_wait(&self) -> Duration {
        Duration::from_millis(self.receive_timeout)
    }

    pub fn validate(&self) -> Result<(), ElectionError> {
        if self.election_timeout_min > self.election_timeout_max {
            return Err(ElectionError::InvalidConfig(format!(
                "election_timeout_min ({}) exceeds election_timeout_max ({})",
                self.election_timeout_min, self.election_timeout_max
            )));
        }
        if self.heartbeat_interval == 0 {
            return Err(ElectionError::InvalidConfig(
                "heartbeat_interval must be positive".to_string(),
            ));
        }
        // Followers would time out between heartbeats of a live leader.
        if self.heartbeat_interval >= self.election_timeout_min {
            return Err(ElectionError::InvalidConfig(format!(
                "heartbeat_interval ({}) must be shorter than election_timeout_min ({})",
                self.heartbeat_interval, self.election_timeout_min
            )));
        }
        if self.receive_timeout == 0 {
            return Err(ElectionError::InvalidConfig(
                "receive_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            election_timeout_min: 2000,
            election_timeout_max: 4000,
            heartbeat_interval: 1000,
            receive_timeout: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = ElectionConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.heartbeat_period(), Duration::from_millis(1000));
        assert_eq!(cfg.receive_wait(), Duration::from_millis(500));
    }

    #[test]
    fn heartbeat_must_be_shorter_than_min_timeout() {
        let cfg = ElectionConfig::new(200, 400, 200);
        match cfg.validate() {
            Err(ElectionError::InvalidConfig(msg)) => assert!(msg.contains("heartbeat_interval")),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn inverted_window_is_rejected() {
        let cfg = ElectionConfig::new(400, 200, 50);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_receive_timeout_is_rejected() {
        let cfg = ElectionConfig {
            receive_timeout: 0,
            ..ElectionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
