use rand::Rng;
use std::time::Duration;

/// Draws an election timeout uniformly from `[min_ms, max_ms]`.
pub fn random_election_timeout(min_ms: u64, max_ms: u64) -> Duration {
    let mut rng = rand::rng();
    let timeout_ms = rng.random_range(min_ms..=max_ms);
    Duration::from_millis(timeout_ms)
}
