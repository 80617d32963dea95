//! Capped exponential backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

use crate::config::RetryConfig;

/// Delay to wait after failed attempt number `attempt` (1-based):
/// `min(initial * multiplier^(attempt-1), max)`, plus up to
/// `jitter_ratio` of that on top.
pub fn calculate_backoff(attempt: u32, policy: &RetryConfig) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let delay_ms = policy.initial_delay_ms as f64 * policy.backoff_multiplier.powi(exponent);
    let capped_delay = delay_ms.min(policy.max_delay_ms as f64).round() as u64;

    let jitter_range = (capped_delay as f64 * policy.jitter_ratio) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
