//! Exponential backoff with jitter for receipt polling.

use rand::Rng;
use std::time::Duration;

/// Delay after poll number `attempt` (1-based) for exponential polling.
///
/// Doubles from `base_ms` per attempt, is capped at `max_ms`, then gets up to
/// 10% jitter so many waiters started together do not poll in lockstep.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
