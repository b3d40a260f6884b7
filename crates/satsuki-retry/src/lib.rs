//! Retry policy for release asset uploads.
//!
//! GitHub cannot replace an asset in place, and upload requests regularly
//! fail in ways that leave the outcome unknown. The upload loop therefore
//! needs a bounded number of attempts, a pause between them, and a way to
//! tell "try again" apart from "go and look first". Those pieces live here,
//! independent of any HTTP client:
//!
//! - [`RetryStrategyConfig`]: attempt limit and pause shape
//! - [`pause_after`]: the pause following a failed attempt
//! - [`ErrorClass`]: how a failure should be handled
//! - [`Sleeper`]: the wait itself, injectable so the loop runs instantly in tests
//!
//! # Example
//!
//! ```
//! use satsuki_retry::{RetryStrategyConfig, pause_after};
//! use std::time::Duration;
//!
//! let policy = RetryStrategyConfig::default();
//! assert_eq!(policy.max_attempts, 3);
//! assert_eq!(pause_after(&policy, 1), Duration::from_secs(30));
//! assert_eq!(pause_after(&policy, 2), Duration::from_secs(60));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause unit; the linear schedule multiplies it by the failed attempt number.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(30);

pub const DEFAULT_MAX_PAUSE: Duration = Duration::from_secs(300);

/// Shape of the pause schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseStrategy {
    /// Retry straight away.
    Immediate,
    /// `pause * n` after the n-th failure.
    #[default]
    Linear,
    /// `pause` after every failure.
    Constant,
    /// `pause * 2^(n-1)` after the n-th failure.
    Exponential,
}

/// Upload retry policy, the `[retry]` table of `.satsuki.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryStrategyConfig {
    pub strategy: PauseStrategy,
    /// Attempts per file, including the first one.
    pub max_attempts: u32,
    #[serde(with = "humantime_serde", alias = "base_delay")]
    pub pause: Duration,
    /// Ceiling applied before jitter.
    #[serde(with = "humantime_serde", alias = "max_delay")]
    pub max_pause: Duration,
    /// Fraction of the pause to randomise by, from 0.0 to 1.0.
    pub jitter: f64,
}

impl Default for RetryStrategyConfig {
    fn default() -> Self {
        Self {
            strategy: PauseStrategy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pause: DEFAULT_PAUSE,
            max_pause: DEFAULT_MAX_PAUSE,
            jitter: 0.0,
        }
    }
}

/// How the upload loop treats a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Nothing landed; pause and try again.
    #[default]
    Retryable,
    /// The request may have succeeded; check the remote state before retrying.
    Ambiguous,
    /// Trying again cannot help.
    Permanent,
}

/// Pause to take after attempt number `failed` (1-based) went wrong.
///
/// ```
/// use satsuki_retry::{PauseStrategy, RetryStrategyConfig, pause_after};
/// use std::time::Duration;
///
/// let policy = RetryStrategyConfig {
///     strategy: PauseStrategy::Exponential,
///     pause: Duration::from_secs(1),
///     ..RetryStrategyConfig::default()
/// };
/// assert_eq!(pause_after(&policy, 3), Duration::from_secs(4));
/// ```
pub fn pause_after(policy: &RetryStrategyConfig, failed: u32) -> Duration {
    let raw = match policy.strategy {
        PauseStrategy::Immediate => return Duration::ZERO,
        PauseStrategy::Constant => policy.pause,
        PauseStrategy::Linear => policy.pause.saturating_mul(failed),
        PauseStrategy::Exponential => {
            let doublings = failed.saturating_sub(1).min(16);
            policy.pause.saturating_mul(1 << doublings)
        }
    };

    jittered(raw.min(policy.max_pause), policy.jitter)
}

/// Spread `pause` uniformly over `pause * (1 ± jitter)`.
fn jittered(pause: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 || pause.is_zero() {
        return pause;
    }
    let factor = 1.0 + jitter * (2.0 * rand::random::<f64>() - 1.0);
    pause.mul_f64(factor.max(0.0))
}

/// Waits between attempts.
pub trait Sleeper {
    fn sleep(&mut self, pause: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, pause: Duration) {
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
    }
}

/// Remembers every requested pause and returns at once.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    pub pauses: Vec<Duration>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, pause: Duration) {
        self.pauses.push(pause);
    }
}
