//! Pipeline configuration.
//!
//! Loads configuration from environment variables with sensible defaults;
//! the defaults reproduce the classic demo run (1000 operations, 10
//! in-flight per lane).

use ledgerflow_core::Money;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Half-open dollar range an operand amount is drawn from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountRange {
    /// Inclusive lower bound.
    pub min: Money,
    /// Exclusive upper bound.
    pub max: Money,
}

impl AmountRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: Money, max: Money) -> Self {
        Self { min, max }
    }

    /// Draws a uniformly random amount from the range.
    ///
    /// A degenerate range (`min >= max`) always yields `min`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Money {
        if self.min >= self.max {
            return self.min;
        }
        Money::from_cents(rng.gen_range(self.min.cents()..self.max.cents()))
    }
}

/// Pipeline and worker-pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker threads for the runtime (minimum pool size).
    pub worker_threads: usize,
    /// Cap on additional blocking threads (maximum pool size).
    pub max_blocking_threads: usize,
    /// Maximum concurrently in-flight operations per lane.
    pub lane_parallelism: usize,
    /// Triggers broadcast to every lane per run.
    pub total_operations: usize,
    /// Deposit amount bounds.
    pub deposit: AmountRange,
    /// Withdrawal amount bounds.
    pub withdraw: AmountRange,
    /// Transfer amount bounds.
    pub transfer: AmountRange,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 8,
            max_blocking_threads: 1000,
            lane_parallelism: 10,
            total_operations: 1000,
            deposit: AmountRange::new(Money::from_dollars(100), Money::from_dollars(1000)),
            withdraw: AmountRange::new(Money::from_dollars(200), Money::from_dollars(500)),
            transfer: AmountRange::new(Money::from_dollars(500), Money::from_dollars(700)),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from `LEDGERFLOW_*` environment variables,
    /// falling back to the defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            worker_threads: env_parse("LEDGERFLOW_WORKER_THREADS", defaults.worker_threads),
            max_blocking_threads: env_parse(
                "LEDGERFLOW_MAX_BLOCKING_THREADS",
                defaults.max_blocking_threads,
            ),
            lane_parallelism: env_parse("LEDGERFLOW_LANE_PARALLELISM", defaults.lane_parallelism),
            total_operations: env_parse("LEDGERFLOW_TOTAL_OPERATIONS", defaults.total_operations),
            deposit: env_range("LEDGERFLOW_DEPOSIT", &defaults.deposit),
            withdraw: env_range("LEDGERFLOW_WITHDRAW", &defaults.withdraw),
            transfer: env_range("LEDGERFLOW_TRANSFER", &defaults.transfer),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Reads `{prefix}_MIN_DOLLARS` / `{prefix}_MAX_DOLLARS`.
fn env_range(prefix: &str, default: &AmountRange) -> AmountRange {
    let min = env::var(format!("{prefix}_MIN_DOLLARS"))
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .map_or(default.min, Money::from_dollars);
    let max = env::var(format!("{prefix}_MAX_DOLLARS"))
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .map_or(default.max, Money::from_dollars);
    AmountRange::new(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn defaults_match_the_classic_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.total_operations, 1000);
        assert_eq!(config.lane_parallelism, 10);
        assert_eq!(config.deposit.min, Money::from_dollars(100));
        assert_eq!(config.transfer.max, Money::from_dollars(700));
    }

    #[test]
    fn sample_stays_in_bounds() {
        let range = AmountRange::new(Money::from_dollars(200), Money::from_dollars(500));
        let mut rng = thread_rng();
        for _ in 0..100 {
            let amount = range.sample(&mut rng);
            assert!(amount >= range.min);
            assert!(amount < range.max);
        }
    }

    #[test]
    fn degenerate_range_yields_the_minimum() {
        let range = AmountRange::new(Money::from_dollars(5), Money::from_dollars(5));
        let mut rng = thread_rng();
        assert_eq!(range.sample(&mut rng), Money::from_dollars(5));
    }
}
