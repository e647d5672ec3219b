//! Fetch engine configuration.
//!
//! [`FetchConfig`] is embedded in the application's TOML config under the
//! `[fetch]` table. Every field defaults sensibly so an empty table is valid.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default share of logical cores used by the static-partition strategy.
pub const DEFAULT_PARTITION_CORE_RATIO: f64 = 0.75;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How jobs are handed out to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Shared queue; workers compete for the next item.
    #[default]
    StreamingQueue,
    /// Contiguous slice per worker, fixed up front.
    StaticPartition,
}

impl Strategy {
    /// Canonical kebab-case name, as used in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::StreamingQueue => "streaming-queue",
            Strategy::StaticPartition => "static-partition",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "streaming-queue" | "streaming" | "queue" => Ok(Strategy::StreamingQueue),
            "static-partition" | "static" | "partition" => Ok(Strategy::StaticPartition),
            other => Err(format!(
                "unknown strategy '{other}' (expected streaming-queue or static-partition)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// FetchConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for a fetch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Dispatch strategy used when the caller does not pick one.
    pub strategy: Strategy,
    /// Fixed worker count. Overrides the core-count policy when set.
    pub workers: Option<usize>,
    /// Share of logical cores used by [`Strategy::StaticPartition`] when
    /// `workers` is unset. Leaves headroom for the presentation layer.
    #[serde(default = "default_partition_core_ratio")]
    pub partition_core_ratio: f64,
    /// Capacity of the streaming queue. Defaults to the item count, which
    /// lets the whole run be enqueued up front.
    pub queue_capacity: Option<usize>,
    /// Per-call deadline for a single provider lookup, in seconds.
    ///
    /// Unset means no deadline: a hung lookup stalls its worker for as long
    /// as it hangs. When set, an expired lookup is recorded as empty as soon
    /// as the deadline passes. The underlying call is not interrupted, and
    /// its worker takes no new job until it returns, so a run never has more
    /// provider calls in flight than workers.
    pub call_timeout_secs: Option<u64>,
}

fn default_partition_core_ratio() -> f64 {
    DEFAULT_PARTITION_CORE_RATIO
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            workers: None,
            partition_core_ratio: default_partition_core_ratio(),
            queue_capacity: None,
            call_timeout_secs: None,
        }
    }
}

impl FetchConfig {
    /// Resolve the number of workers for `strategy` given `cores` logical
    /// cores. Never returns zero.
    pub fn worker_count(&self, strategy: Strategy, cores: usize) -> usize {
        if let Some(n) = self.workers {
            return n.max(1);
        }

        let cores = cores.max(1);
        match strategy {
            Strategy::StreamingQueue => cores,
            Strategy::StaticPartition => {
                let scaled = (cores as f64 * self.partition_core_ratio).round() as usize;
                scaled.max(1)
            }
        }
    }

    /// The per-call deadline, if one is configured.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(Error::Validation("fetch.workers must be at least 1".into()));
        }
        if !(self.partition_core_ratio > 0.0 && self.partition_core_ratio <= 1.0) {
            return Err(Error::Validation(format!(
                "fetch.partition_core_ratio must be in (0, 1], got {}",
                self.partition_core_ratio
            )));
        }
        if self.queue_capacity == Some(0) {
            return Err(Error::Validation(
                "fetch.queue_capacity must be at least 1".into(),
            ));
        }
        if self.call_timeout_secs == Some(0) {
            return Err(Error::Validation(
                "fetch.call_timeout_secs must be at least 1; omit it to disable the deadline"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Return a list of non-fatal issues.
    pub fn warnings(&self, cores: usize) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(n) = self.workers {
            if n > cores.max(1) * 8 {
                warnings.push(format!(
                    "fetch.workers = {n} is far above the {cores} available cores"
                ));
            }
        }

        if self.strategy == Strategy::StaticPartition && self.queue_capacity.is_some() {
            warnings.push(
                "fetch.queue_capacity has no effect with the static-partition strategy".into(),
            );
        }

        if self.call_timeout_secs.is_some() {
            warnings.push(
                "fetch.call_timeout_secs records expired lookups early but cannot stop them".into(),
            );
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = FetchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.strategy, Strategy::StreamingQueue);
        assert_eq!(cfg.call_timeout(), None);
    }

    #[test]
    fn streaming_uses_all_cores() {
        let cfg = FetchConfig::default();
        assert_eq!(cfg.worker_count(Strategy::StreamingQueue, 8), 8);
        assert_eq!(cfg.worker_count(Strategy::StreamingQueue, 0), 1);
    }

    #[test]
    fn partition_uses_rounded_ratio() {
        let cfg = FetchConfig::default();
        assert_eq!(cfg.worker_count(Strategy::StaticPartition, 8), 6);
        // 6 * 0.75 = 4.5 rounds away from zero.
        assert_eq!(cfg.worker_count(Strategy::StaticPartition, 6), 5);
        assert_eq!(cfg.worker_count(Strategy::StaticPartition, 1), 1);
    }

    #[test]
    fn explicit_workers_override_policy() {
        let cfg = FetchConfig {
            workers: Some(3),
            ..FetchConfig::default()
        };
        assert_eq!(cfg.worker_count(Strategy::StreamingQueue, 16), 3);
        assert_eq!(cfg.worker_count(Strategy::StaticPartition, 16), 3);
    }

    #[test]
    fn zero_workers_rejected() {
        let cfg = FetchConfig {
            workers: Some(0),
            ..FetchConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn ratio_out_of_range_rejected() {
        for ratio in [0.0, -0.5, 1.5, f64::NAN] {
            let cfg = FetchConfig {
                partition_core_ratio: ratio,
                ..FetchConfig::default()
            };
            assert!(cfg.validate().is_err(), "ratio {ratio} should be rejected");
        }
    }

    #[test]
    fn zero_timeout_rejected() {
        let cfg = FetchConfig {
            call_timeout_secs: Some(0),
            ..FetchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn queue_capacity_with_partition_warns() {
        let cfg = FetchConfig {
            strategy: Strategy::StaticPartition,
            queue_capacity: Some(16),
            ..FetchConfig::default()
        };
        let warnings = cfg.warnings(4);
        assert!(warnings.iter().any(|w| w.contains("queue_capacity")));
    }

    #[test]
    fn strategy_from_str_aliases() {
        assert_eq!("streaming".parse::<Strategy>().unwrap(), Strategy::StreamingQueue);
        assert_eq!("Static-Partition".parse::<Strategy>().unwrap(), Strategy::StaticPartition);
        assert_eq!("partition".parse::<Strategy>().unwrap(), Strategy::StaticPartition);
        assert!("round-robin".parse::<Strategy>().is_err());
    }

    #[test]
    fn parse_toml_table() {
        let cfg: FetchConfig = toml::from_str(
            r#"
            strategy = "static-partition"
            workers = 2
            call_timeout_secs = 15
            "#,
        )
        .unwrap();
        assert_eq!(cfg.strategy, Strategy::StaticPartition);
        assert_eq!(cfg.workers, Some(2));
        assert_eq!(cfg.call_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(cfg.partition_core_ratio, DEFAULT_PARTITION_CORE_RATIO);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg: FetchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, FetchConfig::default());
    }
}
