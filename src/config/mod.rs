//! # Check Configuration
//!
//! Thresholds, pool sizing and output flags for a check run.
//!
//! ## Layering
//!
//! [`ConfigManager`] builds a [`CheckConfig`] from an optional configuration file
//! followed by `NSCHECK_*` environment variables (nested keys joined with `__`,
//! e.g. `NSCHECK_THRESHOLDS__TOTAL__WARNING`); the command line then
//! overrides individual fields. Size limits accept either a byte count or a
//! suffixed string such as `"10g"`.
//!
//! ```rust
//! use namespace_check::config::{CheckConfig, SizeTier};
//!
//! let mut config = CheckConfig::default();
//! config.thresholds.total = SizeTier::new(1024, 4096);
//! assert!(config.validate().is_ok());
//! ```

pub mod error;
pub mod loader;
pub mod size;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;
pub use size::decode_bytes;

use size::deserialize_optional_size;

/// One week; longer waits are treated as a configuration mistake
const MAX_TIMEOUT_SECONDS: f64 = 7.0 * 24.0 * 3600.0;

/// Complete configuration for one check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Name printed at the start of the summary line
    pub name: String,
    /// Time each collection wave may take before the run is abandoned
    pub timeout_seconds: Option<f64>,
    pub thresholds: Thresholds,
    /// Worker threads in the measurement pool
    pub threads: usize,
    /// Print a line for every resource at WARNING or CRITICAL
    pub verbose: bool,
    /// With `verbose`, also print per sub-structure efficiency
    pub breakdown: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            name: defaults::CHECK_NAME.to_string(),
            timeout_seconds: Some(defaults::TIMEOUT_SECONDS),
            thresholds: Thresholds::default(),
            threads: defaults::WORKER_THREADS,
            verbose: false,
            breakdown: false,
        }
    }
}

impl CheckConfig {
    /// Reject configurations that must not start a run
    pub fn validate(&self) -> ConfigResult<()> {
        if self.threads == 0 {
            return Err(ConfigurationError::invalid_value(
                "threads",
                self.threads,
                "at least one worker thread is required",
            ));
        }

        if let Some(timeout) = self.timeout_seconds {
            if !timeout.is_finite() || timeout <= 0.0 {
                return Err(ConfigurationError::invalid_value(
                    "timeout_seconds",
                    timeout,
                    "timeout must be a positive number of seconds",
                ));
            }
            if timeout > MAX_TIMEOUT_SECONDS {
                return Err(ConfigurationError::invalid_value(
                    "timeout_seconds",
                    timeout,
                    format!("timeout must not exceed {MAX_TIMEOUT_SECONDS} seconds"),
                ));
            }
        }

        self.thresholds.validate()
    }

    /// Collection deadline for each wave; `None` when unset or not representable
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    }
}

/// The three threshold tiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Always evaluated; must be fully configured
    pub total: SizeTier,
    /// Evaluated only for resources that are not partitioned
    pub unsharded: SizeTier,
    /// Evaluated only for resources at or above `efficiency.min_data_size`
    pub efficiency: EfficiencyTier,
}

impl Thresholds {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.total.warning.is_none() {
            return Err(ConfigurationError::missing_required_field(
                "warning",
                "thresholds.total",
            ));
        }
        if self.total.critical.is_none() {
            return Err(ConfigurationError::missing_required_field(
                "critical",
                "thresholds.total",
            ));
        }

        for (field, value) in [
            ("thresholds.efficiency.warning", self.efficiency.warning),
            ("thresholds.efficiency.critical", self.efficiency.critical),
        ] {
            if let Some(percent) = value {
                if percent > 100 {
                    return Err(ConfigurationError::invalid_value(
                        field,
                        percent,
                        "efficiency limits are percentages between 0 and 100",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Absolute size limits in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeTier {
    #[serde(deserialize_with = "deserialize_optional_size")]
    pub warning: Option<u64>,
    #[serde(deserialize_with = "deserialize_optional_size")]
    pub critical: Option<u64>,
}

impl SizeTier {
    pub fn new(warning: u64, critical: u64) -> Self {
        Self {
            warning: Some(warning),
            critical: Some(critical),
        }
    }

    /// Both limits, when the tier is active
    pub fn limits(&self) -> Option<(u64, u64)> {
        self.warning.zip(self.critical)
    }

    pub fn is_active(&self) -> bool {
        self.limits().is_some()
    }
}

/// Efficiency limits in percent, gated by a minimum data size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyTier {
    pub warning: Option<u64>,
    pub critical: Option<u64>,
    /// Resources holding less data than this are never judged on efficiency
    #[serde(deserialize_with = "deserialize_optional_size")]
    pub min_data_size: Option<u64>,
}

impl EfficiencyTier {
    pub fn new(warning: u64, critical: u64, min_data_size: u64) -> Self {
        Self {
            warning: Some(warning),
            critical: Some(critical),
            min_data_size: Some(min_data_size),
        }
    }

    pub fn limits(&self) -> Option<(u64, u64)> {
        self.warning.zip(self.critical)
    }

    pub fn is_active(&self) -> bool {
        self.limits().is_some()
    }

    /// Data size floor; an unset floor gates nothing
    pub fn floor(&self) -> u64 {
        self.min_data_size.unwrap_or(0)
    }
}
