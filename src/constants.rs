//! # System Constants
//!
//! Verdicts, exit codes and configuration defaults shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monitoring verdict for a single resource or for a whole run.
///
/// Variants are ordered by severity so verdicts combine with `max`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    #[default]
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::Warning => "WARNING",
            Verdict::Critical => "CRITICAL",
            Verdict::Unknown => "UNKNOWN",
        }
    }

    /// Conventional monitoring plugin exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Ok => 0,
            Verdict::Warning => 1,
            Verdict::Critical => 2,
            Verdict::Unknown => 3,
        }
    }

    /// Check if this verdict needs operator attention
    pub fn is_problematic(&self) -> bool {
        !matches!(self, Verdict::Ok)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration defaults
pub mod defaults {
    pub const CHECK_NAME: &str = "MongoDB collection size";
    pub const TIMEOUT_SECONDS: f64 = 10.0;
    pub const WORKER_THREADS: usize = 20;
}

/// Environment variables read by the configuration and logging layers
pub mod env {
    pub const CONFIG_PREFIX: &str = "NSCHECK";
    pub const CONFIG_SEPARATOR: &str = "__";
    pub const ENVIRONMENT: &str = "NSCHECK_ENV";
    pub const LOG_FILTER: &str = "NSCHECK_LOG";
    pub const LOG_FORMAT: &str = "NSCHECK_LOG_FORMAT";
}

/// Separator between a resource and one of its sub-structures in a
/// qualified namespace name, e.g. `orders.$_id_`
pub const SUB_STRUCTURE_SEPARATOR: &str = ".$";
