//! Profiler configuration
//!
//! Defaults, then an optional TOML file, then `LAPSTAT_*` environment
//! variables on top:
//!
//! | variable          | effect                                  |
//! |-------------------|-----------------------------------------|
//! | `LAPSTAT_PROFILE` | `0` disables recording, `1` enables it  |
//! | `LAPSTAT_POLICY`  | `sliding` or `batch-replay`             |
//! | `LAPSTAT_FORMAT`  | `text`, `json` or `csv`                 |
//! | `LAPSTAT_LOG_DIR` | directory for saved reports             |

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collector::PairingPolicy;
use crate::report::OutputFormat;

pub const ENV_PROFILE: &str = "LAPSTAT_PROFILE";
pub const ENV_POLICY: &str = "LAPSTAT_POLICY";
pub const ENV_FORMAT: &str = "LAPSTAT_FORMAT";
pub const ENV_LOG_DIR: &str = "LAPSTAT_LOG_DIR";

/// Errors for configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {var}: expected {expected}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// How a profiling session collects and where it reports
///
/// # Example
/// ```
/// use lapstat::config::ProfilerConfig;
/// use lapstat::collector::PairingPolicy;
///
/// let config = ProfilerConfig::from_toml_str("policy = \"batch-replay\"").unwrap();
/// assert!(config.enabled);
/// assert_eq!(config.policy, PairingPolicy::BatchReplay);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilerConfig {
    /// Record checkpoints at all. When false every record is a no-op.
    pub enabled: bool,

    /// Pairing policy of the collector
    pub policy: PairingPolicy,

    /// Format used by console and log-file sinks
    pub format: OutputFormat,

    /// Print the report to stderr on finalize
    pub console: bool,

    /// Save the report to a file on finalize, in the default directory unless
    /// `log_dir` is set
    pub persist: bool,

    /// Directory for saved reports; setting it turns on saving by itself
    pub log_dir: Option<PathBuf>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: PairingPolicy::Sliding,
            format: OutputFormat::Text,
            console: true,
            persist: false,
            log_dir: None,
        }
    }
}

impl ProfilerConfig {
    /// Silent configuration: no console output, no files
    pub fn quiet() -> Self {
        Self {
            console: false,
            ..Self::default()
        }
    }

    /// Whether finalize saves the report to a file
    pub fn saves_reports(&self) -> bool {
        self.persist || self.log_dir.is_some()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults with the environment applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    /// Apply `LAPSTAT_*` variables on top of `self`
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|var| std::env::var(var).ok())
    }

    fn with_vars(mut self, lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(ENV_PROFILE) {
            let parsed = match value.trim() {
                "1" | "true" | "on" => Some(true),
                "0" | "false" | "off" => Some(false),
                _ => None,
            };
            self.enabled = parsed.ok_or_else(|| invalid(ENV_PROFILE, value, "0 or 1"))?;
        }

        if let Some(value) = lookup(ENV_POLICY) {
            let parsed = match value.trim() {
                "sliding" => Some(PairingPolicy::Sliding),
                "batch" | "batch-replay" => Some(PairingPolicy::BatchReplay),
                _ => None,
            };
            self.policy =
                parsed.ok_or_else(|| invalid(ENV_POLICY, value, "sliding or batch-replay"))?;
        }

        if let Some(value) = lookup(ENV_FORMAT) {
            let parsed = match value.trim() {
                "text" => Some(OutputFormat::Text),
                "json" => Some(OutputFormat::Json),
                "csv" => Some(OutputFormat::Csv),
                _ => None,
            };
            self.format = parsed.ok_or_else(|| invalid(ENV_FORMAT, value, "text, json or csv"))?;
        }

        if let Some(value) = lookup(ENV_LOG_DIR).filter(|v| !v.is_empty()) {
            self.log_dir = Some(PathBuf::from(value));
            self.persist = true;
        }

        Ok(self)
    }
}

fn invalid(var: &'static str, value: String, expected: &'static str) -> ConfigError {
    ConfigError::InvalidEnv {
        var,
        value,
        expected,
    }
}
