//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `gleaner-config.yaml`. This
//! module defines strongly-typed structs mirroring the YAML layout and
//! a loader that reads the file; every field has a sensible default so
//! a missing or partial file still yields a runnable configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level helper configuration.
///
/// Mirrors the structure of `gleaner-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GleanerConfig {
    /// Core helper settings (enablement, pacing, own identity).
    #[serde(default)]
    pub helper: HelperConfig,

    /// Quiet-hours window settings.
    #[serde(default)]
    pub quiet_hours: QuietHoursConfig,

    /// Per-action-family feature toggles.
    #[serde(default)]
    pub features: FeatureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GleanerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Core helper settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HelperConfig {
    /// Master switch; when false every pass is skipped.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Our own user id, needed for mischief idempotence checks.
    #[serde(default)]
    pub self_id: u64,

    /// Seconds between passes, measured from pass completion.
    #[serde(default = "default_pass_interval_secs")]
    pub pass_interval_secs: u64,

    /// Milliseconds slept between sequential remote calls.
    #[serde(default = "default_call_pause_ms")]
    pub call_pause_ms: u64,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            self_id: 0,
            pass_interval_secs: default_pass_interval_secs(),
            call_pause_ms: default_call_pause_ms(),
        }
    }
}

/// Quiet-hours window settings. Bounds are `HH:MM` strings; malformed
/// bounds disable the gate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuietHoursConfig {
    /// Whether the quiet-hours gate is active at all.
    #[serde(default)]
    pub enabled: bool,

    /// Window start, inclusive.
    #[serde(default = "default_quiet_start")]
    pub start: String,

    /// Window end, exclusive.
    #[serde(default = "default_quiet_end")]
    pub end: String,
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: default_quiet_start(),
            end: default_quiet_end(),
        }
    }
}

/// Per-action-family feature toggles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeatureConfig {
    /// Whether help actions (weed, insecticide, water) run.
    #[serde(default = "default_true")]
    pub help_enabled: bool,

    /// Whether steal actions run.
    #[serde(default = "default_true")]
    pub steal_enabled: bool,

    /// Whether mischief actions run.
    #[serde(default)]
    pub mischief_enabled: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            help_enabled: true,
            steal_enabled: true,
            mischief_enabled: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Runtime feature toggles derived from [`FeatureConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Help actions enabled.
    pub help: bool,
    /// Steal actions enabled.
    pub steal: bool,
    /// Mischief actions enabled.
    pub mischief: bool,
}

impl Features {
    /// Derive runtime toggles from configuration.
    pub const fn from_config(config: &FeatureConfig) -> Self {
        Self {
            help: config.help_enabled,
            steal: config.steal_enabled,
            mischief: config.mischief_enabled,
        }
    }

    /// All families enabled (test convenience).
    pub const fn all_enabled() -> Self {
        Self {
            help: true,
            steal: true,
            mischief: true,
        }
    }
}

/// Pacing durations derived from [`HelperConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between sequential remote calls.
    pub call_pause: Duration,
    /// Wait between passes, measured from pass completion.
    pub pass_interval: Duration,
}

impl Pacing {
    /// Derive pacing from configuration.
    pub const fn from_config(config: &HelperConfig) -> Self {
        Self {
            call_pause: Duration::from_millis(config.call_pause_ms),
            pass_interval: Duration::from_secs(config.pass_interval_secs),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_pass_interval_secs() -> u64 {
    600
}

fn default_call_pause_ms() -> u64 {
    500
}

fn default_quiet_start() -> String {
    String::from("23:00")
}

fn default_quiet_end() -> String {
    String::from("07:00")
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = GleanerConfig::parse("{}").unwrap();
        assert_eq!(config, GleanerConfig::default());
        assert!(config.helper.enabled);
        assert_eq!(config.helper.pass_interval_secs, 600);
        assert!(!config.features.mischief_enabled);
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = r"
helper:
  self_id: 1001
  call_pause_ms: 250
features:
  mischief_enabled: true
quiet_hours:
  enabled: true
  start: '22:00'
  end: '06:00'
";
        let config = GleanerConfig::parse(yaml).unwrap();
        assert_eq!(config.helper.self_id, 1001);
        assert_eq!(config.helper.call_pause_ms, 250);
        assert_eq!(config.helper.pass_interval_secs, 600);
        assert!(config.features.mischief_enabled);
        assert!(config.features.help_enabled);
        assert!(config.quiet_hours.enabled);
        assert_eq!(config.quiet_hours.start, "22:00");
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(GleanerConfig::parse("helper: [nonsense").is_err());
    }

    #[test]
    fn pacing_derivation() {
        let helper = HelperConfig {
            call_pause_ms: 300,
            pass_interval_secs: 60,
            ..HelperConfig::default()
        };
        let pacing = Pacing::from_config(&helper);
        assert_eq!(pacing.call_pause, Duration::from_millis(300));
        assert_eq!(pacing.pass_interval, Duration::from_secs(60));
    }

    #[test]
    fn features_derivation() {
        let features = Features::from_config(&FeatureConfig {
            help_enabled: false,
            steal_enabled: true,
            mischief_enabled: true,
        });
        assert!(!features.help);
        assert!(features.steal);
        assert!(features.mischief);
    }
}
