// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for Corsair.
//!
//! Provides [`CorsairConfig`] — the top-level runtime settings — together
//! with helpers for loading from TOML files, applying environment variable
//! overrides, and producing advisory [`ConfigWarning`]s.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A deprecated field was used in the configuration.
    DeprecatedField {
        /// Name of the deprecated field.
        field: String,
        /// Suggested replacement, if any.
        suggestion: Option<String>,
    },
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// The configured freshness window is unusually large.
    LargeFreshnessWindow {
        /// Configured number of days.
        days: u32,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeprecatedField { field, suggestion } => {
                write!(f, "deprecated field '{field}'")?;
                if let Some(s) = suggestion {
                    write!(f, " — use '{s}' instead")?;
                }
                Ok(())
            }
            Self::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            Self::LargeFreshnessWindow { days } => {
                write!(f, "freshness window is unusually large ({days} days)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level runtime configuration for Corsair.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct CorsairConfig {
    /// Base URL of the CORSAIR API server, if running in service mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Directories to scan for mapping pack files, in priority order.
    #[serde(default)]
    pub mapping_dirs: Vec<String>,

    /// Individual mapping pack files loaded in addition to `mapping_dirs`.
    #[serde(default)]
    pub mapping_files: Vec<String>,

    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Directory holding Ed25519 signing keys. Defaults to `~/.corsair/keys/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_dir: Option<String>,

    /// Minimum freshness window, in days, used by the assurance calculator
    /// when bucketing observation periods.
    #[serde(default = "default_freshness_days")]
    pub freshness_days: u32,

    /// AWS region passed through to evidence collectors. Read-only: the
    /// collector implementation itself is out of scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,

    /// Connection string for webhook/event persistence. Read-only: the
    /// storage backend itself is out of scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

impl Default for CorsairConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            mapping_dirs: Vec::new(),
            mapping_files: Vec::new(),
            log_level: Some("info".into()),
            key_dir: None,
            freshness_days: default_freshness_days(),
            aws_region: None,
            database_url: None,
        }
    }
}

fn default_freshness_days() -> u32 {
    90
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Threshold above which the freshness window generates a warning.
const LARGE_FRESHNESS_THRESHOLD_DAYS: u32 = 3_650;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`CorsairConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`CorsairConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if `path` is given but unreadable,
/// or [`ConfigError::ParseError`] if the contents are not valid TOML.
pub fn load_config(path: Option<&Path>) -> Result<CorsairConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => CorsairConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`CorsairConfig`].
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] if `content` is not valid TOML or
/// does not match the config schema.
pub fn parse_toml(content: &str) -> Result<CorsairConfig, ConfigError> {
    toml::from_str::<CorsairConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `CORSAIR_API_URL`
/// - `CORSAIR_MAPPING_DIR` (comma-separated, appended to `mapping_dirs`)
/// - `CORSAIR_MAPPING_FILE` (comma-separated, appended to `mapping_files`)
/// - `DATABASE_URL`
/// - `AWS_REGION`
pub fn apply_env_overrides(config: &mut CorsairConfig) {
    if let Ok(val) = std::env::var("CORSAIR_API_URL") {
        config.api_url = Some(val);
    }
    if let Ok(val) = std::env::var("CORSAIR_MAPPING_DIR") {
        config
            .mapping_dirs
            .extend(val.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from));
    }
    if let Ok(val) = std::env::var("CORSAIR_MAPPING_FILE") {
        config
            .mapping_files
            .extend(val.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from));
    }
    if let Ok(val) = std::env::var("DATABASE_URL") {
        config.database_url = Some(val);
    }
    if let Ok(val) = std::env::var("AWS_REGION") {
        config.aws_region = Some(val);
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (invalid log levels) are returned as a
/// [`ConfigError::ValidationError`]; soft issues come back as warnings.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] if any hard constraint is
/// violated.
pub fn validate_config(config: &CorsairConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level
        && !VALID_LOG_LEVELS.contains(&level.as_str())
    {
        errors.push(format!("invalid log_level '{level}'"));
    }

    if config.key_dir.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "key_dir".into(),
            hint: "defaults to ~/.corsair/keys/ when unset".into(),
        });
    }

    if config.freshness_days > LARGE_FRESHNESS_THRESHOLD_DAYS {
        warnings.push(ConfigWarning::LargeFreshnessWindow {
            days: config.freshness_days,
        });
    }

    if !errors.is_empty() {
        return Err(ConfigError::ValidationError { reasons: errors });
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_info_log_level() {
        let c = CorsairConfig::default();
        assert_eq!(c.log_level.as_deref(), Some("info"));
        assert_eq!(c.freshness_days, 90);
    }

    #[test]
    fn env_overrides_apply_on_top_of_defaults() {
        std::env::set_var("CORSAIR_API_URL", "https://corsair.example/api");
        std::env::set_var("CORSAIR_MAPPING_DIR", "a, b ,");
        let mut c = CorsairConfig::default();
        apply_env_overrides(&mut c);
        assert_eq!(c.api_url.as_deref(), Some("https://corsair.example/api"));
        assert_eq!(c.mapping_dirs, vec!["a".to_string(), "b".to_string()]);
        std::env::remove_var("CORSAIR_API_URL");
        std::env::remove_var("CORSAIR_MAPPING_DIR");
    }

    #[test]
    fn invalid_log_level_is_hard_error() {
        let mut c = CorsairConfig::default();
        c.log_level = Some("verbose".into());
        assert!(matches!(
            validate_config(&c),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn missing_key_dir_warns_not_errors() {
        let c = CorsairConfig::default();
        let warnings = validate_config(&c).unwrap();
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ConfigWarning::MissingOptionalField { field, .. } if field == "key_dir")));
    }

    #[test]
    fn load_missing_file_errors() {
        let path = std::path::Path::new("/nonexistent/corsair.toml");
        assert!(matches!(
            load_config(Some(path)),
            Err(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn load_from_real_tempfile_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corsair.toml");
        std::fs::write(&path, "log_level = \"debug\"\nfreshness_days = 120\n").unwrap();
        let c = load_config(Some(&path)).unwrap();
        assert_eq!(c.log_level.as_deref(), Some("debug"));
        assert_eq!(c.freshness_days, 120);
    }
}
