//! Configuration module for cloudmgr.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{ProjectLinkagePolicy, ProviderKind, DEFAULT_STALENESS_WINDOW_SECS};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for cloudmgr.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub project_linkage: ProjectLinkageConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub secrets: SecretsConfig,
    pub logging: LoggingConfig,
}

/// Sync eligibility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds after which a sync still marked in flight is reclaimable.
    pub staleness_window_secs: u64,
    /// Attempts of an optimistic registration update before giving up.
    pub max_update_retries: u32,
}

/// Implicit project linkage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLinkageConfig {
    /// Provider kinds whose registrations get a project of the same name.
    pub provider_kinds: Vec<String>,
}

/// Local database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Identity service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Base URL of the identity API. Project linkage is disabled when unset.
    pub endpoint: Option<String>,
    /// Token sent as `X-Auth-Token`.
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Secret store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// File holding the 256-bit master key; created on first use.
    pub key_file: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/cloudmgr/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }

    /// Staleness window as a duration.
    pub fn staleness_window(&self) -> chrono::Duration {
        let secs = i64::try_from(self.sync.staleness_window_secs).unwrap_or(i64::MAX);
        chrono::Duration::seconds(secs)
    }

    /// Builds the project linkage policy table.
    ///
    /// Unknown kinds are an error; run [`Config::validate`] first for a
    /// friendlier report.
    pub fn project_linkage_policy(&self) -> anyhow::Result<ProjectLinkagePolicy> {
        let kinds = self
            .project_linkage
            .provider_kinds
            .iter()
            .map(|kind| kind.parse::<ProviderKind>())
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid project_linkage.provider_kinds")?;
        Ok(ProjectLinkagePolicy::new(kinds))
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("cloudmgr")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            staleness_window_secs: DEFAULT_STALENESS_WINDOW_SECS as u64,
            max_update_retries: 3,
        }
    }
}

impl Default for ProjectLinkageConfig {
    fn default() -> Self {
        Self {
            provider_kinds: vec![ProviderKind::Azure.to_string()],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("cloudmgr");
        Self {
            path: data_dir.join("cloudmgr.db"),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            key_file: config_dir().join("master.key"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.staleness_window_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.staleness_window_secs == 0 {
            errors.push(ValidationError {
                field: "sync.staleness_window_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.max_update_retries == 0 {
            errors.push(ValidationError {
                field: "sync.max_update_retries".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- project_linkage ---
        for kind in &self.project_linkage.provider_kinds {
            if kind.parse::<ProviderKind>().is_err() {
                let valid: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.as_str()).collect();
                errors.push(ValidationError {
                    field: "project_linkage.provider_kinds".into(),
                    message: format!(
                        "unknown provider kind '{}'; valid options: {}",
                        kind,
                        valid.join(", ")
                    ),
                });
            }
        }

        // --- database ---
        if self.database.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "database.path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- identity ---
        if let Some(endpoint) = &self.identity.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(ValidationError {
                    field: "identity.endpoint".into(),
                    message: format!("must be an http(s) URL, got '{endpoint}'"),
                });
            }
        }
        if self.identity.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "identity.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- secrets ---
        if self.secrets.key_file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "secrets.key_file".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use cloudmgr_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .sync_staleness_window_secs(600)
///     .identity_endpoint("https://keystone.internal/v3")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_staleness_window_secs(mut self, seconds: u64) -> Self {
        self.config.sync.staleness_window_secs = seconds;
        self
    }

    pub fn sync_max_update_retries(mut self, n: u32) -> Self {
        self.config.sync.max_update_retries = n;
        self
    }

    // --- project_linkage ---

    pub fn project_linkage_provider_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.project_linkage.provider_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    // --- database ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    // --- identity ---

    pub fn identity_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.identity.endpoint = Some(endpoint.into());
        self
    }

    pub fn identity_token(mut self, token: impl Into<String>) -> Self {
        self.config.identity.token = Some(token.into());
        self
    }

    pub fn identity_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.identity.timeout_secs = seconds;
        self
    }

    // --- secrets ---

    pub fn secrets_key_file(mut self, path: PathBuf) -> Self {
        self.config.secrets.key_file = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.sync.staleness_window_secs, 900);
        assert_eq!(cfg.sync.max_update_retries, 3);
        assert_eq!(cfg.project_linkage.provider_kinds, vec!["Azure"]);
        assert!(cfg.database.path.to_string_lossy().ends_with("cloudmgr.db"));
        assert!(cfg.identity.endpoint.is_none());
        assert_eq!(cfg.identity.timeout_secs, 30);
        assert!(cfg.secrets.key_file.to_string_lossy().ends_with("master.key"));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn default_policy_links_azure_only() {
        let policy = Config::default().project_linkage_policy().unwrap();
        assert!(policy.requires_linkage(ProviderKind::Azure));
        assert!(!policy.requires_linkage(ProviderKind::Aws));
    }

    #[test]
    fn default_path_is_under_cloudmgr() {
        let path = Config::default_path();
        assert!(path.ends_with("cloudmgr/config.yaml"));
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
sync:
  staleness_window_secs: 600
  max_update_retries: 5
project_linkage:
  provider_kinds: [Azure, OpenStack]
database:
  path: /tmp/cloudmgr-test.db
identity:
  endpoint: https://keystone.internal/v3
  token: s3cret
  timeout_secs: 10
secrets:
  key_file: /tmp/master.key
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.sync.staleness_window_secs, 600);
        assert_eq!(cfg.staleness_window(), chrono::Duration::seconds(600));
        assert_eq!(cfg.sync.max_update_retries, 5);
        assert_eq!(cfg.database.path, PathBuf::from("/tmp/cloudmgr-test.db"));
        assert_eq!(
            cfg.identity.endpoint.as_deref(),
            Some("https://keystone.internal/v3")
        );
        assert_eq!(cfg.identity.token.as_deref(), Some("s3cret"));
        assert_eq!(cfg.secrets.key_file, PathBuf::from("/tmp/master.key"));
        assert_eq!(cfg.logging.level, "debug");

        let policy = cfg.project_linkage_policy().unwrap();
        assert!(policy.requires_linkage(ProviderKind::OpenStack));
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"logging:\n  level: warn\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.sync.staleness_window_secs, 900);
    }

    #[test]
    fn load_missing_file_is_error() {
        let result = Config::load(Path::new("/nonexistent/cloudmgr/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_or_default_falls_back() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/cloudmgr/config.yaml"));
        assert_eq!(cfg.sync.staleness_window_secs, 900);
    }

    // -- Validation --

    #[test]
    fn validate_reports_every_error() {
        let cfg = ConfigBuilder::new()
            .sync_staleness_window_secs(0)
            .sync_max_update_retries(0)
            .project_linkage_provider_kinds(["Azure", "Digitalocean"])
            .identity_endpoint("keystone.internal")
            .logging_level("verbose")
            .build();

        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "sync.staleness_window_secs",
                "sync.max_update_retries",
                "project_linkage.provider_kinds",
                "identity.endpoint",
                "logging.level",
            ]
        );
    }

    #[test]
    fn unknown_kind_fails_policy() {
        let cfg = ConfigBuilder::new()
            .project_linkage_provider_kinds(["azure"])
            .build();
        assert!(cfg.project_linkage_policy().is_err());
    }

    #[test]
    fn build_validated_returns_errors() {
        let errors = ConfigBuilder::new()
            .logging_level("loud")
            .build_validated()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "logging.level");
        assert!(errors[0].to_string().starts_with("logging.level: invalid level"));
    }

    #[test]
    fn yaml_round_trip() {
        let cfg = ConfigBuilder::new()
            .identity_endpoint("http://localhost:5000/v3")
            .build();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.identity.endpoint, cfg.identity.endpoint);
    }
}
