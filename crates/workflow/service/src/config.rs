//! Configuration for the workflow proof service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use workflow_ledger::StaticRoleResolver;

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Instance ledger configuration
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// History pagination
    #[serde(default)]
    pub history: HistoryConfig,

    /// Notary collaborator
    #[serde(default)]
    pub notary: NotaryConfig,

    /// Actor -> roles table for the built-in role resolver
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Instance ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// How long a contended append waits before `Busy`; 0 fails fast
    #[serde(default)]
    pub append_wait_ms: u64,
}

impl LedgerConfig {
    pub fn append_wait(&self) -> Duration {
        Duration::from_millis(self.append_wait_ms)
    }
}

/// History pagination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl HistoryConfig {
    /// Resolve a requested page size against the configured bounds
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        let max = self.max_page_size.max(1);
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, max)
    }
}

/// Notary collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryConfig {
    /// Anchor content and chain hashes with the notary
    #[serde(default)]
    pub enabled: bool,

    /// Upper bound on one anchoring call
    #[serde(default = "default_notary_timeout")]
    pub timeout_ms: u64,
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: default_notary_timeout(),
        }
    }
}

impl NotaryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_page_size() -> usize {
    50
}

fn default_max_page_size() -> usize {
    500
}

fn default_notary_timeout() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    /// Load configuration: defaults, then the file if given, then
    /// `WFPROOF_*` environment variables (`__` between nested keys, e.g.
    /// `WFPROOF_LEDGER__APPEND_WAIT_MS=100`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ServiceConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("WFPROOF")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Role resolver backed by the `roles` table
    pub fn role_resolver(&self) -> StaticRoleResolver {
        StaticRoleResolver::from_map(
            self.roles
                .iter()
                .map(|(actor, roles)| (actor.clone(), roles.clone())),
        )
    }
}
