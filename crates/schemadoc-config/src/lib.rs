//! SchemaDoc Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.schemadoc/config.toml`
//! - Local config: `.schemadoc/config.toml` (in the project directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default width for wrapped attribute values
pub const DEFAULT_WRAP_WIDTH: usize = 80;

/// Default continuation sequence inserted by wrapping
pub const DEFAULT_WRAP_BREAK: &str = "\r\n\t";

/// Default graph document path
pub const DEFAULT_OUTPUT_PATH: &str = "schema-graph.json";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration for SchemaDoc.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SchemaDocConfig {
    /// Where catalog metadata comes from
    pub source: SourceConfig,

    /// Which ingestion catalog to run
    pub catalog: CatalogConfig,

    /// Graph builder settings
    pub build: BuildConfig,

    /// Graph document output
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Catalog source selection.
///
/// At most one of `database` and `snapshot` may be set.
///
/// # Example TOML
///
/// ```toml
/// [source]
/// database = "app.db"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    /// SQLite database file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Recorded catalog snapshot (JSON)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

impl SourceConfig {
    pub fn is_empty(&self) -> bool {
        self.database.is_none() && self.snapshot.is_none()
    }
}

/// Ingestion catalog selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Built-in catalog
    pub dialect: DialectName,

    /// Custom catalog file; takes precedence over `dialect`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Built-in catalog name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DialectName {
    #[default]
    Sqlite,
    Oracle,
}

impl std::fmt::Display for DialectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Oracle => write!(f, "oracle"),
        }
    }
}

impl std::str::FromStr for DialectName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "oracle" => Ok(Self::Oracle),
            _ => Err(ConfigError::invalid_value(
                "catalog.dialect",
                format!("unknown dialect '{}'. Valid values: sqlite, oracle", s),
            )),
        }
    }
}

/// Graph builder settings.
///
/// # Example TOML
///
/// ```toml
/// [build]
/// wrap_width = 100
/// duplicate_policy = "merge"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Maximum line width of wrapped values
    pub wrap_width: usize,

    /// Sequence inserted between wrapped segments
    pub wrap_break: String,

    /// Handling of duplicate object keys
    pub duplicate_policy: DuplicateKeyPolicy,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            wrap_width: DEFAULT_WRAP_WIDTH,
            wrap_break: DEFAULT_WRAP_BREAK.to_string(),
            duplicate_policy: DuplicateKeyPolicy::default(),
        }
    }
}

/// Duplicate key handling during shell creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateKeyPolicy {
    /// Last shell wins (default)
    #[default]
    Overwrite,
    /// First shell wins
    Merge,
    /// Fail the build
    Reject,
}

impl std::fmt::Display for DuplicateKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::Merge => write!(f, "merge"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for DuplicateKeyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "merge" => Ok(Self::Merge),
            "reject" => Ok(Self::Reject),
            _ => Err(ConfigError::invalid_value(
                "build.duplicate_policy",
                format!(
                    "unknown policy '{}'. Valid values: overwrite, merge, reject",
                    s
                ),
            )),
        }
    }
}

/// Graph document output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Document path (relative paths resolve against the project root)
    pub path: PathBuf,

    /// Pretty-print the JSON document
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            pretty: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override the SQLite database (clears any configured snapshot)
    pub database: Option<PathBuf>,

    /// Override the snapshot (clears any configured database)
    pub snapshot: Option<PathBuf>,

    /// Override the built-in catalog
    pub dialect: Option<DialectName>,

    /// Override the custom catalog file
    pub catalog_file: Option<PathBuf>,

    /// Override the output path
    pub output: Option<PathBuf>,

    /// Override the duplicate key policy
    pub duplicate_policy: Option<DuplicateKeyPolicy>,

    /// Override the wrap width
    pub wrap_width: Option<usize>,

    /// Override log level
    pub log_level: Option<String>,
}

impl SchemaDocConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref database) = overrides.database {
            self.source = SourceConfig {
                database: Some(database.clone()),
                snapshot: None,
            };
        }

        if let Some(ref snapshot) = overrides.snapshot {
            self.source = SourceConfig {
                database: None,
                snapshot: Some(snapshot.clone()),
            };
        }

        if let Some(dialect) = overrides.dialect {
            self.catalog.dialect = dialect;
        }

        if let Some(ref file) = overrides.catalog_file {
            self.catalog.file = Some(file.clone());
        }

        if let Some(ref output) = overrides.output {
            self.output.path = output.clone();
        }

        if let Some(policy) = overrides.duplicate_policy {
            self.build.duplicate_policy = policy;
        }

        if let Some(width) = overrides.wrap_width {
            self.build.wrap_width = width;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.database.is_some() && self.source.snapshot.is_some() {
            return Err(ConfigError::ValidationError(
                "source.database and source.snapshot are mutually exclusive".to_string(),
            ));
        }
        if self.build.wrap_width == 0 {
            return Err(ConfigError::ValidationError(
                "build.wrap_width must be greater than zero".to_string(),
            ));
        }
        if self.build.wrap_break.is_empty() {
            return Err(ConfigError::ValidationError(
                "build.wrap_break must not be empty".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!(
                    "unknown level '{}'. Valid values: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }
        Ok(())
    }

    /// Database path, resolved against the project root.
    pub fn database_path(&self, root: &Path) -> Option<PathBuf> {
        self.source.database.as_deref().map(|p| resolve(root, p))
    }

    /// Snapshot path, resolved against the project root.
    pub fn snapshot_path(&self, root: &Path) -> Option<PathBuf> {
        self.source.snapshot.as_deref().map(|p| resolve(root, p))
    }

    /// Custom catalog path, resolved against the project root.
    pub fn catalog_path(&self, root: &Path) -> Option<PathBuf> {
        self.catalog.file.as_deref().map(|p| resolve(root, p))
    }

    /// Output document path, resolved against the project root.
    pub fn output_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.output.path)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
