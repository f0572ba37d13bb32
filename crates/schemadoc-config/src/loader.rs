//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.schemadoc/config.toml`
//! 2. Local config: `.schemadoc/config.toml` (in the project), or an explicit file
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{
    BuildConfig, CatalogConfig, ConfigOverrides, LoggingConfig, OutputConfig, SchemaDocConfig,
    SourceConfig, DEFAULT_OUTPUT_PATH, DEFAULT_WRAP_BREAK, DEFAULT_WRAP_WIDTH,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".schemadoc";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".schemadoc";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.schemadoc`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<SchemaDocConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.schemadoc`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a project.
    pub fn local_config_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a project with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        project_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SchemaDocConfig, ConfigError> {
        let local = self.load_local(project_root)?;
        self.load_layered(local, overrides)
    }

    /// Load configuration with an explicit file in place of the local config.
    pub fn load_with_file(
        &mut self,
        config_file: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SchemaDocConfig, ConfigError> {
        debug!("Loading config from {:?}", config_file);
        let explicit = load_config_file(config_file)?;
        self.load_layered(Some(explicit), overrides)
    }

    fn load_layered(
        &mut self,
        local: Option<SchemaDocConfig>,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SchemaDocConfig, ConfigError> {
        let mut config = SchemaDocConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = local {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<SchemaDocConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a project.
    pub fn load_local(&self, project_root: &Path) -> Result<Option<SchemaDocConfig>, ConfigError> {
        let local_path = self.local_config_path(project_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &SchemaDocConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        save_config_file(&global_dir.join(CONFIG_FILE_NAME), config)
    }

    /// Save configuration to the local config file for a project.
    pub fn save_local(
        &self,
        project_root: &Path,
        config: &SchemaDocConfig,
    ) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(project_root), config)
    }

    /// Initialize global configuration.
    ///
    /// Creates `~/.schemadoc/config.toml` with default configuration.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };
        init_config_dir(global_dir)
    }

    /// Initialize local configuration for a project.
    ///
    /// Creates `.schemadoc/config.toml` with default configuration.
    pub fn init_local(&self, project_root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&project_root.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

/// Write a default config into `dir` unless one exists.
fn init_config_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &SchemaDocConfig::default())?;
    }

    Ok(config_path)
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<SchemaDocConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &SchemaDocConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// This performs a field-by-field merge, allowing partial configs.
fn merge_configs(base: SchemaDocConfig, overlay: SchemaDocConfig) -> SchemaDocConfig {
    SchemaDocConfig {
        source: merge_source(base.source, overlay.source),
        catalog: merge_catalog(base.catalog, overlay.catalog),
        build: merge_build(base.build, overlay.build),
        output: merge_output(base.output, overlay.output),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

/// Sources are alternatives: an overlay naming either replaces both.
fn merge_source(base: SourceConfig, overlay: SourceConfig) -> SourceConfig {
    if overlay.is_empty() {
        base
    } else {
        overlay
    }
}

fn merge_catalog(base: CatalogConfig, overlay: CatalogConfig) -> CatalogConfig {
    CatalogConfig {
        dialect: if overlay.dialect != crate::DialectName::default() {
            overlay.dialect
        } else {
            base.dialect
        },
        file: overlay.file.or(base.file),
    }
}

fn merge_build(base: BuildConfig, overlay: BuildConfig) -> BuildConfig {
    BuildConfig {
        wrap_width: if overlay.wrap_width != DEFAULT_WRAP_WIDTH {
            overlay.wrap_width
        } else {
            base.wrap_width
        },
        wrap_break: if overlay.wrap_break != DEFAULT_WRAP_BREAK {
            overlay.wrap_break
        } else {
            base.wrap_break
        },
        duplicate_policy: if overlay.duplicate_policy != crate::DuplicateKeyPolicy::default() {
            overlay.duplicate_policy
        } else {
            base.duplicate_policy
        },
    }
}

fn merge_output(base: OutputConfig, overlay: OutputConfig) -> OutputConfig {
    OutputConfig {
        path: if overlay.path != Path::new(DEFAULT_OUTPUT_PATH) {
            overlay.path
        } else {
            base.path
        },
        pretty: overlay.pretty,
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        format: overlay.format,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DialectName, DuplicateKeyPolicy};
    use tempfile::TempDir;

    fn create_test_config(content: &str, dir: &Path) -> PathBuf {
        let config_dir = dir.join(".schemadoc");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn write_global(global_dir: &Path, content: &str) {
        std::fs::create_dir_all(global_dir).unwrap();
        std::fs::write(global_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config, SchemaDocConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_test_config(
            r#"
            [source]
            database = "hr.db"

            [build]
            wrap_width = 100
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.source.database, Some(PathBuf::from("hr.db")));
        assert_eq!(config.build.wrap_width, 100);
        assert_eq!(config.build.wrap_break, "\r\n\t");
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        write_global(
            &global_dir,
            r#"
            [logging]
            level = "debug"

            [catalog]
            dialect = "oracle"

            [source]
            snapshot = "global.json"
            "#,
        );

        create_test_config(
            r#"
            [source]
            database = "local.db"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        // Local source replaces the global one entirely
        assert_eq!(config.source.database, Some(PathBuf::from("local.db")));
        assert!(config.source.snapshot.is_none());
        // Values the local config leaves alone survive
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.catalog.dialect, DialectName::Oracle);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();

        create_test_config(
            r#"
            [build]
            duplicate_policy = "merge"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let overrides = ConfigOverrides {
            duplicate_policy: Some(DuplicateKeyPolicy::Reject),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.build.duplicate_policy, DuplicateKeyPolicy::Reject);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_explicit_file_replaces_local() {
        let temp = TempDir::new().unwrap();
        create_test_config("[output]\npath = \"local.json\"\n", temp.path());

        let explicit = temp.path().join("ci.toml");
        std::fs::write(&explicit, "[output]\npath = \"ci.json\"\npretty = false\n").unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_with_file(&explicit, None).unwrap();

        assert_eq!(config.output.path, PathBuf::from("ci.json"));
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader
            .load_with_file(&temp.path().join("absent.toml"), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = create_test_config("[build\nwrap_width = ", temp.path());

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = SchemaDocConfig::default();
        config.source.snapshot = Some(PathBuf::from("saved.json"));
        config.logging.level = "warn".to_string();

        loader.save_local(temp.path(), &config).unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let loaded = loader.load(temp.path(), None).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let path = loader.init_local(temp.path()).unwrap();

        assert!(path.exists());
        assert_eq!(path, temp.path().join(".schemadoc").join("config.toml"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[build]"));
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = create_test_config("[build]\nwrap_width = 60\n", temp.path());
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        loader.init_local(temp.path()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("wrap_width = 60"));
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        write_global(&global_dir, "[logging]\nlevel = \"debug\"\n");

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        assert_eq!(loader.load_global().unwrap().unwrap().logging.level, "debug");

        write_global(&global_dir, "[logging]\nlevel = \"error\"\n");
        // Cached value until cleared
        assert_eq!(loader.load_global().unwrap().unwrap().logging.level, "debug");

        loader.clear_cache();
        assert_eq!(loader.load_global().unwrap().unwrap().logging.level, "error");
    }
}
