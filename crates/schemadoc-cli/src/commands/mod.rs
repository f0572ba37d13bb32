//! CLI command implementations
//!
//! This module contains all SchemaDoc CLI command implementations and the
//! plumbing they share: project and config resolution, source selection and
//! the build-once graph context.

pub mod build;
pub mod catalog;
pub mod config;
pub mod link;
pub mod show;
pub mod snapshot;
pub mod stats;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use schemadoc_config::{
    BuildConfig, ConfigLoader, DialectName, DuplicateKeyPolicy, LoggingConfig, SchemaDocConfig,
};
use schemadoc_core::{
    BuildReport, BuilderConfig, Catalog, Dialect, DuplicatePolicy, GraphBuilder, ObjectKind,
    ParentRef, SchemaContext, SchemaGraph, SchemaIntrospector, SqliteIntrospector,
    StaticIntrospector, UnknownKind,
};
use thiserror::Error;

use crate::progress::{finish_spinner, finish_spinner_error, finish_spinner_warn, spinner};
use crate::GlobalOptions;

/// Resolve the project directory from options or current directory.
pub fn resolve_project(global: &GlobalOptions) -> Result<PathBuf> {
    if let Some(ref project) = global.project {
        if !project.is_dir() {
            anyhow::bail!("Project directory not found: {}", project.display());
        }
        return project
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", project.display()));
    }

    std::env::current_dir().context("Failed to get current directory")
}

/// Resolve a command-line path against the project directory.
pub fn resolve_path(project: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project.join(path)
    }
}

/// Load configuration: global, then local or `--config`, then CLI overrides.
pub fn load_config(global: &GlobalOptions, project: &Path) -> Result<SchemaDocConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();

    let config = match global.config {
        Some(ref config_path) => loader
            .load_with_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?,
        None => loader
            .load(project, Some(&overrides))
            .context("Failed to load configuration")?,
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Logging settings, read before the subscriber exists.
///
/// Errors are ignored here; the command reports them once logging is up.
pub fn peek_logging(global: &GlobalOptions) -> LoggingConfig {
    resolve_project(global)
        .ok()
        .and_then(|project| load_config(global, &project).ok())
        .map(|config| config.logging)
        .unwrap_or_default()
}

pub fn to_dialect(name: DialectName) -> Dialect {
    match name {
        DialectName::Sqlite => Dialect::Sqlite,
        DialectName::Oracle => Dialect::Oracle,
    }
}

/// The custom catalog file when configured, the dialect's built-in otherwise.
pub fn load_catalog(config: &SchemaDocConfig, project: &Path) -> Result<Catalog> {
    match config.catalog_path(project) {
        Some(path) => Catalog::load(&path)
            .with_context(|| format!("Failed to load catalog {}", path.display())),
        None => Catalog::builtin(to_dialect(config.catalog.dialect))
            .context("Failed to load built-in catalog"),
    }
}

/// Convert the config crate's build settings to the builder's.
pub fn to_builder_config(build: &BuildConfig) -> BuilderConfig {
    BuilderConfig {
        wrap_width: build.wrap_width,
        wrap_break: build.wrap_break.clone(),
        duplicate_policy: match build.duplicate_policy {
            DuplicateKeyPolicy::Overwrite => DuplicatePolicy::Overwrite,
            DuplicateKeyPolicy::Merge => DuplicatePolicy::Merge,
            DuplicateKeyPolicy::Reject => DuplicatePolicy::Reject,
        },
    }
}

/// Open the configured catalog source.
pub fn open_source(config: &SchemaDocConfig, project: &Path) -> Result<Box<dyn SchemaIntrospector>> {
    if let Some(path) = config.database_path(project) {
        let source = SqliteIntrospector::open(&path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        return Ok(Box::new(source));
    }

    if let Some(path) = config.snapshot_path(project) {
        let source = StaticIntrospector::load(&path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        return Ok(Box::new(source));
    }

    anyhow::bail!(
        "No catalog source configured (pass --database or --snapshot, or set source.database)"
    )
}

/// Everything a graph-consuming command needs.
pub struct Session {
    pub project: PathBuf,
    pub config: SchemaDocConfig,
    pub context: SchemaContext<Box<dyn SchemaIntrospector>>,
}

impl Session {
    /// Resolve config, catalog and source. Nothing is queried yet.
    pub fn open(global: &GlobalOptions) -> Result<Self> {
        let project = resolve_project(global)?;
        let config = load_config(global, &project)?;
        let catalog = load_catalog(&config, &project)?;
        let source = open_source(&config, &project)?;
        let builder = GraphBuilder::with_config(catalog, to_builder_config(&config.build));

        Ok(Self {
            project,
            config,
            context: SchemaContext::new(source, builder),
        })
    }

    /// The frozen graph and its report, built on first call.
    pub fn build(&self, quiet: bool) -> Result<(&SchemaGraph, &BuildReport)> {
        let already_built = self.context.is_built();
        let pb = if already_built {
            None
        } else {
            spinner(
                &format!("Building graph from {}", self.context.source().describe()),
                quiet,
            )
        };

        let graph = match self.context.graph() {
            Ok(graph) => graph,
            Err(e) => {
                finish_spinner_error(pb, "Build failed");
                return Err(e).context("Failed to build schema graph");
            }
        };
        let report = self.context.report()?;

        if !already_built {
            let failed = report.failures().count();
            if failed == 0 {
                finish_spinner(pb, &format!("Built {} objects", graph.len()));
            } else {
                finish_spinner_warn(
                    pb,
                    &format!("Built {} objects ({} queries failed)", graph.len(), failed),
                );
            }
        }

        Ok((graph, report))
    }
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

/// Print a warning message to stderr.
pub fn print_warning(message: &str) {
    eprintln!("warning: {}", message);
}

/// Warn about every failed query in a build report.
pub fn print_failures(report: &BuildReport, quiet: bool) {
    if quiet {
        return;
    }
    for (name, error) in report.failures() {
        print_warning(&format!("query '{}' failed: {}", name, error));
    }
}

// ============================================================================
// Object arguments
// ============================================================================

/// Parse an object kind argument
pub fn parse_kind(s: &str) -> Result<ObjectKind, String> {
    s.parse().map_err(|e: UnknownKind| e.to_string())
}

/// Parse a `KIND:NAME` parent argument
pub fn parse_parent(s: &str) -> Result<ParentArg, String> {
    s.parse().map_err(|e: ParentArgError| e.to_string())
}

#[derive(Debug, Error)]
pub enum ParentArgError {
    #[error("expected KIND:NAME, got '{0}'")]
    Malformed(String),

    #[error(transparent)]
    Kind(#[from] UnknownKind),
}

/// An owning object named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentArg {
    pub kind: ObjectKind,
    pub name: String,
}

impl ParentArg {
    pub fn as_parent_ref(&self) -> ParentRef<'_> {
        ParentRef::new(self.kind, &self.name)
    }
}

impl FromStr for ParentArg {
    type Err = ParentArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| ParentArgError::Malformed(s.to_string()))?;
        if name.trim().is_empty() {
            return Err(ParentArgError::Malformed(s.to_string()));
        }
        Ok(Self {
            kind: kind.parse()?,
            name: name.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadoc_config::DuplicateKeyPolicy;

    #[test]
    fn test_parse_parent() {
        let parent: ParentArg = "table:employees".parse().unwrap();
        assert_eq!(parent.kind, ObjectKind::Table);
        assert_eq!(parent.name, "employees");

        let parent: ParentArg = "VIEW: staff ".parse().unwrap();
        assert_eq!(parent.kind, ObjectKind::View);
        assert_eq!(parent.name, "staff");
    }

    #[test]
    fn test_parse_parent_errors() {
        assert!(matches!(
            "employees".parse::<ParentArg>(),
            Err(ParentArgError::Malformed(_))
        ));
        assert!(matches!(
            "table:".parse::<ParentArg>(),
            Err(ParentArgError::Malformed(_))
        ));
        assert!(matches!(
            "schema:hr".parse::<ParentArg>(),
            Err(ParentArgError::Kind(_))
        ));
        assert!(parse_parent("nope").unwrap_err().contains("KIND:NAME"));
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("Sequence"), Ok(ObjectKind::Sequence));
        assert!(parse_kind("synonym").unwrap_err().contains("synonym"));
    }

    #[test]
    fn test_builder_config_conversion() {
        let build = BuildConfig {
            wrap_width: 60,
            wrap_break: "\n".to_string(),
            duplicate_policy: DuplicateKeyPolicy::Reject,
        };
        let config = to_builder_config(&build);
        assert_eq!(config.wrap_width, 60);
        assert_eq!(config.wrap_break, "\n");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_builtin_catalog_follows_dialect() {
        let mut config = SchemaDocConfig::default();
        config.catalog.dialect = DialectName::Oracle;
        let catalog = load_catalog(&config, Path::new("/nonexistent")).unwrap();
        assert_eq!(catalog, Catalog::builtin(Dialect::Oracle).unwrap());
    }

    #[test]
    fn test_open_source_requires_a_source() {
        let config = SchemaDocConfig::default();
        let err = open_source(&config, Path::new("/nonexistent"))
            .err()
            .expect("no source configured");
        assert!(err.to_string().contains("--database"));
    }
}
