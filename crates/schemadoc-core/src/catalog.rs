//! Declarative Ingestion Catalog
//!
//! A catalog is data: the shell queries that enumerate objects and the
//! ingestion specs that attach attributes to them. One generic routine in
//! the builder interprets every spec.
//!
//! Catalogs are written in TOML:
//!
//! ```toml
//! [[shell]]
//! name = "objects"
//! query = "SELECT 'TABLE' AS object_type, name AS object_name FROM sqlite_master"
//!
//! [[spec]]
//! name = "table-columns"
//! target = "COLUMN"
//! parent = "TABLE"
//! query = "SELECT c.name AS \"Column\", m.name AS parent_name FROM ..."
//! references = { "Referenced table" = "TABLE" }
//! concatenate = false
//! ```
//!
//! The built-in catalogs are embedded at compile time, so the binary needs no
//! catalog files on disk.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::ObjectKind;
use crate::introspect::{is_parent_label, CatalogColumn};

// Built-in catalogs - embedded at compile time
const SQLITE_CATALOG: &str = include_str!("../catalogs/sqlite.toml");
const ORACLE_CATALOG: &str = include_str!("../catalogs/oracle.toml");

/// Shell query column holding the object kind
pub const OBJECT_TYPE_COLUMN: &str = "object_type";
/// Shell query column holding the object name
pub const OBJECT_NAME_COLUMN: &str = "object_name";
/// Shell query column holding the parent kind
pub const PARENT_TYPE_COLUMN: &str = "parent_type";

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize catalog: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("catalog defines no shell query")]
    NoShells,

    #[error("invalid shell query '{name}': {message}")]
    InvalidShell { name: String, message: String },

    #[error("invalid ingestion spec '{spec}': {message}")]
    InvalidSpec { spec: String, message: String },
}

impl CatalogError {
    fn spec(spec: &str, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            spec: spec.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Dialects
// ============================================================================

/// Built-in catalog dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    Oracle,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Sqlite, Dialect::Oracle];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Oracle => "oracle",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Dialect::Sqlite => SQLITE_CATALOG,
            Dialect::Oracle => ORACLE_CATALOG,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "oracle" => Ok(Dialect::Oracle),
            other => Err(format!(
                "unknown dialect '{}', expected one of: sqlite, oracle",
                other
            )),
        }
    }
}

// ============================================================================
// Shell Queries
// ============================================================================

/// A query enumerating (kind, name[, parent]) tuples for shell creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellQuery {
    pub name: String,
    pub query: String,
    /// Failure is expected on some databases
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
}

impl ShellQuery {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

// ============================================================================
// Ingestion Specs
// ============================================================================

/// One catalog concern: a query whose rows become attribute rows of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSpec {
    pub name: String,

    /// Kind of the object named in column 1
    pub target: ObjectKind,

    /// Kind of the owner named in `parent_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectKind>,

    pub query: String,

    /// Merge consecutive rows of one object into one growing row
    #[serde(default, skip_serializing_if = "is_false")]
    pub concatenate: bool,

    /// Wrap long values; defaults to `concatenate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,

    /// Failure is expected on some databases
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,

    /// Expected number of result columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,

    /// Result-column label to the kind its values name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, ObjectKind>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl IngestionSpec {
    pub fn new(name: impl Into<String>, target: ObjectKind, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target,
            parent: None,
            query: query.into(),
            concatenate: false,
            wrap: None,
            optional: false,
            columns: None,
            references: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: ObjectKind) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_reference(mut self, label: impl Into<String>, kind: ObjectKind) -> Self {
        self.references.insert(label.into(), kind);
        self
    }

    pub fn concatenated(mut self) -> Self {
        self.concatenate = true;
        self
    }

    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap = Some(wrap);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Whether values are wrapped before storing
    pub fn wraps(&self) -> bool {
        self.wrap.unwrap_or(self.concatenate)
    }

    /// Kind named by the values of `label`, ignoring case.
    pub fn reference_kind(&self, label: &str) -> Option<ObjectKind> {
        self.references
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(label))
            .map(|(_, kind)| *kind)
    }

    /// Static checks, run when a catalog is loaded.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::spec("<unnamed>", "spec has no name"));
        }
        if self.query.trim().is_empty() {
            return Err(CatalogError::spec(&self.name, "query is empty"));
        }
        if self.target.is_child_scoped() && self.parent.is_none() {
            return Err(CatalogError::spec(
                &self.name,
                format!("{} objects need a parent kind", self.target),
            ));
        }
        if self.parent == Some(self.target) {
            return Err(CatalogError::spec(
                &self.name,
                "parent kind equals target kind",
            ));
        }
        if let Some(label) = self.references.keys().find(|l| is_parent_label(l)) {
            return Err(CatalogError::spec(
                &self.name,
                format!("'{}' cannot carry a reference", label),
            ));
        }
        if self.columns == Some(0) {
            return Err(CatalogError::spec(&self.name, "expected column count is zero"));
        }
        Ok(())
    }

    /// Check the actual result columns against the query contract.
    pub fn check_columns(&self, columns: &[CatalogColumn]) -> Result<(), String> {
        let Some(identity) = columns.first() else {
            return Err("query returned no columns".to_string());
        };
        if let Some(expected) = self.columns {
            if columns.len() != expected {
                return Err(format!(
                    "expected {} columns, query returned {}",
                    expected,
                    columns.len()
                ));
            }
        }
        if self.parent.is_some() && !columns.iter().any(|c| is_parent_label(&c.name)) {
            return Err("child query has no parent_name column".to_string());
        }
        for label in self.references.keys() {
            if label.eq_ignore_ascii_case(&identity.name) {
                return Err(format!("identity column '{}' cannot carry a reference", label));
            }
            if !columns.iter().any(|c| c.name.eq_ignore_ascii_case(label)) {
                return Err(format!("reference column '{}' is missing", label));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Shell queries plus ingestion specs for one catalog vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "shell")]
    pub shells: Vec<ShellQuery>,

    #[serde(default, rename = "spec")]
    pub specs: Vec<IngestionSpec>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a built-in catalog
    pub fn builtin(dialect: Dialect) -> Result<Self, CatalogError> {
        Self::from_toml(dialect.source())
    }

    /// Source text of a built-in catalog
    pub fn builtin_source(dialect: Dialect) -> &'static str {
        dialect.source()
    }

    /// Parse and validate a catalog
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read, parse and validate a catalog file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, CatalogError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn with_shell(mut self, shell: ShellQuery) -> Self {
        self.shells.push(shell);
        self
    }

    pub fn with_spec(mut self, spec: IngestionSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Check shells and specs; spec names must be unique.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.shells.is_empty() {
            return Err(CatalogError::NoShells);
        }
        for shell in &self.shells {
            if shell.query.trim().is_empty() {
                return Err(CatalogError::InvalidShell {
                    name: shell.name.clone(),
                    message: "query is empty".to_string(),
                });
            }
        }

        let mut names = HashSet::new();
        for spec in &self.specs {
            spec.validate()?;
            if !names.insert(spec.name.as_str()) {
                return Err(CatalogError::spec(&spec.name, "duplicate spec name"));
            }
        }
        Ok(())
    }

    /// Specs grouped by target kind in ingestion order, declared order within a kind.
    pub fn ordered_specs(&self) -> Vec<&IngestionSpec> {
        ObjectKind::ALL
            .iter()
            .flat_map(|kind| self.specs_for(*kind))
            .collect()
    }

    /// Specs targeting one kind, in declared order
    pub fn specs_for(&self, kind: ObjectKind) -> impl Iterator<Item = &IngestionSpec> {
        self.specs.iter().filter(move |s| s.target == kind)
    }

    /// Every query text: shells first, then specs in ingestion order.
    pub fn queries(&self) -> Vec<&str> {
        self.shells
            .iter()
            .map(|s| s.query.as_str())
            .chain(self.ordered_specs().into_iter().map(|s| s.query.as_str()))
            .collect()
    }
}
