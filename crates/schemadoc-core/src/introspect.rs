//! Catalog Sources
//!
//! A `SchemaIntrospector` runs one catalog query at a time and streams the
//! result rows, each carrying the shared column metadata and raw values. It
//! never interprets the values; the builder does.
//!
//! Two sources are provided:
//! - `SqliteIntrospector` reads a live SQLite database through rusqlite.
//! - `StaticIntrospector` replays a recorded catalog snapshot (JSON), which is
//!   how catalogs for engines without a linked driver are consumed.
//!
//! ## Query Contract
//!
//! Every ingestion query presents the object's own name in column 1. Child
//! queries name the owner in a `parent_name` column. Labels starting with `_`
//! are hidden from presentation, labels ending in `code` hold source text.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::Catalog;

/// Label of the column carrying the owner's name in child queries.
pub const PARENT_NAME_COLUMN: &str = "parent_name";

/// Prefix of labels that are never presented.
pub const HIDDEN_PREFIX: &str = "_";

/// Suffix of labels holding source text.
pub const CODE_SUFFIX: &str = "code";

/// Snapshot format version
pub const SNAPSHOT_VERSION: &str = "1.0";

pub fn is_hidden_label(label: &str) -> bool {
    label.starts_with(HIDDEN_PREFIX)
}

pub fn is_code_label(label: &str) -> bool {
    label.to_lowercase().ends_with(CODE_SUFFIX)
}

pub fn is_parent_label(label: &str) -> bool {
    label.eq_ignore_ascii_case(PARENT_NAME_COLUMN)
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by catalog sources.
#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("cannot connect to {target}: {message}")]
    Connect { target: String, message: String },

    #[error("catalog query failed: {message}")]
    Query { query: String, message: String },

    #[error("query contract violated: {message}")]
    Contract { query: String, message: String },

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntrospectError {
    pub fn connect(target: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::Connect {
            target: target.into(),
            message: err.to_string(),
        }
    }

    pub fn query(query: &str, err: impl fmt::Display) -> Self {
        Self::Query {
            query: query.to_string(),
            message: err.to_string(),
        }
    }

    pub fn contract(query: &str, message: impl Into<String>) -> Self {
        Self::Contract {
            query: query.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Result column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
}

impl CatalogColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
        }
    }
}

/// One result row with its position and the shared column metadata.
#[derive(Debug, Clone)]
pub struct CatalogRow {
    position: usize,
    columns: Arc<[CatalogColumn]>,
    values: Vec<Option<String>>,
}

impl CatalogRow {
    pub fn new(position: usize, columns: Arc<[CatalogColumn]>, values: Vec<Option<String>>) -> Self {
        Self {
            position,
            columns,
            values,
        }
    }

    /// 0-based position within the result
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn columns(&self) -> &[CatalogColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Label of column `idx`
    pub fn label(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).map(|c| c.name.as_str())
    }

    /// Raw value of column `idx`; None for NULL
    pub fn raw(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    /// Trimmed value of column `idx`, NULL as empty string.
    pub fn text(&self, idx: usize) -> String {
        self.raw(idx).map(|v| v.trim().to_string()).unwrap_or_default()
    }

    /// Position of the column with the given label, ignoring case.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(label))
    }

    /// Trimmed value of the column with the given label.
    pub fn get(&self, label: &str) -> Option<String> {
        self.index_of(label).map(|idx| self.text(idx))
    }
}

// ============================================================================
// Introspector Trait
// ============================================================================

/// Row visitor; an error stops the scan.
pub type RowVisitor<'a> = dyn FnMut(CatalogRow) -> Result<(), IntrospectError> + 'a;

/// A source of catalog query results.
pub trait SchemaIntrospector {
    /// Human-readable source name for logs
    fn describe(&self) -> String;

    /// Verify the source is reachable before any query runs.
    fn check_connection(&self) -> Result<(), IntrospectError>;

    /// Run `query` and hand each row to `visit` in delivery order.
    ///
    /// Returns the number of rows delivered. Rows delivered before an error
    /// have already been visited.
    fn scan(&self, query: &str, visit: &mut RowVisitor<'_>) -> Result<usize, IntrospectError>;
}

/// Sources chosen at runtime are handed around boxed.
impl<T: SchemaIntrospector + ?Sized> SchemaIntrospector for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn check_connection(&self) -> Result<(), IntrospectError> {
        (**self).check_connection()
    }

    fn scan(&self, query: &str, visit: &mut RowVisitor<'_>) -> Result<usize, IntrospectError> {
        (**self).scan(query, visit)
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// Catalog source backed by a SQLite database.
pub struct SqliteIntrospector {
    conn: Connection,
    target: String,
}

impl SqliteIntrospector {
    /// Open a database file read-only
    pub fn open(path: &Path) -> Result<Self, IntrospectError> {
        let target = path.display().to_string();
        if !path.is_file() {
            return Err(IntrospectError::connect(target, "database file not found"));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| IntrospectError::connect(&target, e))?;
        Ok(Self { conn, target })
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection) -> Self {
        let target = conn
            .path()
            .filter(|p| !p.is_empty())
            .unwrap_or(":memory:")
            .to_string();
        Self { conn, target }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Render a SQLite value as text; large values are kept whole.
fn value_to_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl SchemaIntrospector for SqliteIntrospector {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.target)
    }

    fn check_connection(&self) -> Result<(), IntrospectError> {
        self.conn
            .query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|_| ())
            .map_err(|e| IntrospectError::connect(&self.target, e))
    }

    fn scan(&self, query: &str, visit: &mut RowVisitor<'_>) -> Result<usize, IntrospectError> {
        let mut stmt = self
            .conn
            .prepare(query)
            .map_err(|e| IntrospectError::query(query, e))?;

        let columns: Arc<[CatalogColumn]> = stmt
            .columns()
            .iter()
            .map(|c| CatalogColumn {
                name: c.name().to_string(),
                declared_type: c.decl_type().map(str::to_string),
            })
            .collect();
        let width = columns.len();

        let mut rows = stmt.query([]).map_err(|e| IntrospectError::query(query, e))?;
        let mut delivered = 0;
        while let Some(row) = rows.next().map_err(|e| IntrospectError::query(query, e))? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| IntrospectError::query(query, e))?;
                values.push(value_to_text(value));
            }
            visit(CatalogRow::new(delivered, Arc::clone(&columns), values))?;
            delivered += 1;
        }
        Ok(delivered)
    }
}

// ============================================================================
// Recorded Snapshots
// ============================================================================

/// Collapse whitespace so snapshot lookups survive reformatting.
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One recorded query result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedResult {
    #[serde(default)]
    pub columns: Vec<CatalogColumn>,

    #[serde(default)]
    pub rows: Vec<Vec<Option<String>>>,

    /// Error raised after the recorded rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordedResult {
    /// Empty result with the given column labels
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(CatalogColumn::new).collect(),
            rows: Vec::new(),
            error: None,
        }
    }

    /// Append a row of nullable values
    pub fn with_row(mut self, values: &[Option<&str>]) -> Self {
        self.rows
            .push(values.iter().map(|v| v.map(str::to_string)).collect());
        self
    }

    /// Append a row without NULLs
    pub fn with_text_row(mut self, values: &[&str]) -> Self {
        self.rows
            .push(values.iter().map(|v| Some((*v).to_string())).collect());
        self
    }

    /// Fail after the recorded rows
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// Serializable set of recorded query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub snapshot_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Results keyed by normalized query text
    #[serde(default)]
    pub results: BTreeMap<String, RecordedResult>,
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self {
            snapshot_version: SNAPSHOT_VERSION.to_string(),
            source: None,
            results: BTreeMap::new(),
        }
    }
}

/// Catalog source replaying recorded results.
#[derive(Debug, Clone, Default)]
pub struct StaticIntrospector {
    snapshot: CatalogSnapshot,
    connection_error: Option<String>,
}

impl StaticIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot,
            connection_error: None,
        }
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self, IntrospectError> {
        let content = fs::read_to_string(path)?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&content)?;
        if snapshot.snapshot_version != SNAPSHOT_VERSION {
            warn!(
                path = %path.display(),
                found = %snapshot.snapshot_version,
                expected = SNAPSHOT_VERSION,
                "Snapshot version differs"
            );
        }
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the snapshot as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), IntrospectError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Register a result for `query`
    pub fn insert(&mut self, query: &str, result: RecordedResult) {
        self.snapshot.results.insert(normalize_query(query), result);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_result(mut self, query: &str, result: RecordedResult) -> Self {
        self.insert(query, result);
        self
    }

    /// Make `check_connection` fail
    pub fn with_connection_error(mut self, message: impl Into<String>) -> Self {
        self.connection_error = Some(message.into());
        self
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> CatalogSnapshot {
        self.snapshot
    }

    /// Run every query of `catalog` against `source` and record the results.
    ///
    /// A failing query is recorded with its rows so far and its error, so a
    /// replay reproduces the partial failure.
    pub fn record(
        source: &dyn SchemaIntrospector,
        catalog: &Catalog,
    ) -> Result<Self, IntrospectError> {
        source.check_connection()?;

        let mut recorder = StaticIntrospector::from_snapshot(CatalogSnapshot {
            source: Some(source.describe()),
            ..CatalogSnapshot::default()
        });

        for query in catalog.queries() {
            let mut result = RecordedResult::default();
            let outcome = source.scan(query, &mut |row| {
                if result.columns.is_empty() {
                    result.columns = row.columns().to_vec();
                }
                result.rows.push(row.values);
                Ok(())
            });
            if let Err(e) = outcome {
                debug!(error = %e, "Recording failed query");
                result.error = Some(e.to_string());
            }
            recorder.insert(query, result);
        }

        Ok(recorder)
    }
}

impl SchemaIntrospector for StaticIntrospector {
    fn describe(&self) -> String {
        match &self.snapshot.source {
            Some(source) => format!("snapshot of {source}"),
            None => "snapshot".to_string(),
        }
    }

    fn check_connection(&self) -> Result<(), IntrospectError> {
        match &self.connection_error {
            Some(message) => Err(IntrospectError::connect(self.describe(), message)),
            None => Ok(()),
        }
    }

    fn scan(&self, query: &str, visit: &mut RowVisitor<'_>) -> Result<usize, IntrospectError> {
        let result = self
            .snapshot
            .results
            .get(&normalize_query(query))
            .ok_or_else(|| IntrospectError::query(query, "no recorded result for query"))?;

        let columns: Arc<[CatalogColumn]> = result.columns.clone().into();
        let mut delivered = 0;
        for values in &result.rows {
            if values.len() != columns.len() {
                return Err(IntrospectError::contract(
                    query,
                    format!(
                        "recorded row {} has {} values for {} columns",
                        delivered,
                        values.len(),
                        columns.len()
                    ),
                ));
            }
            visit(CatalogRow::new(delivered, Arc::clone(&columns), values.clone()))?;
            delivered += 1;
        }

        match &result.error {
            Some(message) => Err(IntrospectError::query(query, message)),
            None => Ok(delivered),
        }
    }
}
