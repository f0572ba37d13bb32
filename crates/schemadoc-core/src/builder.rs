//! Object Graph Builder
//!
//! This module provides the `GraphBuilder` struct, which assembles a
//! `SchemaGraph` from a catalog source in two phases:
//!
//! 1. **Shells**: every shell query of the catalog enumerates objects; each
//!    becomes an empty `SchemaObject` under its canonical key.
//! 2. **Attributes**: every ingestion spec runs in kind order. Its rows are
//!    merged into the attribute tables of existing shells, resolving object
//!    references and attaching children to their parents.
//!
//! A failing query abandons only its own spec; rows applied before the
//! failure stand. Only an unreachable source (or a duplicate key under the
//! `reject` policy) fails the build.
//!
//! ## Usage
//!
//! ```ignore
//! use schemadoc_core::{Catalog, Dialect, GraphBuilder, SqliteIntrospector};
//! use std::path::Path;
//!
//! let source = SqliteIntrospector::open(Path::new("app.db"))?;
//! let builder = GraphBuilder::new(Catalog::builtin(Dialect::Sqlite)?);
//! let graph = builder.build(&source)?;
//!
//! println!("Built graph with {} objects", graph.len());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::catalog::{
    Catalog, CatalogError, IngestionSpec, OBJECT_NAME_COLUMN, OBJECT_TYPE_COLUMN,
    PARENT_TYPE_COLUMN,
};
use crate::graph::{Attribute, AttributeRow, ObjectKind, SchemaGraph, SchemaObject};
use crate::introspect::{
    is_parent_label, CatalogColumn, CatalogRow, IntrospectError, SchemaIntrospector,
    PARENT_NAME_COLUMN,
};
use crate::keys::{self, ParentRef};
use crate::text::{wrap_text, DEFAULT_WRAP_BREAK, DEFAULT_WRAP_WIDTH};

// ============================================================================
// Errors
// ============================================================================

/// Errors that fail a whole build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The source could not be reached
    #[error("catalog source unavailable: {0}")]
    Connection(#[source] IntrospectError),

    /// Two shells share a key under the `reject` policy
    #[error("duplicate object key '{key}'")]
    DuplicateKey { key: String },

    /// The catalog is invalid
    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}

// ============================================================================
// Builder Configuration
// ============================================================================

/// What to do when a shell query yields a key that already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Last write wins
    #[default]
    Overwrite,
    /// Keep the first shell, adopting the later one's parent if it has none
    Merge,
    /// Fail the build
    Reject,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::Overwrite => "overwrite",
            DuplicatePolicy::Merge => "merge",
            DuplicatePolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            "merge" => Ok(DuplicatePolicy::Merge),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(format!(
                "unknown duplicate policy '{}', expected one of: overwrite, merge, reject",
                other
            )),
        }
    }
}

/// Configuration for the graph builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Maximum line width for wrapped values (0 disables wrapping)
    pub wrap_width: usize,
    /// Sequence inserted between wrapped segments
    pub wrap_break: String,
    /// Handling of duplicate shell keys
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            wrap_width: DEFAULT_WRAP_WIDTH,
            wrap_break: DEFAULT_WRAP_BREAK.to_string(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

// ============================================================================
// Build Report
// ============================================================================

/// How one query ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Completed,
    /// Failed; rows before the failure stand
    Failed { error: String },
    /// An optional query failed
    Unavailable { error: String },
}

impl QueryOutcome {
    fn from_result(result: Result<usize, IntrospectError>, optional: bool) -> Self {
        match result {
            Ok(_) => QueryOutcome::Completed,
            Err(e) if optional => QueryOutcome::Unavailable {
                error: e.to_string(),
            },
            Err(e) => QueryOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, QueryOutcome::Failed { .. })
    }
}

/// Counters for one shell query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellReport {
    pub name: String,
    pub rows_read: usize,
    pub outcome: QueryOutcome,
}

/// Counters for one ingestion spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecReport {
    pub name: String,
    pub target: ObjectKind,
    pub rows_read: usize,
    pub rows_applied: usize,
    /// Rows whose key has no shell
    pub rows_dropped: usize,
    pub attached: usize,
    pub references_resolved: usize,
    pub outcome: QueryOutcome,
}

/// Summary of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub shells_created: usize,
    pub duplicate_keys: usize,
    pub unresolved_links: usize,
    pub shells: Vec<ShellReport>,
    pub specs: Vec<SpecReport>,
}

impl BuildReport {
    /// Queries that failed and were not optional
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        let shells = self.shells.iter().filter_map(|s| match &s.outcome {
            QueryOutcome::Failed { error } => Some((s.name.as_str(), error.as_str())),
            _ => None,
        });
        let specs = self.specs.iter().filter_map(|s| match &s.outcome {
            QueryOutcome::Failed { error } => Some((s.name.as_str(), error.as_str())),
            _ => None,
        });
        shells.chain(specs)
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn spec(&self, name: &str) -> Option<&SpecReport> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn rows_dropped(&self) -> usize {
        self.specs.iter().map(|s| s.rows_dropped).sum()
    }
}

// ============================================================================
// Graph Builder
// ============================================================================

/// Builds schema graphs from a catalog source.
///
/// The builder itself is stateless between builds; each call starts from an
/// empty graph.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    catalog: Catalog,
    config: BuilderConfig,
}

/// One object enumerated by a shell query.
#[derive(Debug, Clone)]
struct ShellRow {
    kind: ObjectKind,
    name: String,
    parent: Option<(ObjectKind, String)>,
}

impl GraphBuilder {
    /// Create a builder with default configuration
    pub fn new(catalog: Catalog) -> Self {
        Self::with_config(catalog, BuilderConfig::default())
    }

    pub fn with_config(catalog: Catalog, config: BuilderConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build a graph, discarding the report
    pub fn build(&self, source: &dyn SchemaIntrospector) -> Result<SchemaGraph, BuildError> {
        self.build_with_report(source).map(|(graph, _)| graph)
    }

    /// Build a graph and report what every query contributed.
    pub fn build_with_report(
        &self,
        source: &dyn SchemaIntrospector,
    ) -> Result<(SchemaGraph, BuildReport), BuildError> {
        self.catalog.validate()?;
        source.check_connection().map_err(BuildError::Connection)?;

        info!("Building schema graph from {}", source.describe());

        let mut graph = SchemaGraph::new();
        let mut report = BuildReport::default();

        self.create_shells(source, &mut graph, &mut report)?;
        info!("Created {} object shells", graph.len());

        for spec in self.catalog.ordered_specs() {
            let spec_report = self.ingest(source, spec, &mut graph);
            report.specs.push(spec_report);
        }

        for object in graph.iter().filter(|o| o.link.is_none()) {
            warn!(key = %object.key, "Object has no resolvable link");
            report.unresolved_links += 1;
        }

        let stats = graph.stats();
        info!("Graph summary:");
        info!("  - Objects: {}", stats.objects);
        for (kind, count) in &stats.by_kind {
            info!("  - {}: {}", kind.plural(), count);
        }
        info!("  - Attached children: {}", stats.attached);
        info!("  - References: {}", stats.reference_edges);
        if report.rows_dropped() > 0 {
            info!("  - Rows without a shell: {}", report.rows_dropped());
        }

        Ok((graph, report))
    }

    // ------------------------------------------------------------------------
    // Phase 1: shells
    // ------------------------------------------------------------------------

    fn create_shells(
        &self,
        source: &dyn SchemaIntrospector,
        graph: &mut SchemaGraph,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        // Owner named by the shell currently holding each key
        let mut owners: HashMap<String, (ObjectKind, String)> = HashMap::new();

        for shell in &self.catalog.shells {
            debug!(shell = %shell.name, "Running shell query");
            let mut rows: Vec<ShellRow> = Vec::new();
            let mut rows_read = 0;
            let result = source.scan(&shell.query, &mut |row: CatalogRow| {
                rows_read += 1;
                if let Some(shell_row) = parse_shell_row(&shell.query, &row)? {
                    rows.push(shell_row);
                }
                Ok(())
            });

            if let Err(e) = &result {
                if shell.optional {
                    debug!(shell = %shell.name, error = %e, "Optional shell query unavailable");
                } else {
                    warn!(shell = %shell.name, error = %e, "Shell query failed");
                }
            }

            for row in rows {
                let mut object = SchemaObject::shell(row.kind, row.name);
                if let Some((parent_kind, parent_name)) = &row.parent {
                    let parent_ref = ParentRef::new(*parent_kind, parent_name);
                    object.key = keys::object_key(object.kind, &object.name, Some(parent_ref));
                }
                self.insert_shell(graph, object, row.parent, &mut owners, report)?;
            }

            report.shells.push(ShellReport {
                name: shell.name.clone(),
                rows_read,
                outcome: QueryOutcome::from_result(result, shell.optional),
            });
        }

        resolve_owners(graph, owners);
        Ok(())
    }

    fn insert_shell(
        &self,
        graph: &mut SchemaGraph,
        object: SchemaObject,
        owner: Option<(ObjectKind, String)>,
        owners: &mut HashMap<String, (ObjectKind, String)>,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        if !graph.contains(&object.key) {
            if let Some(owner) = owner {
                owners.insert(object.key.clone(), owner);
            }
            graph.insert(object);
            report.shells_created += 1;
            return Ok(());
        }

        report.duplicate_keys += 1;
        match self.config.duplicate_policy {
            DuplicatePolicy::Overwrite => {
                debug!(key = %object.key, "Duplicate key, replacing earlier shell");
                match owner {
                    Some(owner) => owners.insert(object.key.clone(), owner),
                    None => owners.remove(&object.key),
                };
                graph.insert(object);
            }
            DuplicatePolicy::Merge => {
                debug!(key = %object.key, "Duplicate key, keeping earlier shell");
                if let Some(owner) = owner {
                    owners.entry(object.key).or_insert(owner);
                }
            }
            DuplicatePolicy::Reject => {
                return Err(BuildError::DuplicateKey { key: object.key });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Phase 2: attributes
    // ------------------------------------------------------------------------

    fn ingest(
        &self,
        source: &dyn SchemaIntrospector,
        spec: &IngestionSpec,
        graph: &mut SchemaGraph,
    ) -> SpecReport {
        debug!(spec = %spec.name, target = %spec.target, "Running ingestion spec");

        let mut ingestor = SpecIngestor::new(spec, &self.config, graph);
        let result = source.scan(&spec.query, &mut |row: CatalogRow| ingestor.apply(row));
        let mut report = ingestor.into_report();

        match &result {
            Ok(_) => debug!(
                spec = %spec.name,
                read = report.rows_read,
                applied = report.rows_applied,
                dropped = report.rows_dropped,
                "Ingestion spec complete"
            ),
            Err(e) if spec.optional => {
                debug!(spec = %spec.name, error = %e, "Optional ingestion spec unavailable")
            }
            Err(IntrospectError::Contract { message, .. }) => warn!(
                spec = %spec.name,
                target = %spec.target,
                "Query contract violated: {}",
                message
            ),
            Err(e) => warn!(
                spec = %spec.name,
                target = %spec.target,
                applied = report.rows_applied,
                error = %e,
                "Ingestion query failed"
            ),
        }

        report.outcome = QueryOutcome::from_result(result, spec.optional);
        report
    }
}

/// Give owned shells their parent and child link once every owner exists.
///
/// A shell whose owner never showed up keeps its default link.
fn resolve_owners(graph: &mut SchemaGraph, owners: HashMap<String, (ObjectKind, String)>) {
    for (key, (parent_kind, parent_name)) in owners {
        let parent_key = keys::canonical_key(parent_kind, &parent_name);
        let Some(parent) = graph.get(&parent_key).map(|p| (p.kind, p.name.clone())) else {
            trace!(key = %key, parent = %parent_key, "Owner not found, keeping default link");
            continue;
        };
        let Some(object) = graph.index_of(&key).and_then(|idx| graph.node_mut(idx)) else {
            continue;
        };
        let parent_ref = ParentRef::new(parent.0, &parent.1);
        object.link = keys::link_for(object.kind, &object.name, Some(parent_ref)).ok();
        object.parent = Some(parent_key);
    }
}

/// Read (kind, name, parent) from a shell row; unknown kinds yield None.
fn parse_shell_row(query: &str, row: &CatalogRow) -> Result<Option<ShellRow>, IntrospectError> {
    let kind_text = row.get(OBJECT_TYPE_COLUMN).ok_or_else(|| {
        IntrospectError::contract(query, format!("shell query has no {} column", OBJECT_TYPE_COLUMN))
    })?;
    let name = row.get(OBJECT_NAME_COLUMN).ok_or_else(|| {
        IntrospectError::contract(query, format!("shell query has no {} column", OBJECT_NAME_COLUMN))
    })?;

    let Ok(kind) = kind_text.parse::<ObjectKind>() else {
        trace!(kind = %kind_text, name = %name, "Skipping unsupported object kind");
        return Ok(None);
    };
    if name.is_empty() {
        trace!(kind = %kind, "Skipping shell without a name");
        return Ok(None);
    }

    let parent_kind = row
        .get(PARENT_TYPE_COLUMN)
        .and_then(|k| k.parse::<ObjectKind>().ok());
    let parent_name = row.get(PARENT_NAME_COLUMN).filter(|n| !n.is_empty());
    let parent = parent_kind.zip(parent_name);

    Ok(Some(ShellRow { kind, name, parent }))
}

// ============================================================================
// Spec Ingestion
// ============================================================================

/// Role of one result column, fixed from the first row's metadata.
#[derive(Debug, Clone)]
struct AttributeColumn {
    index: usize,
    label: String,
    reference: Option<ObjectKind>,
}

#[derive(Debug, Clone)]
struct RowShape {
    identity_label: String,
    parent: Option<usize>,
    attributes: Vec<AttributeColumn>,
}

impl RowShape {
    fn new(spec: &IngestionSpec, columns: &[CatalogColumn]) -> Self {
        let mut parent = None;
        let mut attributes = Vec::new();
        for (index, column) in columns.iter().enumerate().skip(1) {
            if is_parent_label(&column.name) {
                parent.get_or_insert(index);
                continue;
            }
            attributes.push(AttributeColumn {
                index,
                label: column.name.clone(),
                reference: spec.reference_kind(&column.name),
            });
        }
        Self {
            identity_label: columns
                .first()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            parent,
            attributes,
        }
    }
}

/// Per-spec merge state.
struct SpecIngestor<'a> {
    spec: &'a IngestionSpec,
    config: &'a BuilderConfig,
    graph: &'a mut SchemaGraph,
    shape: Option<RowShape>,
    previous_key: Option<String>,
    current: Option<NodeIndex>,
    /// Attribute row of `current` that concatenated rows grow
    current_row: Option<usize>,
    report: SpecReport,
}

impl<'a> SpecIngestor<'a> {
    fn new(spec: &'a IngestionSpec, config: &'a BuilderConfig, graph: &'a mut SchemaGraph) -> Self {
        Self {
            spec,
            config,
            graph,
            shape: None,
            previous_key: None,
            current: None,
            current_row: None,
            report: SpecReport {
                name: spec.name.clone(),
                target: spec.target,
                rows_read: 0,
                rows_applied: 0,
                rows_dropped: 0,
                attached: 0,
                references_resolved: 0,
                outcome: QueryOutcome::Completed,
            },
        }
    }

    fn into_report(self) -> SpecReport {
        self.report
    }

    fn apply(&mut self, row: CatalogRow) -> Result<(), IntrospectError> {
        let shape = match self.shape.take() {
            Some(shape) => shape,
            None => {
                self.spec
                    .check_columns(row.columns())
                    .map_err(|message| IntrospectError::contract(&self.spec.query, message))?;
                RowShape::new(self.spec, row.columns())
            }
        };
        self.report.rows_read += 1;
        self.apply_row(&shape, &row);
        self.shape = Some(shape);
        Ok(())
    }

    fn apply_row(&mut self, shape: &RowShape, row: &CatalogRow) {
        let spec = self.spec;
        let name = row.text(0);
        let parent_name = shape.parent.map(|idx| row.text(idx));

        let parent_ref = spec
            .parent
            .zip(parent_name.as_deref())
            .map(|(kind, name)| ParentRef::new(kind, name));
        let key = keys::object_key(spec.target, &name, parent_ref);

        let continuing = self.previous_key.as_deref() == Some(key.as_str());
        if !continuing {
            self.current = self.graph.index_of(&key);
            self.current_row = None;
        }
        self.previous_key = Some(key);

        let Some(idx) = self.current else {
            trace!(
                spec = %spec.name,
                row = row.position(),
                name = %name,
                "No shell for row, dropping"
            );
            self.report.rows_dropped += 1;
            return;
        };

        let merge_into = if spec.concatenate && continuing {
            self.current_row
        } else {
            None
        };

        match merge_into {
            Some(row_idx) => self.merge_row(idx, row_idx, shape, row),
            None => self.push_row(idx, shape, row),
        }

        if !continuing && !spec.concatenate {
            self.attach_to_parent(idx, shape, parent_ref);
        }

        self.report.rows_applied += 1;
    }

    /// Trimmed value of an attribute column, wrapped when the spec asks.
    fn value(&self, row: &CatalogRow, column: &AttributeColumn) -> String {
        let value = row.text(column.index);
        if self.spec.wraps() {
            wrap_text(&value, self.config.wrap_width, &self.config.wrap_break)
        } else {
            value
        }
    }

    fn push_row(&mut self, idx: NodeIndex, shape: &RowShape, row: &CatalogRow) {
        let mut attributes = AttributeRow::new();
        let mut targets = Vec::new();

        for column in &shape.attributes {
            let raw = row.text(column.index);
            let object_ref = column
                .reference
                .filter(|_| !raw.is_empty())
                .and_then(|kind| {
                    let key = keys::canonical_key(kind, &raw);
                    self.graph.index_of(&key).map(|target| (key, target))
                });

            let value = self.value(row, column);
            let attribute = match object_ref {
                Some((key, target)) => {
                    targets.push(target);
                    Attribute::new(column.label.as_str(), value).with_object_ref(Some(key))
                }
                None => Attribute::new(column.label.as_str(), value),
            };
            attributes.push(attribute);
        }

        if attributes.is_empty() {
            self.current_row = None;
            return;
        }

        if let Some(object) = self.graph.node_mut(idx) {
            object.attributes.push(attributes);
            self.current_row = Some(object.attributes.len() - 1);
        }
        for target in targets {
            self.graph.add_reference(idx, target);
            self.report.references_resolved += 1;
        }
    }

    fn merge_row(&mut self, idx: NodeIndex, row_idx: usize, shape: &RowShape, row: &CatalogRow) {
        let values: Vec<(&str, String)> = shape
            .attributes
            .iter()
            .map(|column| (column.label.as_str(), self.value(row, column)))
            .collect();

        let Some(current) = self
            .graph
            .node_mut(idx)
            .and_then(|object| object.attributes.get_mut(row_idx))
        else {
            return;
        };
        for (label, value) in values {
            if let Some(attribute) = current.get_mut(label) {
                attribute.append_line(&value);
            }
        }
    }

    fn attach_to_parent(&mut self, idx: NodeIndex, shape: &RowShape, parent: Option<ParentRef<'_>>) {
        let Some(parent) = parent else {
            return;
        };
        let parent_key = keys::canonical_key(parent.kind, parent.name);
        match self.graph.index_of(&parent_key) {
            Some(parent_idx) => {
                if self.graph.attach(idx, parent_idx, &shape.identity_label) {
                    self.report.attached += 1;
                }
            }
            None => trace!(
                spec = %self.spec.name,
                parent = %parent_key,
                "Parent not found, keeping default link"
            ),
        }
    }
}
