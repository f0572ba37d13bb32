//! SchemaDoc Core - Schema catalog introspection and object graph assembly
//!
//! This crate provides the core functionality for documenting a database schema:
//! - Canonical object keys and cross-reference links
//! - Catalog sources (live SQLite, recorded snapshots)
//! - Declarative ingestion catalogs with embedded built-ins
//! - Two-phase graph assembly (shells, then attributes)
//! - A build-once context handing the frozen graph to renderers

pub mod builder;
pub mod catalog;
pub mod context;
pub mod graph;
pub mod introspect;
pub mod keys;
pub mod text;

// Re-exports for convenience
pub use graph::{
    Attribute, AttributeRow, EdgeData, GraphDocument, GraphStats, ObjectKind, Relation,
    SchemaGraph, SchemaObject, UnknownKind, GRAPH_SCHEMA_VERSION, LINE_SEPARATOR,
};
pub use keys::{canonical_key, compound_key, link_for, normalize_name, object_key, KeyError, ParentRef};
pub use text::{wrap_text, DEFAULT_WRAP_BREAK, DEFAULT_WRAP_WIDTH};

// Source re-exports
pub use introspect::{
    CatalogColumn, CatalogRow, CatalogSnapshot, IntrospectError, RecordedResult, RowVisitor,
    SchemaIntrospector, SqliteIntrospector, StaticIntrospector,
};

// Catalog re-exports
pub use catalog::{Catalog, CatalogError, Dialect, IngestionSpec, ShellQuery};

// Builder re-exports
pub use builder::{
    BuildError, BuildReport, BuilderConfig, DuplicatePolicy, GraphBuilder, QueryOutcome,
    ShellReport, SpecReport,
};

// Context re-exports
pub use context::SchemaContext;
