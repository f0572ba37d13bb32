//! Object Model and Schema Graph
//!
//! This module defines the typed object model assembled from catalog metadata:
//! object kinds, attributes, attribute rows and schema objects, plus the
//! `SchemaGraph` arena that owns them.
//!
//! Objects live in a `petgraph::StableGraph`; a `BTreeMap` from canonical key
//! to `NodeIndex` gives O(log n) lookup and ascending-key iteration. Parents
//! are stored as keys on the child and mirrored as CONTAINS edges, so no
//! object ever owns another.
//!
//! Schema Version: 1.0

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::introspect::{is_code_label, is_hidden_label};
use crate::keys::{self, ParentRef};

/// Schema version of the exported graph document
pub const GRAPH_SCHEMA_VERSION: &str = "1.0";

/// Separator used when concatenated rows are merged into one attribute value.
pub const LINE_SEPARATOR: &str = "\r\n";

// ============================================================================
// Object Kinds
// ============================================================================

/// Category of a schema object.
///
/// COLUMN and CONSTRAINT are synthetic kinds: catalogs do not list them as
/// objects of their own, they are layered on top for presentation uniformity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Table,
    View,
    Constraint,
    Index,
    Trigger,
    Procedure,
    Function,
    Package,
    Sequence,
    Column,
}

impl ObjectKind {
    /// All supported kinds, in ingestion order.
    pub const ALL: [ObjectKind; 10] = [
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::Constraint,
        ObjectKind::Index,
        ObjectKind::Trigger,
        ObjectKind::Procedure,
        ObjectKind::Function,
        ObjectKind::Package,
        ObjectKind::Sequence,
        ObjectKind::Column,
    ];

    /// Catalog spelling (upper case)
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::Constraint => "CONSTRAINT",
            ObjectKind::Index => "INDEX",
            ObjectKind::Trigger => "TRIGGER",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Package => "PACKAGE",
            ObjectKind::Sequence => "SEQUENCE",
            ObjectKind::Column => "COLUMN",
        }
    }

    /// Lower-case spelling used in keys and page names
    pub fn as_lower(&self) -> &'static str {
        match self {
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Constraint => "constraint",
            ObjectKind::Index => "index",
            ObjectKind::Trigger => "trigger",
            ObjectKind::Procedure => "procedure",
            ObjectKind::Function => "function",
            ObjectKind::Package => "package",
            ObjectKind::Sequence => "sequence",
            ObjectKind::Column => "column",
        }
    }

    /// Plural form, used for listing pages
    pub fn plural(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLES",
            ObjectKind::View => "VIEWS",
            ObjectKind::Constraint => "CONSTRAINTS",
            ObjectKind::Index => "INDEXES",
            ObjectKind::Trigger => "TRIGGERS",
            ObjectKind::Procedure => "PROCEDURES",
            ObjectKind::Function => "FUNCTIONS",
            ObjectKind::Package => "PACKAGES",
            ObjectKind::Sequence => "SEQUENCES",
            ObjectKind::Column => "COLUMNS",
        }
    }

    /// Three-letter anchor prefix for in-page child anchors
    pub fn anchor_prefix(&self) -> &'static str {
        &self.as_lower()[..3]
    }

    /// Kinds whose identity is only unique under a parent object.
    pub fn is_child_scoped(&self) -> bool {
        matches!(self, ObjectKind::Column)
    }

    /// Kinds without a page of their own, presented on a shared listing page.
    pub fn is_listing_only(&self) -> bool {
        matches!(self, ObjectKind::Sequence)
    }

    /// Kinds added for uniformity that no catalog lists as objects.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, ObjectKind::Column | ObjectKind::Constraint)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a supported kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown object kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for ObjectKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ObjectKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Kinds deserialize case-insensitively so catalogs may write `table` or `TABLE`.
impl<'de> Deserialize<'de> for ObjectKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::unknown_variant(
                &s,
                &[
                    "TABLE",
                    "VIEW",
                    "CONSTRAINT",
                    "INDEX",
                    "TRIGGER",
                    "PROCEDURE",
                    "FUNCTION",
                    "PACKAGE",
                    "SEQUENCE",
                    "COLUMN",
                ],
            )
        })
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// One named value describing an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute label (the result-column name)
    pub name: String,

    /// Raw value
    pub value: String,

    /// False for internal, disambiguation-only attributes (`_` prefix)
    pub visible: bool,

    /// True when the value is source code to be rendered verbatim
    pub preformatted: bool,

    /// Key of the object this value names, when it resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_ref: Option<String>,
}

impl Attribute {
    /// Create an attribute, deriving visibility and formatting from its label.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            visible: !is_hidden_label(&name),
            preformatted: is_code_label(&name),
            value: value.into(),
            name,
            object_ref: None,
        }
    }

    /// Set the resolved object reference
    pub fn with_object_ref(mut self, object_ref: Option<String>) -> Self {
        self.object_ref = object_ref;
        self
    }

    /// Append one more line to a concatenated value.
    pub(crate) fn append_line(&mut self, line: &str) {
        self.value.push_str(LINE_SEPARATOR);
        self.value.push_str(line);
    }
}

/// Ordered attributes delivered by one source row (or a merged run of rows).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeRow {
    attributes: Vec<Attribute>,
}

impl AttributeRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Find an attribute by label, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Attributes meant for presentation
    pub fn visible(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.visible)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl From<Vec<Attribute>> for AttributeRow {
    fn from(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }
}

// ============================================================================
// Schema Object
// ============================================================================

/// A typed catalog object with its attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    /// Canonical key, unique within the graph
    pub key: String,

    /// Object kind
    pub kind: ObjectKind,

    /// Display name as delivered by the catalog
    pub name: String,

    /// Cross-reference address; None until resolvable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Key of the owning object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Attribute rows in delivery order
    #[serde(default)]
    pub attributes: Vec<AttributeRow>,

    /// Set once the object is listed in its parent's attribute table
    #[serde(default)]
    pub attached: bool,
}

impl SchemaObject {
    /// Create a parentless shell with its provisional link.
    pub fn shell(kind: ObjectKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: keys::canonical_key(kind, &name),
            link: keys::link_for(kind, &name, None).ok(),
            kind,
            name,
            parent: None,
            attributes: Vec::new(),
            attached: false,
        }
    }

    /// Create a shell owned by `parent`.
    ///
    /// Child-scoped kinds get a compound key; the link is final immediately.
    pub fn child_shell(kind: ObjectKind, name: impl Into<String>, parent: &SchemaObject) -> Self {
        let name = name.into();
        let parent_ref = ParentRef::new(parent.kind, &parent.name);
        let key = if kind.is_child_scoped() {
            keys::compound_key(&parent.key, &keys::canonical_key(kind, &name))
        } else {
            keys::canonical_key(kind, &name)
        };
        Self {
            key,
            link: keys::link_for(kind, &name, Some(parent_ref)).ok(),
            kind,
            name,
            parent: Some(parent.key.clone()),
            attributes: Vec::new(),
            attached: false,
        }
    }

    /// First attribute with the given label across all rows.
    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find_map(|row| row.get(name))
    }

    /// All attributes with the given label, in row order.
    pub fn attribute_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Attribute> {
        self.attributes.iter().filter_map(move |row| row.get(name))
    }
}

// ============================================================================
// Edges
// ============================================================================

/// Relationship between two objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// Parent lists the child in its attribute table
    Contains,
    /// An attribute value of the source resolves to the target
    References,
}

/// Edge weight stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeData {
    pub relation: Relation,
    /// Insertion sequence, preserves ingestion order
    pub ordinal: usize,
}

// ============================================================================
// Schema Graph
// ============================================================================

/// The assembled object graph.
///
/// Mutation is crate-private: a graph handed out by the builder is frozen.
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    graph: StableGraph<SchemaObject, EdgeData, petgraph::Directed>,

    /// Canonical key to node, kept in ascending key order
    key_index: BTreeMap<String, NodeIndex>,

    next_ordinal: usize,

    schema_version: String,
}

impl Default for SchemaGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            key_index: BTreeMap::new(),
            next_ordinal: 0,
            schema_version: GRAPH_SCHEMA_VERSION.to_string(),
        }
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    // ------------------------------------------------------------------------
    // Crate-private mutation
    // ------------------------------------------------------------------------

    /// Insert an object, replacing any object with the same key.
    ///
    /// Returns the new index and the replaced object, if any.
    pub(crate) fn insert(&mut self, object: SchemaObject) -> (NodeIndex, Option<SchemaObject>) {
        let key = object.key.clone();
        let replaced = self
            .key_index
            .get(&key)
            .copied()
            .and_then(|existing| self.graph.remove_node(existing));

        let idx = self.graph.add_node(object);
        self.key_index.insert(key, idx);
        (idx, replaced)
    }

    pub(crate) fn index_of(&self, key: &str) -> Option<NodeIndex> {
        self.key_index.get(key).copied()
    }

    pub(crate) fn node(&self, idx: NodeIndex) -> Option<&SchemaObject> {
        self.graph.node_weight(idx)
    }

    pub(crate) fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut SchemaObject> {
        self.graph.node_weight_mut(idx)
    }

    /// Link `child` under `parent`, exactly once per child.
    ///
    /// Sets the child's parent, recomputes its link, and appends one
    /// synthetic row `{label: child key}` to the parent's attribute table.
    /// Returns false when the child was already attached or either side is
    /// missing.
    pub(crate) fn attach(&mut self, child: NodeIndex, parent: NodeIndex, label: &str) -> bool {
        if child == parent {
            return false;
        }
        let Some(parent_obj) = self.graph.node_weight(parent) else {
            return false;
        };
        let parent_key = parent_obj.key.clone();
        let parent_kind = parent_obj.kind;
        let parent_name = parent_obj.name.clone();

        let child_key = match self.graph.node_weight_mut(child) {
            Some(child_obj) if !child_obj.attached => {
                child_obj.parent = Some(parent_key);
                child_obj.link = keys::link_for(
                    child_obj.kind,
                    &child_obj.name,
                    Some(ParentRef::new(parent_kind, &parent_name)),
                )
                .ok();
                child_obj.attached = true;
                child_obj.key.clone()
            }
            _ => return false,
        };

        let row = AttributeRow::from(vec![
            Attribute::new(label, child_key.clone()).with_object_ref(Some(child_key))
        ]);
        if let Some(parent_obj) = self.graph.node_weight_mut(parent) {
            parent_obj.attributes.push(row);
        }
        self.add_edge(parent, child, Relation::Contains);
        true
    }

    /// Record that an attribute of `source` names `target`.
    pub(crate) fn add_reference(&mut self, source: NodeIndex, target: NodeIndex) {
        let already = self
            .graph
            .edges_connecting(source, target)
            .any(|e| e.weight().relation == Relation::References);
        if !already {
            self.add_edge(source, target, Relation::References);
        }
    }

    fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, relation: Relation) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.graph
            .add_edge(source, target, EdgeData { relation, ordinal });
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Get an object by canonical key
    pub fn get(&self, key: &str) -> Option<&SchemaObject> {
        self.key_index
            .get(key)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Get an object by kind and display name
    pub fn lookup(&self, kind: ObjectKind, name: &str) -> Option<&SchemaObject> {
        self.get(&keys::canonical_key(kind, name))
    }

    /// Get a child-scoped object (e.g. a column) under its parent
    pub fn lookup_child(
        &self,
        parent_kind: ObjectKind,
        parent_name: &str,
        kind: ObjectKind,
        name: &str,
    ) -> Option<&SchemaObject> {
        let key = keys::compound_key(
            &keys::canonical_key(parent_kind, parent_name),
            &keys::canonical_key(kind, name),
        );
        self.get(&key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.key_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_index.is_empty()
    }

    /// Iterate over all objects in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = &SchemaObject> {
        self.key_index
            .values()
            .filter_map(|&idx| self.graph.node_weight(idx))
    }

    /// All keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.key_index.keys().map(String::as_str)
    }

    /// Objects of one kind, in ascending key order
    pub fn objects_of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &SchemaObject> {
        self.iter().filter(move |o| o.kind == kind)
    }

    /// Every object sorted by display name (case-insensitive), then kind.
    pub fn name_index(&self) -> Vec<&SchemaObject> {
        let mut objects: Vec<&SchemaObject> = self.iter().collect();
        objects.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.kind.cmp(&b.kind))
                .then_with(|| a.key.cmp(&b.key))
        });
        objects
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    /// The object's parent, resolved by key
    pub fn parent_of(&self, key: &str) -> Option<&SchemaObject> {
        self.get(key)
            .and_then(|o| o.parent.as_deref())
            .and_then(|parent_key| self.get(parent_key))
    }

    /// Attached children in attachment order
    pub fn children(&self, key: &str) -> Vec<&SchemaObject> {
        self.related(key, Relation::Contains, Direction::Outgoing)
    }

    /// Objects this object's attributes refer to, in first-reference order
    pub fn references(&self, key: &str) -> Vec<&SchemaObject> {
        self.related(key, Relation::References, Direction::Outgoing)
    }

    /// Objects whose attributes refer to this object, in first-reference order
    pub fn referrers(&self, key: &str) -> Vec<&SchemaObject> {
        self.related(key, Relation::References, Direction::Incoming)
    }

    fn related(&self, key: &str, relation: Relation, direction: Direction) -> Vec<&SchemaObject> {
        let Some(idx) = self.index_of(key) else {
            return Vec::new();
        };
        let mut edges: Vec<(usize, NodeIndex)> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| e.weight().relation == relation)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.weight().ordinal, other)
            })
            .collect();
        edges.sort_by_key(|(ordinal, _)| *ordinal);
        edges
            .into_iter()
            .filter_map(|(_, other)| self.graph.node_weight(other))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    /// Summary counts
    pub fn stats(&self) -> GraphStats {
        let mut by_kind = BTreeMap::new();
        let mut attached = 0;
        let mut unresolved_links = 0;
        for object in self.iter() {
            *by_kind.entry(object.kind).or_insert(0) += 1;
            if object.attached {
                attached += 1;
            }
            if object.link.is_none() {
                unresolved_links += 1;
            }
        }
        let mut contains_edges = 0;
        let mut reference_edges = 0;
        for weight in self.graph.edge_weights() {
            match weight.relation {
                Relation::Contains => contains_edges += 1,
                Relation::References => reference_edges += 1,
            }
        }
        GraphStats {
            objects: self.len(),
            by_kind,
            attached,
            unresolved_links,
            contains_edges,
            reference_edges,
        }
    }

    /// Snapshot of the graph for an external renderer
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            schema_version: self.schema_version.clone(),
            objects: self.iter().cloned().collect(),
        }
    }

    /// Rebuild a graph from an exported document.
    ///
    /// CONTAINS edges follow attachment rows, REFERENCES edges follow
    /// resolved attribute references.
    pub fn from_document(document: GraphDocument) -> Self {
        let mut graph = SchemaGraph::new();
        graph.schema_version = document.schema_version;
        for object in document.objects {
            graph.insert(object);
        }

        let mut links: Vec<(NodeIndex, NodeIndex, Relation)> = Vec::new();
        for &idx in graph.key_index.values() {
            let Some(object) = graph.graph.node_weight(idx) else {
                continue;
            };
            for row in &object.attributes {
                for attribute in row.iter() {
                    let Some(target) = attribute
                        .object_ref
                        .as_deref()
                        .and_then(|k| graph.index_of(k))
                    else {
                        continue;
                    };
                    let is_child_row = row.len() == 1
                        && graph
                            .node(target)
                            .is_some_and(|t| t.parent.as_deref() == Some(object.key.as_str()));
                    let relation = if is_child_row {
                        Relation::Contains
                    } else {
                        Relation::References
                    };
                    links.push((idx, target, relation));
                }
            }
        }
        for (source, target, relation) in links {
            match relation {
                Relation::Contains => graph.add_edge(source, target, relation),
                Relation::References => graph.add_reference(source, target),
            }
        }
        graph
    }
}

/// Summary counts for a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub objects: usize,
    pub by_kind: BTreeMap<ObjectKind, usize>,
    pub attached: usize,
    pub unresolved_links: usize,
    pub contains_edges: usize,
    pub reference_edges: usize,
}

/// Serializable hand-off format for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub schema_version: String,
    /// Objects in ascending key order
    pub objects: Vec<SchemaObject>,
}
