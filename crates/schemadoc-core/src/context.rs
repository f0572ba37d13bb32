//! Build-once graph context.
//!
//! `SchemaContext` owns a catalog source and a builder and builds the graph
//! the first time it is asked for. Every later request, from any thread,
//! receives the same frozen graph. A failed build is not cached; the next
//! request tries again.

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::builder::{BuildError, BuildReport, GraphBuilder};
use crate::graph::SchemaGraph;
use crate::introspect::SchemaIntrospector;

#[derive(Debug)]
struct Built {
    graph: SchemaGraph,
    report: BuildReport,
}

/// Lazily built, shared schema graph.
pub struct SchemaContext<S> {
    source: S,
    builder: GraphBuilder,
    built: OnceCell<Built>,
}

impl<S: SchemaIntrospector> SchemaContext<S> {
    pub fn new(source: S, builder: GraphBuilder) -> Self {
        Self {
            source,
            builder,
            built: OnceCell::new(),
        }
    }

    /// The graph, built on first access
    pub fn graph(&self) -> Result<&SchemaGraph, BuildError> {
        self.get_or_build().map(|built| &built.graph)
    }

    /// Report of the build that produced the graph
    pub fn report(&self) -> Result<&BuildReport, BuildError> {
        self.get_or_build().map(|built| &built.report)
    }

    pub fn is_built(&self) -> bool {
        self.built.get().is_some()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn builder(&self) -> &GraphBuilder {
        &self.builder
    }

    fn get_or_build(&self) -> Result<&Built, BuildError> {
        self.built.get_or_try_init(|| {
            debug!("Schema graph requested for the first time, building");
            let (graph, report) = self.builder.build_with_report(&self.source)?;
            Ok(Built { graph, report })
        })
    }
}
