//! Build command - Assemble the graph and write the JSON document
//!
//! The document is the hand-off to a renderer: schema version plus every
//! object in key order with its attribute table.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use schemadoc_core::GraphDocument;
use serde::Serialize;

use super::{print_failures, print_info, resolve_path, Session};
use crate::GlobalOptions;

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Output file (defaults to output.path from config)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,

    /// Write the document to stdout instead of a file
    #[arg(long, conflicts_with = "output")]
    stdout: bool,

    /// Also write the build report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Fail when any catalog query failed
    #[arg(long)]
    strict: bool,
}

/// Execute the build command
pub fn execute(args: BuildArgs, global: GlobalOptions) -> Result<()> {
    let session = Session::open(&global)?;
    let (graph, report) = session.build(global.quiet)?;
    print_failures(report, global.quiet);

    if args.strict && !report.is_clean() {
        anyhow::bail!(
            "{} catalog queries failed (--strict)",
            report.failures().count()
        );
    }

    let pretty = session.config.output.pretty && !args.compact;
    let document = graph.to_document();

    if args.stdout {
        println!("{}", to_json(&document, pretty)?);
    } else {
        let path = match args.output {
            Some(ref path) => resolve_path(&session.project, path),
            None => session.config.output_path(&session.project),
        };
        write_document(&path, &document, pretty)?;
        print_info(
            &format!("Wrote {} objects to {}", document.objects.len(), path.display()),
            global.quiet,
        );
    }

    if let Some(ref path) = args.report {
        let path = resolve_path(&session.project, path);
        write_json(&path, report, pretty)?;
        print_info(&format!("Wrote build report to {}", path.display()), global.quiet);
    }

    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Write the graph document, creating parent directories.
pub fn write_document(path: &Path, document: &GraphDocument, pretty: bool) -> Result<()> {
    write_json(path, document, pretty)
}

fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, to_json(value, pretty)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadoc_core::{ObjectKind, SchemaGraph, SchemaObject, GRAPH_SCHEMA_VERSION};
    use tempfile::TempDir;

    fn document() -> GraphDocument {
        GraphDocument {
            schema_version: GRAPH_SCHEMA_VERSION.to_string(),
            objects: vec![SchemaObject::shell(ObjectKind::Table, "employees")],
        }
    }

    #[test]
    fn test_write_document_creates_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out").join("graph.json");

        write_document(&path, &document(), true).unwrap();

        let written: GraphDocument =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, document());
        assert_eq!(SchemaGraph::from_document(written).len(), 1);
    }

    #[test]
    fn test_compact_output_is_single_line() {
        let json = to_json(&document(), false).unwrap();
        assert!(!json.contains('\n'));
        let pretty = to_json(&document(), true).unwrap();
        assert!(pretty.lines().count() > 1);
    }
}
