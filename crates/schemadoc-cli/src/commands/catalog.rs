//! Catalog commands - Inspect and check ingestion catalogs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use schemadoc_core::{Catalog, IngestionSpec, ObjectKind};
use serde::Serialize;

use super::{load_catalog, load_config, resolve_project, to_dialect};
use crate::GlobalOptions;

/// Catalog inspection commands
#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Print the active catalog as TOML
    Show,

    /// Load and validate a catalog, listing its specs in ingestion order
    Check(CheckArgs),
}

/// Arguments for the check command
#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Catalog file (defaults to the configured catalog)
    file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// One ingestion spec as listed by `catalog check`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpecSummary {
    pub name: String,
    pub target: ObjectKind,
    pub parent: Option<ObjectKind>,
    pub concatenate: bool,
    pub wrap: bool,
    pub optional: bool,
    pub references: Vec<String>,
}

impl From<&IngestionSpec> for SpecSummary {
    fn from(spec: &IngestionSpec) -> Self {
        Self {
            name: spec.name.clone(),
            target: spec.target,
            parent: spec.parent,
            concatenate: spec.concatenate,
            wrap: spec.wraps(),
            optional: spec.optional,
            references: spec
                .references
                .iter()
                .map(|(label, kind)| format!("{} -> {}", label, kind))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    shells: Vec<String>,
    specs: Vec<SpecSummary>,
}

/// Execute a catalog command
pub fn execute(cmd: CatalogCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        CatalogCommand::Show => execute_show(global),
        CatalogCommand::Check(args) => execute_check(args, global),
    }
}

fn execute_show(global: GlobalOptions) -> Result<()> {
    let project = resolve_project(&global)?;
    let config = load_config(&global, &project)?;

    match config.catalog_path(&project) {
        Some(_) => {
            let catalog = load_catalog(&config, &project)?;
            print!("{}", catalog.to_toml().context("Failed to serialize catalog")?);
        }
        // Built-ins print verbatim, comments included
        None => print!("{}", Catalog::builtin_source(to_dialect(config.catalog.dialect))),
    }

    Ok(())
}

fn execute_check(args: CheckArgs, global: GlobalOptions) -> Result<()> {
    let catalog = match args.file {
        Some(ref path) => {
            Catalog::load(path).with_context(|| format!("Invalid catalog {}", path.display()))?
        }
        None => {
            let project = resolve_project(&global)?;
            let config = load_config(&global, &project)?;
            load_catalog(&config, &project)?
        }
    };

    let output = CheckOutput {
        shells: catalog.shells.iter().map(|s| s.name.clone()).collect(),
        specs: catalog
            .ordered_specs()
            .into_iter()
            .map(SpecSummary::from)
            .collect(),
    };

    if args.json || global.quiet {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "Catalog OK: {} shell queries, {} ingestion specs",
        output.shells.len(),
        output.specs.len()
    );
    println!("\nIngestion order:");
    for spec in &output.specs {
        let mut flags = Vec::new();
        if spec.concatenate {
            flags.push("concatenate");
        }
        if spec.wrap {
            flags.push("wrap");
        }
        if spec.optional {
            flags.push("optional");
        }
        println!(
            "  {:<32} {:<10} {:<10} {}",
            spec.name,
            spec.target.as_str(),
            spec.parent.map(|p| p.as_str()).unwrap_or("-"),
            flags.join(",")
        );
        for reference in &spec.references {
            println!("      {}", reference);
        }
    }

    Ok(())
}
