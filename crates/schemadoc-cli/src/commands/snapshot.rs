//! Snapshot command - Record every catalog query from a live database
//!
//! The recorded snapshot replays through `--snapshot` without the database,
//! including queries that failed at recording time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use schemadoc_core::StaticIntrospector;

use super::{load_catalog, load_config, open_source, print_info, resolve_path, resolve_project};
use crate::progress::{finish_spinner, finish_spinner_warn, spinner};
use crate::GlobalOptions;

/// Arguments for the snapshot command
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Snapshot file to write
    #[arg(long, short = 'o', default_value = "catalog-snapshot.json")]
    output: PathBuf,
}

/// Execute the snapshot command
pub fn execute(args: SnapshotArgs, global: GlobalOptions) -> Result<()> {
    let project = resolve_project(&global)?;
    let config = load_config(&global, &project)?;
    if config.source.database.is_none() {
        anyhow::bail!("Snapshots are recorded from a database (pass --database)");
    }

    let catalog = load_catalog(&config, &project)?;
    let source = open_source(&config, &project)?;

    let pb = spinner(
        &format!("Recording {} queries from {}", catalog.queries().len(), source.describe()),
        global.quiet,
    );
    let recorded = StaticIntrospector::record(&*source, &catalog)
        .context("Failed to record catalog snapshot")?;

    let failed = recorded
        .snapshot()
        .results
        .values()
        .filter(|r| r.error.is_some())
        .count();
    if failed == 0 {
        finish_spinner(pb, "Recorded catalog snapshot");
    } else {
        finish_spinner_warn(
            pb,
            &format!("Recorded catalog snapshot ({} queries failed)", failed),
        );
    }

    let output = resolve_path(&project, &args.output);
    recorded
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    print_info(&format!("Wrote snapshot to {}", output.display()), global.quiet);

    Ok(())
}
