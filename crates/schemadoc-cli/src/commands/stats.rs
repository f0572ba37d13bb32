//! Stats command - Graph statistics and the build report

use anyhow::Result;
use clap::Args;
use schemadoc_core::{BuildReport, GraphStats, QueryOutcome};
use serde::Serialize;

use super::Session;
use crate::GlobalOptions;

/// Arguments for the stats command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// List every ingestion query with its row counts
    #[arg(long)]
    queries: bool,
}

#[derive(Debug, Serialize)]
struct StatsOutput<'a> {
    graph: GraphStats,
    report: &'a BuildReport,
}

/// Execute the stats command
pub fn execute(args: StatsArgs, global: GlobalOptions) -> Result<()> {
    let session = Session::open(&global)?;
    let (graph, report) = session.build(global.quiet || args.json)?;
    let stats = graph.stats();

    if args.json || global.quiet {
        // Machine-readable
        let output = StatsOutput {
            graph: stats,
            report,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Graph Statistics");
    println!("================");
    println!("Objects: {}", stats.objects);
    println!("Attached children: {}", stats.attached);
    println!("Contains edges: {}", stats.contains_edges);
    println!("Reference edges: {}", stats.reference_edges);
    println!("Unresolved links: {}", stats.unresolved_links);

    println!("\nObjects by kind:");
    for (kind, count) in &stats.by_kind {
        println!("  {}: {}", kind, count);
    }

    println!("\nBuild Report");
    println!("============");
    println!("Shells created: {}", report.shells_created);
    println!("Duplicate keys: {}", report.duplicate_keys);
    println!("Rows dropped: {}", report.rows_dropped());

    let failures: Vec<(&str, &str)> = report.failures().collect();
    if failures.is_empty() {
        println!("Failed queries: none");
    } else {
        println!("Failed queries:");
        for (name, error) in failures {
            println!("  {}: {}", name, error);
        }
    }

    if args.queries {
        println!("\nIngestion queries:");
        for spec in &report.specs {
            println!(
                "  {:<32} {:<10} read {:>5}  applied {:>5}  dropped {:>4}  {}",
                spec.name,
                spec.target.as_str(),
                spec.rows_read,
                spec.rows_applied,
                spec.rows_dropped,
                outcome_label(&spec.outcome)
            );
        }
    }

    Ok(())
}

fn outcome_label(outcome: &QueryOutcome) -> &'static str {
    match outcome {
        QueryOutcome::Completed => "ok",
        QueryOutcome::Failed { .. } => "failed",
        QueryOutcome::Unavailable { .. } => "unavailable",
    }
}
