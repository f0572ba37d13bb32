//! Show command - One object with its attribute table and relations

use anyhow::Result;
use clap::Args;
use schemadoc_core::{ObjectKind, SchemaGraph, SchemaObject};

use super::{parse_kind, parse_parent, ParentArg, Session};
use crate::GlobalOptions;

/// Arguments for the show command
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Object kind (table, view, index, column, ...)
    #[arg(value_parser = parse_kind)]
    kind: ObjectKind,

    /// Object name
    name: String,

    /// Owning object for child-scoped kinds, as KIND:NAME
    #[arg(long, value_parser = parse_parent)]
    parent: Option<ParentArg>,

    /// Include hidden attributes
    #[arg(long)]
    all: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the show command
pub fn execute(args: ShowArgs, global: GlobalOptions) -> Result<()> {
    let session = Session::open(&global)?;
    let (graph, _) = session.build(global.quiet || args.json)?;

    let object = find_object(graph, args.kind, &args.name, args.parent.as_ref())
        .ok_or_else(|| anyhow::anyhow!("No {} named '{}'", args.kind, args.name))?;

    if args.json || global.quiet {
        println!("{}", serde_json::to_string_pretty(object)?);
        return Ok(());
    }

    print!("{}", render_object(graph, object, args.all));
    Ok(())
}

fn find_object<'g>(
    graph: &'g SchemaGraph,
    kind: ObjectKind,
    name: &str,
    parent: Option<&ParentArg>,
) -> Option<&'g SchemaObject> {
    match parent {
        Some(p) if kind.is_child_scoped() => graph.lookup_child(p.kind, &p.name, kind, name),
        _ => graph.lookup(kind, name),
    }
}

fn render_object(graph: &SchemaGraph, object: &SchemaObject, all: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", object.kind, object.name));
    out.push_str(&format!("  Key:  {}\n", object.key));
    out.push_str(&format!(
        "  Link: {}\n",
        object.link.as_deref().unwrap_or("(unresolved)")
    ));
    if let Some(parent) = graph.parent_of(&object.key) {
        out.push_str(&format!(
            "  Parent: {} {}{}\n",
            parent.kind,
            parent.name,
            if object.attached { "" } else { " (not attached)" }
        ));
    }

    if !object.attributes.is_empty() {
        out.push_str("\nAttributes:\n");
        for (i, row) in object.attributes.iter().enumerate() {
            out.push_str(&format!("  [{}]\n", i + 1));
            for attribute in row.iter().filter(|a| all || a.visible) {
                let target = attribute
                    .object_ref
                    .as_deref()
                    .map(|key| format!(" -> {}", key))
                    .unwrap_or_default();
                if attribute.preformatted {
                    out.push_str(&format!("    {}:{}\n", attribute.name, target));
                    for line in attribute.value.lines() {
                        out.push_str(&format!("      {}\n", line));
                    }
                } else {
                    out.push_str(&format!("    {}: {}{}\n", attribute.name, attribute.value, target));
                }
            }
        }
    }

    let children = graph.children(&object.key);
    if !children.is_empty() {
        out.push_str("\nChildren:\n");
        for child in children {
            out.push_str(&format!("  {} {}\n", child.kind, child.name));
        }
    }

    let referrers = graph.referrers(&object.key);
    if !referrers.is_empty() {
        out.push_str("\nReferenced by:\n");
        for referrer in referrers {
            out.push_str(&format!("  {} {}\n", referrer.kind, referrer.name));
        }
    }

    out
}
