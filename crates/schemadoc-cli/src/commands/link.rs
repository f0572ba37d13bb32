//! Link command - Key and cross-reference address of an object
//!
//! Pure key computation; no catalog source is opened.

use anyhow::Result;
use clap::Args;
use schemadoc_core::{link_for, object_key, ObjectKind, ParentRef};
use serde::Serialize;

use super::{parse_kind, parse_parent, ParentArg};
use crate::GlobalOptions;

/// Arguments for the link command
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Object kind (table, view, index, column, ...)
    #[arg(value_parser = parse_kind)]
    kind: ObjectKind,

    /// Object name
    name: String,

    /// Owning object, as KIND:NAME
    #[arg(long, value_parser = parse_parent)]
    parent: Option<ParentArg>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Addressed {
    key: String,
    link: String,
}

/// Execute the link command
pub fn execute(args: LinkArgs, global: GlobalOptions) -> Result<()> {
    let parent = args.parent.as_ref().map(ParentArg::as_parent_ref);
    let addressed = address(args.kind, &args.name, parent)?;

    if args.json || global.quiet {
        println!("{}", serde_json::to_string(&addressed)?);
    } else {
        println!("Key:  {}", addressed.key);
        println!("Link: {}", addressed.link);
    }

    Ok(())
}

fn address(kind: ObjectKind, name: &str, parent: Option<ParentRef<'_>>) -> Result<Addressed> {
    Ok(Addressed {
        key: object_key(kind, name, parent),
        link: link_for(kind, name, parent)?,
    })
}
