//! Canonical keys and cross-reference links.
//!
//! Keys identify objects inside the graph; links address them in the rendered
//! document set. Both are pure functions of (kind, name, parent).
//!
//! Keys are case-insensitive: the name is lower-cased and the path-unsafe
//! characters `\`, `/` and `:` become `_`. As a consequence `Emp/A` and
//! `EMP:a` share the key `table.emp_a`. During shell creation the last object
//! wins the key under the default `overwrite` policy.

use thiserror::Error;

use crate::graph::ObjectKind;

/// Separator between key segments
pub const KEY_SEPARATOR: char = '.';

const UNSAFE_CHARS: [char; 3] = ['\\', '/', ':'];

/// Errors raised while deriving keys or links.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("cannot derive a link for a {kind} without a name")]
    MissingName { kind: ObjectKind },
}

/// Kind and display name of an owning object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRef<'a> {
    pub kind: ObjectKind,
    pub name: &'a str,
}

impl<'a> ParentRef<'a> {
    pub fn new(kind: ObjectKind, name: &'a str) -> Self {
        Self { kind, name }
    }
}

/// Lower-case a name and replace path-unsafe characters.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// `kind.name`, normalized.
///
/// ```
/// use schemadoc_core::{canonical_key, ObjectKind};
/// assert_eq!(canonical_key(ObjectKind::Table, "Employees"), "table.employees");
/// ```
pub fn canonical_key(kind: ObjectKind, name: &str) -> String {
    format!("{}{}{}", kind.as_lower(), KEY_SEPARATOR, normalize_name(name))
}

/// Join a parent key and a local key.
pub fn compound_key(parent_key: &str, local_key: &str) -> String {
    format!("{parent_key}{KEY_SEPARATOR}{local_key}")
}

/// Key of an object, compound for child-scoped kinds under a known parent.
pub fn object_key(kind: ObjectKind, name: &str, parent: Option<ParentRef<'_>>) -> String {
    match parent {
        Some(p) if kind.is_child_scoped() => {
            compound_key(&canonical_key(p.kind, p.name), &canonical_key(kind, name))
        }
        _ => canonical_key(kind, name),
    }
}

fn page_name(kind: ObjectKind, name: &str) -> String {
    format!("{}-{}.html", kind.as_lower(), normalize_name(name))
}

/// Cross-reference address of an object.
///
/// Precedence: an object with a parent is an anchor on the parent's page;
/// listing-only kinds are anchors on the shared listing page; everything else
/// gets its own page. Spaces in the result become `_`.
pub fn link_for(
    kind: ObjectKind,
    name: &str,
    parent: Option<ParentRef<'_>>,
) -> Result<String, KeyError> {
    if name.trim().is_empty() {
        return Err(KeyError::MissingName { kind });
    }

    let link = match parent {
        Some(p) => format!(
            "{}#{}-{}",
            page_name(p.kind, p.name),
            kind.anchor_prefix(),
            normalize_name(name)
        ),
        None if kind.is_listing_only() => format!(
            "{}-list.html#{}",
            kind.plural().to_lowercase(),
            name.to_uppercase()
        ),
        None => page_name(kind, name),
    };

    Ok(link.replace(' ', "_"))
}
