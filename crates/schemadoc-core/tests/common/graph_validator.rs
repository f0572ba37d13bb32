//! Graph validation utilities for integration tests.
//!
//! Checks the structural invariants every assembled schema graph must hold,
//! independent of the catalog that produced it.

#![allow(dead_code)]

use schemadoc_core::graph::{ObjectKind, SchemaGraph};
use schemadoc_core::keys;

/// Collect every invariant violation in the graph.
pub fn validate_graph(graph: &SchemaGraph) -> Vec<String> {
    let mut errors = Vec::new();

    let keys: Vec<&str> = graph.keys().collect();
    let mut sorted = keys.clone();
    sorted.sort();
    if keys != sorted {
        errors.push("keys are not iterated in ascending order".to_string());
    }

    for object in graph.iter() {
        let expected = match object.parent.as_deref().and_then(|p| graph.get(p)) {
            Some(parent) if object.kind.is_child_scoped() => keys::compound_key(
                &parent.key,
                &keys::canonical_key(object.kind, &object.name),
            ),
            _ => keys::canonical_key(object.kind, &object.name),
        };
        if object.key != expected {
            errors.push(format!("{}: key does not match {}", object.key, expected));
        }

        if let Some(parent_key) = &object.parent {
            match graph.get(parent_key) {
                None => errors.push(format!("{}: parent {} missing", object.key, parent_key)),
                Some(parent) => {
                    let page = format!(
                        "{}-{}.html#",
                        parent.kind.as_lower(),
                        keys::normalize_name(&parent.name)
                    );
                    let link = object.link.as_deref().unwrap_or_default();
                    if !link.starts_with(&page.replace(' ', "_")) {
                        errors.push(format!("{}: link {} is not on {}", object.key, link, page));
                    }
                }
            }
        }

        if object.attached {
            let Some(parent_key) = object.parent.as_deref() else {
                errors.push(format!("{}: attached without parent", object.key));
                continue;
            };
            let listings = graph
                .get(parent_key)
                .map(|parent| {
                    parent
                        .attributes
                        .iter()
                        .filter(|row| {
                            row.len() == 1
                                && row.iter().any(|a| a.value == object.key)
                        })
                        .count()
                })
                .unwrap_or(0);
            if listings != 1 {
                errors.push(format!(
                    "{}: listed {} times by its parent",
                    object.key, listings
                ));
            }
        }

        if object.kind == ObjectKind::Sequence && object.parent.is_none() {
            let link = object.link.as_deref().unwrap_or_default();
            if !link.starts_with("sequences-list.html#") {
                errors.push(format!("{}: sequence link {}", object.key, link));
            }
        }

        for row in &object.attributes {
            for attribute in row.iter() {
                if let Some(target) = &attribute.object_ref {
                    if !graph.contains(target) {
                        errors.push(format!(
                            "{}: attribute {} refers to missing {}",
                            object.key, attribute.name, target
                        ));
                    }
                }
                if attribute.visible == attribute.name.starts_with('_') {
                    errors.push(format!("{}: visibility of {}", object.key, attribute.name));
                }
            }
        }
    }

    errors
}

/// Panic with every violation listed.
pub fn assert_valid(graph: &SchemaGraph) {
    let errors = validate_graph(graph);
    assert!(
        errors.is_empty(),
        "graph has {} invariant violations:\n{}",
        errors.len(),
        errors.join("\n")
    );
}
