//! Structural diff between two asset snapshots.
//!
//! Identity fields (`id`, `urn`, `type`, `service`) and bookkeeping fields
//! (`version`, `updated_by`, timestamps) never take part in the comparison.
//! The remaining fields are compared in declaration order:
//! `name`, `description`, `data`, `labels`, `owners`.
//!
//! Nested values are walked as generic JSON trees. Mapping keys are visited in
//! lexical order and arrays are compared position by position, so the same
//! pair of snapshots always yields the same changelog.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use catalog_types::{Asset, CatalogError, Change, ChangeKind, Changelog};

/// Compute the changelog that turns `old` into `new`.
///
/// Returns an empty changelog when the compared fields are equal.
pub fn diff(old: &Asset, new: &Asset) -> Result<Changelog, CatalogError> {
    let mut changelog = Changelog::new();

    diff_scalar("name", &old.name, &new.name, &mut changelog);
    diff_scalar("description", &old.description, &new.description, &mut changelog);

    let mut path = vec!["data".to_string()];
    diff_maps(&mut path, &old.data, &new.data, &mut changelog);

    let old_labels = serde_json::to_value(&old.labels)?;
    let new_labels = serde_json::to_value(&new.labels)?;
    let mut path = vec!["labels".to_string()];
    walk(&mut path, &old_labels, &new_labels, &mut changelog);

    let old_owners = serde_json::to_value(&old.owners)?;
    let new_owners = serde_json::to_value(&new.owners)?;
    let mut path = vec!["owners".to_string()];
    walk(&mut path, &old_owners, &new_owners, &mut changelog);

    debug!(urn = %new.urn, changes = changelog.len(), "Computed asset diff");
    Ok(changelog)
}

/// Diff two arbitrary JSON trees, with paths relative to their roots.
pub fn diff_values(old: &Value, new: &Value) -> Changelog {
    let mut changelog = Changelog::new();
    let mut path = Vec::new();
    walk(&mut path, old, new, &mut changelog);
    changelog
}

// An empty string is the zero value of a top-level text field, so filling it
// reads as a creation and clearing it as a deletion.
fn diff_scalar(field: &str, old: &str, new: &str, out: &mut Changelog) {
    if old == new {
        return;
    }
    let kind = if old.is_empty() {
        ChangeKind::Create
    } else if new.is_empty() {
        ChangeKind::Delete
    } else {
        ChangeKind::Update
    };
    out.push(Change {
        kind,
        path: vec![field.to_string()],
        from: Value::String(old.to_string()),
        to: Value::String(new.to_string()),
    });
}

fn walk(path: &mut Vec<String>, old: &Value, new: &Value, out: &mut Changelog) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => diff_maps(path, a, b, out),
        (Value::Array(a), Value::Array(b)) => diff_arrays(path, a, b, out),
        _ => out.push(Change::update(path.clone(), old.clone(), new.clone())),
    }
}

fn diff_maps(
    path: &mut Vec<String>,
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    out: &mut Changelog,
) {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    for key in keys {
        path.push(key.clone());
        match (old.get(key), new.get(key)) {
            (Some(a), Some(b)) => walk(path, a, b, out),
            (None, Some(b)) => out.push(Change::create(path.clone(), b.clone())),
            (Some(a), None) => out.push(Change::delete(path.clone(), a.clone())),
            (None, None) => {}
        }
        path.pop();
    }
}

fn diff_arrays(path: &mut Vec<String>, old: &[Value], new: &[Value], out: &mut Changelog) {
    for i in 0..old.len().max(new.len()) {
        path.push(i.to_string());
        match (old.get(i), new.get(i)) {
            (Some(a), Some(b)) => walk(path, a, b, out),
            (None, Some(b)) => out.push(Change::create(path.clone(), b.clone())),
            (Some(a), None) => out.push(Change::delete(path.clone(), a.clone())),
            (None, None) => {}
        }
        path.pop();
    }
}
