//! Partial-update merging.
//!
//! A patch payload is a sparse JSON object keyed by asset field name. Only
//! keys present in the payload are applied, each through its own entry in
//! [`FIELD_PATCHERS`]. Entries of the wrong shape are dropped silently.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::trace;

use catalog_types::{Asset, AssetType, Owner};

type FieldPatcher = fn(&mut Asset, &Value);

/// Field name to apply function.
const FIELD_PATCHERS: &[(&str, FieldPatcher)] = &[
    ("urn", patch_urn),
    ("type", patch_type),
    ("service", patch_service),
    ("name", patch_name),
    ("description", patch_description),
    ("labels", patch_labels),
    ("owners", patch_owners),
    ("data", patch_data),
];

/// Apply `payload` to a copy of `asset` and return the result.
pub fn patch(asset: &Asset, payload: &Map<String, Value>) -> Asset {
    let mut patched = asset.clone();
    patch_asset(&mut patched, payload);
    patched
}

/// Apply `payload` to `asset` in place.
pub fn patch_asset(asset: &mut Asset, payload: &Map<String, Value>) {
    for (field, apply) in FIELD_PATCHERS {
        if let Some(value) = payload.get(*field) {
            trace!(field, "Applying patch field");
            apply(asset, value);
        }
    }
}

fn patch_string(target: &mut String, value: &Value) {
    if let Value::String(s) = value {
        *target = s.clone();
    }
}

fn patch_urn(asset: &mut Asset, value: &Value) {
    patch_string(&mut asset.urn, value);
}

fn patch_service(asset: &mut Asset, value: &Value) {
    patch_string(&mut asset.service, value);
}

fn patch_name(asset: &mut Asset, value: &Value) {
    patch_string(&mut asset.name, value);
}

fn patch_description(asset: &mut Asset, value: &Value) {
    patch_string(&mut asset.description, value);
}

fn patch_labels(asset: &mut Asset, value: &Value) {
    asset.labels = build_labels(value);
}

fn patch_owners(asset: &mut Asset, value: &Value) {
    asset.owners = build_owners(value);
}

fn patch_type(asset: &mut Asset, value: &Value) {
    if let Some(ty) = value.as_str().and_then(AssetType::parse) {
        asset.asset_type = ty;
    }
}

fn build_labels(value: &Value) -> BTreeMap<String, String> {
    let Value::Object(map) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

fn build_owners(value: &Value) -> Vec<Owner> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            let field = |key: &str| {
                obj.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Owner {
                id: field("id"),
                email: field("email"),
                provider: field("provider"),
            }
        })
        .collect()
}

fn patch_data(asset: &mut Asset, value: &Value) {
    let Value::Object(incoming) = value else {
        return;
    };
    if asset.data.is_empty() {
        asset.data = incoming.clone();
        return;
    }
    merge_maps(&mut asset.data, incoming);
}

/// Deep merge: nested objects on both sides merge recursively, anything else
/// from `src` overwrites `dst`.
fn merge_maps(dst: &mut Map<String, Value>, src: &Map<String, Value>) {
    for (key, incoming) in src {
        match (dst.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_maps(existing, nested),
            _ => {
                dst.insert(key.clone(), incoming.clone());
            }
        }
    }
}
