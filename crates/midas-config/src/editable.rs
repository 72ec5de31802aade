use crate::settings::is_sensitive_path;
use serde::Serialize;
use serde_json::Value;

/// One leaf of the editable config surface: a dotted path, its JSON type
/// name, and its current value (spec §9: "a flat list of `{path, type,
/// value}` entries produced by a schema walk").
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EditableEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: Value,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Walks a JSON tree and emits one entry per leaf (objects recurse,
/// everything else is a leaf), skipping sensitive dotted paths entirely.
pub fn walk_editable(value: &Value, prefix: &str, out: &mut Vec<EditableEntry>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                if is_sensitive_path(&path) {
                    continue;
                }
                walk_editable(child, &path, out);
            }
        }
        leaf => out.push(EditableEntry {
            path: prefix.to_string(),
            value_type: type_name(leaf).to_string(),
            value: leaf.clone(),
        }),
    }
}

/// Collects every dotted path present in a patch document, so
/// `apply_patch` can reject attempts to touch sensitive fields before
/// ever merging them in.
pub fn collect_paths(value: &Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                out.push(path.clone());
                collect_paths(child, &path, out);
            }
        }
        _ => {}
    }
}

/// Deep-merges `patch` into `base` in place, overwriting scalars/arrays
/// and recursing into nested objects.
pub fn deep_merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                deep_merge(
                    base_map.entry(key.clone()).or_insert(Value::Null),
                    patch_value,
                );
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
        }
    }
}
