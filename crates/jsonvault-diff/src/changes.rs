//! Document-level diff: compare two JSON documents.
//!
//! Objects are walked key by key and nested objects are recursed into, so a
//! change deep inside a document is reported at its full dotted path. Arrays
//! and scalars are opaque leaves: they are either equal or `modified`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::equality::values_equal;

/// Path reported when the document root itself changes and is not an object.
pub const ROOT_PATH: &str = "root";

/// The result of comparing two JSON documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Paths present in the new document but not the old one.
    pub added: Vec<String>,
    /// Paths present in the old document but not the new one.
    pub removed: Vec<String>,
    /// Paths whose scalar or array value differs.
    pub modified: Vec<String>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed paths.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

/// Compute the change set between two documents.
///
/// Keys are visited in the old object's order followed by keys that only
/// appear in the new object, so the output is deterministic for a given pair
/// of inputs.
pub fn compute_changes(old: &Value, new: &Value) -> ChangeSet {
    let mut changes = ChangeSet::new();
    walk(old, new, None, &mut changes);
    changes
}

fn walk(old: &Value, new: &Value, path: Option<&str>, out: &mut ChangeSet) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            walk_objects(old_map, new_map, path, out);
        }
        _ => {
            if !values_equal(old, new) {
                out.modified.push(path.unwrap_or(ROOT_PATH).to_string());
            }
        }
    }
}

fn walk_objects(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    path: Option<&str>,
    out: &mut ChangeSet,
) {
    for (key, old_val) in old {
        let child = child_path(path, key);
        match new.get(key) {
            Some(new_val) => walk(old_val, new_val, Some(&child), out),
            None => out.removed.push(child),
        }
    }

    for key in new.keys() {
        if !old.contains_key(key) {
            out.added.push(child_path(path, key));
        }
    }
}

fn child_path(parent: Option<&str>, key: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}.{key}"),
        None => key.to_string(),
    }
}
