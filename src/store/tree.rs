//! Helpers for reading and replacing subtrees of a JSON document.
//!
//! Empty objects and arrays are never stored: writing one, or deleting the
//! last child of one, removes the node entirely.

use serde_json::{Map, Value};

/// Value at `path` below `root`, if present.
pub fn get_in<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Replace the subtree at `path` with `value` (`Null` deletes it).
///
/// Returns the new document, or `None` when nothing is left.
pub fn set_in(root: Option<Value>, path: &[String], value: Value) -> Option<Value> {
    let Some((head, tail)) = path.split_first() else {
        return normalize(value);
    };

    let mut map = match root {
        Some(Value::Object(map)) => map,
        // Scalars and arrays are replaced by an object when written into
        _ => Map::new(),
    };

    let existing = map.remove(head);
    if let Some(child) = set_in(existing, tail, value) {
        map.insert(head.clone(), child);
    }

    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// Drop empty containers and nulls recursively.
fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        Value::Array(items) => (!items.is_empty()).then_some(Value::Array(items)),
        other => Some(other),
    }
}
