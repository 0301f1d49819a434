//! Converting a strictly-parsed `serde_json::Value` into the workspace's own
//! [`Node`] tree, and merging a freshly parsed tree into a committed one.

use indexmap::IndexMap;
use jsonstab_path::{Node, NumberLiteral, Value};

/// Build a fully-`complete` [`Node`] tree from a strict parse result.
///
/// The workspace enables `arbitrary_precision` and `preserve_order` on
/// `serde_json` specifically so this conversion is lossless: numbers keep
/// their exact source text and object keys keep insertion order.
#[must_use]
pub fn from_serde_value(value: serde_json::Value) -> Node {
    Node::complete(convert(value))
}

fn convert(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(NumberLiteral::from_raw(n.to_string())),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(|v| Node::complete(convert(v))).collect()),
        serde_json::Value::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(k, Node::complete(convert(v)));
            }
            Value::Object(out)
        }
    }
}

/// Merge a newly parsed tree into the previously committed one.
///
/// New data wins wherever it is present and at least as rich as the old
/// data (a longer array, an object key that now exists, a differing
/// scalar). A key or element present only in `old` is retained, since
/// absence mid-stream means "more to come", not "removed".
#[must_use]
pub fn merge(old: &Node, new: &Node) -> Node {
    match (&old.value, &new.value) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let mut merged = IndexMap::new();
            for (key, old_child) in old_map {
                match new_map.get(key) {
                    Some(new_child) => {
                        merged.insert(key.clone(), merge(old_child, new_child));
                    }
                    None => {
                        merged.insert(key.clone(), old_child.clone());
                    }
                }
            }
            for (key, new_child) in new_map {
                if !old_map.contains_key(key) {
                    merged.insert(key.clone(), new_child.clone());
                }
            }
            Node {
                value: Value::Object(merged),
                complete: new.complete,
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            if new_items.len() >= old_items.len() {
                let mut merged = Vec::with_capacity(new_items.len());
                for (idx, new_child) in new_items.iter().enumerate() {
                    match old_items.get(idx) {
                        Some(old_child) => merged.push(merge(old_child, new_child)),
                        None => merged.push(new_child.clone()),
                    }
                }
                Node {
                    value: Value::Array(merged),
                    complete: new.complete,
                }
            } else {
                // The stream never shrinks an array; a shorter `new` means
                // the caller handed us a stale or partial reparse. Keep what
                // we already committed.
                old.clone()
            }
        }
        _ => new.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn convert_preserves_number_source_text() {
        let node = from_serde_value(json!({"price": 1.50}));
        let Value::Object(map) = &node.value else { panic!("expected object") };
        let Value::Number(n) = &map["price"].value else { panic!("expected number") };
        assert_eq!(n.raw(), "1.50");
    }

    #[test]
    fn convert_preserves_object_key_order() {
        let node = from_serde_value(json!({"z": 1, "a": 2}));
        let Value::Object(map) = &node.value else { panic!("expected object") };
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn merge_new_object_key_wins_over_old_absence() {
        let old = from_serde_value(json!({"name": "Alice"}));
        let new = from_serde_value(json!({"name": "Alice", "age": 30}));
        let merged = merge(&old, &new);
        let Value::Object(map) = &merged.value else { panic!("expected object") };
        assert!(map.contains_key("age"));
    }

    #[test]
    fn merge_retains_old_key_absent_from_new() {
        let old = from_serde_value(json!({"name": "Alice", "age": 30}));
        let new = from_serde_value(json!({"name": "Alice"}));
        let merged = merge(&old, &new);
        let Value::Object(map) = &merged.value else { panic!("expected object") };
        assert_eq!(map["age"].value, Value::Number(NumberLiteral::from_raw("30")));
    }

    #[test]
    fn merge_array_grows_with_new_elements() {
        let old = from_serde_value(json!([1, 2]));
        let new = from_serde_value(json!([1, 2, 3]));
        let merged = merge(&old, &new);
        let Value::Array(items) = &merged.value else { panic!("expected array") };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn merge_shorter_new_array_keeps_old() {
        let old = from_serde_value(json!([1, 2, 3]));
        let new = from_serde_value(json!([1, 2]));
        let merged = merge(&old, &new);
        let Value::Array(items) = &merged.value else { panic!("expected array") };
        assert_eq!(items.len(), 3);
    }
}
