//! Minimal get/set over `serde_json::Value` by canonical [`Path`], used only
//! to apply schema-hook suggestions. This intentionally does not use
//! the workspace's own [`jsonstab_path::Node`] tree model, to avoid a
//! dependency cycle with the streaming parser that builds it.

use jsonstab_path::{Path, PathSegment};
use serde_json::Value;

#[must_use]
pub fn get_in<'a>(value: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.segments() {
        current = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key)?,
            (Value::Array(items), PathSegment::Index(idx)) => items.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

pub fn set_in(value: &mut Value, path: &Path, new_value: Value) -> bool {
    if path.is_empty() {
        *value = new_value;
        return true;
    }
    let segments = path.segments();
    let mut current = value;
    for segment in &segments[..segments.len() - 1] {
        current = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => match map.get_mut(key) {
                Some(v) => v,
                None => return false,
            },
            (Value::Array(items), PathSegment::Index(idx)) => match items.get_mut(*idx) {
                Some(v) => v,
                None => return false,
            },
            _ => return false,
        };
    }
    match (current, segments.last().expect("checked non-empty above")) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), new_value);
            true
        }
        (Value::Array(items), PathSegment::Index(idx)) if *idx < items.len() => {
            items[*idx] = new_value;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set_through_nested_path() {
        let mut value: Value = serde_json::json!({"a": {"b": [1, 2, 3]}});
        let path = Path::root().child_key("a").child_key("b").child_index(1);
        assert_eq!(get_in(&value, &path), Some(&serde_json::json!(2)));
        assert!(set_in(&mut value, &path, serde_json::json!(99)));
        assert_eq!(get_in(&value, &path), Some(&serde_json::json!(99)));
    }

    #[test]
    fn missing_path_is_none() {
        let value: Value = serde_json::json!({"a": 1});
        let path = Path::root().child_key("missing");
        assert_eq!(get_in(&value, &path), None);
    }
}
