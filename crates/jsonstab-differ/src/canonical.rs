//! Canonical byte serialization used for per-path content hashing.
//!
//! Object keys are written in insertion order, matching the tree model, not
//! sorted: the differ's hash must agree with the scan order used elsewhere,
//! or identical-looking trees built via different emission order would hash
//! differently.

use jsonstab_path::{Node, Value};

pub fn canonical_bytes(node: &Node) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&node.value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.raw().as_bytes()),
        Value::String(s) => write_quoted(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(&item.value, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_quoted(key, out);
                out.push(b':');
                write_value(&item.value, out);
            }
            out.push(b'}');
        }
    }
}

fn write_quoted(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn insertion_order_is_preserved_in_canonical_form() {
        let mut map = IndexMap::new();
        map.insert("b".to_string(), Node::complete(Value::Number(jsonstab_path::NumberLiteral::from_raw("1"))));
        map.insert("a".to_string(), Node::complete(Value::Number(jsonstab_path::NumberLiteral::from_raw("2"))));
        let node = Node::complete(Value::Object(map));
        let bytes = canonical_bytes(&node);
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"b":1,"a":2}"#);
    }
}
