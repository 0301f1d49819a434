//! The JSON value model shared by the parser, completer, and differ.

use indexmap::IndexMap;

use crate::path::{Path, PathSegment};

/// A numeric literal that preserves its original source text.
///
/// LLM-emitted numbers are re-serialized verbatim where possible so that a
/// value like `1.50` does not silently become `1.5`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    raw: String,
}

impl NumberLiteral {
    /// Construct from the exact source text. Callers are responsible for
    /// only passing text that is lexically a valid JSON number.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.raw.parse().ok()
    }
}

impl std::fmt::Display for NumberLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The variant payload of a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(NumberLiteral),
    String(String),
    Array(Vec<Node>),
    /// Insertion-ordered: LLMs emit keys in a meaningful order, and both the
    /// differ's scan order and the content hash depend on preserving it.
    Object(IndexMap<String, Node>),
}

impl Value {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_))
    }
}

/// One node of a [`PartialTree`]: a value plus whether the stream has
/// closed it off from further extension.
///
/// `complete = false` means "observed so far but still open to extension" —
/// e.g. a string that may gain more characters, or an array that may gain
/// more elements, before the session finalizes.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub value: Value,
    pub complete: bool,
}

impl Node {
    #[must_use]
    pub fn complete(value: Value) -> Self {
        Self {
            value,
            complete: true,
        }
    }

    #[must_use]
    pub fn open(value: Value) -> Self {
        Self {
            value,
            complete: false,
        }
    }

    #[must_use]
    pub fn null() -> Self {
        Self::complete(Value::Null)
    }
}

/// Alias used at call sites where "the tree" reads more naturally than
/// "the root node".
pub type PartialTree = Node;

/// Result of [`get`]: `found` is false whenever any intermediate segment is
/// missing or of the wrong kind. Traversal never panics or raises on
/// absence.
pub struct Lookup<'a> {
    pub found: bool,
    pub value: Option<&'a Node>,
}

/// Traverse a tree by path, returning `(found, value)` semantics via
/// [`Lookup`].
#[must_use]
pub fn get<'a>(root: &'a Node, path: &Path) -> Lookup<'a> {
    let mut current = root;
    for segment in path.segments() {
        let next = match (&current.value, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key),
            (Value::Array(items), PathSegment::Index(idx)) => items.get(*idx),
            _ => None,
        };
        match next {
            Some(node) => current = node,
            None => return Lookup { found: false, value: None },
        }
    }
    Lookup {
        found: true,
        value: Some(current),
    }
}

/// Enumerate every leaf path of a tree in canonical scan order: depth-first,
/// object keys in insertion order, array indices ascending. This is the
/// scan order used by the differ and by coalescer flush ordering.
#[must_use]
pub fn enumerate_leaves(root: &Node) -> Vec<(Path, &Node)> {
    let mut out = Vec::new();
    walk_leaves(root, Path::root(), &mut out);
    out
}

fn walk_leaves<'a>(node: &'a Node, path: Path, out: &mut Vec<(Path, &'a Node)>) {
    match &node.value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                walk_leaves(child, path.child_key(key.clone()), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (idx, child) in items.iter().enumerate() {
                walk_leaves(child, path.child_index(idx), out);
            }
        }
        _ => out.push((path, node)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Node {
        let mut alice = IndexMap::new();
        alice.insert("name".to_string(), Node::complete(Value::String("Alice".into())));
        let mut bob = IndexMap::new();
        bob.insert("name".to_string(), Node::complete(Value::String("Bob".into())));

        let mut users = IndexMap::new();
        users.insert(
            "users".to_string(),
            Node::complete(Value::Array(vec![
                Node::complete(Value::Object(alice)),
                Node::complete(Value::Object(bob)),
            ])),
        );
        let mut api = IndexMap::new();
        api.insert("api".to_string(), Node::complete(Value::Object(users)));
        Node::complete(Value::Object(api))
    }

    #[test]
    fn traverse_found_path() {
        let tree = sample_tree();
        let path = crate::path::parse("api.users[1].name", crate::path::PathStyle::Dot).unwrap();
        let result = get(&tree, &path);
        assert!(result.found);
        assert_eq!(result.value.unwrap().value, Value::String("Bob".into()));
    }

    #[test]
    fn traverse_missing_index_not_found() {
        let tree = sample_tree();
        let path = crate::path::parse("api.users[5].name", crate::path::PathStyle::Dot).unwrap();
        let result = get(&tree, &path);
        assert!(!result.found);
        assert!(result.value.is_none());
    }

    #[test]
    fn traverse_wrong_kind_not_found() {
        let tree = sample_tree();
        // "api" is an object, indexing into it as an array must fail cleanly.
        let path = Path::root().child_key("api").child_index(0);
        let result = get(&tree, &path);
        assert!(!result.found);
    }

    #[test]
    fn enumerate_leaves_is_depth_first_in_insertion_order() {
        let tree = sample_tree();
        let leaves = enumerate_leaves(&tree);
        let rendered: Vec<String> = leaves
            .iter()
            .map(|(p, _)| crate::path::render(p, crate::path::PathStyle::Dot))
            .collect();
        assert_eq!(
            rendered,
            vec!["api.users[0].name".to_string(), "api.users[1].name".to_string()]
        );
    }

    #[test]
    fn number_literal_preserves_source_text() {
        let n = NumberLiteral::from_raw("1.50");
        assert_eq!(n.raw(), "1.50");
        assert_eq!(n.as_f64(), Some(1.5));
        assert_eq!(n.to_string(), "1.50");
    }
}
