//! The Conservative and Smart diff algorithms.

use jsonstab_config::DiffMode;
use jsonstab_path::{Node, Path, Value};

use crate::ops::{sketch, ChangeOp};

/// `diff(old_tree, new_tree, root_path) -> ordered list of ChangeOps`.
#[must_use]
pub fn diff(old: &Node, new: &Node, root_path: &Path, mode: DiffMode) -> Vec<ChangeOp> {
    let mut out = Vec::new();
    match mode {
        DiffMode::Conservative => {
            if old.value != new.value {
                out.push(ChangeOp::Replace {
                    path: root_path.clone(),
                    old_value_sketch: sketch(old),
                    new_value: new.clone(),
                });
            }
        }
        DiffMode::Smart => diff_node(old, new, root_path, &mut out),
    }
    out
}

fn diff_node(old: &Node, new: &Node, path: &Path, out: &mut Vec<ChangeOp>) {
    match (&old.value, &new.value) {
        (Value::Object(o), Value::Object(n)) => diff_object(o, n, path, out),
        (Value::Array(o), Value::Array(n)) => diff_array(o, n, path, out),
        (a, b) if a.is_scalar() && b.is_scalar() => {
            if a != b {
                out.push(ChangeOp::Replace {
                    path: path.clone(),
                    old_value_sketch: sketch(old),
                    new_value: new.clone(),
                });
            }
        }
        _ => {
            if old.value != new.value {
                out.push(ChangeOp::Replace {
                    path: path.clone(),
                    old_value_sketch: sketch(old),
                    new_value: new.clone(),
                });
            }
        }
    }
}

fn diff_object(
    old: &indexmap::IndexMap<String, Node>,
    new: &indexmap::IndexMap<String, Node>,
    path: &Path,
    out: &mut Vec<ChangeOp>,
) {
    for (key, old_child) in old {
        match new.get(key) {
            Some(new_child) => diff_node(old_child, new_child, &path.child_key(key.clone()), out),
            None => out.push(ChangeOp::Remove {
                path: path.child_key(key.clone()),
                old_value_sketch: sketch(old_child),
            }),
        }
    }
    for (key, new_child) in new {
        if !old.contains_key(key) {
            out.push(ChangeOp::Add {
                path: path.child_key(key.clone()),
                value: new_child.clone(),
            });
        }
    }
}

/// Arrays below this length use LCS-bounded matching; longer arrays fall
/// back to positional alignment only.
const LCS_THRESHOLD: usize = 64;

fn diff_array(old: &[Node], new: &[Node], path: &Path, out: &mut Vec<ChangeOp>) {
    if old.len() <= LCS_THRESHOLD && new.len() <= LCS_THRESHOLD {
        diff_array_lcs(old, new, path, out);
    } else {
        diff_array_positional(old, new, path, out);
    }
}

fn diff_array_positional(old: &[Node], new: &[Node], path: &Path, out: &mut Vec<ChangeOp>) {
    let common = old.len().min(new.len());
    for i in 0..common {
        diff_node(&old[i], &new[i], &path.child_index(i), out);
    }
    for i in common..old.len() {
        out.push(ChangeOp::Remove {
            path: path.child_index(i),
            old_value_sketch: sketch(&old[i]),
        });
    }
    for i in common..new.len() {
        out.push(ChangeOp::Add {
            path: path.child_index(i),
            value: new[i].clone(),
        });
    }
}

/// Longest-common-subsequence alignment: matched elements (exactly equal,
/// not recursively diffed) are left untouched; gaps become `Remove`/`Add`
/// runs at their respective old/new index.
fn diff_array_lcs(old: &[Node], new: &[Node], path: &Path, out: &mut Vec<ChangeOp>) {
    let pairs = lcs_pairs(old, new);
    let mut oi = 0usize;
    let mut ni = 0usize;
    for (pi, pj) in pairs {
        while oi < pi {
            out.push(ChangeOp::Remove {
                path: path.child_index(oi),
                old_value_sketch: sketch(&old[oi]),
            });
            oi += 1;
        }
        while ni < pj {
            out.push(ChangeOp::Add {
                path: path.child_index(ni),
                value: new[ni].clone(),
            });
            ni += 1;
        }
        // matched element, no-op
        oi += 1;
        ni += 1;
    }
    while oi < old.len() {
        out.push(ChangeOp::Remove {
            path: path.child_index(oi),
            old_value_sketch: sketch(&old[oi]),
        });
        oi += 1;
    }
    while ni < new.len() {
        out.push(ChangeOp::Add {
            path: path.child_index(ni),
            value: new[ni].clone(),
        });
        ni += 1;
    }
}

fn lcs_pairs(old: &[Node], new: &[Node]) -> Vec<(usize, usize)> {
    let n = old.len();
    let m = new.len();
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if old[i] == new[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonstab_path::NumberLiteral;

    fn num(n: &str) -> Node {
        Node::complete(Value::Number(NumberLiteral::from_raw(n)))
    }

    fn string(s: &str) -> Node {
        Node::complete(Value::String(s.to_string()))
    }

    #[test]
    fn equal_scalars_emit_nothing() {
        let ops = diff(&num("1"), &num("1"), &Path::root(), DiffMode::Smart);
        assert!(ops.is_empty());
    }

    #[test]
    fn unequal_scalars_emit_replace() {
        let ops = diff(&num("1"), &num("2"), &Path::root(), DiffMode::Smart);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], ChangeOp::Replace { .. }));
    }

    #[test]
    fn conservative_mode_emits_single_replace_at_root() {
        let mut old_map = indexmap::IndexMap::new();
        old_map.insert("a".to_string(), num("1"));
        let mut new_map = indexmap::IndexMap::new();
        new_map.insert("a".to_string(), num("2"));
        new_map.insert("b".to_string(), num("3"));
        let old = Node::complete(Value::Object(old_map));
        let new = Node::complete(Value::Object(new_map));
        let ops = diff(&old, &new, &Path::root(), DiffMode::Conservative);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].path(), &Path::root());
    }

    #[test]
    fn object_diff_emits_add_for_new_key_preserving_union_order() {
        let mut old_map = indexmap::IndexMap::new();
        old_map.insert("a".to_string(), num("1"));
        let mut new_map = indexmap::IndexMap::new();
        new_map.insert("a".to_string(), num("1"));
        new_map.insert("b".to_string(), num("2"));
        let old = Node::complete(Value::Object(old_map));
        let new = Node::complete(Value::Object(new_map));
        let ops = diff(&old, &new, &Path::root(), DiffMode::Smart);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], ChangeOp::Add { .. }));
        assert_eq!(ops[0].path(), &Path::root().child_key("b"));
    }

    #[test]
    fn object_diff_emits_remove_for_missing_key() {
        let mut old_map = indexmap::IndexMap::new();
        old_map.insert("a".to_string(), num("1"));
        old_map.insert("b".to_string(), num("2"));
        let mut new_map = indexmap::IndexMap::new();
        new_map.insert("a".to_string(), num("1"));
        let old = Node::complete(Value::Object(old_map));
        let new = Node::complete(Value::Object(new_map));
        let ops = diff(&old, &new, &Path::root(), DiffMode::Smart);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], ChangeOp::Remove { .. }));
    }

    #[test]
    fn array_append_emits_only_adds_for_new_elements() {
        let old = Node::complete(Value::Array(vec![string("a")]));
        let new = Node::complete(Value::Array(vec![string("a"), string("b")]));
        let ops = diff(&old, &new, &Path::root(), DiffMode::Smart);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].path(), &Path::root().child_index(1));
        assert!(matches!(ops[0], ChangeOp::Add { .. }));
    }

    #[test]
    fn array_diff_matches_unchanged_elements_via_lcs() {
        let old = Node::complete(Value::Array(vec![string("a"), string("b"), string("c")]));
        let new = Node::complete(Value::Array(vec![string("a"), string("x"), string("b"), string("c")]));
        let ops = diff(&old, &new, &Path::root(), DiffMode::Smart);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], ChangeOp::Add { .. }));
        assert_eq!(ops[0].path(), &Path::root().child_index(1));
    }

    #[test]
    fn mismatched_kinds_emit_replace() {
        let old = num("1");
        let new = Node::complete(Value::String("1".to_string()));
        let ops = diff(&old, &new, &Path::root(), DiffMode::Smart);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], ChangeOp::Replace { .. }));
    }
}
