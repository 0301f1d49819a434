//! Per-session path-level memory for idempotent emission.

use std::collections::HashMap;

use jsonstab_path::{Node, Path};
use jsonstab_utils::hash::content_hash_u64;

use crate::canonical::canonical_bytes;
use crate::ops::ChangeOp;

#[derive(Debug, Clone, Copy)]
struct PathRecord {
    content_hash: u64,
    last_emitted_version: u64,
}

/// Tracks the last-emitted content hash per path so repeated diffs against
/// unchanged trees produce no events.
#[derive(Debug, Default)]
pub struct DiffEngineState {
    records: HashMap<Path, PathRecord>,
    version_counter: u64,
}

impl DiffEngineState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn node_hash(op: &ChangeOp) -> Option<u64> {
        match op {
            ChangeOp::Add { value, .. } | ChangeOp::Replace { new_value: value, .. } => {
                Some(content_hash_u64(&canonical_bytes(value)))
            }
            ChangeOp::Remove { .. } => None,
        }
    }

    /// Drop ops whose target path's content hash already matches what was
    /// last emitted; update the stored hash for every op that survives.
    pub fn filter_novel(&mut self, ops: Vec<ChangeOp>) -> Vec<ChangeOp> {
        let mut survivors = Vec::with_capacity(ops.len());
        for op in ops {
            let path = op.path().clone();
            match Self::node_hash(&op) {
                Some(hash) => {
                    let is_duplicate = self
                        .records
                        .get(&path)
                        .is_some_and(|record| record.content_hash == hash);
                    if is_duplicate {
                        continue;
                    }
                    self.version_counter += 1;
                    self.records.insert(
                        path,
                        PathRecord {
                            content_hash: hash,
                            last_emitted_version: self.version_counter,
                        },
                    );
                    survivors.push(op);
                }
                None => {
                    // Remove: always novel unless the path was never recorded
                    // (nothing to remove, so there is nothing to duplicate).
                    if self.records.remove(&path).is_some() {
                        self.version_counter += 1;
                        survivors.push(op);
                    }
                }
            }
        }
        survivors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonstab_path::{NumberLiteral, Value};

    fn num(n: &str) -> Node {
        Node::complete(Value::Number(NumberLiteral::from_raw(n)))
    }

    #[test]
    fn second_identical_diff_call_produces_no_events() {
        let mut state = DiffEngineState::new();
        let op = ChangeOp::Add {
            path: Path::root().child_key("a"),
            value: num("1"),
        };
        let first = state.filter_novel(vec![op.clone()]);
        assert_eq!(first.len(), 1);
        let second = state.filter_novel(vec![op]);
        assert!(second.is_empty());
    }

    #[test]
    fn changed_value_at_same_path_passes_through() {
        let mut state = DiffEngineState::new();
        let path = Path::root().child_key("a");
        state.filter_novel(vec![ChangeOp::Add {
            path: path.clone(),
            value: num("1"),
        }]);
        let second = state.filter_novel(vec![ChangeOp::Replace {
            path: path.clone(),
            old_value_sketch: "1".into(),
            new_value: num("2"),
        }]);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn remove_without_prior_add_is_suppressed() {
        let mut state = DiffEngineState::new();
        let ops = state.filter_novel(vec![ChangeOp::Remove {
            path: Path::root().child_key("ghost"),
            old_value_sketch: "null".into(),
        }]);
        assert!(ops.is_empty());
    }
}
