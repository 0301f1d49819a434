//! The edit-script vocabulary emitted by [`crate::diff`].

use jsonstab_path::{Node, Path};

/// One structural edit, scoped to a path.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOp {
    Add { path: Path, value: Node },
    Remove { path: Path, old_value_sketch: String },
    Replace { path: Path, old_value_sketch: String, new_value: Node },
}

impl ChangeOp {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Add { path, .. } | Self::Remove { path, .. } | Self::Replace { path, .. } => path,
        }
    }
}

pub fn sketch(node: &Node) -> String {
    const MAX: usize = 80;
    let rendered = format!("{:?}", node.value);
    if rendered.chars().count() <= MAX {
        rendered
    } else {
        let truncated: String = rendered.chars().take(MAX).collect();
        format!("{truncated}…")
    }
}
