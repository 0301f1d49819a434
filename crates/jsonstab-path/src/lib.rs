//! Path representation and the partial JSON value model.
//!
//! Everything downstream — the parser's emitted tree, the differ's change
//! ops, the coalescer's per-path buffers — addresses document locations
//! through the [`path::Path`] type defined here, never through raw strings.

pub mod path;
pub mod tree;

pub use path::{parse, render, Path, PathSegment, PathStyle};
pub use tree::{enumerate_leaves, get, Lookup, Node, NumberLiteral, PartialTree, Value};
