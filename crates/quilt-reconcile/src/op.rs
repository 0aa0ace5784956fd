#![forbid(unsafe_code)]

//! Patch operations and compare-policy decisions.

use quilt_dom::Node;
use smallvec::SmallVec;

/// One mutation of the displayed tree. A diff run produces an ordered
/// sequence of these; applying them in order reproduces the target tree's
/// shape and attributes on the source tree.
#[derive(Debug)]
pub enum PatchOp {
    /// Replace `node` (and its whole subtree) with `with`.
    Replace { node: Node, with: Node },
    /// Copy `attrs` onto `node` and drop the `removed` names. Carries the
    /// full target attribute set, not a delta.
    SyncAttributes {
        node: Node,
        attrs: Vec<(String, String)>,
        removed: SmallVec<[String; 4]>,
    },
    /// Detach `node` from its parent.
    Remove { node: Node },
    /// Insert `node` under `parent`, immediately before `before`.
    InsertBefore {
        parent: Node,
        node: Node,
        before: Node,
    },
    /// Append `node` as `parent`'s last child.
    Append { parent: Node, node: Node },
    /// Exchange the positions of `a` and `b` without recreating either.
    Swap { a: Node, b: Node },
}

/// Verdict of a compare-policy callback, consulted before each node pair is
/// compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Compare normally.
    Descend,
    /// Treat the pair as already equal; emit nothing and do not descend.
    /// Used to protect subtrees owned by nested components.
    Skip,
    /// Emit a full-subtree replacement without descending. Used when a
    /// component-owned slot is displaced entirely.
    Replace,
}
