#![forbid(unsafe_code)]

//! Tree reconciliation: compute a minimal ordered patch between a displayed
//! tree and a freshly rendered target tree, then apply it in place.
//!
//! The differ preserves as much of the existing subtree identity as it can:
//! keyed children that merely moved are swapped rather than recreated, so
//! live state that rides on node identity (listeners, control values, child
//! component ownership) survives a re-render.

pub mod apply;
pub mod diff;
pub mod op;

pub use diff::TreeDiff;
pub use op::{Decision, PatchOp};
