#![forbid(unsafe_code)]

//! Patch application.
//!
//! Operations execute in sequence against the live tree. Structural ops act
//! on node identity, so a patch stays valid across the mutations made by its
//! own earlier ops.
//!
//! Attribute sync also synchronizes live form-control state: the displayed
//! `value`/`checked` of a control may have diverged from its attributes
//! (user input), so attribute reflection alone would leave the control
//! showing stale state.

use quilt_dom::Node;

use crate::op::PatchOp;

/// Apply `ops` in order.
pub fn apply(ops: &[PatchOp]) {
    for op in ops {
        apply_op(op);
    }
}

fn apply_op(op: &PatchOp) {
    match op {
        PatchOp::Replace { node, with } => {
            if !node.replace_with(with) {
                note_failed("replace");
            }
        }
        PatchOp::SyncAttributes {
            node,
            attrs,
            removed,
        } => {
            for (name, value) in attrs {
                node.set_attr(name.clone(), value.clone());
            }
            for name in removed.iter() {
                node.remove_attr(name);
            }
            if node.is_form_control() {
                let value = attrs
                    .iter()
                    .find(|(name, _)| name == "value")
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default();
                node.set_value(value);
                node.set_checked(attrs.iter().any(|(name, _)| name == "checked"));
            }
        }
        PatchOp::Remove { node } => node.detach(),
        PatchOp::InsertBefore {
            parent,
            node,
            before,
        } => {
            if !parent.insert_before(node, before) {
                note_failed("insert_before");
            }
        }
        PatchOp::Append { parent, node } => parent.append_child(node),
        PatchOp::Swap { a, b } => {
            if !Node::swap(a, b) {
                note_failed("swap");
            }
        }
    }
}

#[cfg(feature = "tracing")]
fn note_failed(op: &'static str) {
    tracing::warn!(message = "patch.op_failed", op);
}

#[cfg(not(feature = "tracing"))]
fn note_failed(_op: &'static str) {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
