#![forbid(unsafe_code)]

//! Diff computation.
//!
//! # Design
//!
//! [`TreeDiff::compute`] walks the source (displayed) and target (freshly
//! rendered) trees together and records the mutations needed to make the
//! source match the target. Inserted nodes are deep-cloned out of the target
//! so the target tree is never aliased into the live document.
//!
//! Child sequences are walked with independent cursors. Element children may
//! carry a `key` attribute giving them list-item identity; when two cursors
//! meet different keys that each exist on the opposite side, a single
//! [`PatchOp::Swap`] reorders the existing nodes instead of a remove/insert
//! pair recreating them.
//!
//! # Invariants
//!
//! 1. Diffing a tree against a structurally identical copy yields an empty
//!    op list.
//! 2. Applying the op list of `compute(a, b)` to `a` makes `a` structurally
//!    equal to `b`.
//! 3. Keyed children that differ only by a permutation produce swaps only,
//!    never a remove/insert pair for the same key.
//! 4. Computation never mutates either tree.

use ahash::AHashSet;
use quilt_dom::Node;
use smallvec::SmallVec;

use crate::op::{Decision, PatchOp};

/// An ordered patch between two trees.
#[derive(Debug, Default)]
pub struct TreeDiff {
    ops: Vec<PatchOp>,
}

impl TreeDiff {
    /// Diff `source` against `target` with no compare policy.
    #[must_use]
    pub fn compute(source: &Node, target: &Node) -> Self {
        Self::compute_with_policy(source, target, |_, _| Decision::Descend)
    }

    /// Diff `source` against `target`, consulting `policy` before each node
    /// pair is compared.
    #[must_use]
    pub fn compute_with_policy(
        source: &Node,
        target: &Node,
        policy: impl Fn(&Node, &Node) -> Decision,
    ) -> Self {
        let mut ops = Vec::new();
        diff_node(source, target, &policy, &mut ops);
        #[cfg(feature = "tracing")]
        tracing::trace!(message = "diff.computed", ops = ops.len());
        Self { ops }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// The computed operations, in application order.
    #[must_use]
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    #[must_use]
    pub fn into_ops(self) -> Vec<PatchOp> {
        self.ops
    }

    /// Apply this patch to the live tree. See [`crate::apply::apply`].
    pub fn apply(self) {
        crate::apply::apply(&self.ops);
    }
}

fn diff_node(
    source: &Node,
    target: &Node,
    policy: &dyn Fn(&Node, &Node) -> Decision,
    ops: &mut Vec<PatchOp>,
) {
    match policy(source, target) {
        Decision::Skip => return,
        Decision::Replace => {
            ops.push(PatchOp::Replace {
                node: source.clone(),
                with: target.deep_clone(),
            });
            return;
        }
        Decision::Descend => {}
    }

    match (source.tag(), target.tag()) {
        // Two text nodes: differing payload replaces the node wholesale.
        (None, None) => {
            if source.text_content() != target.text_content() {
                ops.push(PatchOp::Replace {
                    node: source.clone(),
                    with: target.deep_clone(),
                });
            }
        }
        (Some(src_tag), Some(tgt_tag)) if src_tag == tgt_tag => {
            diff_children(source, target, policy, ops);
            diff_attrs(source, target, ops);
        }
        // Kind mismatch: element vs text, or differing tags.
        _ => ops.push(PatchOp::Replace {
            node: source.clone(),
            with: target.deep_clone(),
        }),
    }
}

/// Walk both child sequences with independent cursors, resynchronizing on
/// kind mismatches and negotiating keyed reorders as swaps.
///
/// `work` mirrors what the source child list will look like once the emitted
/// ops are applied, so positions referenced by later ops stay consistent.
fn diff_children(
    source: &Node,
    target: &Node,
    policy: &dyn Fn(&Node, &Node) -> Decision,
    ops: &mut Vec<PatchOp>,
) {
    let mut work = source.children();
    let tgt = target.children();

    let src_keys: AHashSet<String> = work.iter().filter_map(Node::key).collect();
    let tgt_keys: AHashSet<String> = tgt.iter().filter_map(Node::key).collect();

    let mut i = 0;
    let mut j = 0;
    while i < work.len() && j < tgt.len() {
        let s = work[i].clone();
        let t = tgt[j].clone();
        match (s.is_element(), t.is_element()) {
            // Source has a text node where target has an element: drop it
            // and resynchronize, advancing only the source side.
            (false, true) => {
                ops.push(PatchOp::Remove { node: s });
                work.remove(i);
            }
            // Target has a text node the source lacks: insert it, advancing
            // only the target side.
            (true, false) => {
                let clone = t.deep_clone();
                ops.push(PatchOp::InsertBefore {
                    parent: source.clone(),
                    node: clone.clone(),
                    before: s,
                });
                work.insert(i, clone);
                i += 1;
                j += 1;
            }
            (false, false) => {
                diff_node(&s, &t, policy, ops);
                i += 1;
                j += 1;
            }
            (true, true) => {
                let key_s = s.key();
                let key_t = t.key();
                if key_s == key_t {
                    diff_node(&s, &t, policy, ops);
                    i += 1;
                    j += 1;
                    continue;
                }
                let s_still_wanted = key_s.as_ref().is_some_and(|k| tgt_keys.contains(k));
                let t_already_here = key_t.as_ref().is_some_and(|k| src_keys.contains(k));
                if s_still_wanted && t_already_here {
                    // Both keys exist on the opposite side: reorder without
                    // recreating. The matching source child must sit past the
                    // cursor; everything before it is already matched.
                    let wanted = key_t.as_ref().expect("checked by t_already_here");
                    if let Some(pos) =
                        (i + 1..work.len()).find(|&p| work[p].key().as_ref() == Some(wanted))
                    {
                        ops.push(PatchOp::Swap {
                            a: s,
                            b: work[pos].clone(),
                        });
                        work.swap(i, pos);
                        // Re-examine the cursor pair: keys now match.
                        continue;
                    }
                    // Key sets disagree with the sequence (duplicate keys in
                    // malformed input); fall through to an insertion.
                }
                if s_still_wanted {
                    // Introduced key (or no usable swap partner): insert the
                    // target child here.
                    let clone = t.deep_clone();
                    ops.push(PatchOp::InsertBefore {
                        parent: source.clone(),
                        node: clone.clone(),
                        before: s,
                    });
                    work.insert(i, clone);
                    i += 1;
                    j += 1;
                } else {
                    // Vacated key: the source child is not wanted anywhere in
                    // the target.
                    ops.push(PatchOp::Remove { node: s });
                    work.remove(i);
                }
            }
        }
    }

    // Surplus source children are removed; surplus target children appended.
    while i < work.len() {
        ops.push(PatchOp::Remove {
            node: work[i].clone(),
        });
        work.remove(i);
    }
    while j < tgt.len() {
        ops.push(PatchOp::Append {
            parent: source.clone(),
            node: tgt[j].deep_clone(),
        });
        j += 1;
    }
}

/// Compare attribute sets independently of structure; any difference emits a
/// single sync op carrying the full target set and the names to remove.
fn diff_attrs(source: &Node, target: &Node, ops: &mut Vec<PatchOp>) {
    let src_attrs = source.attrs();
    let tgt_attrs = target.attrs();

    let mut sorted_src = src_attrs.clone();
    let mut sorted_tgt = tgt_attrs.clone();
    sorted_src.sort();
    sorted_tgt.sort();
    if sorted_src == sorted_tgt {
        return;
    }

    let removed: SmallVec<[String; 4]> = src_attrs
        .iter()
        .filter(|(name, _)| !tgt_attrs.iter().any(|(t, _)| t == name))
        .map(|(name, _)| name.clone())
        .collect();
    ops.push(PatchOp::SyncAttributes {
        node: source.clone(),
        attrs: tgt_attrs,
        removed,
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
