//! Property-based invariant tests for the quilt-reconcile tree differ.
//!
//! These tests verify structural invariants of [`TreeDiff`] that must hold
//! for **any** pair of trees:
//!
//! 1. A tree diffed against a structurally identical copy yields an empty
//!    op list.
//! 2. Applying `compute(a, b)` to `a` makes `a` structurally equal to `b`.
//! 3. Diff is deterministic (same inputs → same op sequence).
//! 4. Keyed child permutations produce swap operations only.
//! 5. Computation alone never mutates either tree.

use proptest::prelude::*;
use quilt_dom::Node;
use quilt_reconcile::{PatchOp, TreeDiff};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Plain data description of a tree, materialized into [`Node`]s per test.
#[derive(Clone, Debug)]
enum Spec {
    Text(String),
    Element {
        tag: &'static str,
        attrs: Vec<(&'static str, String)>,
        key: Option<u8>,
        children: Vec<Spec>,
    },
}

fn arb_tag() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("div"),
        Just("span"),
        Just("p"),
        Just("ul"),
        Just("li"),
    ]
}

fn arb_attrs() -> impl Strategy<Value = Vec<(&'static str, String)>> {
    proptest::collection::vec(
        (
            prop_oneof![Just("class"), Just("title"), Just("data-x")],
            "[a-z]{0,4}",
        ),
        0..3,
    )
}

fn arb_spec() -> impl Strategy<Value = Spec> {
    let leaf = prop_oneof![
        "[a-z ]{1,8}".prop_map(Spec::Text),
        (arb_tag(), arb_attrs(), proptest::option::of(0u8..6)).prop_map(|(tag, attrs, key)| {
            Spec::Element {
                tag,
                attrs,
                key,
                children: Vec::new(),
            }
        }),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            arb_tag(),
            arb_attrs(),
            proptest::option::of(0u8..6),
            proptest::collection::vec(inner, 0..4),
        )
            .prop_map(|(tag, attrs, key, children)| Spec::Element {
                tag,
                attrs,
                key,
                children,
            })
    })
}

/// Build a node from a spec. Sibling keys are deduplicated (first wins) so
/// generated trees satisfy the unique-key convention.
fn materialize(spec: &Spec) -> Node {
    match spec {
        Spec::Text(text) => Node::text(text.clone()),
        Spec::Element {
            tag,
            attrs,
            key,
            children,
        } => {
            let node = Node::element(*tag);
            for (name, value) in attrs {
                node.set_attr(*name, value.clone());
            }
            if let Some(key) = key {
                node.set_attr("key", key.to_string());
            }
            let mut seen_keys = Vec::new();
            for child in children {
                let built = materialize(child);
                if let Some(child_key) = built.key() {
                    if seen_keys.contains(&child_key) {
                        built.remove_attr("key");
                    } else {
                        seen_keys.push(child_key);
                    }
                }
                node.append_child(&built);
            }
            node
        }
    }
}

/// Wrap a materialized tree in a fixed holder so every diffed node has a
/// parent (a root-level replace needs one).
fn holder(spec: &Spec) -> Node {
    let root = Node::element("holder");
    root.append_child(&materialize(spec));
    root
}

fn op_kind(op: &PatchOp) -> &'static str {
    match op {
        PatchOp::Replace { .. } => "replace",
        PatchOp::SyncAttributes { .. } => "sync_attrs",
        PatchOp::Remove { .. } => "remove",
        PatchOp::InsertBefore { .. } => "insert",
        PatchOp::Append { .. } => "append",
        PatchOp::Swap { .. } => "swap",
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Identical trees produce an empty diff
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn identical_trees_produce_empty_diff(spec in arb_spec()) {
        let a = holder(&spec);
        let b = holder(&spec);
        let diff = TreeDiff::compute(&a, &b);
        prop_assert!(
            diff.is_empty(),
            "diff between identical trees should be empty, got {} ops",
            diff.len()
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Applying compute(a, b) to a reproduces b
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn apply_reproduces_target(a_spec in arb_spec(), b_spec in arb_spec()) {
        let a = holder(&a_spec);
        let b = holder(&b_spec);
        TreeDiff::compute(&a, &b).apply();
        prop_assert!(
            a.structural_eq(&b),
            "after apply, source should equal target\nsource: {}\ntarget: {}",
            a.to_markup(),
            b.to_markup()
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Diff is deterministic
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn diff_is_deterministic(a_spec in arb_spec(), b_spec in arb_spec()) {
        let first = TreeDiff::compute(&holder(&a_spec), &holder(&b_spec));
        let second = TreeDiff::compute(&holder(&a_spec), &holder(&b_spec));
        let kinds_first: Vec<_> = first.ops().iter().map(op_kind).collect();
        let kinds_second: Vec<_> = second.ops().iter().map(op_kind).collect();
        prop_assert_eq!(kinds_first, kinds_second);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Keyed permutations reorder with swaps only
// ═════════════════════════════════════════════════════════════════════════

fn keyed_list(keys: &[u8]) -> Node {
    let list = Node::element("ul");
    for key in keys {
        let item = Node::element("li");
        item.set_attr("key", key.to_string());
        item.append_child(&Node::text(format!("item {key}")));
        list.append_child(&item);
    }
    list
}

proptest! {
    #[test]
    fn keyed_permutation_swaps_only(
        keys in proptest::collection::hash_set(0u8..20, 2..8),
        shuffle_seed in any::<u64>(),
    ) {
        let ordered: Vec<u8> = keys.iter().copied().collect();
        // Deterministic Fisher-Yates driven by the seed.
        let mut shuffled = ordered.clone();
        let mut state = shuffle_seed | 1;
        for idx in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let pick = (state >> 33) as usize % (idx + 1);
            shuffled.swap(idx, pick);
        }

        let source = keyed_list(&ordered);
        let target = keyed_list(&shuffled);
        let diff = TreeDiff::compute(&source, &target);
        for op in diff.ops() {
            prop_assert!(
                matches!(op, PatchOp::Swap { .. }),
                "permutation must not produce {:?}",
                op_kind(op)
            );
        }
        diff.apply();
        prop_assert!(source.structural_eq(&target));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Computation never mutates the inputs
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn compute_is_read_only(a_spec in arb_spec(), b_spec in arb_spec()) {
        let a = holder(&a_spec);
        let b = holder(&b_spec);
        let (a_before, b_before) = (a.to_markup(), b.to_markup());
        let _diff = TreeDiff::compute(&a, &b);
        prop_assert_eq!(a.to_markup(), a_before);
        prop_assert_eq!(b.to_markup(), b_before);
    }
}
