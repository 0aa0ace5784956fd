#![forbid(unsafe_code)]

//! Tree nodes: elements and text, with attributes, listeners, and live
//! form-control state.
//!
//! # Design
//!
//! [`Node`] is a clonable handle (`Rc<RefCell<..>>`) to a mutable tree node.
//! Clones alias the same node; identity is pointer identity
//! ([`Node::ptr_eq`]). Parent links are weak, so detaching a subtree never
//! leaks and a node's ancestors do not keep it alive.
//!
//! Live form-control state (`value`, `checked`) is held separately from the
//! corresponding attributes: a control's displayed state may diverge from its
//! attribute state (user input), and patching synchronizes it explicitly.
//! Reading [`Node::value`] / [`Node::checked`] falls back to the attribute
//! when no live override has been set.
//!
//! # Invariants
//!
//! 1. A node has at most one parent, and appears at most once in that
//!    parent's child list.
//! 2. Attribute order is insertion order; setting an existing name updates
//!    it in place (last write wins, position preserved).
//! 3. [`Node::swap`] relocates both nodes without destroying either:
//!    listeners, live control state, and descendant identity survive.
//! 4. Listener callbacks run after every borrow of the dispatching node has
//!    been released; a listener may freely mutate the tree.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::Event;

/// Tags that never carry children and serialize without a closing tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Tags whose displayed state is synchronized explicitly during patching.
const FORM_CONTROL_TAGS: &[&str] = &["input", "textarea", "select", "option"];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one listener attachment on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

fn next_listener_id() -> ListenerId {
    ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
}

struct Listener {
    id: ListenerId,
    event: String,
    callback: Rc<dyn Fn(&Event)>,
}

struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
    /// Live control value; `None` means "reflect the `value` attribute".
    value: Option<String>,
    /// Live checkedness; `None` means "reflect the `checked` attribute".
    checked: Option<bool>,
    listeners: Vec<Listener>,
}

enum NodeKind {
    Element(ElementData),
    Text(String),
}

struct NodeData {
    parent: Weak<RefCell<NodeData>>,
    kind: NodeKind,
}

/// Handle to a tree node. Cloning aliases the same node.
#[derive(Clone)]
pub struct Node {
    inner: Rc<RefCell<NodeData>>,
}

impl Node {
    /// Create a detached element node.
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeData {
                parent: Weak::new(),
                kind: NodeKind::Element(ElementData {
                    tag: tag.into(),
                    attrs: Vec::new(),
                    children: Vec::new(),
                    value: None,
                    checked: None,
                    listeners: Vec::new(),
                }),
            })),
        }
    }

    /// Create a detached text node.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeData {
                parent: Weak::new(),
                kind: NodeKind::Text(content.into()),
            })),
        }
    }

    /// Whether two handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    // ─── Kind accessors ─────────────────────────────────────────────────────

    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self.inner.borrow().kind, NodeKind::Element(_))
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.inner.borrow().kind, NodeKind::Text(_))
    }

    /// Tag name, for element nodes.
    #[must_use]
    pub fn tag(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            NodeKind::Element(el) => Some(el.tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Character data, for text nodes.
    #[must_use]
    pub fn text_content(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            NodeKind::Text(t) => Some(t.clone()),
            NodeKind::Element(_) => None,
        }
    }

    /// Replace the character data of a text node. No-op on elements.
    pub fn set_text_content(&self, content: impl Into<String>) {
        if let NodeKind::Text(t) = &mut self.inner.borrow_mut().kind {
            *t = content.into();
        }
    }

    // ─── Attributes ─────────────────────────────────────────────────────────

    /// Attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.inner.borrow().kind {
            NodeKind::Element(el) => el
                .attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Set an attribute, updating in place when the name already exists.
    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        if let NodeKind::Element(el) = &mut self.inner.borrow_mut().kind {
            if let Some(slot) = el.attrs.iter_mut().find(|(n, _)| *n == name) {
                slot.1 = value;
            } else {
                el.attrs.push((name, value));
            }
        }
    }

    /// Remove an attribute. No-op when absent.
    pub fn remove_attr(&self, name: &str) {
        if let NodeKind::Element(el) = &mut self.inner.borrow_mut().kind {
            el.attrs.retain(|(n, _)| n != name);
        }
    }

    /// Snapshot of the attribute list in insertion order.
    #[must_use]
    pub fn attrs(&self) -> Vec<(String, String)> {
        match &self.inner.borrow().kind {
            NodeKind::Element(el) => el.attrs.clone(),
            NodeKind::Text(_) => Vec::new(),
        }
    }

    /// The `id` attribute, denoting a stable slot.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.attr("id")
    }

    /// The `key` attribute, denoting list-item identity for reordering.
    #[must_use]
    pub fn key(&self) -> Option<String> {
        self.attr("key")
    }

    /// Whether the `class` attribute contains `class_name` as a whole word.
    #[must_use]
    pub fn has_class(&self, class_name: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|w| w == class_name))
    }

    // ─── Live form-control state ────────────────────────────────────────────

    /// Whether this element's displayed state is synchronized explicitly
    /// during patching.
    #[must_use]
    pub fn is_form_control(&self) -> bool {
        match &self.inner.borrow().kind {
            NodeKind::Element(el) => FORM_CONTROL_TAGS.contains(&el.tag.as_str()),
            NodeKind::Text(_) => false,
        }
    }

    /// Displayed control value: the live override when set, otherwise the
    /// `value` attribute, otherwise empty.
    #[must_use]
    pub fn value(&self) -> String {
        match &self.inner.borrow().kind {
            NodeKind::Element(el) => match &el.value {
                Some(v) => v.clone(),
                None => el
                    .attrs
                    .iter()
                    .find(|(n, _)| n == "value")
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default(),
            },
            NodeKind::Text(_) => String::new(),
        }
    }

    /// Set the live control value (as user input would).
    pub fn set_value(&self, value: impl Into<String>) {
        if let NodeKind::Element(el) = &mut self.inner.borrow_mut().kind {
            el.value = Some(value.into());
        }
    }

    /// Displayed checkedness: the live override when set, otherwise the
    /// presence of the `checked` attribute.
    #[must_use]
    pub fn checked(&self) -> bool {
        match &self.inner.borrow().kind {
            NodeKind::Element(el) => match el.checked {
                Some(c) => c,
                None => el.attrs.iter().any(|(n, _)| n == "checked"),
            },
            NodeKind::Text(_) => false,
        }
    }

    /// Set the live checkedness (as a user click would).
    pub fn set_checked(&self, checked: bool) {
        if let NodeKind::Element(el) = &mut self.inner.borrow_mut().kind {
            el.checked = Some(checked);
        }
    }

    // ─── Tree structure ─────────────────────────────────────────────────────

    /// Parent node, when attached.
    #[must_use]
    pub fn parent(&self) -> Option<Node> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| Node { inner })
    }

    /// Snapshot of child handles.
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        match &self.inner.borrow().kind {
            NodeKind::Element(el) => el.children.clone(),
            NodeKind::Text(_) => Vec::new(),
        }
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        match &self.inner.borrow().kind {
            NodeKind::Element(el) => el.children.len(),
            NodeKind::Text(_) => 0,
        }
    }

    /// Append `node` as the last child, detaching it from any previous
    /// parent. No-op when `node` is `self` or an ancestor of `self`.
    pub fn append_child(&self, node: &Node) {
        if Node::ptr_eq(self, node) || self.has_ancestor(node) {
            return;
        }
        node.detach();
        if let NodeKind::Element(el) = &mut self.inner.borrow_mut().kind {
            el.children.push(node.clone());
            node.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
        }
    }

    /// Insert `node` immediately before `reference` among this node's
    /// children. Returns false when `reference` is not a child.
    pub fn insert_before(&self, node: &Node, reference: &Node) -> bool {
        if Node::ptr_eq(self, node) || self.has_ancestor(node) {
            return false;
        }
        match reference.parent() {
            Some(parent) if Node::ptr_eq(&parent, self) => {}
            _ => return false,
        }
        node.detach();
        if let NodeKind::Element(el) = &mut self.inner.borrow_mut().kind {
            let Some(idx) = el
                .children
                .iter()
                .position(|c| Node::ptr_eq(c, reference))
            else {
                return false;
            };
            el.children.insert(idx, node.clone());
            node.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
            return true;
        }
        false
    }

    /// Remove this node from its parent. No-op when already detached.
    pub fn detach(&self) {
        let Some(parent) = self.parent() else {
            self.inner.borrow_mut().parent = Weak::new();
            return;
        };
        if let NodeKind::Element(el) = &mut parent.inner.borrow_mut().kind {
            el.children.retain(|c| !Node::ptr_eq(c, self));
        }
        self.inner.borrow_mut().parent = Weak::new();
    }

    /// Replace this node in its parent with `new`, detaching `self`.
    /// Returns false when `self` has no parent.
    pub fn replace_with(&self, new: &Node) -> bool {
        if Node::ptr_eq(self, new) {
            return true;
        }
        let Some(parent) = self.parent() else {
            return false;
        };
        new.detach();
        if let NodeKind::Element(el) = &mut parent.inner.borrow_mut().kind {
            let Some(idx) = el.children.iter().position(|c| Node::ptr_eq(c, self)) else {
                return false;
            };
            el.children[idx] = new.clone();
            new.inner.borrow_mut().parent = Rc::downgrade(&parent.inner);
        }
        self.inner.borrow_mut().parent = Weak::new();
        true
    }

    /// Exchange the tree positions of two attached nodes, preserving both
    /// nodes' identity. Implemented as a three-way relocation through a
    /// placeholder so adjacent siblings swap correctly.
    ///
    /// Returns false when either node is detached.
    pub fn swap(a: &Node, b: &Node) -> bool {
        if Node::ptr_eq(a, b) {
            return true;
        }
        if a.parent().is_none() || b.parent().is_none() {
            return false;
        }
        let placeholder = Node::text("");
        a.replace_with(&placeholder) && b.replace_with(a) && placeholder.replace_with(b)
    }

    fn has_ancestor(&self, candidate: &Node) -> bool {
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            if Node::ptr_eq(&node, candidate) {
                return true;
            }
            cursor = node.parent();
        }
        false
    }

    // ─── Search ─────────────────────────────────────────────────────────────

    /// Depth-first search for an element with the given `id`, including
    /// `self`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<Node> {
        if self.id().as_deref() == Some(id) {
            return Some(self.clone());
        }
        for child in self.children() {
            if let Some(found) = child.find_by_id(id) {
                return Some(found);
            }
        }
        None
    }

    /// All elements with the given tag name in this subtree, in document
    /// order, including `self`.
    #[must_use]
    pub fn collect_by_tag(&self, tag: &str) -> Vec<Node> {
        let mut out = Vec::new();
        self.collect_by_tag_into(tag, &mut out);
        out
    }

    fn collect_by_tag_into(&self, tag: &str, out: &mut Vec<Node>) {
        if self.tag().as_deref() == Some(tag) {
            out.push(self.clone());
        }
        for child in self.children() {
            child.collect_by_tag_into(tag, out);
        }
    }

    /// All elements in this subtree matching `selector`, in document order.
    #[must_use]
    pub fn query_all(&self, selector: &crate::selector::Selector) -> Vec<Node> {
        let mut out = Vec::new();
        self.query_all_into(selector, &mut out);
        out
    }

    fn query_all_into(&self, selector: &crate::selector::Selector, out: &mut Vec<Node>) {
        if selector.matches(self) {
            out.push(self.clone());
        }
        for child in self.children() {
            child.query_all_into(selector, out);
        }
    }

    // ─── Copies and comparison ──────────────────────────────────────────────

    /// Recursive copy of this subtree: structure, attributes, text, and live
    /// control state. Listeners are not copied; the copy is detached.
    #[must_use]
    pub fn deep_clone(&self) -> Node {
        let data = self.inner.borrow();
        match &data.kind {
            NodeKind::Text(t) => Node::text(t.clone()),
            NodeKind::Element(el) => {
                let copy = Node::element(el.tag.clone());
                if let NodeKind::Element(copy_el) = &mut copy.inner.borrow_mut().kind {
                    copy_el.attrs = el.attrs.clone();
                    copy_el.value = el.value.clone();
                    copy_el.checked = el.checked;
                }
                for child in &el.children {
                    copy.append_child(&child.deep_clone());
                }
                copy
            }
        }
    }

    /// Structural equality: kind, tag, text payload, attribute sets (order
    /// insensitive), and children, recursively. Listeners and live control
    /// state are not compared.
    #[must_use]
    pub fn structural_eq(&self, other: &Node) -> bool {
        match (self.tag(), other.tag()) {
            (None, None) => return self.text_content() == other.text_content(),
            (Some(a), Some(b)) if a == b => {}
            _ => return false,
        }
        let mut attrs_a = self.attrs();
        let mut attrs_b = other.attrs();
        attrs_a.sort();
        attrs_b.sort();
        if attrs_a != attrs_b {
            return false;
        }
        let (children_a, children_b) = (self.children(), other.children());
        children_a.len() == children_b.len()
            && children_a
                .iter()
                .zip(&children_b)
                .all(|(a, b)| a.structural_eq(b))
    }

    /// Serialize this subtree back to markup, escaping text and attribute
    /// values.
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        let data = self.inner.borrow();
        match &data.kind {
            NodeKind::Text(t) => out.push_str(&escape_text(t)),
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attr(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if is_void_element(&el.tag) && el.children.is_empty() {
                    return;
                }
                for child in &el.children {
                    child.write_markup(out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }

    // ─── Listeners ──────────────────────────────────────────────────────────

    /// Attach a listener for `event` on this element. Returns an id usable
    /// with [`Node::remove_listener`]. No-op (dead id) on text nodes.
    pub fn add_listener(&self, event: impl Into<String>, callback: Rc<dyn Fn(&Event)>) -> ListenerId {
        let id = next_listener_id();
        if let NodeKind::Element(el) = &mut self.inner.borrow_mut().kind {
            el.listeners.push(Listener {
                id,
                event: event.into(),
                callback,
            });
        }
        id
    }

    /// Detach one listener by id. Idempotent.
    pub fn remove_listener(&self, id: ListenerId) {
        if let NodeKind::Element(el) = &mut self.inner.borrow_mut().kind {
            el.listeners.retain(|l| l.id != id);
        }
    }

    /// Number of listeners currently attached (any event).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        match &self.inner.borrow().kind {
            NodeKind::Element(el) => el.listeners.len(),
            NodeKind::Text(_) => 0,
        }
    }

    /// Dispatch an event by name against this element, invoking matching
    /// listeners in attachment order. Callbacks run with no borrow of the
    /// node held and may mutate the tree. Returns the number of listeners
    /// invoked.
    pub fn dispatch(&self, event_name: &str) -> usize {
        let callbacks: Vec<Rc<dyn Fn(&Event)>> = match &self.inner.borrow().kind {
            NodeKind::Element(el) => el
                .listeners
                .iter()
                .filter(|l| l.event == event_name)
                .map(|l| Rc::clone(&l.callback))
                .collect(),
            NodeKind::Text(_) => Vec::new(),
        };
        let event = Event {
            name: event_name.to_string(),
            target: self.clone(),
        };
        for callback in &callbacks {
            callback(&event);
        }
        callbacks.len()
    }

    // ─── Construction helpers ───────────────────────────────────────────────

    /// Builder-style attribute set.
    #[must_use]
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child append.
    #[must_use]
    pub fn with_child(self, child: Node) -> Self {
        self.append_child(&child);
        self
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner.borrow().kind {
            NodeKind::Text(t) => f.debug_tuple("Text").field(t).finish(),
            NodeKind::Element(el) => f
                .debug_struct("Element")
                .field("tag", &el.tag)
                .field("attrs", &el.attrs)
                .field("children", &el.children.len())
                .finish(),
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
