#![forbid(unsafe_code)]

//! Document handle: the displayed tree's root plus the document title.

use std::cell::RefCell;
use std::rc::Rc;

use crate::node::Node;
use crate::selector::Selector;

struct DocumentData {
    root: Node,
    title: String,
}

/// Clonable handle to the displayed document. Clones alias the same
/// document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentData>>,
}

impl Document {
    /// Create a document with an empty `<body>` root.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(Node::element("body"))
    }

    /// Create a document around an existing root element.
    #[must_use]
    pub fn with_root(root: Node) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DocumentData {
                root,
                title: String::new(),
            })),
        }
    }

    /// The root element.
    #[must_use]
    pub fn root(&self) -> Node {
        self.inner.borrow().root.clone()
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.inner.borrow().title.clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.inner.borrow_mut().title = title.into();
    }

    /// First element with the given `id`, searching from the root.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<Node> {
        self.root().find_by_id(id)
    }

    /// All elements matching `selector`, searching from the root.
    #[must_use]
    pub fn query_all(&self, selector: &Selector) -> Vec<Node> {
        self.root().query_all(selector)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
