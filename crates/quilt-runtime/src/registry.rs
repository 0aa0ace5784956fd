#![forbid(unsafe_code)]

//! Dynamic child factories.
//!
//! Components can declare custom tag names; during render, every matching
//! element spawns a child component through the factory registered for that
//! tag. The registry is an explicit tag to factory mapping populated by the
//! application at startup; there is no runtime resolution of type names. An
//! unregistered tag simply yields no child and the element stays inert.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use quilt_dom::Node;
use serde_json::Value;

use crate::component::Component;

/// Everything a factory gets to know about the element it is spawning a
/// child for.
pub struct DynamicChildContext {
    /// The custom tag name that matched.
    pub tag: String,
    /// The matching element in the displayed tree.
    pub element: Node,
    /// The element's `id`, which becomes the child's render target.
    pub id: String,
    /// The value resolved from the element's `bind` expression against the
    /// owning component's merged model context, when both exist.
    pub value: Option<Value>,
}

type Factory = Rc<dyn Fn(&DynamicChildContext) -> Option<Component>>;

/// Clonable tag → factory mapping. Clones alias the same registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Rc<RefCell<AHashMap<String, Factory>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for a tag, replacing any previous one.
    pub fn register(
        &self,
        tag: impl Into<String>,
        factory: impl Fn(&DynamicChildContext) -> Option<Component> + 'static,
    ) {
        self.inner.borrow_mut().insert(tag.into(), Rc::new(factory));
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.inner.borrow().contains_key(tag)
    }

    /// Invoke the factory for `context.tag`. Returns `None` when no factory
    /// is registered or the factory declines.
    #[must_use]
    pub fn create(&self, context: &DynamicChildContext) -> Option<Component> {
        let factory = self.inner.borrow().get(&context.tag).cloned();
        factory.and_then(|factory| factory(context))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
