#![forbid(unsafe_code)]

//! Component lifecycle and the render pipeline.
//!
//! # Design
//!
//! A [`Component`] owns a render-target id, a renderer, an ordered list of
//! child components with an id index, event bindings, and a set of custom
//! tag names that spawn dynamic children. It renders by asking the renderer
//! for fresh markup, reconciling it against the currently displayed subtree
//! with [`TreeDiff`], and applying the patch.
//!
//! Children are exclusively owned for lifecycle purposes (start/stop
//! cascades), but their displayed subtrees are looked up by id on demand:
//! reconciliation may relocate a child's slot element, so holding a node
//! reference across renders would go stale.
//!
//! # Invariants
//!
//! 1. A stopped component never renders; a started component has rendered
//!    at least once.
//! 2. `start()` renders exactly once before any child starts.
//! 3. `stop()` stops every descendant before the parent's after-stop hook
//!    fires; stopping a stopped component is a no-op.
//! 4. A render triggered while a render is in progress is dropped, not
//!    queued.
//! 5. Every listener attachment made during a render is removed at the
//!    start of the next render (patching can relocate elements, so stale
//!    attachments cannot be reused).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use quilt_dom::{Document, Event, ListenerId, Node, Selector, parse_markup};
use quilt_reconcile::{Decision, TreeDiff};

use crate::error::{EngineError, Result};
use crate::model::{Model, ObserverId};
use crate::model_component::{RenderContext, merged_context, resolve_bind_path};
use crate::registry::{DynamicChildContext, Registry};

/// Renderer contract: merged context in, markup text out. Parsed markup must
/// yield exactly one root element.
pub type RenderFn = Rc<dyn Fn(&RenderContext) -> String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Stopped,
    Started,
}

struct EventBinding {
    selector: Selector,
    event: String,
    callback: Rc<dyn Fn(&Event)>,
}

struct AttachedListener {
    node: Node,
    id: ListenerId,
}

type LifecycleHook = Rc<dyn Fn(&Component)>;
type UpdateHandler = Rc<dyn Fn(&Component, &Model, Option<&str>)>;

struct ComponentInner {
    document: Document,
    target: RefCell<Option<String>>,
    renderer: Option<RenderFn>,
    models: Vec<Model>,
    registry: Option<Registry>,
    custom_tags: Vec<String>,
    state: Cell<Lifecycle>,
    rendering: Cell<bool>,
    children: RefCell<Vec<Component>>,
    child_index: RefCell<AHashMap<String, Component>>,
    /// Ids of dynamically created children, mapped to the custom tag that
    /// spawned them.
    dynamic_children: RefCell<AHashMap<String, String>>,
    bindings: RefCell<Vec<EventBinding>>,
    attached: RefCell<Vec<AttachedListener>>,
    subscriptions: RefCell<Vec<(Model, ObserverId)>>,
    after_start: Option<LifecycleHook>,
    after_stop: Option<LifecycleHook>,
    update_handler: Option<UpdateHandler>,
}

/// Clonable handle to a component. Clones alias the same component.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

/// Builder for [`Component`].
#[derive(Default)]
pub struct ComponentSpec {
    target: Option<String>,
    renderer: Option<RenderFn>,
    models: Vec<Model>,
    registry: Option<Registry>,
    custom_tags: Vec<String>,
    bindings: Vec<EventBinding>,
    after_start: Option<LifecycleHook>,
    after_stop: Option<LifecycleHook>,
    update_handler: Option<UpdateHandler>,
}

impl ComponentSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id of the displayed element this component renders into.
    #[must_use]
    pub fn target(mut self, id: impl Into<String>) -> Self {
        self.target = Some(id.into());
        self
    }

    #[must_use]
    pub fn renderer(mut self, renderer: impl Fn(&RenderContext) -> String + 'static) -> Self {
        self.renderer = Some(Rc::new(renderer));
        self
    }

    /// Add a model to the composition; its entries join the merged render
    /// context and the component re-renders on its mutations.
    #[must_use]
    pub fn model(mut self, model: Model) -> Self {
        self.models.push(model);
        self
    }

    /// Declare a custom tag whose elements spawn dynamic children.
    #[must_use]
    pub fn custom_tag(mut self, tag: impl Into<String>) -> Self {
        self.custom_tags.push(tag.into());
        self
    }

    /// The factory registry consulted for custom tags.
    #[must_use]
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Bind `callback` to `event` on every element matching `selector`
    /// within the rendered subtree. Re-applied after every render.
    #[must_use]
    pub fn on(
        mut self,
        selector: &str,
        event: impl Into<String>,
        callback: impl Fn(&Event) + 'static,
    ) -> Self {
        self.bindings.push(EventBinding {
            selector: Selector::parse(selector),
            event: event.into(),
            callback: Rc::new(callback),
        });
        self
    }

    #[must_use]
    pub fn after_start(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.after_start = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn after_stop(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.after_stop = Some(Rc::new(hook));
        self
    }

    /// Override the model-update handler. The default handler re-renders.
    #[must_use]
    pub fn on_model_update(
        mut self,
        handler: impl Fn(&Component, &Model, Option<&str>) + 'static,
    ) -> Self {
        self.update_handler = Some(Rc::new(handler));
        self
    }

    #[must_use]
    pub fn build(self, document: &Document) -> Component {
        Component {
            inner: Rc::new(ComponentInner {
                document: document.clone(),
                target: RefCell::new(self.target),
                renderer: self.renderer,
                models: self.models,
                registry: self.registry,
                custom_tags: self.custom_tags,
                state: Cell::new(Lifecycle::Stopped),
                rendering: Cell::new(false),
                children: RefCell::new(Vec::new()),
                child_index: RefCell::new(AHashMap::new()),
                dynamic_children: RefCell::new(AHashMap::new()),
                bindings: RefCell::new(self.bindings),
                attached: RefCell::new(Vec::new()),
                subscriptions: RefCell::new(Vec::new()),
                after_start: self.after_start,
                after_stop: self.after_stop,
                update_handler: self.update_handler,
            }),
        }
    }
}

impl Component {
    /// Whether two handles refer to the same component.
    #[must_use]
    pub fn ptr_eq(a: &Component, b: &Component) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    #[must_use]
    pub fn target_id(&self) -> Option<String> {
        self.inner.target.borrow().clone()
    }

    /// Rebind the render target. Intended for use before the component is
    /// (re)attached; an attached parent's id index is keyed by the old id.
    pub fn set_target(&self, id: impl Into<String>) {
        *self.inner.target.borrow_mut() = Some(id.into());
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.state.get() == Lifecycle::Started
    }

    #[must_use]
    pub fn document(&self) -> Document {
        self.inner.document.clone()
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Transition to started: subscribe to models, render once, start
    /// children in order, then fire the after-start hook. No-op when
    /// already started.
    pub fn start(&self) -> Result<()> {
        if self.is_started() {
            return Ok(());
        }
        self.inner.state.set(Lifecycle::Started);
        for model in &self.inner.models {
            let weak = Rc::downgrade(&self.inner);
            let id = model.add_observer(move |model, hint| {
                if let Some(inner) = weak.upgrade() {
                    Component { inner }.handle_model_update(model, hint);
                }
            });
            self.inner
                .subscriptions
                .borrow_mut()
                .push((model.clone(), id));
        }
        self.render()?;
        for child in self.children() {
            child.start()?;
        }
        if let Some(hook) = &self.inner.after_start {
            hook(self);
        }
        Ok(())
    }

    /// Transition to stopped: stop children in order, unsubscribe from
    /// models, detach listeners, then fire the after-stop hook. No-op when
    /// already stopped.
    pub fn stop(&self) {
        if !self.is_started() {
            return;
        }
        for child in self.children() {
            child.stop();
        }
        for (model, id) in self.inner.subscriptions.borrow_mut().drain(..) {
            model.remove_observer(id);
        }
        self.detach_listeners();
        self.inner.state.set(Lifecycle::Stopped);
        if let Some(hook) = &self.inner.after_stop {
            hook(self);
        }
    }

    fn handle_model_update(&self, model: &Model, hint: Option<&str>) {
        match &self.inner.update_handler {
            Some(handler) => handler(self, model, hint),
            None => self.render_or_log(),
        }
    }

    // ─── Children ───────────────────────────────────────────────────────────

    /// Ordered snapshot of child handles.
    #[must_use]
    pub fn children(&self) -> Vec<Component> {
        self.inner.children.borrow().clone()
    }

    /// Child lookup by render-target id.
    #[must_use]
    pub fn child(&self, id: &str) -> Option<Component> {
        self.inner.child_index.borrow().get(id).cloned()
    }

    /// Append a child, index it by target id, match its lifecycle state to
    /// this component's, and render it once.
    pub fn add_child(&self, child: Component) -> Result<()> {
        self.inner.children.borrow_mut().push(child.clone());
        match child.target_id() {
            Some(id) => {
                self.inner.child_index.borrow_mut().insert(id, child.clone());
            }
            None => {
                tracing::warn!(message = "component.child_without_target");
            }
        }
        if self.is_started() {
            if child.is_started() {
                child.render()?;
            } else {
                child.start()?;
            }
        } else {
            child.stop();
        }
        Ok(())
    }

    /// Stop the child registered under `id`, drop it from both structures,
    /// and re-render this component. No-op for unknown ids.
    pub fn remove_child(&self, id: &str) -> Result<()> {
        let Some(child) = self.child(id) else {
            return Ok(());
        };
        child.stop();
        self.inner.child_index.borrow_mut().remove(id);
        self.inner
            .children
            .borrow_mut()
            .retain(|existing| !Component::ptr_eq(existing, &child));
        self.inner.dynamic_children.borrow_mut().remove(id);
        self.render()
    }

    // ─── Rendering ──────────────────────────────────────────────────────────

    /// Render and reconcile. No-op when stopped, when no target id is
    /// configured, or when the target id is absent from the displayed tree.
    /// A render triggered while one is in progress is dropped.
    pub fn render(&self) -> Result<()> {
        if !self.is_started() {
            return Ok(());
        }
        let Some(target) = self.target_id() else {
            return Ok(());
        };
        let Some(current) = self.inner.document.get_element_by_id(&target) else {
            return Ok(());
        };
        if self.inner.rendering.replace(true) {
            return Ok(());
        }
        let result = self.render_to(&target, &current);
        self.inner.rendering.set(false);
        result
    }

    /// Render, logging any failure. For callers with no error channel
    /// (model observers, event callbacks).
    pub fn render_or_log(&self) {
        if let Err(error) = self.render() {
            tracing::error!(
                message = "component.render_failed",
                target = ?self.target_id(),
                error = %error
            );
        }
    }

    fn render_to(&self, target: &str, current: &Node) -> Result<()> {
        let Some(renderer) = &self.inner.renderer else {
            return Ok(());
        };

        // Child-owned subtrees, captured up front so they can be restored
        // if reconciliation relocates or recreates their slot elements.
        let mut captured: Vec<(String, Node)> = Vec::new();
        for child in self.children() {
            if let Some(id) = child.target_id()
                && let Some(node) = self.inner.document.get_element_by_id(&id)
            {
                captured.push((id, node));
            }
        }

        let context = merged_context(&self.inner.models);
        let markup = renderer(&context);
        let new_root = single_root(&markup)?;
        if new_root.id().is_none() {
            new_root.set_attr("id", target);
        }

        let slots: AHashSet<String> = self
            .children()
            .iter()
            .filter_map(Component::target_id)
            .collect();
        TreeDiff::compute_with_policy(current, &new_root, |displayed, candidate| {
            slot_policy(&slots, displayed, candidate)
        })
        .apply();

        // Reconciliation may have replaced a slot element with a fresh
        // placeholder; put the live child subtree back.
        for (id, live) in &captured {
            if let Some(now) = self.inner.document.get_element_by_id(id)
                && !Node::ptr_eq(&now, live)
            {
                now.replace_with(live);
            }
        }

        self.reattach_listeners(target);
        self.reconcile_dynamic_children(&new_root, &context)
    }

    /// Clear all listener attachments from the previous render and bind
    /// every registered selector against the current subtree.
    fn reattach_listeners(&self, target: &str) {
        self.detach_listeners();
        let Some(root) = self.inner.document.get_element_by_id(target) else {
            return;
        };
        let bindings = self.inner.bindings.borrow();
        for binding in bindings.iter() {
            for node in root.query_all(&binding.selector) {
                let id = node.add_listener(binding.event.clone(), Rc::clone(&binding.callback));
                self.inner
                    .attached
                    .borrow_mut()
                    .push(AttachedListener { node, id });
            }
        }
    }

    fn detach_listeners(&self) {
        for AttachedListener { node, id } in self.inner.attached.borrow_mut().drain(..) {
            node.remove_listener(id);
        }
    }

    /// Create children for custom-tag elements that appeared in this render
    /// and drop children whose element or id is gone.
    ///
    /// Presence is judged against the freshly rendered target tree, not the
    /// displayed tree: once a dynamic child has rendered, its slot in the
    /// displayed tree carries the child's own markup instead of the custom
    /// tag, but the child stays alive as long as the owning component keeps
    /// rendering its tag.
    fn reconcile_dynamic_children(&self, rendered: &Node, context: &RenderContext) -> Result<()> {
        if self.inner.custom_tags.is_empty() {
            return Ok(());
        }

        let mut present: AHashMap<String, Vec<Node>> = AHashMap::new();
        for tag in &self.inner.custom_tags {
            present.insert(tag.clone(), rendered.collect_by_tag(tag));
        }

        // Removals first, so an id that moved between tags is rebuilt in the
        // same pass.
        let tracked: Vec<(String, String)> = self
            .inner
            .dynamic_children
            .borrow()
            .iter()
            .map(|(id, tag)| (id.clone(), tag.clone()))
            .collect();
        for (id, spawned_by) in tracked {
            let still_rendered = present
                .get(spawned_by.as_str())
                .is_some_and(|elements| {
                    elements.iter().any(|e| e.id().as_deref() == Some(id.as_str()))
                });
            if !still_rendered {
                self.inner.dynamic_children.borrow_mut().remove(&id);
                self.remove_child(&id)?;
            }
        }

        for tag in &self.inner.custom_tags {
            for element in &present[tag] {
                let Some(id) = element.id() else {
                    tracing::debug!(message = "component.dynamic_child_without_id", tag = %tag);
                    continue;
                };
                if self.child(&id).is_some() {
                    continue;
                }
                let Some(registry) = &self.inner.registry else {
                    continue;
                };
                // The factory gets the displayed element, patched in by this
                // render, rather than the parsed target node.
                let Some(displayed) = self.inner.document.get_element_by_id(&id) else {
                    continue;
                };
                let value = element
                    .attr("bind")
                    .and_then(|path| resolve_bind_path(context, &path));
                let child_context = DynamicChildContext {
                    tag: tag.clone(),
                    element: displayed,
                    id: id.clone(),
                    value,
                };
                // No matching factory: the element stays inert.
                let Some(child) = registry.create(&child_context) else {
                    continue;
                };
                child.set_target(&id);
                self.inner
                    .dynamic_children
                    .borrow_mut()
                    .insert(id, tag.clone());
                self.add_child(child)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("target", &self.inner.target.borrow())
            .field("state", &self.inner.state.get())
            .field("children", &self.inner.children.borrow().len())
            .finish()
    }
}

/// Enforce the exactly-one-root-element renderer contract.
fn single_root(markup: &str) -> Result<Node> {
    let elements: Vec<Node> = parse_markup(markup)?
        .into_iter()
        .filter(Node::is_element)
        .collect();
    match elements.len() {
        0 => Err(EngineError::EmptyMarkup),
        1 => Ok(elements.into_iter().next().expect("length checked")),
        count => Err(EngineError::MultiRootMarkup { count }),
    }
}

/// Compare policy protecting child-owned slots: an unchanged slot id is
/// skipped entirely; a slot displaced by different content is replaced
/// without descending.
fn slot_policy(slots: &AHashSet<String>, displayed: &Node, candidate: &Node) -> Decision {
    let displayed_id = displayed.id();
    let candidate_id = candidate.id();
    if displayed_id == candidate_id {
        if let Some(id) = &displayed_id
            && slots.contains(id)
        {
            return Decision::Skip;
        }
        return Decision::Descend;
    }
    let displayed_is_slot = displayed_id.as_ref().is_some_and(|id| slots.contains(id));
    let candidate_is_slot = candidate_id.as_ref().is_some_and(|id| slots.contains(id));
    if displayed_is_slot || candidate_is_slot {
        Decision::Replace
    } else {
        Decision::Descend
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
