#![forbid(unsafe_code)]

//! Hash-fragment page routing.
//!
//! # Design
//!
//! [`Router`] is a model-driven component: it owns a route model holding
//! `currentPage`, renders a shell containing a content slot, and swaps page
//! components in and out of that slot as the location fragment changes.
//! Fragment changes feed the route model; the router's update handler
//! notices updates to its own route model (identity compare) and performs
//! the page transition, while updates to any other model fall back to a
//! plain re-render.
//!
//! Route keys are the fragment up to an optional `?`; the remainder is a
//! route-scoped query string (distinct from the document's own query
//! string), readable through [`Router::route_query_param`].
//!
//! Navigating to an unknown route key logs and leaves the display unchanged.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use percent_encoding::percent_decode_str;
use quilt_dom::Document;
use serde_json::Value;

use crate::component::{Component, ComponentSpec, RenderFn};
use crate::error::Result;
use crate::location::{Location, SubscriptionId};
use crate::model::{Model, ModelData};

/// One route: a page component plus an optional document title.
pub struct RouteEntry {
    component: Component,
    title: Option<String>,
}

impl RouteEntry {
    #[must_use]
    pub fn component(&self) -> &Component {
        &self.component
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

/// Route key → page mapping, plus the default key used when the fragment is
/// empty. Keys are case-sensitive.
#[derive(Default)]
pub struct RouteTable {
    routes: AHashMap<String, RouteEntry>,
    default_route: Option<String>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route(mut self, key: impl Into<String>, component: Component) -> Self {
        self.routes.insert(
            key.into(),
            RouteEntry {
                component,
                title: None,
            },
        );
        self
    }

    #[must_use]
    pub fn route_titled(
        mut self,
        key: impl Into<String>,
        component: Component,
        title: impl Into<String>,
    ) -> Self {
        self.routes.insert(
            key.into(),
            RouteEntry {
                component,
                title: Some(title.into()),
            },
        );
        self
    }

    /// The route used when the location fragment is empty.
    #[must_use]
    pub fn default_route(mut self, key: impl Into<String>) -> Self {
        self.default_route = Some(key.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RouteEntry> {
        self.routes.get(key)
    }

    #[must_use]
    pub fn default_key(&self) -> Option<&str> {
        self.default_route.as_deref()
    }
}

/// Builder for [`Router`].
pub struct RouterSpec {
    table: RouteTable,
    target: Option<String>,
    content_target: String,
    renderer: Option<RenderFn>,
}

impl RouterSpec {
    #[must_use]
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            target: None,
            content_target: "content".to_string(),
            renderer: None,
        }
    }

    /// The id of the displayed element the router shell renders into.
    #[must_use]
    pub fn target(mut self, id: impl Into<String>) -> Self {
        self.target = Some(id.into());
        self
    }

    /// The id of the shell element pages are bound to (default `content`).
    /// The shell renderer must produce an element with this id.
    #[must_use]
    pub fn content_target(mut self, id: impl Into<String>) -> Self {
        self.content_target = id.into();
        self
    }

    /// Override the shell renderer. The default renders a bare container
    /// holding the content slot.
    #[must_use]
    pub fn renderer(
        mut self,
        renderer: impl Fn(&crate::model_component::RenderContext) -> String + 'static,
    ) -> Self {
        self.renderer = Some(Rc::new(renderer));
        self
    }

    #[must_use]
    pub fn build(self, document: &Document, location: &Location) -> Router {
        let RouterSpec {
            table,
            target,
            content_target,
            renderer,
        } = self;

        // Initial route: current fragment, else the default.
        let initial = route_key(&location.fragment())
            .map(str::to_string)
            .or_else(|| table.default_key().map(str::to_string));
        let mut data = ModelData::new();
        match &initial {
            Some(key) => {
                data.insert("currentPage".to_string(), Value::String(key.clone()));
            }
            None => tracing::warn!(message = "router.no_initial_route"),
        }
        let route_model = Model::with_data("route", data);

        let shell_renderer: RenderFn = renderer.unwrap_or_else(|| {
            let content = content_target.clone();
            Rc::new(move |_| format!("<div><div id=\"{content}\"></div></div>"))
        });

        let inner = Rc::new_cyclic(|weak: &Weak<RouterInner>| {
            let weak_for_updates = weak.clone();
            let mut spec = ComponentSpec::new()
                .renderer(move |context| shell_renderer(context))
                .model(route_model.clone())
                .on_model_update(move |component, model, _hint| {
                    let Some(inner) = weak_for_updates.upgrade() else {
                        return;
                    };
                    let router = Router { inner };
                    if Model::ptr_eq(model, &router.inner.route_model) {
                        router.sync_page();
                    } else {
                        component.render_or_log();
                    }
                });
            if let Some(target) = target {
                spec = spec.target(target);
            }
            let component = spec.build(document);

            RouterInner {
                component,
                route_model: route_model.clone(),
                table,
                location: location.clone(),
                document: document.clone(),
                content_target,
                active: RefCell::new(None),
                location_subscription: Cell::new(None),
            }
        });

        // Fragment changes drive the route model; the model update then
        // drives the page transition.
        let model_for_location = inner.route_model.clone();
        let default_key = inner.table.default_key().map(str::to_string);
        let subscription = location.subscribe(move |fragment| {
            let key = route_key(fragment)
                .map(str::to_string)
                .or_else(|| default_key.clone());
            match key {
                Some(key) => model_for_location.insert("currentPage", Value::String(key)),
                None => {
                    tracing::warn!(message = "router.no_route_for_fragment", fragment = %fragment);
                }
            }
        });
        inner.location_subscription.set(Some(subscription));

        Router { inner }
    }
}

struct RouterInner {
    component: Component,
    route_model: Model,
    table: RouteTable,
    location: Location,
    document: Document,
    content_target: String,
    /// The route key of the page currently occupying the content slot.
    active: RefCell<Option<String>>,
    location_subscription: Cell<Option<SubscriptionId>>,
}

impl Drop for RouterInner {
    fn drop(&mut self) {
        if let Some(id) = self.location_subscription.take() {
            self.location.unsubscribe(id);
        }
    }
}

/// Clonable handle to a router. Clones alias the same router.
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl Router {
    /// The shell component (for embedding the router under a parent).
    #[must_use]
    pub fn component(&self) -> Component {
        self.inner.component.clone()
    }

    #[must_use]
    pub fn route_model(&self) -> Model {
        self.inner.route_model.clone()
    }

    /// The key of the page currently displayed.
    #[must_use]
    pub fn active_route(&self) -> Option<String> {
        self.inner.active.borrow().clone()
    }

    /// Start the shell and activate the current page.
    pub fn start(&self) -> Result<()> {
        self.inner.component.start()?;
        self.sync_page();
        Ok(())
    }

    pub fn stop(&self) {
        self.inner.component.stop();
    }

    /// Set the location fragment to `key`, driving the standard
    /// fragment-change path.
    pub fn navigate(&self, key: &str) {
        self.inner.location.set_fragment(key);
    }

    /// Read a parameter from the route-scoped query string appended after
    /// the fragment's route key. Returns the percent-decoded value, an empty
    /// string for a parameter present without a value, and `None` when the
    /// parameter is absent.
    #[must_use]
    pub fn route_query_param(&self, name: &str) -> Option<String> {
        route_query_param(&self.inner.location.fragment(), name)
    }

    /// Bring the content slot in line with the route model's `currentPage`.
    fn sync_page(&self) {
        if !self.inner.component.is_started() {
            return;
        }
        let Some(key) = self
            .inner
            .route_model
            .get("currentPage")
            .and_then(|value| value.as_str().map(str::to_string))
        else {
            tracing::warn!(message = "router.no_current_page");
            return;
        };
        if self.inner.active.borrow().as_deref() == Some(key.as_str()) {
            return;
        }
        let Some(entry) = self.inner.table.get(&key) else {
            tracing::warn!(message = "router.unknown_route", route = %key);
            return;
        };
        tracing::debug!(message = "router.navigate", route = %key);
        if let Some(title) = entry.title() {
            self.inner.document.set_title(title);
        }

        // Stop and detach the previous page, then bind and start the new one.
        let had_previous = self.inner.active.borrow_mut().take().is_some();
        if had_previous
            && let Err(error) = self.inner.component.remove_child(&self.inner.content_target)
        {
            tracing::error!(message = "router.detach_failed", error = %error);
        }
        let page = entry.component().clone();
        page.set_target(&self.inner.content_target);
        match self.inner.component.add_child(page) {
            Ok(()) => *self.inner.active.borrow_mut() = Some(key),
            Err(error) => tracing::error!(message = "router.attach_failed", error = %error),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("active", &self.inner.active.borrow())
            .field("routes", &self.inner.table.routes.len())
            .finish()
    }
}

/// The route key inside a fragment: everything before an optional `?`.
/// Empty fragments carry no key.
fn route_key(fragment: &str) -> Option<&str> {
    let key = fragment.split('?').next().unwrap_or("");
    (!key.is_empty()).then_some(key)
}

fn route_query_param(fragment: &str, name: &str) -> Option<String> {
    let (_, query) = fragment.split_once('?')?;
    for pair in query.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (pair, None),
        };
        if key == name {
            return Some(match value {
                Some(value) => percent_decode_str(value).decode_utf8_lossy().into_owned(),
                None => String::new(),
            });
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use quilt_dom::Node;

    fn app_document() -> Document {
        let document = Document::new();
        document
            .root()
            .append_child(&Node::element("div").with_attr("id", "app"));
        document
    }

    fn page(document: &Document, body: &'static str) -> Component {
        ComponentSpec::new()
            .renderer(move |_| format!("<div><h2>{body}</h2></div>"))
            .build(document)
    }

    fn blog_router(document: &Document, location: &Location) -> Router {
        let table = RouteTable::new()
            .route_titled("posts", page(document, "Posts"), "All posts")
            .route_titled("login", page(document, "Login"), "Sign in")
            .route("edit-post", page(document, "Edit"))
            .default_route("posts");
        RouterSpec::new(table)
            .target("app")
            .build(document, location)
    }

    #[test]
    fn empty_fragment_resolves_default_route() {
        let document = app_document();
        let location = Location::new();
        let router = blog_router(&document, &location);
        assert_eq!(
            router.route_model().get("currentPage"),
            Some(Value::String("posts".to_string()))
        );

        router.start().unwrap();
        assert_eq!(router.active_route().as_deref(), Some("posts"));
        assert!(document.root().to_markup().contains("<h2>Posts</h2>"));
        assert_eq!(document.title(), "All posts");
    }

    #[test]
    fn initial_fragment_selects_route() {
        let document = app_document();
        let location = Location::with_fragment("#login");
        let router = blog_router(&document, &location);
        router.start().unwrap();
        assert_eq!(router.active_route().as_deref(), Some("login"));
        assert!(document.root().to_markup().contains("<h2>Login</h2>"));
    }

    #[test]
    fn initial_fragment_query_is_not_part_of_route_key() {
        let document = app_document();
        let location = Location::with_fragment("#edit-post?id=42");
        let router = blog_router(&document, &location);
        router.start().unwrap();
        assert_eq!(router.active_route().as_deref(), Some("edit-post"));
    }

    #[test]
    fn navigation_switches_pages_and_title() {
        let document = app_document();
        let location = Location::new();
        let router = blog_router(&document, &location);
        router.start().unwrap();

        let posts_page = router
            .inner
            .table
            .get("posts")
            .unwrap()
            .component()
            .clone();
        assert!(posts_page.is_started());

        router.navigate("login");
        assert_eq!(router.active_route().as_deref(), Some("login"));
        assert!(!posts_page.is_started());
        let markup = document.root().to_markup();
        assert!(markup.contains("<h2>Login</h2>"));
        assert!(!markup.contains("<h2>Posts</h2>"));
        assert_eq!(document.title(), "Sign in");
    }

    #[test]
    fn unknown_route_leaves_display_unchanged() {
        let document = app_document();
        let location = Location::new();
        let router = blog_router(&document, &location);
        router.start().unwrap();

        router.navigate("missing-page");
        assert_eq!(router.active_route().as_deref(), Some("posts"));
        assert!(document.root().to_markup().contains("<h2>Posts</h2>"));
        assert_eq!(document.title(), "All posts");

        // Routing still works afterwards.
        router.navigate("login");
        assert_eq!(router.active_route().as_deref(), Some("login"));
    }

    #[test]
    fn untitled_route_keeps_previous_title() {
        let document = app_document();
        let location = Location::new();
        let router = blog_router(&document, &location);
        router.start().unwrap();
        router.navigate("edit-post");
        assert_eq!(document.title(), "All posts");
    }

    #[test]
    fn no_default_route_and_empty_fragment_displays_nothing() {
        let document = app_document();
        let location = Location::new();
        let table = RouteTable::new().route("posts", page(&document, "Posts"));
        let router = RouterSpec::new(table)
            .target("app")
            .build(&document, &location);
        router.start().unwrap();
        assert_eq!(router.active_route(), None);
        assert!(!document.root().to_markup().contains("<h2>"));
    }

    #[test]
    fn clearing_fragment_falls_back_to_default() {
        let document = app_document();
        let location = Location::with_fragment("login");
        let router = blog_router(&document, &location);
        router.start().unwrap();
        assert_eq!(router.active_route().as_deref(), Some("login"));

        location.set_fragment("");
        assert_eq!(router.active_route().as_deref(), Some("posts"));
    }

    #[test]
    fn query_param_parsing() {
        let document = app_document();
        let location = Location::with_fragment("edit-post?id=42&draft&title=a%20b");
        let router = blog_router(&document, &location);
        assert_eq!(router.route_query_param("id").as_deref(), Some("42"));
        assert_eq!(router.route_query_param("draft").as_deref(), Some(""));
        assert_eq!(router.route_query_param("title").as_deref(), Some("a b"));
        assert_eq!(router.route_query_param("missing"), None);
    }

    #[test]
    fn query_param_absent_without_query_string() {
        let document = app_document();
        let location = Location::with_fragment("edit-post");
        let router = blog_router(&document, &location);
        assert_eq!(router.route_query_param("id"), None);
    }

    #[test]
    fn restart_keeps_active_page() {
        let document = app_document();
        let location = Location::new();
        let router = blog_router(&document, &location);
        router.start().unwrap();
        router.stop();
        let posts_page = router
            .inner
            .table
            .get("posts")
            .unwrap()
            .component()
            .clone();
        assert!(!posts_page.is_started());

        router.start().unwrap();
        assert!(posts_page.is_started());
        assert!(document.root().to_markup().contains("<h2>Posts</h2>"));
    }
}
