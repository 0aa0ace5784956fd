//! End-to-end flow: models, components, dynamic children, and routing wired
//! together the way a host application drives them. The host constructs
//! models and components, binds event callbacks that mutate models, calls
//! start once, and lets model notifications pull everything else through.

use quilt_dom::{Document, Node, Selector};
use quilt_runtime::{
    ComponentSpec, Location, Model, ModelData, Registry, RouteTable, RouterSpec,
};
use serde_json::{Value, json};

fn app_document() -> Document {
    let document = Document::new();
    document
        .root()
        .append_child(&Node::element("div").with_attr("id", "app"));
    document
}

fn posts_model(titles: &[&str]) -> Model {
    let mut data = ModelData::new();
    data.insert(
        "posts".to_string(),
        Value::Array(titles.iter().map(|t| json!({"title": t})).collect()),
    );
    Model::with_data("posts", data)
}

/// A post-list page over a posts model: one dynamic child per post element,
/// each scoped to its own entry of the collection.
fn post_list_page(document: &Document, model: &Model, registry: &Registry) -> quilt_runtime::Component {
    ComponentSpec::new()
        .model(model.clone())
        .registry(registry.clone())
        .custom_tag("post-preview")
        .renderer(|context| {
            let count = context
                .get("posts")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            let mut markup = String::from("<div><ul>");
            for index in 0..count {
                markup.push_str(&format!(
                    "<li key=\"{index}\"><post-preview id=\"preview-{index}\" \
                     bind=\"posts.{index}\"></post-preview></li>"
                ));
            }
            markup.push_str("</ul></div>");
            markup
        })
        .build(document)
}

#[test]
fn full_blog_flow() {
    let document = app_document();
    let location = Location::new();
    let model = posts_model(&["first", "second"]);

    let registry = Registry::new();
    let registry_document = document.clone();
    registry.register("post-preview", move |context| {
        let title = context
            .value
            .as_ref()
            .and_then(|value| value.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("untitled")
            .to_string();
        Some(
            ComponentSpec::new()
                .renderer(move |_| format!("<article><h3>{title}</h3></article>"))
                .build(&registry_document),
        )
    });

    let mut login_data = ModelData::new();
    login_data.insert("attempts".to_string(), json!(0));
    let login_model = Model::with_data("login", login_data);
    let login_model_in = login_model.clone();
    let login_page = ComponentSpec::new()
        .model(login_model.clone())
        .renderer(|context| {
            let attempts = context
                .get("attempts")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            format!(
                "<div><form><input id=\"user\" value=\"\"><button class=\"submit\">Go</button>\
                 </form><span class=\"tries\">{attempts}</span></div>"
            )
        })
        .on("button.submit", "click", move |_| {
            login_model_in.set(|data| {
                let attempts = data.get("attempts").and_then(Value::as_i64).unwrap_or(0);
                data.insert("attempts".to_string(), json!(attempts + 1));
            });
        })
        .build(&document);

    let table = RouteTable::new()
        .route_titled(
            "posts",
            post_list_page(&document, &model, &registry),
            "All posts",
        )
        .route_titled("login", login_page, "Sign in")
        .default_route("posts");
    let router = RouterSpec::new(table)
        .target("app")
        .build(&document, &location);

    // Empty fragment resolves to the default route.
    router.start().unwrap();
    assert_eq!(router.active_route().as_deref(), Some("posts"));
    assert_eq!(document.title(), "All posts");
    let markup = document.root().to_markup();
    assert!(markup.contains("<h3>first</h3>"));
    assert!(markup.contains("<h3>second</h3>"));

    // Mutating the model grows the list and spawns a new dynamic child.
    model.set(|data| {
        data.insert(
            "posts".to_string(),
            json!([{"title": "first"}, {"title": "second"}, {"title": "third"}]),
        );
    });
    assert!(document.root().to_markup().contains("<h3>third</h3>"));

    // Navigate to the login page: posts page detaches, listeners fire.
    location.set_fragment("login");
    assert_eq!(document.title(), "Sign in");
    let markup = document.root().to_markup();
    assert!(markup.contains("button"));
    assert!(!markup.contains("<h3>first</h3>"));

    // Clicking mutates the login model, which re-renders the page.
    let submit = document.root().query_all(&Selector::parse("button.submit"))[0].clone();
    submit.dispatch("click");
    assert!(
        document
            .root()
            .to_markup()
            .contains("<span class=\"tries\">1</span>")
    );

    // A typed-in value diverges from the value attribute and survives the
    // re-render triggered by the next click (no attribute changed on the
    // input, so its displayed state is left alone).
    let user_input = document.get_element_by_id("user").unwrap();
    user_input.set_value("admin");
    submit.dispatch("click");
    assert_eq!(user_input.value(), "admin");
    assert!(
        document
            .root()
            .to_markup()
            .contains("<span class=\"tries\">2</span>")
    );

    // Back to posts: dynamic children come back up, scoped per entry.
    location.set_fragment("posts");
    assert_eq!(document.title(), "All posts");
    assert!(document.root().to_markup().contains("<h3>third</h3>"));
}

#[test]
fn keyed_list_reorder_preserves_preview_subtrees() {
    let document = app_document();
    let mut data = ModelData::new();
    data.insert("order".to_string(), json!(["a", "b", "c"]));
    let model = Model::with_data("list", data);

    let component = ComponentSpec::new()
        .target("app")
        .model(model.clone())
        .renderer(|context| {
            let order = context.get("order").and_then(Value::as_array).unwrap();
            let mut markup = String::from("<ul>");
            for key in order {
                let key = key.as_str().unwrap();
                markup.push_str(&format!("<li key=\"{key}\">{key}</li>"));
            }
            markup.push_str("</ul>");
            markup
        })
        .build(&document);
    component.start().unwrap();

    let list = document.get_element_by_id("app").unwrap();
    let original: Vec<Node> = list.children();

    model.set(|data| {
        data.insert("order".to_string(), json!(["b", "a", "c"]));
    });

    let reordered = document.get_element_by_id("app").unwrap().children();
    assert_eq!(reordered[0].key().as_deref(), Some("b"));
    assert_eq!(reordered[1].key().as_deref(), Some("a"));
    // Reordering moved the existing nodes; nothing was recreated.
    assert!(Node::ptr_eq(&reordered[0], &original[1]));
    assert!(Node::ptr_eq(&reordered[1], &original[0]));
    assert!(Node::ptr_eq(&reordered[2], &original[2]));
}
