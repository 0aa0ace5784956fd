#![forbid(unsafe_code)]

//! Model-driven rendering support.
//!
//! A component built over one or more [`Model`]s renders from a single
//! merged context: each model's top-level entries are shallow-copied into
//! one map in model-list order, so later models win on conflicting keys.
//! The type system guarantees every member of the composition is a model,
//! discharging the construction-time validity check statically.
//!
//! Custom-tag elements may carry a `bind` attribute holding a dot-path into
//! the merged context (`posts.2.title`; numeric segments index arrays). The
//! resolved value is handed to the dynamic child factory so each created
//! child is scoped to one element of a data collection.

use serde_json::Value;

use crate::model::Model;

/// The context object a renderer is invoked with.
pub type RenderContext = serde_json::Map<String, Value>;

/// Shallow-merge the models' top-level entries, in list order. Later models
/// win on conflicting keys.
#[must_use]
pub fn merged_context(models: &[Model]) -> RenderContext {
    let mut context = RenderContext::new();
    for model in models {
        model.read_data(|data| {
            for (key, value) in data {
                context.insert(key.clone(), value.clone());
            }
        });
    }
    context
}

/// Resolve a dot-path binding expression against a merged context. Numeric
/// segments index arrays; anything unresolvable yields `None`.
#[must_use]
pub fn resolve_bind_path(context: &RenderContext, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let mut cursor = context.get(segments.next()?)?;
    for segment in segments {
        cursor = match cursor {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cursor.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_with(name: &str, entries: &[(&str, Value)]) -> Model {
        let mut data = crate::model::ModelData::new();
        for (key, value) in entries {
            data.insert((*key).to_string(), value.clone());
        }
        Model::with_data(name, data)
    }

    #[test]
    fn merge_copies_top_level_entries() {
        let a = model_with("a", &[("title", json!("hello")), ("count", json!(2))]);
        let context = merged_context(&[a]);
        assert_eq!(context.get("title"), Some(&json!("hello")));
        assert_eq!(context.get("count"), Some(&json!(2)));
    }

    #[test]
    fn later_models_win_on_conflicts() {
        let a = model_with("a", &[("title", json!("first")), ("only-a", json!(1))]);
        let b = model_with("b", &[("title", json!("second"))]);
        let context = merged_context(&[a, b]);
        assert_eq!(context.get("title"), Some(&json!("second")));
        assert_eq!(context.get("only-a"), Some(&json!(1)));
    }

    #[test]
    fn merge_is_shallow() {
        let nested = json!({"inner": {"x": 1}});
        let a = model_with("a", &[("data", nested.clone())]);
        let context = merged_context(&[a]);
        assert_eq!(context.get("data"), Some(&nested));
    }

    #[test]
    fn bind_path_resolves_objects_and_arrays() {
        let model = model_with(
            "posts",
            &[(
                "posts",
                json!([{"title": "one"}, {"title": "two", "tags": ["x", "y"]}]),
            )],
        );
        let context = merged_context(&[model]);
        assert_eq!(
            resolve_bind_path(&context, "posts.1.title"),
            Some(json!("two"))
        );
        assert_eq!(
            resolve_bind_path(&context, "posts.1.tags.0"),
            Some(json!("x"))
        );
    }

    #[test]
    fn bind_path_misses_yield_none() {
        let model = model_with("posts", &[("posts", json!([{"title": "one"}]))]);
        let context = merged_context(&[model]);
        assert_eq!(resolve_bind_path(&context, "missing"), None);
        assert_eq!(resolve_bind_path(&context, "posts.9.title"), None);
        assert_eq!(resolve_bind_path(&context, "posts.zero"), None);
        assert_eq!(resolve_bind_path(&context, "posts.0.title.deeper"), None);
    }
}
