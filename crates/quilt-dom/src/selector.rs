#![forbid(unsafe_code)]

//! Minimal selector matching for event binding.
//!
//! Supported forms: `tag`, `#id`, `.class`, and compounds of one tag with id
//! and/or class segments (`li.item`, `input#name`, `button.primary.small`).
//! No combinators, no attribute selectors. Matching is case-sensitive.

use crate::node::Node;

/// A parsed selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    /// Parse a selector string. Unsupported syntax yields a selector that
    /// matches nothing rather than an error.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let mut selector = Selector::default();
        if input.is_empty() || input.contains(char::is_whitespace) {
            // Combinators are unsupported; match nothing.
            selector.id = Some(String::new());
            return selector;
        }
        let mut rest = input;
        if !rest.starts_with(['#', '.']) {
            let end = rest.find(['#', '.']).unwrap_or(rest.len());
            selector.tag = Some(rest[..end].to_string());
            rest = &rest[end..];
        }
        while !rest.is_empty() {
            let marker = rest.as_bytes()[0];
            rest = &rest[1..];
            let end = rest.find(['#', '.']).unwrap_or(rest.len());
            let segment = rest[..end].to_string();
            rest = &rest[end..];
            match marker {
                b'#' => selector.id = Some(segment),
                b'.' => selector.classes.push(segment),
                _ => unreachable!("loop only entered on '#' or '.'"),
            }
        }
        selector
    }

    /// Whether `node` (an element) matches this selector.
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        let Some(tag) = node.tag() else {
            return false;
        };
        if let Some(want) = &self.tag
            && *want != tag
        {
            return false;
        }
        if let Some(want) = &self.id
            && node.id().as_deref() != Some(want.as_str())
        {
            return false;
        }
        self.classes.iter().all(|class| node.has_class(class))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
