#![forbid(unsafe_code)]

//! Engine error taxonomy.

use quilt_dom::ParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// A render or lifecycle failure. Each variant is a discriminated failure
/// kind; none of them are recoverable by retrying the same render.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The renderer's markup contained no root element.
    #[error("renderer produced no root element")]
    EmptyMarkup,

    /// The renderer's markup contained more than one root element, which
    /// breaks the single-root invariant reconciliation depends on.
    #[error("renderer produced {count} root elements, expected exactly one")]
    MultiRootMarkup { count: usize },

    /// The renderer's markup failed to parse.
    #[error("markup parse error: {0}")]
    Markup(#[from] ParseError),
}
