#![forbid(unsafe_code)]

//! Markup parsing errors.

use thiserror::Error;

/// Syntactic failure while parsing markup. Positions are byte offsets into
/// the input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input at byte {at}")]
    UnexpectedEof { at: usize },

    #[error("malformed tag at byte {at}")]
    MalformedTag { at: usize },

    #[error("mismatched closing tag at byte {at}: expected </{expected}>, found </{found}>")]
    MismatchedClosingTag {
        expected: String,
        found: String,
        at: usize,
    },

    #[error("unclosed element <{tag}> starting at byte {at}")]
    UnclosedElement { tag: String, at: usize },

    #[error("stray closing tag </{tag}> at byte {at}")]
    StrayClosingTag { tag: String, at: usize },
}
