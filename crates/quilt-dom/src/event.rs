#![forbid(unsafe_code)]

//! Event values delivered to listeners attached via [`Node::add_listener`].
//!
//! [`Node::add_listener`]: crate::node::Node::add_listener

use crate::node::Node;

/// An event dispatched against a single element.
///
/// There is no capture or bubble phase: listeners are attached directly to
/// every element they should observe, so an event only ever reaches the node
/// it was dispatched on.
#[derive(Clone)]
pub struct Event {
    /// Event name, e.g. `"click"` or `"input"`.
    pub name: String,
    /// The element the event was dispatched on.
    pub target: Node,
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("target", &self.target)
            .finish()
    }
}
