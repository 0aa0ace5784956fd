#![forbid(unsafe_code)]

//! Host bridge for the location fragment.
//!
//! The engine core never reads a real browser location; whatever host embeds
//! it pushes fragment changes into a [`Location`] and the router subscribes.
//! Subscribers are notified in registration order, after the fragment has
//! been updated.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type SubscriberFn = Rc<dyn Fn(&str)>;

/// Identifies one fragment-change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct LocationInner {
    fragment: RefCell<String>,
    subscribers: RefCell<Vec<(SubscriptionId, SubscriberFn)>>,
    next_subscription: Cell<u64>,
}

/// Clonable handle to the current location fragment. Clones alias the same
/// location.
#[derive(Clone)]
pub struct Location {
    inner: Rc<LocationInner>,
}

impl Location {
    /// Create a location with an empty fragment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fragment("")
    }

    /// Create a location with an initial fragment (leading `#` accepted and
    /// stripped).
    #[must_use]
    pub fn with_fragment(fragment: &str) -> Self {
        Self {
            inner: Rc::new(LocationInner {
                fragment: RefCell::new(normalize(fragment)),
                subscribers: RefCell::new(Vec::new()),
                next_subscription: Cell::new(1),
            }),
        }
    }

    /// The current fragment, without a leading `#`.
    #[must_use]
    pub fn fragment(&self) -> String {
        self.inner.fragment.borrow().clone()
    }

    /// Update the fragment and notify subscribers. Setting the current value
    /// again is a no-op, matching host hash-change semantics.
    pub fn set_fragment(&self, fragment: &str) {
        let fragment = normalize(fragment);
        if *self.inner.fragment.borrow() == fragment {
            return;
        }
        *self.inner.fragment.borrow_mut() = fragment.clone();
        let snapshot: Vec<(SubscriptionId, SubscriberFn)> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(id, subscriber)| (*id, Rc::clone(subscriber)))
            .collect();
        for (id, subscriber) in snapshot {
            let alive = self
                .inner
                .subscribers
                .borrow()
                .iter()
                .any(|(existing, _)| *existing == id);
            if alive {
                subscriber(&fragment);
            }
        }
    }

    /// Register a fragment-change subscriber.
    pub fn subscribe(&self, subscriber: impl Fn(&str) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner.next_subscription.set(id.0 + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(subscriber)));
        id
    }

    /// Deregister a subscriber. Idempotent.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .subscribers
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(fragment: &str) -> String {
    fragment.strip_prefix('#').unwrap_or(fragment).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_hash_stripped() {
        let location = Location::with_fragment("#posts");
        assert_eq!(location.fragment(), "posts");
        location.set_fragment("#login");
        assert_eq!(location.fragment(), "login");
    }

    #[test]
    fn subscribers_see_new_fragment() {
        let location = Location::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = Rc::clone(&seen);
        location.subscribe(move |fragment| seen_in.borrow_mut().push(fragment.to_string()));
        location.set_fragment("posts");
        location.set_fragment("edit-post?id=1");
        assert_eq!(*seen.borrow(), vec!["posts", "edit-post?id=1"]);
    }

    #[test]
    fn same_fragment_does_not_notify() {
        let location = Location::with_fragment("posts");
        location.subscribe(|_| panic!("no change expected"));
        location.set_fragment("posts");
        location.set_fragment("#posts");
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let location = Location::new();
        let id = location.subscribe(|_| panic!("unsubscribed"));
        location.unsubscribe(id);
        location.unsubscribe(id);
        location.set_fragment("anywhere");
    }
}
