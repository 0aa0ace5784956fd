#![forbid(unsafe_code)]

//! Observable state containers.
//!
//! # Design
//!
//! [`Model`] is a named, clonable handle (`Rc` inside) to a mutable bag of
//! JSON values. Mutation goes through [`Model::set`], which runs the mutator
//! and then notifies observers. Observers are plain closures registered with
//! [`Model::add_observer`]; registration returns an [`ObserverId`] for later
//! removal (closures have no identity of their own to remove by).
//!
//! # Invariants
//!
//! 1. Observers are notified only after a mutation completes, never during.
//! 2. Observers are notified in registration order.
//! 3. A removed observer receives no further notifications, including the
//!    remainder of a notification pass it was removed during.
//! 4. A `set` issued from inside an observer is deferred: the mutation is
//!    queued and applied after the in-flight notification pass completes,
//!    FIFO, with its own notification pass. Callers must not assume the
//!    mutation has been applied when their `set` call returns.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

/// The key/value payload of a [`Model`].
pub type ModelData = serde_json::Map<String, Value>;

type ObserverFn = Rc<dyn Fn(&Model, Option<&str>)>;
type Mutator = Box<dyn FnOnce(&mut ModelData)>;

/// Identifies one observer registration on one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Deferred {
    mutate: Mutator,
    hint: Option<String>,
}

struct ModelInner {
    name: String,
    data: RefCell<ModelData>,
    observers: RefCell<Vec<(ObserverId, ObserverFn)>>,
    next_observer: Cell<u64>,
    notifying: Cell<bool>,
    deferred: RefCell<VecDeque<Deferred>>,
}

/// Named observable bag of key/value application data. Clones alias the same
/// model; identity is pointer identity ([`Model::ptr_eq`]).
#[derive(Clone)]
pub struct Model {
    inner: Rc<ModelInner>,
}

impl Model {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_data(name, ModelData::new())
    }

    #[must_use]
    pub fn with_data(name: impl Into<String>, data: ModelData) -> Self {
        Self {
            inner: Rc::new(ModelInner {
                name: name.into(),
                data: RefCell::new(data),
                observers: RefCell::new(Vec::new()),
                next_observer: Cell::new(1),
                notifying: Cell::new(false),
                deferred: RefCell::new(VecDeque::new()),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether two handles refer to the same model.
    #[must_use]
    pub fn ptr_eq(a: &Model, b: &Model) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Run `mutate` against the data, then notify all observers in
    /// registration order. Issued during a notification pass, the mutation
    /// is deferred (see module docs).
    pub fn set(&self, mutate: impl FnOnce(&mut ModelData) + 'static) {
        self.set_impl(Box::new(mutate), None);
    }

    /// Like [`Model::set`], passing `hint` through to every observer.
    pub fn set_with_hint(&self, mutate: impl FnOnce(&mut ModelData) + 'static, hint: &str) {
        self.set_impl(Box::new(mutate), Some(hint.to_string()));
    }

    fn set_impl(&self, mutate: Mutator, hint: Option<String>) {
        if self.inner.notifying.get() {
            self.inner
                .deferred
                .borrow_mut()
                .push_back(Deferred { mutate, hint });
            return;
        }
        self.run_set(mutate, hint);
        loop {
            let next = self.inner.deferred.borrow_mut().pop_front();
            match next {
                Some(deferred) => self.run_set(deferred.mutate, deferred.hint),
                None => break,
            }
        }
    }

    fn run_set(&self, mutate: Mutator, hint: Option<String>) {
        mutate(&mut self.inner.data.borrow_mut());
        self.notify(hint.as_deref());
    }

    fn notify(&self, hint: Option<&str>) {
        self.inner.notifying.set(true);
        let snapshot: Vec<(ObserverId, ObserverFn)> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|(id, observer)| (*id, Rc::clone(observer)))
            .collect();
        for (id, observer) in snapshot {
            // An observer removed mid-pass must stay silent for the rest of
            // the pass.
            let alive = self
                .inner
                .observers
                .borrow()
                .iter()
                .any(|(existing, _)| *existing == id);
            if alive {
                observer(self, hint);
            }
        }
        self.inner.notifying.set(false);
    }

    /// Register an observer, to be called after each mutation with the model
    /// and the mutation's optional hint.
    pub fn add_observer(&self, observer: impl Fn(&Model, Option<&str>) + 'static) -> ObserverId {
        let id = ObserverId(self.inner.next_observer.get());
        self.inner.next_observer.set(id.0 + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        id
    }

    /// Deregister an observer. Idempotent: unknown ids are a no-op.
    pub fn remove_observer(&self, id: ObserverId) {
        self.inner
            .observers
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Read access to the data. The closure must not call `set` on the same
    /// model (the data is borrowed for its duration).
    pub fn read_data<R>(&self, read: impl FnOnce(&ModelData) -> R) -> R {
        read(&self.inner.data.borrow())
    }

    /// Clone of one top-level value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.data.borrow().get(key).cloned()
    }

    /// Set one top-level value through the standard mutation path
    /// (observers are notified).
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.set(move |data| {
            data.insert(key, value);
        });
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("keys", &self.inner.data.borrow().len())
            .field("observers", &self.inner.observers.borrow().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
