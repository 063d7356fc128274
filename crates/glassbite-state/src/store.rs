#![forbid(unsafe_code)]

//! Subscribe/notify wrapper around a pure reducer.
//!
//! A [`Store`] owns the current state of one session slice. Screens call
//! [`Store::dispatch`]; the store runs the slice's [`Reducer::reduce`],
//! swaps in the new state, and notifies subscribers.
//!
//! # Invariants
//!
//! 1. Listeners run in registration order, once per dispatch that changed
//!    the state. A dispatch that leaves the state equal notifies nobody.
//! 2. No borrow is held while listeners run, so a listener may read the
//!    store or dispatch again.
//! 3. Dropping a [`StoreSubscription`] removes exactly its own listener.
//!
//! Stores are single-threaded (`Rc`); clone a store to share it between
//! screens on the same thread.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// A state slice with a total, pure transition function.
pub trait Reducer: Clone + Default + PartialEq + 'static {
    type Action: fmt::Debug;

    /// Apply `action`. Must not panic; invalid actions return `self` unchanged.
    fn reduce(self, action: Self::Action) -> Self;
}

type Listener<S> = Rc<dyn Fn(&S)>;

struct Inner<S> {
    state: RefCell<Rc<S>>,
    listeners: RefCell<Vec<(u64, Listener<S>)>>,
    next_id: Cell<u64>,
    version: Cell<u64>,
}

/// Shared handle to one state slice.
pub struct Store<S: Reducer> {
    inner: Rc<Inner<S>>,
}

impl<S: Reducer> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Reducer + fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state.borrow())
            .field("version", &self.inner.version.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl<S: Reducer> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Reducer> Store<S> {
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(Rc::new(initial)),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                version: Cell::new(0),
            }),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> Rc<S> {
        Rc::clone(&self.inner.state.borrow())
    }

    /// Number of state changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Run `action` through the reducer and notify on change.
    pub fn dispatch(&self, action: S::Action) {
        let current = self.state();
        tracing::trace!(slice = std::any::type_name::<S>(), action = ?action, "dispatch");
        let next = S::clone(&current).reduce(action);
        if next == *current {
            return;
        }

        let next = Rc::new(next);
        *self.inner.state.borrow_mut() = Rc::clone(&next);
        self.inner.version.set(self.inner.version.get() + 1);

        let listeners: Vec<Listener<S>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(&next);
        }
    }

    /// Register `callback` for state changes.
    pub fn subscribe(&self, callback: impl Fn(&S) + 'static) -> StoreSubscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.listeners.borrow_mut().push((id, Rc::new(callback)));

        let weak: Weak<Inner<S>> = Rc::downgrade(&self.inner);
        StoreSubscription {
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

/// RAII guard for a store listener. Dropping it unsubscribes.
#[must_use = "dropping this guard unsubscribes immediately"]
pub struct StoreSubscription {
    remove: Option<Box<dyn FnOnce()>>,
}

impl StoreSubscription {
    /// Explicit form of dropping the guard.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for StoreSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSubscription").finish_non_exhaustive()
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}
