// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notifications emitted by the repository.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::types::NodeId;

/// Notification delivered to repository subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepositoryEvent {
    /// The node set may have changed; call
    /// [`Repository::update`](crate::Repository::update) and reset any view of it.
    Invalidated,
    /// Derived attributes of one node changed, or of every node when `None`.
    Changed(Option<NodeId>),
    /// The domain was reloaded as a whole (patient switched, tracking
    /// reconfigured, mode changed).
    Loaded,
}

/// Handle returned by [`Repository::subscribe`](crate::Repository::subscribe).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// A list of listeners invoked in subscription order.
pub(crate) struct Signal<E> {
    next: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self {
            next: 0,
            listeners: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<E> Signal<E> {
    pub(crate) fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next);
        self.next += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub(crate) fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signal = Signal::default();

        let first = Rc::clone(&seen);
        let a = signal.subscribe(move |e: &u32| first.borrow_mut().push(("a", *e)));
        let second = Rc::clone(&seen);
        signal.subscribe(move |e: &u32| second.borrow_mut().push(("b", *e)));

        signal.emit(&1);
        assert!(signal.unsubscribe(a));
        assert!(!signal.unsubscribe(a), "double unsubscribe is a no-op");
        signal.emit(&2);

        assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1), ("b", 2)]);
    }
}
