// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node memo of the two expensive derived queries.
//!
//! Computing the visible parent walks the parent chain, and computing the
//! visible children scans every node in the repository. Both results are kept
//! here until the node announces a change. Memoized handles are checked for
//! liveness on every read; a memo that refers to a node freed by a rebuild or
//! a removal counts as a miss and is recomputed.

use core::cell::{Cell, RefCell};

use smallvec::SmallVec;

use crate::types::NodeId;

/// Inline capacity of memoized child lists.
pub(crate) type ChildList = SmallVec<[NodeId; 8]>;

/// Aggregate hit/miss counters of every node cache in a repository.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Queries answered from a memo.
    pub hits: u64,
    /// Queries that had to be recomputed.
    pub misses: u64,
}

#[derive(Debug, Default)]
struct Memo {
    visible_parent: Option<Option<NodeId>>,
    visible_children: Option<ChildList>,
}

#[derive(Debug, Default)]
pub(crate) struct NodeCache {
    memo: RefCell<Memo>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl NodeCache {
    /// Memoized visible parent, or `None` on a miss.
    pub(crate) fn visible_parent(&self, is_alive: impl Fn(NodeId) -> bool) -> Option<Option<NodeId>> {
        let memo = self.memo.borrow();
        let hit = match memo.visible_parent {
            Some(Some(parent)) if !is_alive(parent) => None,
            cached => cached,
        };
        self.count(hit.is_some());
        hit
    }

    pub(crate) fn store_visible_parent(&self, parent: Option<NodeId>) {
        self.memo.borrow_mut().visible_parent = Some(parent);
    }

    /// Memoized visible children, or `None` on a miss.
    pub(crate) fn visible_children(&self, is_alive: impl Fn(NodeId) -> bool) -> Option<ChildList> {
        let memo = self.memo.borrow();
        let hit = memo
            .visible_children
            .as_ref()
            .filter(|children| children.iter().all(|&c| is_alive(c)))
            .cloned();
        self.count(hit.is_some());
        hit
    }

    pub(crate) fn store_visible_children(&self, children: ChildList) {
        self.memo.borrow_mut().visible_children = Some(children);
    }

    /// Drop both memo slots.
    pub(crate) fn clear(&self) {
        let mut memo = self.memo.borrow_mut();
        memo.visible_parent = None;
        memo.visible_children = None;
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }

    fn count(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.set(counter.get() + 1);
    }
}
