// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Tree: the entity tree of an image-guided therapy workspace.
//!
//! A [`Repository`] turns the state of a [`DomainService`](arbor_domain::DomainService)
//! into a tree of nodes: data items and their show-as facets, tracking tools,
//! coordinate spaces and view groups, under a single invisible top node.
//!
//! - Nodes are closed variants of [`NodeKind`]; each one names a domain entity by
//!   uid and never owns it.
//! - Parents are not stored. They are resolved by [`resolve_parent`] from the
//!   node kind, the current [`Mode`] and the domain state.
//! - A [`TreeOptions`] type filter and per-kind rules decide visibility; hidden
//!   nodes are skipped by [`Repository::visible_parent_of`] and
//!   [`Repository::visible_children_of`], whose results are memoized per node.
//! - Domain changes arrive as events; structural ones mark the repository
//!   invalid and the node set is rebuilt on the next [`Repository::update`].
//! - Subscribers observe [`RepositoryEvent`]s. Display attributes come from a
//!   caller-supplied [`Presenter`].
//!
//! ## Modes
//!
//! In [`Mode::Flat`] every entity sits under the group bucket of its kind
//! (`Tools`, `Data`, `Spaces`, `Views`). In [`Mode::Hierarchical`] the groups are
//! hidden and entities nest by coordinate space: data under its parent space,
//! tools under the reference tool or the patient reference space, spaces under
//! the reference space.
//!
//! ## Example
//!
//! ```rust
//! use arbor_domain::{DataItem, InMemoryDomain, Tool, ToolKind};
//! use arbor_tree::{Mode, Repository, RepositoryEvent, TreeOptions};
//!
//! let mut repo = Repository::new(InMemoryDomain::new(), TreeOptions::new());
//! repo.domain_mut().insert_data(DataItem::new("ct", "CT"));
//! repo.domain_mut()
//!     .add_tool(Tool::new("pointer", "Pointer", ToolKind::POINTER));
//! repo.sync_domain_events();
//! repo.update();
//!
//! let ct = repo.node("ct").unwrap();
//! assert_eq!(ct.parent().unwrap().uid(), "group_data");
//! assert_eq!(ct.children().len(), 3);
//!
//! repo.subscribe(|event| {
//!     if let RepositoryEvent::Changed(None) = event {
//!         // Refresh the whole view.
//!     }
//! });
//! repo.set_mode(Mode::Hierarchical);
//! assert_eq!(repo.node("ct").unwrap().parent().unwrap().uid(), "reference");
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod cache;
mod node;
mod options;
mod presenter;
mod repository;
mod rules;
mod signal;
mod types;

pub use cache::CacheStats;
pub use node::NodeRef;
pub use options::{DEFAULT_SCOPE, MemorySettings, SettingsStore, TreeOptions};
pub use presenter::Presenter;
pub use repository::Repository;
pub use rules::{NodeLookup, resolve_parent};
pub use signal::{RepositoryEvent, SubscriptionId};
pub use types::{
    GroupKind, Mode, NodeId, NodeKind, ParseModeError, ShowFacet, TOP_NODE_UID, node_type,
};
