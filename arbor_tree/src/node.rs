// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node records and the borrowed view handed out by the repository.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use arbor_domain::{DataItem, DomainService, Tool};

use crate::cache::NodeCache;
use crate::presenter::Presenter;
use crate::repository::Repository;
use crate::types::{NodeId, NodeKind};

/// Arena record of one node.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) generation: u32,
    pub(crate) uid: String,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) cache: NodeCache,
}

impl Node {
    pub(crate) fn new(generation: u32, uid: String, name: String, kind: NodeKind) -> Self {
        Self {
            generation,
            uid,
            name,
            kind,
            cache: NodeCache::default(),
        }
    }
}

/// A live node, borrowed from its [`Repository`].
///
/// Every derived query (parent, visibility, children) is answered by the
/// repository at call time, so a `NodeRef` always reflects the current
/// configuration and domain state.
pub struct NodeRef<'a, D: DomainService> {
    repo: &'a Repository<D>,
    id: NodeId,
    node: &'a Node,
}

impl<D: DomainService> Clone for NodeRef<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: DomainService> Copy for NodeRef<'_, D> {}

impl<D: DomainService> fmt::Debug for NodeRef<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("uid", &self.node.uid)
            .field("kind", &self.node.kind)
            .finish_non_exhaustive()
    }
}

impl<D: DomainService> PartialEq for NodeRef<'_, D> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && core::ptr::eq(self.repo, other.repo)
    }
}

impl<'a, D: DomainService> NodeRef<'a, D> {
    pub(crate) fn new(repo: &'a Repository<D>, id: NodeId, node: &'a Node) -> Self {
        Self { repo, id, node }
    }

    /// Handle of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Uid, unique within the repository snapshot.
    pub fn uid(&self) -> &'a str {
        &self.node.uid
    }

    /// Display name.
    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    /// Type used by the visibility filter.
    pub fn node_type(&self) -> &'static str {
        self.node.kind.node_type()
    }

    /// What the node stands for.
    pub fn kind(&self) -> &'a NodeKind {
        &self.node.kind
    }

    /// Structural parent. See [`Repository::parent_of`].
    pub fn parent(&self) -> Option<Self> {
        self.repo.parent_of(self.id).and_then(|id| self.repo.get(id))
    }

    /// Whether the node is shown. See [`Repository::is_visible`].
    pub fn is_visible(&self) -> bool {
        self.repo.is_visible(self.id)
    }

    /// Nearest visible ancestor. See [`Repository::visible_parent_of`].
    pub fn visible_parent(&self) -> Option<Self> {
        self.repo
            .visible_parent_of(self.id)
            .and_then(|id| self.repo.get(id))
    }

    /// Nodes whose parent is this node.
    pub fn children(&self) -> Vec<Self> {
        self.resolve(self.repo.children_of(self.id))
    }

    /// Nodes whose visible parent is this node.
    pub fn visible_children(&self) -> Vec<Self> {
        self.resolve(self.repo.visible_children_of(self.id))
    }

    /// Whether [`Repository::remove`] would remove this node.
    pub fn is_removable(&self) -> bool {
        self.repo.is_removable(self.id)
    }

    /// The data item behind a data or show-as node.
    pub fn data_item(&self) -> Option<&'a DataItem> {
        let state = self.repo.domain().state();
        match &self.node.kind {
            NodeKind::Data { uid } | NodeKind::ShowAs { data: uid, .. } => state.data(uid),
            _ => None,
        }
    }

    /// The tool behind a tool node.
    pub fn tool(&self) -> Option<&'a Tool> {
        match &self.node.kind {
            NodeKind::Tool { uid } => self.repo.domain().state().tool(uid),
            _ => None,
        }
    }

    /// Whether the node is the active data item, tool or view group.
    pub fn is_active(&self) -> bool {
        let state = self.repo.domain().state();
        match &self.node.kind {
            NodeKind::Data { uid } => state.active_data() == Some(uid.as_str()),
            NodeKind::Tool { uid } => state.active_tool() == Some(uid.as_str()),
            NodeKind::ViewGroup { index } => state.active_view_group() == Some(*index),
            _ => false,
        }
    }

    /// For show-as nodes, whether the facet is enabled in the active view group.
    pub fn is_shown(&self) -> bool {
        let NodeKind::ShowAs { data, facet } = &self.node.kind else {
            return false;
        };
        let state = self.repo.domain().state();
        state
            .active_view_group()
            .and_then(|index| state.view_group(index))
            .is_some_and(|group| group.facets_of(data).contains(facet.flag()))
    }

    /// Icon produced by `presenter`.
    pub fn icon<P: Presenter<D>>(&self, presenter: &P) -> P::Icon {
        presenter.icon(self)
    }

    /// Color produced by `presenter`.
    pub fn color<P: Presenter<D>>(&self, presenter: &P) -> P::Color {
        presenter.color(self)
    }

    /// Font produced by `presenter`.
    pub fn font<P: Presenter<D>>(&self, presenter: &P) -> P::Font {
        presenter.font(self)
    }

    /// Properties panel produced by `presenter`, if the node has one.
    pub fn properties_panel<P: Presenter<D>>(&self, presenter: &P) -> Option<P::Panel> {
        presenter.properties_panel(self)
    }

    fn resolve(&self, ids: Vec<NodeId>) -> Vec<Self> {
        ids.into_iter().filter_map(|id| self.repo.get(id)).collect()
    }
}
