// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The repository: node ownership, rebuilds, lookups and configuration.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::iter;

use arbor_domain::{
    CoordinateSystem, DomainEvent, DomainService, DomainState, InMemoryDomain,
    PATIENT_REFERENCE_SPACE_UID, REFERENCE_SPACE_UID, ViewFacets,
};
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::cache::{CacheStats, ChildList};
use crate::node::{Node, NodeRef};
use crate::options::{SettingsStore, TreeOptions};
use crate::rules::{self, NodeLookup, Visibility};
use crate::signal::{RepositoryEvent, Signal, SubscriptionId};
use crate::types::{GroupKind, Mode, NodeId, NodeKind, ShowFacet, TOP_NODE_UID};

struct AttachedSettings {
    store: Box<dyn SettingsStore>,
    scope: String,
}

/// Owner of every node of the entity tree.
///
/// The repository keeps a flat arena of nodes rebuilt from the domain on
/// demand. Nodes do not store their parent or children; those are resolved
/// from the node kind, the [`TreeOptions`] and the current domain state each
/// time they are asked for, with the visible parent and visible children
/// memoized per node.
///
/// Domain changes reach the repository as [`DomainEvent`]s, either through
/// [`Repository::handle_domain_event`] or by draining the domain's queue with
/// [`Repository::sync_domain_events`]. Structural changes only mark the
/// repository invalid; the node set is rebuilt on the next
/// [`Repository::update`].
///
/// ## Example
///
/// ```rust
/// use arbor_domain::{DataItem, InMemoryDomain, REFERENCE_SPACE_UID};
/// use arbor_tree::{Mode, Repository, TreeOptions};
///
/// let mut repo = Repository::new(
///     InMemoryDomain::new(),
///     TreeOptions::new().with_mode(Mode::Hierarchical),
/// );
/// repo.domain_mut().insert_data(DataItem::new("ct", "CT"));
/// repo.sync_domain_events();
/// repo.update();
///
/// let ct = repo.node("ct").unwrap();
/// assert_eq!(ct.parent().unwrap().uid(), REFERENCE_SPACE_UID);
/// ```
pub struct Repository<D: DomainService = InMemoryDomain> {
    domain: D,
    options: TreeOptions,
    settings: Option<AttachedSettings>,
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    uids: HashMap<String, NodeId>,
    invalid: bool,
    rebuilds: u64,
    events: Signal<RepositoryEvent>,
}

impl<D: DomainService + core::fmt::Debug> core::fmt::Debug for Repository<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let alive = self.uids.len();
        f.debug_struct("Repository")
            .field("domain", &self.domain)
            .field("options", &self.options)
            .field("nodes_total", &self.nodes.len())
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("invalid", &self.invalid)
            .field("rebuilds", &self.rebuilds)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl<D: DomainService> Repository<D> {
    /// Create a repository over `domain`.
    ///
    /// Only the top node exists until the first [`Repository::update`].
    pub fn new(domain: D, options: TreeOptions) -> Self {
        let mut repo = Self {
            domain,
            options,
            settings: None,
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            uids: HashMap::new(),
            invalid: true,
            rebuilds: 0,
            events: Signal::default(),
        };
        repo.insert(NodeKind::Top, None);
        repo
    }

    /// Create a repository whose options are loaded from, and written back to,
    /// `store` under `scope`.
    pub fn with_settings(domain: D, store: impl SettingsStore + 'static, scope: &str) -> Self {
        let options = TreeOptions::load(&store, scope);
        let mut repo = Self::new(domain, options);
        repo.settings = Some(AttachedSettings {
            store: Box::new(store),
            scope: scope.to_string(),
        });
        repo
    }

    /// The domain the tree is built from.
    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Mutable access to the domain. Changes take effect once their events are
    /// handled; see [`Repository::sync_domain_events`].
    pub fn domain_mut(&mut self) -> &mut D {
        &mut self.domain
    }

    /// The attached settings store, if any.
    pub fn settings(&self) -> Option<&dyn SettingsStore> {
        self.settings.as_ref().map(|s| &*s.store)
    }

    // --- configuration ---

    /// Current options.
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.options.mode
    }

    /// Switch the parent-resolution mode.
    ///
    /// The node set is unchanged. Subscribers receive
    /// [`RepositoryEvent::Changed`]`(None)` followed by [`RepositoryEvent::Loaded`],
    /// since the set of relevant group nodes differs between modes.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.options.mode == mode {
            return;
        }
        self.options.mode = mode;
        self.options_changed();
        self.events.emit(&RepositoryEvent::Loaded);
    }

    /// Node types eligible for display.
    pub fn visible_types(&self) -> &HashSet<String> {
        &self.options.visible_types
    }

    /// Replace the visible node types.
    pub fn set_visible_types<I, S>(&mut self, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: HashSet<String> = types.into_iter().map(Into::into).collect();
        if self.options.visible_types == types {
            return;
        }
        self.options.visible_types = types;
        self.options_changed();
    }

    /// Show or hide one node type.
    pub fn set_type_visible(&mut self, ty: &str, visible: bool) {
        let changed = if visible {
            self.options.visible_types.insert(ty.to_string())
        } else {
            self.options.visible_types.remove(ty)
        };
        if changed {
            self.options_changed();
        }
    }

    fn options_changed(&mut self) {
        if let Some(settings) = &mut self.settings {
            self.options.save(&mut *settings.store, &settings.scope);
        }
        self.clear_caches();
        self.events.emit(&RepositoryEvent::Changed(None));
    }

    // --- notifications ---

    /// Register a listener for [`RepositoryEvent`]s.
    pub fn subscribe(&mut self, listener: impl FnMut(&RepositoryEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// React to one domain change.
    pub fn handle_domain_event(&mut self, event: &DomainEvent) {
        match event {
            DomainEvent::DataAdded(_)
            | DomainEvent::DataRemoved(_)
            | DomainEvent::DataChanged(_)
            | DomainEvent::ViewGroupsChanged => self.invalidate(),
            DomainEvent::ActiveDataChanged { previous, current }
            | DomainEvent::ActiveToolChanged { previous, current } => {
                self.selection_changed(&[previous.clone(), current.clone()]);
            }
            DomainEvent::ActiveViewGroupChanged { previous, current } => {
                let uid = |index: &Option<usize>| {
                    index.map(|index| NodeKind::ViewGroup { index }.uid())
                };
                self.selection_changed(&[uid(previous), uid(current)]);
            }
            DomainEvent::ReferenceToolChanged => {
                self.clear_caches();
                self.events.emit(&RepositoryEvent::Changed(None));
            }
            DomainEvent::ViewFacetsChanged { data, .. } => {
                let shown: SmallVec<[NodeId; 3]> = ShowFacet::ALL
                    .iter()
                    .filter_map(|&facet| {
                        let kind = NodeKind::ShowAs {
                            data: data.clone(),
                            facet,
                        };
                        self.find(&kind.uid())
                    })
                    .collect();
                for id in shown {
                    self.mark_node_changed(id);
                }
            }
            DomainEvent::ToolsChanged
            | DomainEvent::ToolStateChanged(_)
            | DomainEvent::PatientChanged => {
                self.invalidate();
                self.events.emit(&RepositoryEvent::Loaded);
            }
        }
    }

    /// Handle every event the domain queued since the last call.
    ///
    /// Returns the number of events handled.
    pub fn sync_domain_events(&mut self) -> usize {
        let events = self.domain.drain_events();
        for event in &events {
            self.handle_domain_event(event);
        }
        events.len()
    }

    fn selection_changed(&mut self, uids: &[Option<String>]) {
        let ids: SmallVec<[NodeId; 2]> = uids
            .iter()
            .flatten()
            .filter_map(|uid| self.find(uid))
            .collect();
        if ids.is_empty() {
            self.events.emit(&RepositoryEvent::Changed(None));
        }
        for id in ids {
            self.mark_node_changed(id);
        }
    }

    /// Announce that a node's derived attributes changed.
    ///
    /// The node's memo is dropped and the change is re-emitted as
    /// [`RepositoryEvent::Changed`] for that node. Stale handles are ignored.
    pub fn mark_node_changed(&mut self, id: NodeId) {
        let Some(node) = self.node_opt(id) else {
            return;
        };
        node.cache.clear();
        self.events.emit(&RepositoryEvent::Changed(Some(id)));
    }

    fn clear_caches(&self) {
        for node in self.nodes.iter().flatten() {
            node.cache.clear();
        }
    }

    // --- structure ---

    /// Mark the node set as out of date and notify subscribers.
    pub fn invalidate(&mut self) {
        self.invalid = true;
        self.events.emit(&RepositoryEvent::Invalidated);
    }

    /// Whether the next [`Repository::update`] will rebuild.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Rebuild if invalid. Returns whether a rebuild happened.
    pub fn update(&mut self) -> bool {
        let rebuilt = self.invalid;
        if rebuilt {
            self.rebuild();
        }
        self.invalid = false;
        rebuilt
    }

    /// Number of rebuilds performed so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Discard every node and recreate the node set from the domain.
    ///
    /// Nodes are inserted in a fixed order: top, the four groups, the reference
    /// space, each data item followed by its three show-as nodes, spaces implied
    /// by data items, the patient reference space (when any tool exists), each
    /// tool and each view group. A node whose uid is already taken is skipped,
    /// and so are the show-as nodes of a skipped data node.
    ///
    /// Every handle from before the rebuild becomes stale.
    pub fn rebuild(&mut self) {
        for slot in &mut self.nodes {
            *slot = None;
        }
        self.uids.clear();
        self.free_list = (0..self.nodes.len()).rev().collect();

        let mut shadowed: Option<String> = None;
        for (kind, name) in node_specs(self.domain.state()) {
            if let NodeKind::ShowAs { data, .. } = &kind
                && shadowed.as_ref() == Some(data)
            {
                continue;
            }
            let data_uid = match &kind {
                NodeKind::Data { uid } => Some(uid.clone()),
                _ => None,
            };
            let inserted = self.insert(kind, name).is_some();
            if data_uid.is_some() {
                shadowed = if inserted { None } else { data_uid };
            }
        }
        self.rebuilds += 1;
        log::debug!("rebuilt entity tree with {} nodes", self.uids.len());
    }

    fn insert(&mut self, kind: NodeKind, name: Option<String>) -> Option<NodeId> {
        let uid = kind.uid();
        if let Some(existing) = self.find(&uid) {
            log::debug!("skipping node `{uid}`: uid already taken by {existing:?}");
            return None;
        }
        let name = name.unwrap_or_else(|| kind.fallback_name());
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, uid.clone(), name, kind));
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.nodes
                .push(Some(Node::new(generation, uid.clone(), name, kind)));
            self.generations.push(generation);
            (self.nodes.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "NodeId stores 32-bit slot indices."
        )]
        let id = NodeId::new(idx as u32, generation);
        self.uids.insert(uid, id);
        Some(id)
    }

    fn free(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(node) = self.nodes[id.idx()].take() {
            self.uids.remove(&node.uid);
            self.free_list.push(id.idx());
        }
    }

    // --- lookups ---

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.uids.len()
    }

    /// Returns true if no node is live. Never the case while the top node exists.
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// Returns true if `id` refers to a node of the current snapshot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn live(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, slot)| {
            let node = slot.as_ref()?;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId stores 32-bit slot indices."
            )]
            let id = NodeId::new(i as u32, node.generation);
            Some((id, node))
        })
    }

    /// View of a live node.
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, D>> {
        self.node_opt(id).map(|node| NodeRef::new(self, id, node))
    }

    /// Node with the given uid.
    pub fn node(&self, uid: &str) -> Option<NodeRef<'_, D>> {
        self.find(uid).and_then(|id| self.get(id))
    }

    /// Every live node, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_, D>> + '_ {
        self.live().map(|(id, node)| NodeRef::new(self, id, node))
    }

    /// The root node.
    ///
    /// The top node is installed on construction and on every rebuild, so a
    /// miss is a bug; it is logged and reported as `None`.
    pub fn top_node(&self) -> Option<NodeRef<'_, D>> {
        let top = self.top().and_then(|id| self.get(id));
        if top.is_none() {
            log::warn!("entity tree has no top node");
        }
        top
    }

    /// Group bucket by short name (`"tool"`, `"data"`, `"space"` or `"view"`).
    pub fn node_for_group(&self, name: &str) -> Option<NodeRef<'_, D>> {
        GroupKind::ALL
            .into_iter()
            .find(|group| group.name() == name)
            .and_then(|group| self.group(group))
            .and_then(|id| self.get(id))
    }

    // --- derived queries ---

    /// Structural parent of a node.
    ///
    /// Resolved by [`rules::resolve_parent`] against the current mode and
    /// domain state. `None` for roots and stale handles.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node_opt(id)?;
        rules::resolve_parent(&node.kind, self.options.mode, self.domain.state(), self)
    }

    /// Whether a node is shown.
    ///
    /// The top node is always visible. Other nodes must pass
    /// [`TreeOptions::is_type_visible`]; in addition groups are only visible in
    /// flat mode, show-as nodes only in flat mode while their data item is
    /// visible, and the patient reference space only while some tool is visible.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let Some(node) = self.node_opt(id) else {
            return false;
        };
        let flat = self.options.mode == Mode::Flat;
        let by_type = || self.options.is_type_visible(node.kind.node_type());
        match rules::visibility(&node.kind) {
            Visibility::Always => true,
            Visibility::ByType => by_type(),
            Visibility::FlatOnly => flat && by_type(),
            Visibility::WithData(data) => {
                flat && by_type() && self.find(data).is_some_and(|d| self.is_visible(d))
            }
            Visibility::WithVisibleTool => {
                by_type()
                    && self
                        .live()
                        .any(|(t, n)| matches!(n.kind, NodeKind::Tool { .. }) && self.is_visible(t))
            }
        }
    }

    /// Nearest visible ancestor of a visible node. Memoized.
    ///
    /// Returns `None` for invisible nodes and for visible nodes with no visible
    /// ancestor. The walk is bounded by the node count; a parent cycle among
    /// hidden nodes is logged and treated as "no visible ancestor".
    pub fn visible_parent_of(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node_opt(id)?;
        if let Some(parent) = node.cache.visible_parent(|p| self.is_alive(p)) {
            return parent;
        }
        let parent = rules::visible_ancestor(
            id,
            self.len(),
            |n| self.parent_of(n),
            |n| self.is_visible(n),
        );
        node.cache.store_visible_parent(parent);
        parent
    }

    /// Nodes whose parent is `id`, in insertion order.
    ///
    /// Computed by scanning every node, so this is linear in the node count.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        if !self.is_alive(id) {
            return Vec::new();
        }
        self.live()
            .map(|(child, _)| child)
            .filter(|&child| self.parent_of(child) == Some(id))
            .collect()
    }

    /// Nodes whose visible parent is `id`, in insertion order. Memoized.
    pub fn visible_children_of(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node_opt(id) else {
            return Vec::new();
        };
        if let Some(children) = node.cache.visible_children(|c| self.is_alive(c)) {
            return children.into_vec();
        }
        let children: ChildList = self
            .live()
            .map(|(child, _)| child)
            .filter(|&child| self.visible_parent_of(child) == Some(id))
            .collect();
        node.cache.store_visible_children(children.clone());
        children.into_vec()
    }

    /// Aggregate memo counters over every live node.
    pub fn cache_stats(&self) -> CacheStats {
        self.nodes
            .iter()
            .flatten()
            .map(|node| node.cache.stats())
            .fold(CacheStats::default(), |acc, s| CacheStats {
                hits: acc.hits + s.hits,
                misses: acc.misses + s.misses,
            })
    }

    // --- actions ---

    /// Make the node's entity the active one.
    ///
    /// Data and show-as nodes activate their data item, tool nodes their tool and
    /// view group nodes their view group. A data-local space activates the data
    /// item it is named after, if one exists by now. Returns false for other
    /// nodes.
    pub fn activate(&mut self, id: NodeId) -> bool {
        let Some(kind) = self.node_opt(id).map(|n| n.kind.clone()) else {
            return false;
        };
        match kind {
            NodeKind::Data { uid } | NodeKind::ShowAs { data: uid, .. } => {
                self.domain.set_active_data(Some(&uid));
            }
            NodeKind::Space(CoordinateSystem::Data(uid)) => {
                if self.domain.state().data(&uid).is_none() {
                    return false;
                }
                self.domain.set_active_data(Some(&uid));
            }
            NodeKind::Tool { uid } => self.domain.set_active_tool(Some(&uid)),
            NodeKind::ViewGroup { index } => self.domain.set_active_view_group(index),
            NodeKind::Top | NodeKind::Group(_) | NodeKind::Space(_) => return false,
        }
        true
    }

    /// Flip a show-as node's facet for its data item in the active view group.
    ///
    /// Returns false for other nodes, or when there is no view group.
    pub fn toggle_visibility(&mut self, id: NodeId) -> bool {
        let Some(NodeKind::ShowAs { data, facet }) = self.node_opt(id).map(|n| n.kind.clone())
        else {
            return false;
        };
        let state = self.domain.state();
        let Some(group) = state.active_view_group() else {
            return false;
        };
        let facets = state
            .view_group(group)
            .map_or(ViewFacets::empty(), |g| g.facets_of(&data))
            ^ facet.flag();
        self.domain.set_view_facets(group, &data, facets)
    }

    /// Whether [`Repository::remove`] applies to the node.
    pub fn is_removable(&self, id: NodeId) -> bool {
        self.node_opt(id)
            .is_some_and(|n| matches!(n.kind, NodeKind::Data { .. }))
    }

    /// Remove a data node's item from the domain.
    ///
    /// The data node and its show-as nodes are dropped at once, without waiting
    /// for a rebuild, and subscribers receive [`RepositoryEvent::Invalidated`].
    /// Returns false for nodes that are not removable.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(NodeKind::Data { uid }) = self.node_opt(id).map(|n| n.kind.clone()) else {
            return false;
        };
        if !self.domain.remove_data(&uid) {
            log::debug!("data item `{uid}` was already gone from the domain");
        }
        let doomed: Vec<NodeId> = self
            .live()
            .filter(|(_, n)| matches!(&n.kind, NodeKind::ShowAs { data, .. } if *data == uid))
            .map(|(show, _)| show)
            .chain(iter::once(id))
            .collect();
        for node in doomed {
            self.free(node);
        }
        self.events.emit(&RepositoryEvent::Invalidated);
        true
    }
}

impl<D: DomainService> NodeLookup for Repository<D> {
    fn find(&self, uid: &str) -> Option<NodeId> {
        self.uids.get(uid).copied().filter(|&id| self.is_alive(id))
    }

    fn top(&self) -> Option<NodeId> {
        self.find(TOP_NODE_UID)
    }

    fn group(&self, group: GroupKind) -> Option<NodeId> {
        self.find(&NodeKind::Group(group).uid())
    }
}

/// Kinds and domain names of every node a rebuild inserts, in order.
fn node_specs(state: &DomainState) -> Vec<(NodeKind, Option<String>)> {
    let mut specs = Vec::new();
    specs.push((NodeKind::Top, None));
    specs.extend(GroupKind::ALL.map(|group| (NodeKind::Group(group), None)));
    specs.push((NodeKind::Space(CoordinateSystem::Reference), None));

    // The well-known space uids always name the canonical space nodes.
    let reserved = |uid: &str| uid == REFERENCE_SPACE_UID || uid == PATIENT_REFERENCE_SPACE_UID;
    for item in state.data_items().iter().filter(|item| !reserved(item.uid.as_str())) {
        specs.push((
            NodeKind::Data {
                uid: item.uid.clone(),
            },
            Some(item.name.clone()),
        ));
        specs.extend(ShowFacet::ALL.map(|facet| {
            (
                NodeKind::ShowAs {
                    data: item.uid.clone(),
                    facet,
                },
                None,
            )
        }));
    }
    for item in state.data_items() {
        let space = &item.parent_space;
        if !space.is_empty() && !reserved(space.as_str()) && state.data(space).is_none() {
            specs.push((NodeKind::Space(CoordinateSystem::Data(space.clone())), None));
        }
    }

    if !state.tools().is_empty() {
        specs.push((NodeKind::Space(CoordinateSystem::PatientReference), None));
    }
    for tool in state.tools() {
        specs.push((
            NodeKind::Tool {
                uid: tool.uid.clone(),
            },
            Some(tool.name.clone()),
        ));
    }
    for group in state.view_groups() {
        specs.push((NodeKind::ViewGroup { index: group.index }, None));
    }
    specs
}
