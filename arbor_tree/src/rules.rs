// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parent and visibility rules per node kind.
//!
//! Parents are not stored. They are resolved on demand from the node kind, the
//! current [`Mode`] and the [`DomainState`], with node handles looked up through
//! a [`NodeLookup`]. The functions here are pure, so the decision table can be
//! exercised without a repository.
//!
//! | Kind       | [`Mode::Hierarchical`]                       | [`Mode::Flat`]  |
//! |------------|----------------------------------------------|-----------------|
//! | Top        | none                                         | none            |
//! | Group      | none                                         | top             |
//! | Data       | declared parent space, else reference space  | `data` group    |
//! | ShowAs     | own data item                                | own data item   |
//! | Space      | reference → top, others → reference space    | `space` group   |
//! | Tool       | see [`resolve_parent`]                       | `tool` group    |
//! | ViewGroup  | top                                          | top             |

use arbor_domain::{
    CoordinateSystem, DomainState, PATIENT_REFERENCE_SPACE_UID, REFERENCE_SPACE_UID, ToolKind,
};

use crate::types::{GroupKind, Mode, NodeId, NodeKind};

/// Read-only node lookups needed to resolve parents.
pub trait NodeLookup {
    /// Live node with the given uid.
    fn find(&self, uid: &str) -> Option<NodeId>;
    /// The root node.
    fn top(&self) -> Option<NodeId>;
    /// The bucket node of a group.
    fn group(&self, group: GroupKind) -> Option<NodeId>;
}

/// Resolve the structural parent of a node of `kind`.
///
/// Tools in [`Mode::Hierarchical`] resolve, in order of precedence:
/// 1. manual tools to the patient reference space,
/// 2. tools flagged as reference tools to the patient reference space,
/// 3. other tools to the node of the domain's reference tool,
/// 4. otherwise to the patient reference space.
///
/// Data items in [`Mode::Hierarchical`] resolve to the node named by their
/// declared parent space: a data item, a data-local space, or one of the two
/// well-known spaces. An empty, self-referencing or unresolved declaration
/// falls back to the reference space. This covers a data item declared in the
/// patient reference space while no tool exists, since that space node is
/// only present alongside tools.
///
/// Tools whose anchor cannot be found fall back to the patient reference space
/// and, when that is absent too, to the reference space. Both paths keep the
/// tree connected. Only a missing top or group node yields `None`.
pub fn resolve_parent(
    kind: &NodeKind,
    mode: Mode,
    domain: &DomainState,
    nodes: &impl NodeLookup,
) -> Option<NodeId> {
    match (kind, mode) {
        (NodeKind::Top, _) | (NodeKind::Group(_), Mode::Hierarchical) => None,
        (NodeKind::Group(_), Mode::Flat) | (NodeKind::ViewGroup { .. }, _) => nodes.top(),
        (NodeKind::ShowAs { data, .. }, _) => nodes.find(data),
        (NodeKind::Data { .. }, Mode::Flat) => nodes.group(GroupKind::Data),
        (NodeKind::Space(_), Mode::Flat) => nodes.group(GroupKind::Space),
        (NodeKind::Tool { .. }, Mode::Flat) => nodes.group(GroupKind::Tool),
        (NodeKind::Data { uid }, Mode::Hierarchical) => data_parent(uid, domain, nodes),
        (NodeKind::Space(space), Mode::Hierarchical) => match space {
            CoordinateSystem::Reference => nodes.top(),
            CoordinateSystem::PatientReference | CoordinateSystem::Data(_) => reference(nodes),
        },
        (NodeKind::Tool { uid }, Mode::Hierarchical) => tool_parent(uid, domain, nodes),
    }
}

fn reference(nodes: &impl NodeLookup) -> Option<NodeId> {
    nodes.find(REFERENCE_SPACE_UID)
}

fn patient_reference(nodes: &impl NodeLookup) -> Option<NodeId> {
    nodes
        .find(PATIENT_REFERENCE_SPACE_UID)
        .or_else(|| reference(nodes))
}

fn data_parent(uid: &str, domain: &DomainState, nodes: &impl NodeLookup) -> Option<NodeId> {
    let declared = domain.data(uid).map_or("", |d| d.parent_space.as_str());
    if declared.is_empty() || declared == uid {
        return reference(nodes);
    }
    // Either the data item the space is named after, or the space node implied by it.
    nodes.find(declared).or_else(|| reference(nodes))
}

fn tool_parent(uid: &str, domain: &DomainState, nodes: &impl NodeLookup) -> Option<NodeId> {
    let Some(tool) = domain.tool(uid) else {
        return patient_reference(nodes);
    };
    if tool.has_kind(ToolKind::MANUAL) || tool.has_kind(ToolKind::REFERENCE) {
        return patient_reference(nodes);
    }
    domain
        .reference_tool()
        .filter(|reference| reference.uid != uid)
        .and_then(|reference| nodes.find(&reference.uid))
        .or_else(|| patient_reference(nodes))
}

/// Extra condition a node must meet, on top of the type filter, to be visible.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Visibility<'a> {
    /// Visible regardless of the type filter.
    Always,
    /// The type filter alone decides.
    ByType,
    /// Visible only in [`Mode::Flat`].
    FlatOnly,
    /// Visible only in [`Mode::Flat`] while the data item's node is visible.
    WithData(&'a str),
    /// Visible only while some tool node is visible.
    WithVisibleTool,
}

pub(crate) fn visibility(kind: &NodeKind) -> Visibility<'_> {
    match kind {
        NodeKind::Top => Visibility::Always,
        NodeKind::Group(_) => Visibility::FlatOnly,
        NodeKind::ShowAs { data, .. } => Visibility::WithData(data),
        NodeKind::Space(CoordinateSystem::PatientReference) => Visibility::WithVisibleTool,
        NodeKind::Data { .. }
        | NodeKind::Space(_)
        | NodeKind::Tool { .. }
        | NodeKind::ViewGroup { .. } => Visibility::ByType,
    }
}

/// First visible ancestor of `start`, walking at most `bound` parents.
///
/// Returns `None` if `start` itself is invisible, if the chain ends, or if the
/// bound is exceeded (which can only happen on a parent cycle).
pub(crate) fn visible_ancestor(
    start: NodeId,
    bound: usize,
    parent_of: impl Fn(NodeId) -> Option<NodeId>,
    is_visible: impl Fn(NodeId) -> bool,
) -> Option<NodeId> {
    if !is_visible(start) {
        return None;
    }
    let mut current = parent_of(start);
    let mut steps = 0_usize;
    while let Some(id) = current {
        if is_visible(id) {
            return Some(id);
        }
        steps += 1;
        if steps > bound {
            log::warn!("parent chain of {start:?} exceeds {bound} nodes; treating as root");
            return None;
        }
        current = parent_of(id);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;
    use arbor_domain::{DataItem, DomainService, InMemoryDomain, Tool};

    /// Lookup over a fixed list of uids; the handle index is the list position.
    struct Uids(Vec<String>);

    impl Uids {
        fn new(uids: &[&str]) -> Self {
            Self(uids.iter().map(|u| u.to_string()).collect())
        }

        fn id(&self, uid: &str) -> Option<NodeId> {
            self.find(uid)
        }
    }

    impl NodeLookup for Uids {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Test lookups hold a handful of nodes."
        )]
        fn find(&self, uid: &str) -> Option<NodeId> {
            self.0
                .iter()
                .position(|u| u == uid)
                .map(|i| NodeId::new(i as u32, 1))
        }

        fn top(&self) -> Option<NodeId> {
            self.find("top")
        }

        fn group(&self, group: GroupKind) -> Option<NodeId> {
            self.find(group.name())
        }
    }

    fn tool(uid: &str) -> NodeKind {
        NodeKind::Tool {
            uid: uid.to_string(),
        }
    }

    #[test]
    fn flat_mode_parents_to_groups() {
        let nodes = Uids::new(&["top", "tool", "data", "space", "view"]);
        let state = DomainState::default();
        let flat = |kind: &NodeKind| resolve_parent(kind, Mode::Flat, &state, &nodes);

        assert_eq!(flat(&NodeKind::Top), None);
        assert_eq!(flat(&NodeKind::Group(GroupKind::Tool)), nodes.id("top"));
        assert_eq!(flat(&tool("t1")), nodes.id("tool"));
        assert_eq!(flat(&NodeKind::Space(CoordinateSystem::Reference)), nodes.id("space"));
        assert_eq!(
            flat(&NodeKind::Data {
                uid: "ct".to_string()
            }),
            nodes.id("data")
        );
        assert_eq!(flat(&NodeKind::ViewGroup { index: 0 }), nodes.id("top"));
    }

    #[test]
    fn hierarchical_spaces_chain_to_top() {
        let nodes = Uids::new(&["top", REFERENCE_SPACE_UID, PATIENT_REFERENCE_SPACE_UID]);
        let state = DomainState::default();
        let parent = |space| {
            resolve_parent(&NodeKind::Space(space), Mode::Hierarchical, &state, &nodes)
        };

        assert_eq!(parent(CoordinateSystem::Reference), nodes.id("top"));
        assert_eq!(
            parent(CoordinateSystem::PatientReference),
            nodes.id(REFERENCE_SPACE_UID)
        );
        assert_eq!(
            parent(CoordinateSystem::Data("us".to_string())),
            nodes.id(REFERENCE_SPACE_UID)
        );
        assert_eq!(
            resolve_parent(
                &NodeKind::Group(GroupKind::Data),
                Mode::Hierarchical,
                &state,
                &nodes
            ),
            None
        );
    }

    #[test]
    fn data_resolves_declared_space_or_reference() {
        let mut domain = InMemoryDomain::new();
        domain.insert_data(DataItem::new("ct", "CT"));
        domain.insert_data(DataItem::new("seg", "Segmentation").with_parent_space("ct"));
        domain.insert_data(DataItem::new("us", "US").with_parent_space("probe_space"));
        domain.insert_data(DataItem::new("lost", "Lost").with_parent_space("nowhere"));
        let nodes = Uids::new(&[REFERENCE_SPACE_UID, "ct", "seg", "us", "probe_space", "lost"]);
        let parent = |uid: &str| {
            resolve_parent(
                &NodeKind::Data {
                    uid: uid.to_string(),
                },
                Mode::Hierarchical,
                domain.state(),
                &nodes,
            )
        };

        assert_eq!(parent("ct"), nodes.id(REFERENCE_SPACE_UID));
        assert_eq!(parent("seg"), nodes.id("ct"));
        assert_eq!(parent("us"), nodes.id("probe_space"));
        assert_eq!(parent("lost"), nodes.id(REFERENCE_SPACE_UID), "unresolved space");
    }

    #[test]
    fn tool_precedence() {
        let mut domain = InMemoryDomain::new();
        domain.add_tool(Tool::new("manual", "Manual", ToolKind::MANUAL | ToolKind::REFERENCE));
        domain.add_tool(Tool::new("ref", "Reference", ToolKind::REFERENCE));
        domain.add_tool(Tool::new("pointer", "Pointer", ToolKind::POINTER));
        let nodes = Uids::new(&[
            REFERENCE_SPACE_UID,
            PATIENT_REFERENCE_SPACE_UID,
            "manual",
            "ref",
            "pointer",
        ]);
        let parent = |uid: &str, domain: &InMemoryDomain| {
            resolve_parent(&tool(uid), Mode::Hierarchical, domain.state(), &nodes)
        };

        let patient = nodes.id(PATIENT_REFERENCE_SPACE_UID);
        assert_eq!(parent("manual", &domain), patient);
        assert_eq!(parent("ref", &domain), patient);
        // The first reference-flagged tool is the manual one, which is still a valid anchor.
        assert_eq!(parent("pointer", &domain), nodes.id("manual"));

        domain.set_reference_tool(Some("ref"));
        assert_eq!(parent("pointer", &domain), nodes.id("ref"));

        // A reference tool never parents itself.
        domain.set_reference_tool(Some("pointer"));
        assert_eq!(parent("pointer", &domain), patient);
    }

    #[test]
    fn tool_falls_back_to_reference_space() {
        let nodes = Uids::new(&[REFERENCE_SPACE_UID]);
        let state = DomainState::default();
        assert_eq!(
            resolve_parent(&tool("ghost"), Mode::Hierarchical, &state, &nodes),
            nodes.id(REFERENCE_SPACE_UID)
        );
    }

    #[test]
    fn visible_ancestor_skips_hidden_nodes() {
        let id = |i| NodeId::new(i, 1);
        // 3 -> 2 -> 1 -> 0, with 2 and 1 hidden.
        let parent_of = |n: NodeId| (n.0 > 0).then(|| id(n.0 - 1));
        let is_visible = |n: NodeId| n.0 == 0 || n.0 == 3;

        assert_eq!(visible_ancestor(id(3), 4, parent_of, is_visible), Some(id(0)));
        assert_eq!(visible_ancestor(id(2), 4, parent_of, is_visible), None);
        assert_eq!(visible_ancestor(id(0), 4, parent_of, is_visible), None);
    }

    #[test]
    fn visible_ancestor_terminates_on_hidden_cycle() {
        let id = |i| NodeId::new(i, 1);
        // 0 -> 1 -> 2 -> 1 -> ...
        let parent_of = |n: NodeId| Some(id(if n.0 == 2 { 1 } else { n.0 + 1 }));
        let is_visible = |n: NodeId| n.0 == 0;

        assert_eq!(visible_ancestor(id(0), 3, parent_of, is_visible), None);
    }
}
