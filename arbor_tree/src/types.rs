// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the entity tree: node identifiers, node kinds and the display mode.

use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

use arbor_domain::{CoordinateSystem, ViewFacets};

/// Node type strings understood by the visibility filter.
pub mod node_type {
    /// Data items and their show-as nodes.
    pub const DATA: &str = "data";
    /// Tracking tools.
    pub const TOOL: &str = "tool";
    /// Coordinate spaces.
    pub const SPACE: &str = "space";
    /// Logical group buckets.
    pub const GROUP: &str = "group";
    /// View groups.
    pub const VIEW: &str = "view";
    /// The invisible root. Not filterable.
    pub const TOP: &str = "top";

    /// Every type that [`visible_types`](crate::TreeOptions::visible_types) can hide.
    pub const RECOGNIZED: [&str; 5] = [DATA, TOOL, SPACE, GROUP, VIEW];

    /// Returns true if `ty` is one of [`RECOGNIZED`].
    pub fn is_recognized(ty: &str) -> bool {
        RECOGNIZED.contains(&ty)
    }
}

/// Uid of the root node.
pub const TOP_NODE_UID: &str = "node::invisible_top";

/// Identifier for a node in the tree (generational).
///
/// A handle stays valid for one repository snapshot. After a rebuild, or after
/// the node is removed, the handle is stale and every lookup through it
/// returns `None`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Global switch selecting the parent-resolution rules.
///
/// Changing the mode never changes which nodes exist, only how they are parented.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Entities are bucketed under one group node per category.
    #[default]
    Flat,
    /// Entities hang off the coordinate spaces they live in.
    Hierarchical,
}

impl Mode {
    /// Persisted name of the mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Hierarchical => "spaces",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a persisted mode name is not understood.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown tree mode `{0}`")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "flat" => Ok(Self::Flat),
            "spaces" | "hierarchical" => Ok(Self::Hierarchical),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Category buckets used as parents in [`Mode::Flat`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Parent of every tool.
    Tool,
    /// Parent of every data item.
    Data,
    /// Parent of every coordinate space.
    Space,
    /// Parent of every view group (unused as a parent, view groups sit under the top).
    View,
}

impl GroupKind {
    /// All groups in insertion order.
    pub const ALL: [Self; 4] = [Self::Tool, Self::Data, Self::Space, Self::View];

    /// Short name used by [`Repository::node_for_group`](crate::Repository::node_for_group).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Data => "data",
            Self::Space => "space",
            Self::View => "view",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Tool => "Tools",
            Self::Data => "Data",
            Self::Space => "Spaces",
            Self::View => "Views",
        }
    }
}

/// Rendering facet represented by a show-as node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShowFacet {
    /// Volume rendering in 3D views.
    Volume3D,
    /// Slices in 2D views.
    Slice2D,
    /// Slices in 3D views.
    Slice3D,
}

impl ShowFacet {
    /// All facets in insertion order.
    pub const ALL: [Self; 3] = [Self::Volume3D, Self::Slice2D, Self::Slice3D];

    /// Suffix appended to the data item uid.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Volume3D => "volume",
            Self::Slice2D => "slice2D",
            Self::Slice3D => "slice3D",
        }
    }

    /// The view-group facet flag toggled by this node.
    pub const fn flag(self) -> ViewFacets {
        match self {
            Self::Volume3D => ViewFacets::VOLUME_3D,
            Self::Slice2D => ViewFacets::SLICE_2D,
            Self::Slice3D => ViewFacets::SLICE_3D,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Volume3D => "Volume 3D",
            Self::Slice2D => "Slice 2D",
            Self::Slice3D => "Slice 3D",
        }
    }
}

/// What a node stands for. Parent and visibility rules dispatch on this.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The invisible root.
    Top,
    /// A category bucket.
    Group(GroupKind),
    /// A data item.
    Data {
        /// Uid of the data item.
        uid: String,
    },
    /// One rendering facet of a data item.
    ShowAs {
        /// Uid of the data item.
        data: String,
        /// The facet.
        facet: ShowFacet,
    },
    /// A coordinate space.
    Space(CoordinateSystem),
    /// A tracking tool.
    Tool {
        /// Uid of the tool.
        uid: String,
    },
    /// A view group.
    ViewGroup {
        /// Index of the group.
        index: usize,
    },
}

impl NodeKind {
    /// Node uid derived from the kind.
    pub fn uid(&self) -> String {
        match self {
            Self::Top => TOP_NODE_UID.to_string(),
            Self::Group(group) => format!("group_{}", group.name()),
            Self::Data { uid } | Self::Tool { uid } => uid.clone(),
            Self::ShowAs { data, facet } => format!("{data}_{}", facet.suffix()),
            Self::Space(space) => space.uid().to_string(),
            Self::ViewGroup { index } => format!("viewgroup_{index}"),
        }
    }

    /// Node type used by the visibility filter.
    pub const fn node_type(&self) -> &'static str {
        match self {
            Self::Top => node_type::TOP,
            Self::Group(_) => node_type::GROUP,
            Self::Data { .. } | Self::ShowAs { .. } => node_type::DATA,
            Self::Space(_) => node_type::SPACE,
            Self::Tool { .. } => node_type::TOOL,
            Self::ViewGroup { .. } => node_type::VIEW,
        }
    }

    /// Display name for kinds whose name does not come from the domain.
    pub(crate) fn fallback_name(&self) -> String {
        match self {
            Self::Top => "top".to_string(),
            Self::Group(group) => group.label().to_string(),
            Self::ShowAs { facet, .. } => facet.label().to_string(),
            Self::Space(CoordinateSystem::Reference) => "Reference".to_string(),
            Self::Space(CoordinateSystem::PatientReference) => "Patient Reference".to_string(),
            Self::Space(space) => space.to_string(),
            Self::ViewGroup { index } => format!("View {}", index + 1),
            Self::Data { uid } | Self::Tool { uid } => uid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names() {
        assert_eq!("flat".parse::<Mode>(), Ok(Mode::Flat));
        assert_eq!(" spaces ".parse::<Mode>(), Ok(Mode::Hierarchical));
        assert_eq!("hierarchical".parse::<Mode>(), Ok(Mode::Hierarchical));
        assert!("tree".parse::<Mode>().is_err());
        assert_eq!(Mode::Hierarchical.as_str(), "spaces");
    }

    #[test]
    fn show_as_uids() {
        let uids: alloc::vec::Vec<String> = ShowFacet::ALL
            .iter()
            .map(|&facet| {
                NodeKind::ShowAs {
                    data: "D1".to_string(),
                    facet,
                }
                .uid()
            })
            .collect();
        assert_eq!(uids, ["D1_volume", "D1_slice2D", "D1_slice3D"]);
    }

    #[test]
    fn show_as_nodes_filter_as_data() {
        let kind = NodeKind::ShowAs {
            data: "D1".to_string(),
            facet: ShowFacet::Slice3D,
        };
        assert_eq!(kind.node_type(), node_type::DATA);
        assert!(!node_type::is_recognized(NodeKind::Top.node_type()));
    }
}
