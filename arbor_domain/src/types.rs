// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plain domain entities: data items, tools, coordinate systems and view groups.

use alloc::string::String;
use core::fmt;

use hashbrown::HashMap;

/// Uid of the world reference space node.
pub const REFERENCE_SPACE_UID: &str = "reference";

/// Uid of the patient reference space node.
pub const PATIENT_REFERENCE_SPACE_UID: &str = "patient reference";

/// An 8-bit RGBA color attached to a data item.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba {
    /// Create an opaque color.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// One clinical data item (image, mesh, point set, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct DataItem {
    /// Unique id of the item within the patient session.
    pub uid: String,
    /// Display name.
    pub name: String,
    /// Free-form kind, for example `"image"` or `"mesh"`.
    pub kind: String,
    /// Optional icon resource name.
    pub icon: Option<String>,
    /// Optional display color.
    pub color: Option<Rgba>,
    /// Uid of the space this item is expressed in. Empty means the reference space.
    pub parent_space: String,
}

impl DataItem {
    /// Create a data item expressed in the reference space.
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            kind: String::new(),
            icon: None,
            color: None,
            parent_space: String::new(),
        }
    }

    /// Set the kind.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the declared parent space.
    pub fn with_parent_space(mut self, space: impl Into<String>) -> Self {
        self.parent_space = space.into();
        self
    }

    /// Set the display color.
    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the icon resource.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

bitflags::bitflags! {
    /// Kind flags of a tracking tool. A tool may carry several.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ToolKind: u8 {
        /// The tool is a patient reference frame.
        const REFERENCE = 0b0000_0001;
        /// The tool is the manual (mouse driven) tool.
        const MANUAL    = 0b0000_0010;
        /// The tool is an ultrasound probe.
        const PROBE     = 0b0000_0100;
        /// The tool is a pointer.
        const POINTER   = 0b0000_1000;
    }
}

/// One tracking tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tool {
    /// Unique id of the tool.
    pub uid: String,
    /// Display name.
    pub name: String,
    /// Kind flags.
    pub kind: ToolKind,
    /// Whether the tracking system has initialized the tool.
    pub initialized: bool,
    /// Whether the tracking system currently sees the tool.
    pub visible: bool,
}

impl Tool {
    /// Create an uninitialized, unseen tool.
    pub fn new(uid: impl Into<String>, name: impl Into<String>, kind: ToolKind) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            kind,
            initialized: false,
            visible: false,
        }
    }

    /// Returns true if the tool carries every flag in `kind`.
    pub fn has_kind(&self, kind: ToolKind) -> bool {
        self.kind.contains(kind)
    }
}

/// A coordinate space referenced by the tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CoordinateSystem {
    /// The world reference space. Anchor of every other space.
    Reference,
    /// The space of the patient reference tool.
    PatientReference,
    /// A space local to one data item, named by its uid.
    Data(String),
}

impl CoordinateSystem {
    /// Uid of the node representing this space.
    ///
    /// Data-local spaces share the uid of the data item they are named after, so
    /// a data item and the space it implies never both appear in one tree.
    pub fn uid(&self) -> &str {
        match self {
            Self::Reference => REFERENCE_SPACE_UID,
            Self::PatientReference => PATIENT_REFERENCE_SPACE_UID,
            Self::Data(object) => object,
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => f.write_str(REFERENCE_SPACE_UID),
            Self::PatientReference => f.write_str(PATIENT_REFERENCE_SPACE_UID),
            Self::Data(object) => write!(f, "data/{object}"),
        }
    }
}

bitflags::bitflags! {
    /// Independent rendering facets of one data item inside a view group.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ViewFacets: u8 {
        /// Rendered as a volume in 3D views.
        const VOLUME_3D = 0b0000_0001;
        /// Rendered as slices in 3D views.
        const SLICE_3D  = 0b0000_0010;
        /// Rendered in 2D slice views.
        const SLICE_2D  = 0b0000_0100;
    }
}

/// One rendering group and the facets it shows per data item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewGroup {
    /// Position of the group in the layout.
    pub index: usize,
    facets: HashMap<String, ViewFacets>,
}

impl ViewGroup {
    /// Create an empty view group.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            facets: HashMap::new(),
        }
    }

    /// Facets shown for `data`. Empty if the item is not in the group.
    pub fn facets_of(&self, data: &str) -> ViewFacets {
        self.facets.get(data).copied().unwrap_or_default()
    }

    /// Replace the facets of `data`. Empty facets drop the entry.
    pub fn set_facets(&mut self, data: &str, facets: ViewFacets) {
        if facets.is_empty() {
            self.facets.remove(data);
        } else {
            self.facets.insert(String::from(data), facets);
        }
    }

    pub(crate) fn forget(&mut self, data: &str) {
        self.facets.remove(data);
    }

    pub(crate) fn clear(&mut self) {
        self.facets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn data_space_shares_item_uid() {
        let space = CoordinateSystem::Data("us_0".to_string());
        assert_eq!(space.uid(), "us_0");
        assert_eq!(space.to_string(), "data/us_0");
        assert_eq!(CoordinateSystem::Reference.uid(), REFERENCE_SPACE_UID);
    }

    #[test]
    fn empty_facets_remove_entry() {
        let mut group = ViewGroup::new(0);
        group.set_facets("ct", ViewFacets::SLICE_2D | ViewFacets::VOLUME_3D);
        assert!(group.facets_of("ct").contains(ViewFacets::SLICE_2D));
        group.set_facets("ct", ViewFacets::empty());
        assert!(group.facets_of("ct").is_empty());
        assert!(group.facets.is_empty(), "empty facets should not be stored");
    }

    #[test]
    fn tool_kind_flags() {
        let tool = Tool::new("t", "Pointer", ToolKind::POINTER | ToolKind::MANUAL);
        assert!(tool.has_kind(ToolKind::MANUAL));
        assert!(!tool.has_kind(ToolKind::REFERENCE));
    }
}
