// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Domain services: the mutation capability and the events it announces.

use alloc::string::String;
use alloc::vec::Vec;
use core::mem;

use crate::state::DomainState;
use crate::types::{DataItem, Tool, ViewFacets, ViewGroup};

/// A change in the domain, delivered to the tree repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    /// A data item was added.
    DataAdded(String),
    /// A data item was removed.
    DataRemoved(String),
    /// A data item's attributes or declared parent space changed.
    DataChanged(String),
    /// The active data item changed.
    ActiveDataChanged {
        /// Previously active item.
        previous: Option<String>,
        /// Newly active item.
        current: Option<String>,
    },
    /// The active tool changed.
    ActiveToolChanged {
        /// Previously active tool.
        previous: Option<String>,
        /// Newly active tool.
        current: Option<String>,
    },
    /// The configured reference tool changed.
    ReferenceToolChanged,
    /// The tool configuration changed (tools added or removed).
    ToolsChanged,
    /// The tracking state of one tool changed.
    ToolStateChanged(String),
    /// View groups were added or removed.
    ViewGroupsChanged,
    /// The active view group changed.
    ActiveViewGroupChanged {
        /// Previously active group.
        previous: Option<usize>,
        /// Newly active group.
        current: Option<usize>,
    },
    /// The facets shown for one data item in one view group changed.
    ViewFacetsChanged {
        /// Index of the view group.
        group: usize,
        /// Uid of the data item.
        data: String,
    },
    /// The patient session was switched; all data is new.
    PatientChanged,
}

/// Read access and the mutations tree nodes may trigger.
///
/// Implementations queue one [`DomainEvent`] per effective change; the tree
/// repository collects them through [`DomainService::drain_events`].
pub trait DomainService {
    /// Current domain state.
    fn state(&self) -> &DomainState;

    /// Make `uid` the active data item, or clear the selection.
    ///
    /// Unknown uids are ignored.
    fn set_active_data(&mut self, uid: Option<&str>);

    /// Make `uid` the active tool, or clear the selection.
    ///
    /// Unknown uids are ignored.
    fn set_active_tool(&mut self, uid: Option<&str>);

    /// Make `index` the active view group. Unknown indices are ignored.
    fn set_active_view_group(&mut self, index: usize);

    /// Remove a data item. Returns false if it did not exist.
    fn remove_data(&mut self, uid: &str) -> bool;

    /// Replace the facets of `data` in view group `group`.
    ///
    /// Returns false if either the group or the data item does not exist.
    fn set_view_facets(&mut self, group: usize, data: &str, facets: ViewFacets) -> bool;

    /// Take every event queued since the last call.
    fn drain_events(&mut self) -> Vec<DomainEvent>;
}

/// A [`DomainService`] holding its state in memory.
///
/// Hosts feed it from their own services; tests drive it directly.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDomain {
    state: DomainState,
    pending: Vec<DomainEvent>,
}

impl InMemoryDomain {
    /// Create an empty domain: no data, no tools, no view groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a data item, replacing one with the same uid.
    pub fn insert_data(&mut self, item: DataItem) {
        if let Some(existing) = self.state.data.iter_mut().find(|d| d.uid == item.uid) {
            let uid = item.uid.clone();
            *existing = item;
            self.pending.push(DomainEvent::DataChanged(uid));
        } else {
            self.pending.push(DomainEvent::DataAdded(item.uid.clone()));
            self.state.data.push(item);
        }
    }

    /// Change the declared parent space of a data item.
    pub fn set_data_parent_space(&mut self, uid: &str, space: impl Into<String>) -> bool {
        let Some(item) = self.state.data.iter_mut().find(|d| d.uid == uid) else {
            return false;
        };
        item.parent_space = space.into();
        self.pending.push(DomainEvent::DataChanged(String::from(uid)));
        true
    }

    /// Add a tool, replacing one with the same uid.
    pub fn add_tool(&mut self, tool: Tool) {
        if let Some(existing) = self.state.tools.iter_mut().find(|t| t.uid == tool.uid) {
            *existing = tool;
        } else {
            self.state.tools.push(tool);
        }
        self.pending.push(DomainEvent::ToolsChanged);
    }

    /// Remove a tool. Returns false if it did not exist.
    pub fn remove_tool(&mut self, uid: &str) -> bool {
        let before = self.state.tools.len();
        self.state.tools.retain(|t| t.uid != uid);
        if self.state.tools.len() == before {
            return false;
        }
        if self.state.reference_tool.as_deref() == Some(uid) {
            self.state.reference_tool = None;
        }
        if self.state.active_tool.as_deref() == Some(uid) {
            self.set_active_tool(None);
        }
        self.pending.push(DomainEvent::ToolsChanged);
        true
    }

    /// Configure the reference tool explicitly.
    pub fn set_reference_tool(&mut self, uid: Option<&str>) {
        let uid = uid.map(String::from);
        if self.state.reference_tool != uid {
            self.state.reference_tool = uid;
            self.pending.push(DomainEvent::ReferenceToolChanged);
        }
    }

    /// Update the tracking state of a tool.
    pub fn set_tool_state(&mut self, uid: &str, initialized: bool, visible: bool) -> bool {
        let Some(tool) = self.state.tools.iter_mut().find(|t| t.uid == uid) else {
            return false;
        };
        if tool.initialized == initialized && tool.visible == visible {
            return true;
        }
        tool.initialized = initialized;
        tool.visible = visible;
        self.pending.push(DomainEvent::ToolStateChanged(String::from(uid)));
        true
    }

    /// Append a view group and return its index.
    pub fn add_view_group(&mut self) -> usize {
        let index = self
            .state
            .view_groups
            .iter()
            .map(|g| g.index + 1)
            .max()
            .unwrap_or(0);
        self.state.view_groups.push(ViewGroup::new(index));
        self.pending.push(DomainEvent::ViewGroupsChanged);
        index
    }

    /// Switch to a new patient: all data and its view state is dropped.
    ///
    /// Tools belong to the tracking configuration and survive the switch.
    pub fn switch_patient(&mut self) {
        self.state.data.clear();
        self.state.active_data = None;
        for group in &mut self.state.view_groups {
            group.clear();
        }
        self.pending.push(DomainEvent::PatientChanged);
    }
}

impl DomainService for InMemoryDomain {
    fn state(&self) -> &DomainState {
        &self.state
    }

    fn set_active_data(&mut self, uid: Option<&str>) {
        if let Some(uid) = uid
            && self.state.data(uid).is_none()
        {
            return;
        }
        let current = uid.map(String::from);
        if self.state.active_data == current {
            return;
        }
        let previous = mem::replace(&mut self.state.active_data, current.clone());
        self.pending
            .push(DomainEvent::ActiveDataChanged { previous, current });
    }

    fn set_active_tool(&mut self, uid: Option<&str>) {
        if let Some(uid) = uid
            && self.state.tool(uid).is_none()
        {
            return;
        }
        let current = uid.map(String::from);
        if self.state.active_tool == current {
            return;
        }
        let previous = mem::replace(&mut self.state.active_tool, current.clone());
        self.pending
            .push(DomainEvent::ActiveToolChanged { previous, current });
    }

    fn set_active_view_group(&mut self, index: usize) {
        if self.state.view_group(index).is_none() {
            return;
        }
        let previous = self.state.active_view_group();
        if previous == Some(index) {
            self.state.active_view_group = Some(index);
            return;
        }
        self.state.active_view_group = Some(index);
        self.pending.push(DomainEvent::ActiveViewGroupChanged {
            previous,
            current: Some(index),
        });
    }

    fn remove_data(&mut self, uid: &str) -> bool {
        let before = self.state.data.len();
        self.state.data.retain(|d| d.uid != uid);
        if self.state.data.len() == before {
            return false;
        }
        for group in &mut self.state.view_groups {
            group.forget(uid);
        }
        if self.state.active_data.as_deref() == Some(uid) {
            self.set_active_data(None);
        }
        self.pending.push(DomainEvent::DataRemoved(String::from(uid)));
        true
    }

    fn set_view_facets(&mut self, group: usize, data: &str, facets: ViewFacets) -> bool {
        if self.state.data(data).is_none() {
            return false;
        }
        let Some(view_group) = self.state.view_groups.iter_mut().find(|g| g.index == group)
        else {
            return false;
        };
        if view_group.facets_of(data) == facets {
            return true;
        }
        view_group.set_facets(data, facets);
        self.pending.push(DomainEvent::ViewFacetsChanged {
            group,
            data: String::from(data),
        });
        true
    }

    fn drain_events(&mut self) -> Vec<DomainEvent> {
        mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolKind;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn insert_then_replace_data() {
        let mut domain = InMemoryDomain::new();
        domain.insert_data(DataItem::new("ct", "CT"));
        domain.insert_data(DataItem::new("ct", "CT (resampled)"));
        assert_eq!(domain.state().data_items().len(), 1);
        assert_eq!(domain.state().data("ct").map(|d| d.name.as_str()), Some("CT (resampled)"));
        assert_eq!(
            domain.drain_events(),
            vec![
                DomainEvent::DataAdded("ct".to_string()),
                DomainEvent::DataChanged("ct".to_string()),
            ]
        );
        assert!(domain.drain_events().is_empty(), "events are drained once");
    }

    #[test]
    fn removing_active_data_clears_selection() {
        let mut domain = InMemoryDomain::new();
        domain.insert_data(DataItem::new("ct", "CT"));
        let group = domain.add_view_group();
        domain.set_active_data(Some("ct"));
        assert!(domain.set_view_facets(group, "ct", ViewFacets::SLICE_2D));
        let _ = domain.drain_events();

        assert!(domain.remove_data("ct"));
        assert!(!domain.remove_data("ct"));
        assert_eq!(domain.state().active_data(), None);
        assert!(domain.state().view_groups()[0].facets_of("ct").is_empty());
        assert_eq!(
            domain.drain_events(),
            vec![
                DomainEvent::ActiveDataChanged {
                    previous: Some("ct".to_string()),
                    current: None,
                },
                DomainEvent::DataRemoved("ct".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_selection_is_ignored() {
        let mut domain = InMemoryDomain::new();
        domain.set_active_data(Some("nope"));
        domain.set_active_tool(Some("nope"));
        domain.set_active_view_group(3);
        assert!(domain.drain_events().is_empty());
    }

    #[test]
    fn tool_state_change_is_reported_once() {
        let mut domain = InMemoryDomain::new();
        domain.add_tool(Tool::new("t1", "Pointer", ToolKind::POINTER));
        let _ = domain.drain_events();
        assert!(domain.set_tool_state("t1", true, true));
        assert!(domain.set_tool_state("t1", true, true));
        assert!(!domain.set_tool_state("t2", true, true));
        assert_eq!(
            domain.drain_events(),
            vec![DomainEvent::ToolStateChanged("t1".to_string())]
        );
    }

    #[test]
    fn removing_reference_tool_clears_configuration() {
        let mut domain = InMemoryDomain::new();
        domain.add_tool(Tool::new("ref", "Reference", ToolKind::empty()));
        domain.set_reference_tool(Some("ref"));
        assert!(domain.remove_tool("ref"));
        assert!(domain.state().reference_tool().is_none());
    }

    #[test]
    fn switch_patient_keeps_tools() {
        let mut domain = InMemoryDomain::new();
        domain.insert_data(DataItem::new("ct", "CT"));
        domain.add_tool(Tool::new("t1", "Pointer", ToolKind::POINTER));
        domain.switch_patient();
        assert!(domain.state().data_items().is_empty());
        assert_eq!(domain.state().tools().len(), 1);
        assert_eq!(domain.drain_events().last(), Some(&DomainEvent::PatientChanged));
    }
}
