// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A read-only view of the current domain.

use alloc::string::String;
use alloc::vec::Vec;

use crate::types::{DataItem, Tool, ToolKind, ViewGroup};

/// Everything the tree needs to know about the domain at one point in time.
///
/// Mutation goes through a [`DomainService`](crate::DomainService) so that each
/// change is paired with the [`DomainEvent`](crate::DomainEvent) announcing it.
#[derive(Clone, Debug, Default)]
pub struct DomainState {
    pub(crate) data: Vec<DataItem>,
    pub(crate) tools: Vec<Tool>,
    pub(crate) view_groups: Vec<ViewGroup>,
    pub(crate) reference_tool: Option<String>,
    pub(crate) active_data: Option<String>,
    pub(crate) active_tool: Option<String>,
    pub(crate) active_view_group: Option<usize>,
}

impl DomainState {
    /// All data items, in insertion order.
    pub fn data_items(&self) -> &[DataItem] {
        &self.data
    }

    /// Look up a data item.
    pub fn data(&self, uid: &str) -> Option<&DataItem> {
        self.data.iter().find(|d| d.uid == uid)
    }

    /// All tools, in insertion order.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Look up a tool.
    pub fn tool(&self, uid: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.uid == uid)
    }

    /// The reference tool other tools are tracked against.
    ///
    /// An explicitly configured tool wins when it still exists; otherwise the
    /// first tool flagged [`ToolKind::REFERENCE`] is used.
    pub fn reference_tool(&self) -> Option<&Tool> {
        self.reference_tool
            .as_deref()
            .and_then(|uid| self.tool(uid))
            .or_else(|| self.tools.iter().find(|t| t.has_kind(ToolKind::REFERENCE)))
    }

    /// All view groups, ordered by index.
    pub fn view_groups(&self) -> &[ViewGroup] {
        &self.view_groups
    }

    /// Look up a view group by index.
    pub fn view_group(&self, index: usize) -> Option<&ViewGroup> {
        self.view_groups.iter().find(|g| g.index == index)
    }

    /// Uid of the active data item.
    pub fn active_data(&self) -> Option<&str> {
        self.active_data.as_deref()
    }

    /// Uid of the active tool.
    pub fn active_tool(&self) -> Option<&str> {
        self.active_tool.as_deref()
    }

    /// Index of the active view group. Falls back to the first group.
    pub fn active_view_group(&self) -> Option<usize> {
        self.active_view_group
            .filter(|&index| self.view_group(index).is_some())
            .or_else(|| self.view_groups.first().map(|g| g.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn reference_tool_falls_back_to_flag() {
        let mut state = DomainState {
            tools: vec![
                Tool::new("t1", "Pointer", ToolKind::POINTER),
                Tool::new("ref", "Reference", ToolKind::REFERENCE),
            ],
            ..DomainState::default()
        };
        assert_eq!(state.reference_tool().map(|t| t.uid.as_str()), Some("ref"));

        state.reference_tool = Some("t1".to_string());
        assert_eq!(state.reference_tool().map(|t| t.uid.as_str()), Some("t1"));

        // A configured uid that no longer exists is ignored.
        state.reference_tool = Some("gone".to_string());
        assert_eq!(state.reference_tool().map(|t| t.uid.as_str()), Some("ref"));
    }

    #[test]
    fn active_view_group_defaults_to_first() {
        let mut state = DomainState {
            view_groups: vec![ViewGroup::new(0), ViewGroup::new(1)],
            ..DomainState::default()
        };
        assert_eq!(state.active_view_group(), Some(0));
        state.active_view_group = Some(1);
        assert_eq!(state.active_view_group(), Some(1));
        state.active_view_group = Some(7);
        assert_eq!(state.active_view_group(), Some(0));
    }
}
