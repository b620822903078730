// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presentation hooks.

use arbor_domain::DomainService;

use crate::node::NodeRef;

/// Produces display attributes for nodes.
///
/// The tree defines no presentation logic of its own. A UI adapter implements
/// this trait with whatever icon, color, font and panel types its toolkit uses,
/// and calls [`NodeRef::icon`] and friends while drawing. Implementations can
/// consult [`NodeRef::data_item`], [`NodeRef::tool`], [`NodeRef::is_active`] and
/// [`NodeRef::is_shown`] to decide.
pub trait Presenter<D: DomainService> {
    /// Icon handle.
    type Icon;
    /// Color value.
    type Color;
    /// Font description.
    type Font;
    /// Properties panel widget.
    type Panel;

    /// Icon for `node`.
    fn icon(&self, node: &NodeRef<'_, D>) -> Self::Icon;

    /// Color for `node`.
    fn color(&self, node: &NodeRef<'_, D>) -> Self::Color;

    /// Font for `node`.
    fn font(&self, node: &NodeRef<'_, D>) -> Self::Font;

    /// Properties panel for `node`, or `None` if it has nothing to edit.
    fn properties_panel(&self, node: &NodeRef<'_, D>) -> Option<Self::Panel>;
}
