// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Domain: the entities an Arbor tree is built from.
//!
//! The tree repository in `arbor_tree` never owns domain data. It reads a
//! [`DomainState`] through a [`DomainService`], and learns about changes
//! from the [`DomainEvent`]s the service queues.
//!
//! - [`DataItem`]: a clinical data item, expressed in a parent space.
//! - [`Tool`]: a tracking tool with [`ToolKind`] flags.
//! - [`CoordinateSystem`]: the reference, patient reference and data-local spaces.
//! - [`ViewGroup`]: a rendering group with per-item [`ViewFacets`].
//! - [`InMemoryDomain`]: a [`DomainService`] that keeps everything in memory.
//!
//! ```rust
//! use arbor_domain::{DataItem, DomainEvent, DomainService, InMemoryDomain};
//!
//! let mut domain = InMemoryDomain::new();
//! domain.insert_data(DataItem::new("ct", "CT"));
//! domain.set_active_data(Some("ct"));
//!
//! assert_eq!(domain.state().active_data(), Some("ct"));
//! assert_eq!(domain.drain_events().len(), 2);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod service;
mod state;
mod types;

pub use service::{DomainEvent, DomainService, InMemoryDomain};
pub use state::DomainState;
pub use types::{
    CoordinateSystem, DataItem, PATIENT_REFERENCE_SPACE_UID, REFERENCE_SPACE_UID, Rgba, Tool,
    ToolKind, ViewFacets, ViewGroup,
};
