// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree configuration and its persistence.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::types::{Mode, node_type};

/// Scope used when no other is given.
pub const DEFAULT_SCOPE: &str = "tree";

const MODE_KEY: &str = "mode";
const VISIBLE_TYPES_KEY: &str = "visible_node_types";

/// Configuration that parameterizes every node's parent and visibility rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeOptions {
    /// Parent-resolution mode.
    pub mode: Mode,
    /// Node types eligible for display. See [`TreeOptions::is_type_visible`].
    pub visible_types: HashSet<String>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            visible_types: node_type::RECOGNIZED
                .iter()
                .map(|ty| ty.to_string())
                .collect(),
        }
    }
}

impl TreeOptions {
    /// Default options: flat mode, every recognized type visible.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the visible types.
    pub fn with_visible_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Whether nodes of type `ty` pass the type filter.
    ///
    /// Types listed in `visible_types` pass. Recognized types that are not listed
    /// fail. Types this filter does not know about always pass.
    pub fn is_type_visible(&self, ty: &str) -> bool {
        self.visible_types.contains(ty) || !node_type::is_recognized(ty)
    }

    /// Read options from `store` under `scope`.
    ///
    /// Missing keys keep their defaults. A mode that fails to parse is logged and
    /// ignored.
    pub fn load(store: &dyn SettingsStore, scope: &str) -> Self {
        let mut options = Self::default();
        if let Some(mode) = store.value(&scoped(scope, MODE_KEY)) {
            match mode.parse::<Mode>() {
                Ok(mode) => options.mode = mode,
                Err(err) => log::warn!("ignoring persisted tree mode: {err}"),
            }
        }
        if let Some(types) = store.value(&scoped(scope, VISIBLE_TYPES_KEY)) {
            options.visible_types = types
                .split(',')
                .map(str::trim)
                .filter(|ty| !ty.is_empty())
                .map(String::from)
                .collect();
        }
        options
    }

    /// Write options to `store` under `scope`.
    pub fn save(&self, store: &mut dyn SettingsStore, scope: &str) {
        store.set_value(&scoped(scope, MODE_KEY), self.mode.as_str().to_string());
        let mut types: Vec<&str> = self.visible_types.iter().map(String::as_str).collect();
        types.sort_unstable();
        store.set_value(&scoped(scope, VISIBLE_TYPES_KEY), types.join(","));
    }
}

fn scoped(scope: &str, key: &str) -> String {
    format!("{scope}/{key}")
}

/// Key/value settings backend.
pub trait SettingsStore {
    /// Read a value.
    fn value(&self, key: &str) -> Option<String>;
    /// Write a value.
    fn set_value(&mut self, key: &str, value: String);
}

/// In-memory [`SettingsStore`].
#[derive(Clone, Debug, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl MemorySettings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_types_default_to_visible() {
        let options = TreeOptions::new().with_visible_types(["data"]);
        assert!(options.is_type_visible("data"));
        assert!(!options.is_type_visible("tool"), "recognized but unlisted");
        assert!(options.is_type_visible("annotation"), "unrecognized");
        assert!(options.is_type_visible(node_type::TOP));
    }

    #[test]
    fn persisted_options_survive_reload() {
        let mut store = MemorySettings::new();
        let options = TreeOptions::new()
            .with_mode(Mode::Hierarchical)
            .with_visible_types(["tool", "data"]);
        options.save(&mut store, "patient_tree");

        assert_eq!(store.value("patient_tree/mode").as_deref(), Some("spaces"));
        assert_eq!(
            store.value("patient_tree/visible_node_types").as_deref(),
            Some("data,tool")
        );
        assert_eq!(TreeOptions::load(&store, "patient_tree"), options);
        assert_eq!(TreeOptions::load(&store, "other"), TreeOptions::default());
    }

    #[test]
    fn bad_mode_keeps_default() {
        let mut store = MemorySettings::new();
        store.set_value("tree/mode", "sideways".to_string());
        store.set_value("tree/visible_node_types", String::new());
        let options = TreeOptions::load(&store, DEFAULT_SCOPE);
        assert_eq!(options.mode, Mode::Flat);
        assert!(options.visible_types.is_empty());
    }
}
