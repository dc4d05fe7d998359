//! Keyed fragment registries.
//!
//! Each registry maps a key to a rendered fragment and iterates in first
//! insertion order. Re-inserting a key replaces the fragment where it stands.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::position::Position;

/// Insertion-ordered, keyed registry of HTML (or code) fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: IndexMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the previous fragment for `key`.
    pub fn insert(&mut self, key: impl Into<String>, fragment: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), fragment.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    /// All fragments joined by `separator`, in order.
    pub fn join(&self, separator: &str) -> String {
        self.values().collect::<Vec<_>>().join(separator)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// One [`Registry`] per [`Position`].
#[derive(Debug, Clone, Default)]
pub struct PositionedRegistry {
    slots: BTreeMap<Position, Registry>,
}

impl PositionedRegistry {
    pub fn insert(
        &mut self,
        position: Position,
        key: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Option<String> {
        self.slots.entry(position).or_default().insert(key, fragment)
    }

    pub fn get(&self, position: Position) -> Option<&Registry> {
        self.slots.get(&position).filter(|r| !r.is_empty())
    }

    /// Total number of fragments across all positions.
    pub fn len(&self) -> usize {
        self.slots.values().map(Registry::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
