//! In-memory named collections of heterogeneous sub-regions.
//!
//! This module holds the data half of the Custom Registry: creating and
//! mutating [`CustomDefinition`]s. The behavioral half — snapshotting a
//! custom definition as one slot, and partially restoring from one — drives
//! the Backup Engine and lives in `chunkvault-engine`.

use std::collections::BTreeMap;

use crate::selector::Selector;

#[derive(thiserror::Error, Debug)]
pub enum CustomError {
    #[error("a custom backup named {0:?} already exists")]
    AlreadyExists(String),
    #[error("no custom backup named {0:?}")]
    NotFound(String),
    #[error("custom backup {custom:?} has no sub-slot {sub}")]
    UnidentifiedSubSlot { custom: String, sub: u32 },
}

/// One sub-region within a custom definition: a selector plus the metadata
/// recorded about it at creation time.
#[derive(Debug, Clone)]
pub struct SubSlot {
    pub selector: Selector,
    pub dimension: String,
    pub comment: String,
    pub origin_command: String,
    pub created_time: String,
    pub created_by: String,
}

/// A named, in-memory collection of sub-slots, possibly spanning several
/// dimensions. Lives only in process memory and does not persist across
/// restarts; a caller that wants durability is responsible for its own
/// save/load of the registry's contents.
#[derive(Debug, Clone)]
pub struct CustomDefinition {
    pub name: String,
    pub time_created: String,
    pub user_created: String,
    sub_slots: BTreeMap<u32, SubSlot>,
    next_key: u32,
}

impl CustomDefinition {
    pub fn new(name: impl Into<String>, time_created: impl Into<String>, user_created: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_created: time_created.into(),
            user_created: user_created.into(),
            sub_slots: BTreeMap::new(),
            next_key: 1,
        }
    }

    /// Append a sub-slot, then reindex the ordered map to `1..K` so
    /// invariant I1 holds for sub-slots too (not just numbered backup
    /// slots). Returns the new sub-slot's key.
    pub fn add_sub(&mut self, sub: SubSlot) -> u32 {
        let key = self.next_key;
        self.sub_slots.insert(key, sub);
        self.next_key += 1;
        self.reindex();
        key
    }

    /// Remove one sub-slot by key, reindexing the remaining ones.
    pub fn remove_sub(&mut self, key: u32) -> Result<(), CustomError> {
        self.sub_slots
            .remove(&key)
            .ok_or_else(|| CustomError::UnidentifiedSubSlot { custom: self.name.clone(), sub: key })?;
        self.reindex();
        Ok(())
    }

    fn reindex(&mut self) {
        let reordered: Vec<SubSlot> = std::mem::take(&mut self.sub_slots).into_values().collect();
        self.sub_slots = reordered.into_iter().enumerate().map(|(i, s)| (i as u32 + 1, s)).collect();
        self.next_key = self.sub_slots.len() as u32 + 1;
    }

    /// Sub-slots in insertion (key) order.
    pub fn sub_slots(&self) -> impl Iterator<Item = (u32, &SubSlot)> {
        self.sub_slots.iter().map(|(&k, v)| (k, v))
    }

    pub fn sub_slot(&self, key: u32) -> Option<&SubSlot> {
        self.sub_slots.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.sub_slots.is_empty()
    }

    /// Selectors belonging to one dimension, in sub-slot order — the input
    /// to [`crate::selector::combine_and_group`] when saving.
    pub fn selectors_for_dimension<'a>(&'a self, dimension: &'a str) -> impl Iterator<Item = &'a Selector> {
        self.sub_slots
            .values()
            .filter(move |sub| sub.dimension == dimension)
            .map(|sub| &sub.selector)
    }

    /// The distinct dimensions spanned by this custom's sub-slots, in
    /// first-seen order.
    pub fn dimensions(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for sub in self.sub_slots.values() {
            if !seen.contains(&sub.dimension) {
                seen.push(sub.dimension.clone());
            }
        }
        seen
    }
}

/// Process-local registry of named [`CustomDefinition`]s, ordered by
/// creation (insertion order of a `BTreeMap` over an incrementing id would
/// lose name lookup; a plain map keyed by name is used instead, with
/// creation order preserved implicitly since names are not reused after
/// removal within a process run).
#[derive(Debug, Default)]
pub struct CustomRegistry {
    definitions: BTreeMap<String, CustomDefinition>,
}

impl CustomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, name: impl Into<String>, time_created: impl Into<String>, user_created: impl Into<String>) -> Result<(), CustomError> {
        let name = name.into();
        if self.definitions.contains_key(&name) {
            return Err(CustomError::AlreadyExists(name));
        }
        self.definitions.insert(name.clone(), CustomDefinition::new(name, time_created, user_created));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&CustomDefinition, CustomError> {
        self.definitions.get(name).ok_or_else(|| CustomError::NotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut CustomDefinition, CustomError> {
        self.definitions.get_mut(name).ok_or_else(|| CustomError::NotFound(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<CustomDefinition, CustomError> {
        self.definitions.remove(name).ok_or_else(|| CustomError::NotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;

    fn dummy_sub(dimension: &str) -> SubSlot {
        SubSlot {
            selector: Selector::rectangle((0.0, 0.0), (15.0, 15.0), 320, false).unwrap(),
            dimension: dimension.to_string(),
            comment: String::new(),
            origin_command: "custom add farm".to_string(),
            created_time: "2026-01-01 00:00:00".to_string(),
            created_by: "Steve".to_string(),
        }
    }

    #[test]
    fn create_rejects_duplicate_name() {
        let mut registry = CustomRegistry::new();
        registry.create("farm", "t", "Steve").unwrap();
        let err = registry.create("farm", "t", "Steve").unwrap_err();
        assert!(matches!(err, CustomError::AlreadyExists(_)));
    }

    #[test]
    fn add_sub_reindexes_to_contiguous_keys() {
        let mut def = CustomDefinition::new("farm", "t", "Steve");
        let k1 = def.add_sub(dummy_sub("minecraft:overworld"));
        let k2 = def.add_sub(dummy_sub("minecraft:the_nether"));
        assert_eq!((k1, k2), (1, 2));

        def.remove_sub(1).unwrap();
        // Remaining sub-slot is reindexed down to key 1.
        assert!(def.sub_slot(1).is_some());
        assert!(def.sub_slot(2).is_none());
    }

    #[test]
    fn custom_with_two_dimensions_reports_both_in_insertion_order() {
        let mut def = CustomDefinition::new("farm", "t", "Steve");
        def.add_sub(dummy_sub("minecraft:overworld"));
        def.add_sub(dummy_sub("minecraft:the_nether"));
        assert_eq!(def.dimensions(), vec!["minecraft:overworld", "minecraft:the_nether"]);
    }
}
