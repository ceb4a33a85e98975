//! Diff calculation between two ranked snapshots.
//!
//! Produces the ordered change events of a report:
//!
//! 1. every previous entry, in previous rank order, that moved or left;
//! 2. a single separator, if step 1 produced anything;
//! 3. every current entry, in current rank order, that is new.
//!
//! Items are matched by identity, never by position.

use std::collections::HashMap;

use crate::models::{ChangeEvent, DiffReport, Item, Snapshot};

/// Calculator for computing diffs between snapshots.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    /// Calculate the change events from `previous` to `current`.
    ///
    /// An empty `previous` (first run) yields no changes at all.
    pub fn diff(&self, previous: &Snapshot, current: &Snapshot) -> DiffReport {
        log::debug!("comparing snapshots...");
        if previous.is_empty() {
            return DiffReport::default();
        }

        let current_index = Self::index_by_identity(current.items());
        let previous_index = Self::index_by_identity(previous.items());
        let mut events = Vec::new();

        for (i, old) in previous.iter().enumerate() {
            match current_index.get(old.identity.as_str()) {
                Some(&j) if i != j => events.push(ChangeEvent::RankChanged {
                    item: current.items()[j].clone(),
                    old_rank: i + 1,
                    new_rank: j + 1,
                }),
                Some(_) => {}
                None => events.push(ChangeEvent::Removed {
                    item: old.clone(),
                    old_rank: i + 1,
                }),
            }
        }

        if !events.is_empty() {
            events.push(ChangeEvent::Separator);
        }

        for (j, new) in current.iter().enumerate() {
            if !previous_index.contains_key(new.identity.as_str()) {
                events.push(ChangeEvent::Added {
                    item: new.clone(),
                    new_rank: j + 1,
                });
            }
        }

        log::debug!("compare snapshots finished.");
        DiffReport {
            has_changes: events.iter().any(|e| !e.is_separator()),
            events,
        }
    }

    /// Position of the first item carrying each identity.
    fn index_by_identity(items: &[Item]) -> HashMap<&str, usize> {
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            index.entry(item.identity.as_str()).or_insert(position);
        }
        index
    }
}

/// Convenience function to calculate diff.
pub fn calculate_diff(previous: &Snapshot, current: &Snapshot) -> DiffReport {
    DiffEngine::new().diff(previous, current)
}
