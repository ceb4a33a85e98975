//! Change events produced by comparing two snapshots.

use super::Item;

/// One difference between the previous and the current snapshot.
///
/// Ranks are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Present in both snapshots at different positions; `item` is the current entry.
    RankChanged {
        item: Item,
        old_rank: usize,
        new_rank: usize,
    },
    /// Present in the previous snapshot only.
    Removed { item: Item, old_rank: usize },
    /// Present in the current snapshot only.
    Added { item: Item, new_rank: usize },
    /// Blank line between previous-side and new-entry events.
    Separator,
}

impl ChangeEvent {
    pub fn is_separator(&self) -> bool {
        matches!(self, Self::Separator)
    }
}

/// Ordered outcome of a snapshot comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffReport {
    pub has_changes: bool,
    pub events: Vec<ChangeEvent>,
}

impl DiffReport {
    /// Number of rank changes.
    pub fn moved_count(&self) -> usize {
        self.count(|e| matches!(e, ChangeEvent::RankChanged { .. }))
    }

    /// Number of entries that left the list.
    pub fn removed_count(&self) -> usize {
        self.count(|e| matches!(e, ChangeEvent::Removed { .. }))
    }

    /// Number of entries that joined the list.
    pub fn added_count(&self) -> usize {
        self.count(|e| matches!(e, ChangeEvent::Added { .. }))
    }

    fn count(&self, predicate: impl Fn(&ChangeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }
}
