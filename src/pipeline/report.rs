//! Human-readable change reports.

use std::fmt;

use crate::models::{ChangeEvent, Item};

const RANK_CHANGED: &str = "排位变动";
const JOINED: &str = "新上榜";
const LEFT: &str = "下榜";

/// Render events one per line, joined by `\n`.
pub fn render(events: &[ChangeEvent]) -> String {
    events
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_entry(f: &mut fmt::Formatter<'_>, label: &str, rank: usize, item: &Item) -> fmt::Result {
    write!(
        f,
        "【{}】{} - {} {:.1} ({}人评价） {}",
        label, rank, item.title, item.score, item.score_count, item.note
    )
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::RankChanged {
                item,
                old_rank,
                new_rank,
            } => write!(
                f,
                "【{}】{}：第 {} 名 --> 第 {} 名",
                RANK_CHANGED, item.title, old_rank, new_rank
            ),
            ChangeEvent::Removed { item, old_rank } => write_entry(f, LEFT, *old_rank, item),
            ChangeEvent::Added { item, new_rank } => write_entry(f, JOINED, *new_rank, item),
            ChangeEvent::Separator => Ok(()),
        }
    }
}
