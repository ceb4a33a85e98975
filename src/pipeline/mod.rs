//! Pipeline stages of one monitoring cycle.
//!
//! - `snapshot`: paginated acquisition of a complete snapshot
//! - `diff`: change events between two snapshots
//! - `report`: rendering of change events
//! - `monitor`: the poll loop tying them together

pub mod diff;
pub mod monitor;
pub mod report;
pub mod snapshot;

pub use diff::{DiffEngine, calculate_diff};
pub use monitor::{CycleOutcome, Monitor};
pub use report::render;
pub use snapshot::{BuildSettings, Sleeper, SnapshotBuilder, TokioSleeper};
