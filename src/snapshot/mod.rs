//! Row-count Snapshot Module
//!
//! Point-in-time row counts, their on-disk history, and the delta report
//! that compares two of them.

pub mod diff;
pub mod stats;
pub mod store;

pub use stats::{StatisticsLog, TableStats};
pub use store::SnapshotStore;
