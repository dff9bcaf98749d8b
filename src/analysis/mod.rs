//! Timeline analysis engine.
//!
//! Pure, synchronous computations over runs, timelines and log text that the
//! fetch layer has already retrieved.

pub mod batch;
pub mod duration;
pub mod leg_log;
pub mod names;
pub mod parallelization;
pub mod signing;
pub mod stats;
pub mod timeline;

pub use batch::{analyze_parallelization, analyze_signing, RunData};
pub use signing::{LegLogs, SigningPlan};
pub use stats::DurationStats;
pub use timeline::{Record, RecordType, Run, Timeline};
