//! Budget-constrained fantasy roster selection for downhill world-cup
//! leagues: ingest a rider pool, enumerate every per-group team under the
//! budget ceiling, and cross-join the groups for the best feasible roster.
//!
//! `data` handles ingestion and normalization, `optimizer` the generation
//! and selection core, `parallel` the optional worker partitioning, and
//! `cli` the command-line boundary.

pub mod cli;
pub mod data;
pub mod optimizer;
pub mod parallel;
