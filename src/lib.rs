//! Gap Insight Engine - socioeconomic gap statistics for standardized-test results
//!
//! This library normalizes a results table once, then computes, per filter
//! state, a per-stratum score distribution, a stratum × parent-education
//! cross-tab and a ranking of municipalities by the gap between high- and
//! low-stratum mean scores.

pub mod aggregate;
pub mod arrow_handler;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod filter;
pub mod gap;
pub mod normalize;
pub mod outcome;
pub mod stats;
pub mod utils;

pub use config::{ColumnMapping, EngineConfig};
pub use dataset::{Dataset, Record};
pub use engine::{compute, Dashboard, GapEngine};
pub use filter::Selection;
pub use normalize::{EducationVariable, Stratum, Tier};
pub use outcome::{NoData, Outcome};
pub use stats::Statistics;
pub use utils::AnalysisError;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
