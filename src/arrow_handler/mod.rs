pub mod builder;
/// Arrow IPC table input and view output
pub mod parser;

// Re-export commonly used functions
pub use builder::{build_distribution_result, build_gap_ranking_result, build_pivot_result};
pub use parser::parse_arrow_ipc;
