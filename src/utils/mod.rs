/// Utility modules for error handling and raw value conversions
pub mod error;
pub mod type_convert;

// Re-export commonly used types
pub use error::AnalysisError;
pub use type_convert::{coerce_numeric, non_empty, strip_quotes};
