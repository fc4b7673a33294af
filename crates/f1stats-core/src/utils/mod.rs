//! Pure derivations over raw statistics: win rates and year spans.

pub mod format;
pub mod stats;

// Re-export commonly used functions at module level
pub use format::{compress_years_to_spans, format_win_rate};
pub use stats::compute_win_rate;
