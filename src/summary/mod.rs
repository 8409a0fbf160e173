//! Variant category counts and the summary-counts pipeline.

mod counts;
mod pipeline;

pub use counts::{count_categories, count_categories_by, SummaryCounts, CATEGORY_NAMES};
pub use pipeline::{get_summary_counts, SummaryCountsConfig};
