//! Row filters for variant tables and matrices.

mod an_adj;
mod criteria;
mod regions;

pub use an_adj::{AnAdjConfig, AnAdjCriterion, SamplesBySex};
pub use criteria::{and3, RowCriterion, RowFilter, RARE_AF, ULTRA_COMMON_AF};
pub use regions::{filter_low_conf_regions, IntervalRegions, RegionFilter};
