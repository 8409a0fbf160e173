//! Combined per-variant row criteria with three-valued logic.

use crate::data::VariantRecord;
use crate::filter::an_adj::AnAdjCriterion;
use serde::{Deserialize, Serialize};

/// AF at or above which a variant is ultra-common.
pub const ULTRA_COMMON_AF: f64 = 0.95;
/// AF below which a variant is rare.
pub const RARE_AF: f64 = 0.05;

/// Three-valued AND: false dominates, then missing.
pub fn and3(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

/// Criteria a variant row can be tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowCriterion {
    /// Empty filters set.
    Pass,
    /// Enough called alleles for the locus, see [`AnAdjCriterion`].
    AnAdjacent,
    /// AF below [`ULTRA_COMMON_AF`].
    NotUltraCommon,
    /// AF below [`RARE_AF`].
    RareOnly,
}

/// Conjunction of row criteria.
#[derive(Debug, Clone)]
pub struct RowFilter {
    criteria: Vec<RowCriterion>,
    freq_index: usize,
    an_adj: Option<AnAdjCriterion>,
}

impl Default for RowFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowFilter {
    /// An empty filter that keeps every row.
    pub fn new() -> Self {
        Self {
            criteria: Vec::new(),
            freq_index: 0,
            an_adj: None,
        }
    }

    /// Frequency index read by the AF criteria.
    pub fn freq_index(mut self, index: usize) -> Self {
        self.freq_index = index;
        self
    }

    /// Require an empty filters set.
    pub fn pass(mut self) -> Self {
        self.criteria.push(RowCriterion::Pass);
        self
    }

    /// Require the AN criterion to hold.
    pub fn an_adjacent(mut self, criterion: AnAdjCriterion) -> Self {
        self.criteria.push(RowCriterion::AnAdjacent);
        self.an_adj = Some(criterion);
        self
    }

    /// Require AF below 0.95.
    pub fn not_ultra_common(mut self) -> Self {
        self.criteria.push(RowCriterion::NotUltraCommon);
        self
    }

    /// Require AF below 0.05.
    pub fn rare_only(mut self) -> Self {
        self.criteria.push(RowCriterion::RareOnly);
        self
    }

    pub fn criteria(&self) -> &[RowCriterion] {
        &self.criteria
    }

    fn af_below(&self, record: &VariantRecord, threshold: f64) -> Option<bool> {
        record.freq_at(self.freq_index)?.af.map(|af| af < threshold)
    }

    /// Evaluate a single criterion.
    pub fn evaluate_one(&self, criterion: RowCriterion, record: &VariantRecord) -> Option<bool> {
        match criterion {
            RowCriterion::Pass => Some(record.is_pass()),
            RowCriterion::AnAdjacent => self
                .an_adj
                .as_ref()
                .and_then(|c| c.evaluate(&record.locus, &record.freq)),
            RowCriterion::NotUltraCommon => self.af_below(record, ULTRA_COMMON_AF),
            RowCriterion::RareOnly => self.af_below(record, RARE_AF),
        }
    }

    /// Three-valued conjunction of all criteria.
    pub fn evaluate(&self, record: &VariantRecord) -> Option<bool> {
        self.criteria
            .iter()
            .fold(Some(true), |acc, &c| and3(acc, self.evaluate_one(c, record)))
    }

    /// Rows pass only when every criterion is true.
    pub fn keep(&self, record: &VariantRecord) -> bool {
        self.evaluate(record) == Some(true)
    }
}
