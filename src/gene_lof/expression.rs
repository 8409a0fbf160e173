//! Transcript expression annotations for gene/consequence pairs.

use crate::data::VariantRecord;
use crate::error::{Result, SummaryError};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Mean expression level at or above which a pair is highly expressed.
pub const HIGH_EXPRESSION: f64 = 0.9;
/// Mean expression level above which a pair is at least medium expressed.
pub const MEDIUM_EXPRESSION: f64 = 0.1;

/// Expression level of a gene/consequence pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionBucket {
    High,
    Medium,
    Low,
    Missing,
}

impl ExpressionBucket {
    /// Bucket a mean expression value; only `None` is `Missing`, a defined
    /// NaN falls through to `Low`.
    pub fn from_mean(mean_expression: Option<f64>) -> Self {
        match mean_expression {
            Some(v) if v >= HIGH_EXPRESSION => ExpressionBucket::High,
            Some(v) if v > MEDIUM_EXPRESSION => ExpressionBucket::Medium,
            Some(_) => ExpressionBucket::Low,
            None => ExpressionBucket::Missing,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExpressionBucket::High => "high",
            ExpressionBucket::Medium => "medium",
            ExpressionBucket::Low => "low",
            ExpressionBucket::Missing => "missing",
        }
    }
}

impl std::fmt::Display for ExpressionBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Expression of one gene/consequence pair at a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionEntry {
    pub ensg: String,
    pub csq: String,
    pub mean_expression: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExpressionRow {
    contig: String,
    position: u64,
    #[serde(rename = "ref")]
    reference: String,
    alt: String,
    ensg: String,
    csq: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    mean_expression: Option<f64>,
}

/// Expression annotations keyed by variant.
#[derive(Debug, Clone, Default)]
pub struct TranscriptExpression {
    by_variant: HashMap<String, Vec<ExpressionEntry>>,
}

impl TranscriptExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a tab-separated table with columns
    /// `contig, position, ref, alt, ensg, csq, mean_expression`.
    ///
    /// Unparseable expression values (e.g. `NA`) are treated as missing.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = ReaderBuilder::new().delimiter(b'\t').from_path(path)?;
        let mut expression = Self::new();

        for (idx, result) in reader.deserialize().enumerate() {
            let row: ExpressionRow = result.map_err(|e| SummaryError::Parse {
                line: idx + 2,
                reason: e.to_string(),
            })?;
            let key = format!("{}:{}:{}:{}", row.contig, row.position, row.reference, row.alt);
            expression.by_variant.entry(key).or_default().push(ExpressionEntry {
                ensg: row.ensg,
                csq: row.csq,
                mean_expression: row.mean_expression,
            });
        }

        if expression.by_variant.is_empty() {
            return Err(SummaryError::EmptyData(
                "Expression table has no rows".to_string(),
            ));
        }
        tracing::debug!("Loaded expression for {} variants", expression.by_variant.len());
        Ok(expression)
    }

    /// Add an entry for a variant id (`contig:position:ref:alt`).
    pub fn insert(&mut self, variant_id: &str, entry: ExpressionEntry) {
        self.by_variant
            .entry(variant_id.to_string())
            .or_default()
            .push(entry);
    }

    pub fn n_variants(&self) -> usize {
        self.by_variant.len()
    }

    /// First entry for the variant matching both gene and consequence.
    pub fn lookup(&self, record: &VariantRecord, gene_id: &str, csq: Option<&str>) -> Option<&ExpressionEntry> {
        let csq = csq?;
        self.by_variant
            .get(&record.variant_id())?
            .iter()
            .find(|e| e.ensg == gene_id && e.csq == csq)
    }

    /// Expression bucket for a gene/consequence pair at a variant.
    pub fn bucket(&self, record: &VariantRecord, gene_id: &str, csq: Option<&str>) -> ExpressionBucket {
        ExpressionBucket::from_mean(self.lookup(record, gene_id, csq).and_then(|e| e.mean_expression))
    }
}
