//! Counts of variants per functional category.

use crate::data::alleles::{is_indel, is_snp};
use crate::data::VariantRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category names in output order.
pub const CATEGORY_NAMES: [&str; 8] = [
    "num_variants",
    "indels",
    "snps",
    "LOF",
    "pass_loftee",
    "pass_loftee_no_flag",
    "loftee_os",
    "fail_loftee",
];

/// Counts of variants across categories.
///
/// Assumes multi-allelic sites have been split: only the first two alleles
/// of a record are used to call it an indel or SNV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    /// Number of variants.
    pub num_variants: u64,
    /// Number of indels.
    pub indels: u64,
    /// Number of SNVs.
    pub snps: u64,
    /// LoF variants (any LOFTEE call).
    #[serde(rename = "LOF")]
    pub lof: u64,
    /// LoF variants passing LOFTEE, flagged or not.
    pub pass_loftee: u64,
    /// LoF variants passing LOFTEE without flags.
    pub pass_loftee_no_flag: u64,
    /// Variants called "other splice" by LOFTEE.
    pub loftee_os: u64,
    /// LoF variants failing LOFTEE.
    pub fail_loftee: u64,
}

impl SummaryCounts {
    /// Add one variant.
    ///
    /// `no_lof_flags` follows three-valued logic: a missing value never
    /// counts towards `pass_loftee_no_flag`.
    pub fn observe(&mut self, alleles: &[String], lof: Option<&str>, no_lof_flags: Option<bool>) {
        self.num_variants += 1;
        if is_indel(alleles) {
            self.indels += 1;
        }
        if is_snp(alleles) {
            self.snps += 1;
        }
        let Some(call) = lof else {
            return;
        };
        self.lof += 1;
        match call {
            "HC" => {
                self.pass_loftee += 1;
                if no_lof_flags == Some(true) {
                    self.pass_loftee_no_flag += 1;
                }
            }
            "OS" => self.loftee_os += 1,
            "LC" => self.fail_loftee += 1,
            _ => {}
        }
    }

    /// Add one record using its `alleles`, `lof` and `no_lof_flags` fields.
    pub fn observe_record(&mut self, record: &VariantRecord) {
        self.observe(&record.alleles, record.lof.as_deref(), record.no_lof_flags);
    }

    /// Combine two partial aggregates.
    pub fn merge(mut self, other: Self) -> Self {
        self.num_variants += other.num_variants;
        self.indels += other.indels;
        self.snps += other.snps;
        self.lof += other.lof;
        self.pass_loftee += other.pass_loftee;
        self.pass_loftee_no_flag += other.pass_loftee_no_flag;
        self.loftee_os += other.loftee_os;
        self.fail_loftee += other.fail_loftee;
        self
    }

    /// Values in [`CATEGORY_NAMES`] order.
    pub fn values(&self) -> [u64; 8] {
        [
            self.num_variants,
            self.indels,
            self.snps,
            self.lof,
            self.pass_loftee,
            self.pass_loftee_no_flag,
            self.loftee_os,
            self.fail_loftee,
        ]
    }

    /// Category name/count pairs with `prefix` prepended to every name.
    pub fn named(&self, prefix: &str) -> Vec<(String, u64)> {
        CATEGORY_NAMES
            .iter()
            .zip(self.values())
            .map(|(name, count)| (format!("{}{}", prefix, name), count))
            .collect()
    }
}

impl std::fmt::Display for SummaryCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Summary Counts")?;
        for (name, count) in self.named("") {
            writeln!(f, "  {:<20} {}", name, count)?;
        }
        Ok(())
    }
}

fn warn_split_multiallelics() {
    tracing::warn!("Category counts expect multi-allelic variants to have been split");
}

/// Count categories across all records.
pub fn count_categories(records: &[VariantRecord]) -> SummaryCounts {
    warn_split_multiallelics();
    records
        .par_iter()
        .fold(SummaryCounts::default, |mut acc, rec| {
            acc.observe_record(rec);
            acc
        })
        .reduce(SummaryCounts::default, SummaryCounts::merge)
}

/// Count categories per group, with the grouping key chosen by the caller.
///
/// Only keys that occur in `records` appear in the output.
pub fn count_categories_by<K, F>(records: &[VariantRecord], key: F) -> BTreeMap<K, SummaryCounts>
where
    K: Ord + Send,
    F: Fn(&VariantRecord) -> K + Sync,
{
    warn_split_multiallelics();
    records
        .par_iter()
        .fold(BTreeMap::new, |mut groups: BTreeMap<K, SummaryCounts>, rec| {
            groups.entry(key(rec)).or_default().observe_record(rec);
            groups
        })
        .reduce(BTreeMap::new, |mut left, right| {
            for (k, counts) in right {
                let merged = left.remove(&k).unwrap_or_default().merge(counts);
                left.insert(k, merged);
            }
            left
        })
}
