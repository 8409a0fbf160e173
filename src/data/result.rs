//! Result tables produced by the summary pipelines.

use crate::error::Result;
use crate::frequency::FreqBin;
use crate::gene_lof::ExpressionBucket;
use crate::summary::SummaryCounts;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Category counts for one frequency bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreqBinRow {
    /// `None` for records without a frequency struct at the binned index.
    pub freq_bin: Option<FreqBin>,
    pub counts: SummaryCounts,
}

/// Summary counts grouped by frequency bin, with table-level totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryCountsTable {
    /// Totals over every record that survived filtering.
    pub globals: SummaryCounts,
    /// One row per bin, in ascending bin order.
    pub rows: Vec<FreqBinRow>,
}

impl SummaryCountsTable {
    /// Global totals named with the `total_` prefix.
    pub fn globals_named(&self) -> Vec<(String, u64)> {
        self.globals.named("total_")
    }

    /// Counts for a bin, if a row exists for it.
    pub fn get(&self, bin: FreqBin) -> Option<&SummaryCounts> {
        self.rows
            .iter()
            .find(|r| r.freq_bin == Some(bin))
            .map(|r| &r.counts)
    }

    /// Sum of every row.
    pub fn row_total(&self) -> SummaryCounts {
        self.rows
            .iter()
            .fold(SummaryCounts::default(), |acc, r| acc.merge(r.counts))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write per-bin rows to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        write!(writer, "freq_bin")?;
        for (name, _) in self.globals.named("") {
            write!(writer, "\t{}", name)?;
        }
        writeln!(writer)?;

        for row in &self.rows {
            let label = row.freq_bin.map_or("NA", |b| b.label());
            write!(writer, "{}", label)?;
            for count in row.counts.values() {
                write!(writer, "\t{}", count)?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the `total_` globals as a JSON object.
    pub fn globals_to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let globals: serde_json::Map<String, serde_json::Value> = self
            .globals_named()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::from(v)))
            .collect();
        let wrapped = serde_json::json!({ "summary_counts": globals });
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &wrapped)?;
        Ok(())
    }
}

impl std::fmt::Display for SummaryCountsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Summary Counts by Frequency Bin")?;
        for row in &self.rows {
            let label = row.freq_bin.map_or("NA", |b| b.label());
            writeln!(
                f,
                "  {:<14} variants={} indels={} snps={} LOF={} pass_loftee={}",
                label,
                row.counts.num_variants,
                row.counts.indels,
                row.counts.snps,
                row.counts.lof,
                row.counts.pass_loftee
            )?;
        }
        write!(f, "Totals\n{}", self.globals)
    }
}

/// Last component of a gene group key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupDetail {
    /// Expression bucket of the gene/consequence pair.
    Expression(ExpressionBucket),
    /// Transcript and whether it is canonical.
    Transcript { transcript_id: String, canonical: bool },
}

/// Grouping key of the gene-level LoF matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneGroupKey {
    pub gene_id: String,
    pub gene: Option<String>,
    pub indel: bool,
    pub most_severe_consequence: Option<String>,
    pub detail: GroupDetail,
}

/// Site-level aggregates of a gene group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteStats {
    /// Number of (variant, consequence) rows.
    pub n_sites: u64,
    /// Per frequency subset, number of sites with AC > 0.
    pub n_sites_array: Vec<u64>,
    /// Sum of AF at the selected frequency index.
    pub classic_caf: f64,
    /// Maximum AF at the selected frequency index.
    pub max_af: Option<f64>,
    /// Per frequency subset, sum of AF.
    pub classic_caf_array: Vec<f64>,
}

/// Genotype aggregates of one group for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeCounts {
    pub num_homs: u64,
    pub num_hets: u64,
    pub defined_sites: u64,
}

/// One row of the gene-level LoF matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneLofRow {
    pub key: GeneGroupKey,
    pub sites: SiteStats,
}

/// Gene/consequence groups × samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneLofMatrix {
    sample_ids: Vec<String>,
    rows: Vec<GeneLofRow>,
    /// Row-major entries, `rows.len() × sample_ids.len()`.
    entries: Vec<GenotypeCounts>,
    with_expression: bool,
}

impl GeneLofMatrix {
    pub(crate) fn new(
        sample_ids: Vec<String>,
        rows: Vec<GeneLofRow>,
        entries: Vec<GenotypeCounts>,
        with_expression: bool,
    ) -> Self {
        debug_assert_eq!(entries.len(), rows.len() * sample_ids.len());
        Self {
            sample_ids,
            rows,
            entries,
            with_expression,
        }
    }

    #[inline]
    pub fn n_groups(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn rows(&self) -> &[GeneLofRow] {
        &self.rows
    }

    /// Whether groups are keyed by expression bucket rather than transcript.
    pub fn with_expression(&self) -> bool {
        self.with_expression
    }

    /// Genotype aggregates for (group, sample).
    pub fn entry(&self, row: usize, col: usize) -> GenotypeCounts {
        self.entries[row * self.n_samples() + col]
    }

    /// Genotype aggregates of one group across samples.
    pub fn row_entries(&self, row: usize) -> &[GenotypeCounts] {
        let n = self.n_samples();
        &self.entries[row * n..(row + 1) * n]
    }

    /// Rows for a gene and consequence.
    pub fn find(&self, gene_id: &str, csq: &str) -> Vec<&GeneLofRow> {
        self.rows
            .iter()
            .filter(|r| r.key.gene_id == gene_id && r.key.most_severe_consequence.as_deref() == Some(csq))
            .collect()
    }

    /// Write group keys and site-level statistics to a TSV file.
    pub fn rows_to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        write!(writer, "gene_id\tgene\tindel\tmost_severe_consequence")?;
        if self.with_expression {
            write!(writer, "\texpressed")?;
        } else {
            write!(writer, "\ttranscript_id\tcanonical")?;
        }
        writeln!(writer, "\tn_sites\tn_sites_array\tclassic_caf\tmax_af\tclassic_caf_array")?;

        for row in &self.rows {
            let key = &row.key;
            write!(
                writer,
                "{}\t{}\t{}\t{}",
                key.gene_id,
                key.gene.as_deref().unwrap_or("NA"),
                key.indel,
                key.most_severe_consequence.as_deref().unwrap_or("NA")
            )?;
            match &key.detail {
                GroupDetail::Expression(bucket) => write!(writer, "\t{}", bucket.name())?,
                GroupDetail::Transcript {
                    transcript_id,
                    canonical,
                } => write!(writer, "\t{}\t{}", transcript_id, canonical)?,
            }
            let s = &row.sites;
            writeln!(
                writer,
                "\t{}\t{}\t{:.6e}\t{}\t{}",
                s.n_sites,
                join(&s.n_sites_array, |v| v.to_string()),
                s.classic_caf,
                s.max_af.map_or("NA".to_string(), |v| format!("{:.6e}", v)),
                join(&s.classic_caf_array, |v| format!("{:.6e}", v)),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write per-sample genotype aggregates in long format.
    ///
    /// Columns: group index (row order of [`Self::rows_to_tsv`]), sample,
    /// `num_homs`, `num_hets`, `defined_sites`.
    pub fn entries_to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "group\tgene_id\tsample_id\tnum_homs\tnum_hets\tdefined_sites")?;
        for (row_idx, row) in self.rows.iter().enumerate() {
            for (col, sample_id) in self.sample_ids.iter().enumerate() {
                let e = self.entry(row_idx, col);
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    row_idx, row.key.gene_id, sample_id, e.num_homs, e.num_hets, e.defined_sites
                )?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

fn join<T, F: Fn(&T) -> String>(values: &[T], fmt: F) -> String {
    values.iter().map(fmt).collect::<Vec<_>>().join(",")
}
