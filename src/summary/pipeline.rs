//! Summary counts of a variant table, stratified by frequency bin.

use crate::data::{FreqBinRow, SummaryCountsTable, VariantRecord, VariantTable};
use crate::error::Result;
use crate::filter::{filter_low_conf_regions, RegionFilter};
use crate::frequency::{freq_bin, FreqBin};
use crate::summary::counts::{count_categories, count_categories_by};
use crate::vep::{filter_vep_to_canonical_transcripts, get_most_severe_consequence_for_summary};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters of [`get_summary_counts`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryCountsConfig {
    /// Frequency subset used for binning.
    pub freq_index: usize,
    /// Also drop variants in decoy regions.
    pub filter_decoy: bool,
    /// Emit a zero row for every bin that has no variants.
    pub fill_missing_bins: bool,
}

/// Count variants per category over PASS variants outside low-confidence
/// regions, in total and per frequency bin.
///
/// Consequences are restricted to canonical transcripts before the most
/// severe consequence and LOFTEE call of each variant are derived. Without a
/// region filter the region step is skipped.
pub fn get_summary_counts(
    table: VariantTable,
    regions: Option<&dyn RegionFilter>,
    config: &SummaryCountsConfig,
) -> Result<SummaryCountsTable> {
    let n_input = table.len();
    tracing::info!("Filtering to PASS variants...");
    let mut records = table.filter(VariantRecord::is_pass).into_records();
    tracing::debug!("{} of {} variants PASS", records.len(), n_input);

    match regions {
        Some(regions) => {
            tracing::info!("Removing variants in low confidence regions...");
            records = filter_low_conf_regions(records, regions, config.filter_decoy);
            tracing::debug!("{} variants outside low confidence regions", records.len());
        }
        None => tracing::info!("No low confidence regions supplied, skipping region filter"),
    }

    tracing::info!("Annotating canonical consequences, LOFTEE calls and frequency bins...");
    let freq_index = config.freq_index;
    let records: Vec<VariantRecord> = records
        .into_par_iter()
        .map(|rec| {
            let mut rec = get_most_severe_consequence_for_summary(filter_vep_to_canonical_transcripts(rec));
            rec.freq_bin = freq_bin(&rec.freq, freq_index);
            rec
        })
        .collect();

    if records.is_empty() {
        tracing::warn!("No variants left after filtering");
    }

    tracing::info!("Computing global summary counts...");
    let globals = count_categories(&records);

    tracing::info!("Computing summary counts per frequency bin...");
    let mut by_bin = count_categories_by(&records, |r| r.freq_bin);
    let missing_bin = by_bin.remove(&None);

    let mut rows: Vec<FreqBinRow> = if config.fill_missing_bins {
        FreqBin::ALL
            .iter()
            .map(|&bin| FreqBinRow {
                freq_bin: Some(bin),
                counts: by_bin.remove(&Some(bin)).unwrap_or_default(),
            })
            .collect()
    } else {
        by_bin
            .into_iter()
            .map(|(freq_bin, counts)| FreqBinRow { freq_bin, counts })
            .collect()
    };
    if let Some(counts) = missing_bin {
        rows.push(FreqBinRow {
            freq_bin: None,
            counts,
        });
    }

    let summary = SummaryCountsTable { globals, rows };
    debug_assert_eq!(summary.row_total(), summary.globals);
    Ok(summary)
}
