//! Variant Summary Statistics Library
//!
//! Composable primitives for summarising annotated genomic variant tables:
//! frequency bins, LoF category counts and gene-level LoF matrices.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (variant records, genotype matrix, sample metadata, result tables)
//! - **frequency**: Frequency binning of AC/AF
//! - **vep**: Consequence severity and LOFTEE summaries
//! - **filter**: Row filters (low-confidence regions, AN criterion, AF thresholds)
//! - **summary**: Category counts and the summary-counts pipeline
//! - **gene_lof**: Gene-level LoF matrix
//! - **pipeline**: Pipeline composition and execution
//!
//! # Example
//!
//! ```no_run
//! use variant_summary::prelude::*;
//!
//! // Load data
//! let variants = VariantTable::from_jsonl("variants.jsonl").unwrap();
//! let regions = IntervalRegions::from_bed(&["lcr.bed"], None).unwrap();
//!
//! // Run the summary pipeline
//! let output = Pipeline::new()
//!     .filter_pass()
//!     .summary_counts(SummaryCountsConfig::default())
//!     .run(PipelineInputs::new(variants).regions(&regions))
//!     .unwrap();
//! println!("{}", output.summary_counts.unwrap());
//! ```

pub mod data;
pub mod error;
pub mod filter;
pub mod frequency;
pub mod gene_lof;
pub mod pipeline;
pub mod summary;
pub mod vep;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        FreqBinRow, Frequency, GeneGroupKey, GeneLofMatrix, GeneLofRow, Genotype, GenotypeCounts,
        GroupDetail, Locus, ReferenceGenome, SampleMetadata, SiteStats, SummaryCountsTable,
        TranscriptConsequence, VariantMatrix, VariantRecord, VariantTable, VepAnnotation,
    };
    pub use crate::error::{Result, SummaryError};
    pub use crate::filter::{
        // Low-confidence regions
        filter_low_conf_regions, IntervalRegions, RegionFilter,
        // AN criterion
        AnAdjConfig, AnAdjCriterion, SamplesBySex,
        // Combined row criteria
        and3, RowCriterion, RowFilter,
    };
    pub use crate::frequency::{freq_bin, FreqBin};
    pub use crate::gene_lof::{
        generate_gene_lof_matrix, ExpressionBucket, GeneLofConfig, TranscriptExpression,
    };
    pub use crate::pipeline::{
        run_summary_counts, Pipeline, PipelineConfig, PipelineInputs, PipelineOutput, PipelineStep,
    };
    pub use crate::summary::{
        count_categories, count_categories_by, get_summary_counts, SummaryCounts,
        SummaryCountsConfig,
    };
    pub use crate::vep::{
        filter_vep_to_canonical_transcripts, get_most_severe_consequence_for_summary,
        process_consequences,
    };
}
