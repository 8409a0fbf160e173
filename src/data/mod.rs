//! Data structures for variant summary statistics.

pub mod alleles;
mod genotype_matrix;
mod locus;
mod result;
mod samples;
mod variant;

pub use alleles::{allele_type, is_indel, is_snp, AlleleType};
pub use genotype_matrix::{Genotype, VariantMatrix};
pub use locus::{Locus, LocusClass, ReferenceGenome};
pub use result::{
    FreqBinRow, GeneGroupKey, GeneLofMatrix, GeneLofRow, GenotypeCounts, GroupDetail, SiteStats,
    SummaryCountsTable,
};
pub use samples::SampleMetadata;
pub use variant::{Frequency, TranscriptConsequence, VariantRecord, VariantTable, VepAnnotation};
