//! Gene-level loss-of-function matrix.
//!
//! Variants are reduced to (gene, consequence) groups with site-level
//! frequency aggregates and per-sample genotype counts, the input of
//! gene burden and LoF curation analyses.

mod classify;
mod expression;
mod matrix;

pub use classify::LofPolicy;
pub use expression::{ExpressionBucket, ExpressionEntry, TranscriptExpression};
pub use matrix::{generate_gene_lof_matrix, GeneLofConfig};
