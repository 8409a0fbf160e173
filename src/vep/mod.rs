//! VEP consequence helpers: severity order, canonical filtering and
//! per-record consequence summaries.

mod csq;
mod process;

pub use csq::{
    add_most_severe_consequence_to_consequence, csq_rank, most_severe_consequence, CSQ_ORDER,
};
pub use process::{
    filter_vep_to_canonical_transcripts, get_most_severe_consequence_for_summary,
    process_consequences, LOFTEE_LABELS,
};
