//! Selection of the consequences that enter the gene-level matrix.

use crate::data::TranscriptConsequence;
use std::collections::BTreeSet;

/// Which transcript consequences count as loss-of-function.
#[derive(Debug, Clone, PartialEq)]
pub struct LofPolicy {
    /// Without LOFTEE, classify by consequence term instead of `lof`.
    pub pre_loftee: bool,
    /// Terms counted as LoF when `pre_loftee` is set.
    pub lof_csq_set: BTreeSet<String>,
    /// Extra terms kept regardless of LoF status.
    pub additional_csq_set: BTreeSet<String>,
}

impl LofPolicy {
    fn is_lof(&self, csq: &TranscriptConsequence) -> bool {
        if self.pre_loftee {
            csq.most_severe_consequence
                .as_ref()
                .is_some_and(|term| self.lof_csq_set.contains(term))
        } else {
            csq.lof.as_deref() == Some("HC") && csq.lof_flags.is_none()
        }
    }

    fn is_additional(&self, csq: &TranscriptConsequence) -> bool {
        csq.most_severe_consequence
            .as_ref()
            .is_some_and(|term| self.additional_csq_set.contains(term))
    }

    /// Whether a consequence is kept. Expects `most_severe_consequence`
    /// to be annotated.
    pub fn keeps(&self, csq: &TranscriptConsequence) -> bool {
        self.is_lof(csq) || self.is_additional(csq)
    }
}
