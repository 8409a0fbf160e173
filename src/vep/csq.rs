//! Consequence severity order.

use crate::data::TranscriptConsequence;

/// Consequence terms from most to least severe.
pub const CSQ_ORDER: &[&str] = &[
    // high impact, coding
    "transcript_ablation",
    "splice_acceptor_variant",
    "splice_donor_variant",
    "stop_gained",
    "frameshift_variant",
    "stop_lost",
    // medium impact, coding
    "start_lost",
    "initiator_codon_variant",
    "transcript_amplification",
    "inframe_insertion",
    "inframe_deletion",
    "missense_variant",
    "protein_altering_variant",
    // low impact, coding
    "splice_region_variant",
    "incomplete_terminal_codon_variant",
    "start_retained_variant",
    "stop_retained_variant",
    "synonymous_variant",
    "coding_sequence_variant",
    // non-coding
    "mature_miRNA_variant",
    "5_prime_UTR_variant",
    "3_prime_UTR_variant",
    "non_coding_transcript_exon_variant",
    "non_coding_exon_variant",
    "intron_variant",
    "NMD_transcript_variant",
    "non_coding_transcript_variant",
    "nc_transcript_variant",
    "upstream_gene_variant",
    "downstream_gene_variant",
    "TFBS_ablation",
    "TFBS_amplification",
    "TF_binding_site_variant",
    "regulatory_region_ablation",
    "regulatory_region_amplification",
    "feature_elongation",
    "regulatory_region_variant",
    "feature_truncation",
    "intergenic_variant",
];

/// Position of a term in [`CSQ_ORDER`]; lower is more severe.
pub fn csq_rank(term: &str) -> Option<usize> {
    CSQ_ORDER.iter().position(|c| *c == term)
}

/// Most severe known term of a consequence list.
pub fn most_severe_consequence<S: AsRef<str>>(terms: &[S]) -> Option<&'static str> {
    CSQ_ORDER
        .iter()
        .find(|c| terms.iter().any(|t| t.as_ref() == **c))
        .copied()
}

/// Annotate a transcript consequence with its most severe term and its rank.
pub fn add_most_severe_consequence_to_consequence(
    mut csq: TranscriptConsequence,
) -> TranscriptConsequence {
    let most_severe = most_severe_consequence(&csq.consequence_terms);
    csq.most_severe_consequence = most_severe.map(String::from);
    csq.csq_score = most_severe.and_then(csq_rank).map(|r| r as f64);
    csq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank() {
        assert_eq!(csq_rank("transcript_ablation"), Some(0));
        assert!(csq_rank("stop_gained") < csq_rank("missense_variant"));
        assert_eq!(csq_rank("made_up_variant"), None);
    }

    #[test]
    fn test_most_severe() {
        let terms = vec!["intron_variant", "splice_region_variant", "missense_variant"];
        assert_eq!(most_severe_consequence(&terms), Some("missense_variant"));
        let unknown: Vec<String> = vec!["made_up_variant".to_string()];
        assert_eq!(most_severe_consequence(&unknown), None);
    }

    #[test]
    fn test_annotate_consequence() {
        let csq = TranscriptConsequence {
            consequence_terms: vec!["splice_region_variant".into(), "stop_gained".into()],
            ..Default::default()
        };
        let csq = add_most_severe_consequence_to_consequence(csq);
        assert_eq!(csq.most_severe_consequence.as_deref(), Some("stop_gained"));
        assert_eq!(csq.csq_score, Some(3.0));
    }
}
