//! Record-level VEP processing used by the summary pipelines.

use crate::data::{TranscriptConsequence, VariantRecord};
use crate::vep::csq::{add_most_severe_consequence_to_consequence, most_severe_consequence, CSQ_ORDER};
use std::collections::BTreeMap;

/// LOFTEE labels in the order they are reported for a variant.
pub const LOFTEE_LABELS: [&str; 3] = ["HC", "LC", "OS"];

/// Score penalty for a high-confidence LoF carrying LOFTEE flags.
const FLAG_SCORE: f64 = 500.0;
/// Score penalty for a high-confidence LoF without flags.
const NO_FLAG_SCORE: f64 = FLAG_SCORE * 2.0;

/// Keep only canonical transcript consequences.
pub fn filter_vep_to_canonical_transcripts(mut record: VariantRecord) -> VariantRecord {
    record
        .vep
        .transcript_consequences
        .retain(TranscriptConsequence::is_canonical);
    record
}

/// Severity score of a consequence, lower is worse.
///
/// Starts from the rank of the most severe term and subtracts bonuses for
/// LOFTEE calls and PolyPhen predictions. Unknown terms rank last.
fn worst_csq_score(csq: &TranscriptConsequence) -> f64 {
    let base = csq.csq_score.unwrap_or(CSQ_ORDER.len() as f64);
    let penalty = match (csq.lof.as_deref(), csq.polyphen_prediction.as_deref()) {
        (Some("HC"), _) if csq.has_no_lof_flags() => NO_FLAG_SCORE,
        (Some("HC"), _) => FLAG_SCORE,
        (Some("OS"), _) => 20.0,
        (Some("LC"), _) => 10.0,
        (_, Some("probably_damaging")) => 0.5,
        (_, Some("possibly_damaging")) => 0.25,
        (_, Some("benign")) => 0.1,
        _ => 0.0,
    };
    base - penalty
}

/// Annotate every transcript consequence with its most severe term and
/// reduce them to the worst consequence per gene.
///
/// `worst_csq_by_gene` is sorted by score, worst first, and
/// `vep.most_severe_consequence` is set to the worst term of the variant.
pub fn process_consequences(mut record: VariantRecord) -> VariantRecord {
    let csqs: Vec<TranscriptConsequence> = record
        .vep
        .transcript_consequences
        .drain(..)
        .map(add_most_severe_consequence_to_consequence)
        .collect();

    let mut by_gene: BTreeMap<&str, TranscriptConsequence> = BTreeMap::new();
    for csq in &csqs {
        let mut scored = csq.clone();
        scored.csq_score = Some(worst_csq_score(csq));
        match by_gene.get(csq.gene_id.as_str()) {
            Some(current) if current.csq_score <= scored.csq_score => {}
            _ => {
                by_gene.insert(csq.gene_id.as_str(), scored);
            }
        }
    }
    let mut worst: Vec<TranscriptConsequence> = by_gene.into_values().collect();
    worst.sort_by(|a, b| a.csq_score.partial_cmp(&b.csq_score).unwrap_or(std::cmp::Ordering::Equal));

    let all_terms: Vec<&str> = csqs
        .iter()
        .filter_map(|c| c.most_severe_consequence.as_deref())
        .collect();
    if let Some(term) = most_severe_consequence(&all_terms) {
        record.vep.most_severe_consequence = Some(term.to_string());
    }

    record.vep.transcript_consequences = csqs;
    record.vep.worst_csq_by_gene = Some(worst);
    record
}

/// Summarise VEP annotations into `most_severe_csq`, `protein_coding`,
/// `lof` and `no_lof_flags`.
///
/// Protein-coding transcripts are preferred when present. `lof` is the first
/// LOFTEE label (HC, LC, OS) carried by any transcript, and `no_lof_flags`
/// is true when a transcript with that label has no flags. Records without
/// transcript consequences fall back to the variant-level VEP term.
pub fn get_most_severe_consequence_for_summary(mut record: VariantRecord) -> VariantRecord {
    let protein_coding: Vec<&TranscriptConsequence> = record
        .vep
        .transcript_consequences
        .iter()
        .filter(|c| c.is_protein_coding())
        .collect();

    let (csqs, is_protein_coding): (Vec<&TranscriptConsequence>, bool) = if !protein_coding.is_empty() {
        (protein_coding, true)
    } else {
        (record.vep.transcript_consequences.iter().collect(), false)
    };

    if csqs.is_empty() {
        record.most_severe_csq = record.vep.most_severe_consequence.clone();
        record.protein_coding = Some(false);
        record.lof = None;
        record.no_lof_flags = None;
        return record;
    }

    let terms: Vec<&str> = csqs
        .iter()
        .flat_map(|c| c.consequence_terms.iter().map(String::as_str))
        .collect();
    let lof = LOFTEE_LABELS
        .iter()
        .find(|label| csqs.iter().any(|c| c.lof.as_deref() == Some(**label)))
        .copied();
    let no_lof_flags = lof.map(|label| {
        csqs.iter()
            .any(|c| c.lof.as_deref() == Some(label) && c.has_no_lof_flags())
    });

    record.most_severe_csq = most_severe_consequence(&terms).map(String::from);
    record.protein_coding = Some(is_protein_coding);
    record.lof = lof.map(String::from);
    record.no_lof_flags = no_lof_flags;
    record
}
