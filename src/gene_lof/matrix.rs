//! Gene-level LoF matrix: genotype aggregates per gene/consequence group.

use crate::data::{
    is_indel, GeneGroupKey, GeneLofMatrix, GeneLofRow, Genotype, GenotypeCounts, GroupDetail,
    SampleMetadata, SiteStats, TranscriptConsequence, VariantMatrix, VariantRecord,
};
use crate::error::{Result, SummaryError};
use crate::filter::{AnAdjConfig, AnAdjCriterion, RowFilter, SamplesBySex};
use crate::gene_lof::classify::LofPolicy;
use crate::gene_lof::expression::TranscriptExpression;
use crate::vep::{add_most_severe_consequence_to_consequence, process_consequences};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Parameters of [`generate_gene_lof_matrix`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneLofConfig {
    /// Frequency subset used for AF filters and `classic_caf`.
    pub freq_index: usize,
    /// Consequences kept in addition to LoF ones.
    pub additional_csq_set: BTreeSet<String>,
    /// Use every transcript consequence instead of the worst per gene.
    pub all_transcripts: bool,
    /// Keep only variants passing the AN criterion.
    pub filter_an: bool,
    pub an: AnAdjConfig,
    /// Samples per karyotype; counted from metadata when absent.
    pub samples_by_sex: Option<BTreeMap<String, u64>>,
    /// Keep only variants with AF < 5%.
    pub filter_to_rare: bool,
    /// Classify LoF by consequence term instead of LOFTEE.
    pub pre_loftee: bool,
    pub lof_csq_set: BTreeSet<String>,
    /// Drop variants with AF >= 95%.
    pub remove_ultra_common: bool,
}

fn csq_set(terms: &[&str]) -> BTreeSet<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

impl Default for GeneLofConfig {
    fn default() -> Self {
        Self {
            freq_index: 0,
            additional_csq_set: csq_set(&["missense_variant", "synonymous_variant"]),
            all_transcripts: false,
            filter_an: false,
            an: AnAdjConfig::default(),
            samples_by_sex: None,
            filter_to_rare: false,
            pre_loftee: false,
            lof_csq_set: csq_set(&[
                "splice_acceptor_variant",
                "splice_donor_variant",
                "stop_gained",
                "frameshift_variant",
            ]),
            remove_ultra_common: false,
        }
    }
}

impl GeneLofConfig {
    fn lof_policy(&self) -> LofPolicy {
        LofPolicy {
            pre_loftee: self.pre_loftee,
            lof_csq_set: self.lof_csq_set.clone(),
            additional_csq_set: self.additional_csq_set.clone(),
        }
    }

    /// Resolve the row filter, counting karyotypes from `metadata` if needed.
    fn row_filter(&self, matrix: &VariantMatrix, metadata: Option<&SampleMetadata>) -> Result<RowFilter> {
        let mut filter = RowFilter::new().freq_index(self.freq_index).pass();
        if self.filter_an {
            let samples_by_sex: SamplesBySex = match (&self.samples_by_sex, metadata) {
                (Some(counts), _) => counts.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                (None, Some(metadata)) => {
                    let aligned = metadata.align_to(matrix.sample_ids())?;
                    SamplesBySex::from_metadata(&aligned, &self.an.sex_field)?
                }
                (None, None) => {
                    return Err(SummaryError::InvalidParameter(
                        "AN filtering needs samples_by_sex or sample metadata".to_string(),
                    ))
                }
            };
            let criterion = AnAdjCriterion::new(&samples_by_sex, &self.an, self.freq_index)?;
            filter = filter.an_adjacent(criterion);
        }
        if self.remove_ultra_common {
            filter = filter.not_ultra_common();
        }
        if self.filter_to_rare {
            filter = filter.rare_only();
        }
        Ok(filter)
    }
}

/// Consequences of a record at the requested granularity, each annotated
/// with its most severe term.
fn candidate_consequences(record: &VariantRecord, all_transcripts: bool) -> Vec<TranscriptConsequence> {
    if all_transcripts {
        record
            .vep
            .transcript_consequences
            .iter()
            .cloned()
            .map(add_most_severe_consequence_to_consequence)
            .collect()
    } else {
        process_consequences(record.clone())
            .vep
            .worst_csq_by_gene
            .unwrap_or_default()
    }
}

fn group_key(
    record: &VariantRecord,
    csq: TranscriptConsequence,
    expression: Option<&TranscriptExpression>,
) -> GeneGroupKey {
    let detail = match expression {
        Some(expression) => GroupDetail::Expression(expression.bucket(
            record,
            &csq.gene_id,
            csq.most_severe_consequence.as_deref(),
        )),
        None => GroupDetail::Transcript {
            canonical: csq.canonical.is_some(),
            transcript_id: csq.transcript_id,
        },
    };
    GeneGroupKey {
        gene_id: csq.gene_id,
        gene: csq.gene_symbol,
        indel: is_indel(&record.alleles),
        most_severe_consequence: csq.most_severe_consequence,
        detail,
    }
}

/// Site-level statistics over the (variant, consequence) rows of a group.
fn site_stats(matrix: &VariantMatrix, rows: &[usize], freq_index: usize) -> Result<SiteStats> {
    let records = matrix.rows();
    let n_freq = rows.first().map_or(0, |&r| records[r].freq.len());
    let mut stats = SiteStats {
        n_sites: rows.len() as u64,
        n_sites_array: vec![0; n_freq],
        classic_caf: 0.0,
        max_af: None,
        classic_caf_array: vec![0.0; n_freq],
    };

    for &row in rows {
        let freq = &records[row].freq;
        if freq.len() != n_freq {
            return Err(SummaryError::DimensionMismatch {
                expected: n_freq,
                actual: freq.len(),
            });
        }
        for (j, f) in freq.iter().enumerate() {
            if f.ac.is_some_and(|ac| ac > 0) {
                stats.n_sites_array[j] += 1;
            }
            if let Some(af) = f.af {
                stats.classic_caf_array[j] += af;
            }
        }
        if let Some(af) = freq.get(freq_index).and_then(|f| f.af) {
            stats.classic_caf += af;
            stats.max_af = Some(stats.max_af.map_or(af, |m: f64| m.max(af)));
        }
    }
    Ok(stats)
}

/// Per-sample genotype aggregates over the rows of a group.
fn genotype_counts(matrix: &VariantMatrix, rows: &[usize]) -> Vec<GenotypeCounts> {
    let mut counts = vec![GenotypeCounts::default(); matrix.n_samples()];
    let mut missing = vec![0u64; matrix.n_samples()];
    for &row in rows {
        for (col, gt) in matrix.non_ref_calls(row) {
            match gt {
                Genotype::Het => counts[col].num_hets += 1,
                Genotype::HomVar => counts[col].num_homs += 1,
                Genotype::Missing => missing[col] += 1,
                Genotype::HomRef => {}
            }
        }
    }
    for (c, m) in counts.iter_mut().zip(missing) {
        c.defined_sites = rows.len() as u64 - m;
    }
    counts
}

/// Aggregate variants into gene × consequence groups.
///
/// Rows are first restricted to PASS variants, optionally also to variants
/// passing the AN criterion, not ultra-common or rare. Consequences (the
/// worst per gene, or every transcript with `all_transcripts`) that are LoF
/// under the configured policy, or whose most severe term is in
/// `additional_csq_set`, each contribute one row to their group. Groups are
/// keyed by gene, indel status and consequence plus either the expression
/// bucket (when `expression` is given) or the transcript.
///
/// `metadata` is only read when AN filtering is on and `samples_by_sex` is
/// not configured.
pub fn generate_gene_lof_matrix(
    matrix: &VariantMatrix,
    metadata: Option<&SampleMetadata>,
    expression: Option<&TranscriptExpression>,
    config: &GeneLofConfig,
) -> Result<GeneLofMatrix> {
    let filter = config.row_filter(matrix, metadata)?;
    let policy = &config.lof_policy();

    tracing::info!("Filtering variants ({:?})...", filter.criteria());
    let kept: Vec<usize> = (0..matrix.n_variants())
        .into_par_iter()
        .filter(|&i| filter.keep(&matrix.rows()[i]))
        .collect();
    tracing::debug!("{} of {} variants kept", kept.len(), matrix.n_variants());

    tracing::info!("Selecting LoF consequences...");
    let keyed: Vec<(GeneGroupKey, usize)> = kept
        .par_iter()
        .flat_map_iter(|&i| {
            let record = &matrix.rows()[i];
            candidate_consequences(record, config.all_transcripts)
                .into_iter()
                .filter(move |csq| policy.keeps(csq))
                .map(move |csq| (group_key(record, csq, expression), i))
        })
        .collect();

    let mut groups: BTreeMap<GeneGroupKey, Vec<usize>> = BTreeMap::new();
    for (key, row) in keyed {
        groups.entry(key).or_default().push(row);
    }
    tracing::info!(
        "Aggregating {} consequence rows into {} groups...",
        groups.values().map(Vec::len).sum::<usize>(),
        groups.len()
    );

    let aggregated: Vec<(GeneLofRow, Vec<GenotypeCounts>)> = groups
        .into_par_iter()
        .map(|(key, rows)| -> Result<(GeneLofRow, Vec<GenotypeCounts>)> {
            let sites = site_stats(matrix, &rows, config.freq_index)?;
            Ok((GeneLofRow { key, sites }, genotype_counts(matrix, &rows)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(aggregated.len());
    let mut entries = Vec::with_capacity(aggregated.len() * matrix.n_samples());
    for (row, counts) in aggregated {
        rows.push(row);
        entries.extend(counts);
    }

    Ok(GeneLofMatrix::new(
        matrix.sample_ids().to_vec(),
        rows,
        entries,
        expression.is_some(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Frequency, Locus};

    fn tc(gene: &str, tx: &str, terms: &[&str], lof: Option<&str>) -> TranscriptConsequence {
        TranscriptConsequence {
            gene_id: gene.to_string(),
            gene_symbol: Some(format!("SYM_{}", gene)),
            transcript_id: tx.to_string(),
            biotype: Some("protein_coding".to_string()),
            consequence_terms: terms.iter().map(|t| t.to_string()).collect(),
            canonical: Some(1),
            lof: lof.map(String::from),
            ..Default::default()
        }
    }

    fn variant(pos: u64, freq: Vec<Frequency>, csqs: Vec<TranscriptConsequence>) -> VariantRecord {
        let mut rec = VariantRecord::new(Locus::new("chr1", pos), "C", "T");
        rec.freq = freq;
        rec.vep.transcript_consequences = csqs;
        rec
    }

    fn create_test_matrix() -> VariantMatrix {
        use Genotype::*;
        let rows = vec![
            variant(
                100,
                vec![Frequency::new(3, 200), Frequency::new(0, 100)],
                vec![tc("G1", "T1", &["stop_gained"], Some("HC"))],
            ),
            variant(
                200,
                vec![Frequency::new(2, 200), Frequency::new(1, 100)],
                vec![tc("G1", "T1", &["stop_gained"], Some("HC"))],
            ),
            variant(
                300,
                vec![Frequency::new(150, 200), Frequency::new(80, 100)],
                vec![tc("G1", "T1", &["missense_variant"], None)],
            ),
            variant(
                400,
                vec![Frequency::new(1, 200), Frequency::new(1, 100)],
                vec![tc("G2", "T2", &["intron_variant"], None)],
            ),
        ];
        let calls = vec![
            vec![Het, HomVar, HomRef],
            vec![Het, Missing, HomRef],
            vec![HomVar, HomVar, Het],
            vec![Het, HomRef, HomRef],
        ];
        let samples = vec!["S1".to_string(), "S2".to_string(), "S3".to_string()];
        VariantMatrix::from_dense(rows, samples, &calls).unwrap()
    }

    #[test]
    fn test_default_matrix() {
        let matrix = create_test_matrix();
        let result = generate_gene_lof_matrix(&matrix, None, None, &GeneLofConfig::default()).unwrap();

        assert_eq!(result.n_groups(), 2);
        assert_eq!(result.n_samples(), 3);

        let lof = result.find("G1", "stop_gained");
        assert_eq!(lof.len(), 1);
        let sites = &lof[0].sites;
        assert_eq!(sites.n_sites, 2);
        assert_eq!(sites.n_sites_array, vec![2, 1]);
        assert!((sites.classic_caf - 0.025).abs() < 1e-12);
        assert_eq!(sites.max_af, Some(0.015));
        assert!((sites.classic_caf_array[1] - 0.01).abs() < 1e-12);
        assert_eq!(
            lof[0].key.detail,
            GroupDetail::Transcript {
                transcript_id: "T1".to_string(),
                canonical: true
            }
        );

        let row = result
            .rows()
            .iter()
            .position(|r| r.key.most_severe_consequence.as_deref() == Some("stop_gained"))
            .unwrap();
        let s1 = result.entry(row, 0);
        assert_eq!((s1.num_hets, s1.num_homs, s1.defined_sites), (2, 0, 2));
        let s2 = result.entry(row, 1);
        assert_eq!((s2.num_hets, s2.num_homs, s2.defined_sites), (0, 1, 1));
        let s3 = result.entry(row, 2);
        assert_eq!((s3.num_hets, s3.num_homs, s3.defined_sites), (0, 0, 2));

        // Intronic variants are neither LoF nor additional.
        assert!(result.rows().iter().all(|r| r.key.gene_id == "G1"));
    }

    #[test]
    fn test_remove_ultra_common_and_rare() {
        let matrix = create_test_matrix();
        let config = GeneLofConfig {
            filter_to_rare: true,
            ..Default::default()
        };
        let result = generate_gene_lof_matrix(&matrix, None, None, &config).unwrap();
        assert!(result.find("G1", "missense_variant").is_empty());
        assert_eq!(result.find("G1", "stop_gained")[0].sites.n_sites, 2);
    }

    #[test]
    fn test_pre_loftee_matches_post_loftee() {
        let matrix = create_test_matrix();
        let post = generate_gene_lof_matrix(&matrix, None, None, &GeneLofConfig::default()).unwrap();
        let pre_config = GeneLofConfig {
            pre_loftee: true,
            ..Default::default()
        };
        let pre = generate_gene_lof_matrix(&matrix, None, None, &pre_config).unwrap();
        assert_eq!(pre, post);
    }

    #[test]
    fn test_filter_an_requires_sex_counts() {
        let matrix = create_test_matrix();
        let config = GeneLofConfig {
            filter_an: true,
            ..Default::default()
        };
        assert!(generate_gene_lof_matrix(&matrix, None, None, &config).is_err());

        let config = GeneLofConfig {
            filter_an: true,
            samples_by_sex: Some([("XX".to_string(), 60), ("XY".to_string(), 40)].into()),
            ..Default::default()
        };
        // Expected AN is 200 on autosomes; every variant has AN 200.
        let result = generate_gene_lof_matrix(&matrix, None, None, &config).unwrap();
        assert_eq!(result.n_groups(), 2);
    }

    #[test]
    fn test_filter_an_from_metadata() {
        let matrix = create_test_matrix();
        let field = AnAdjConfig::default().sex_field;
        let mut meta = SampleMetadata::new();
        for (id, sex) in [("S1", "XX"), ("S2", "XY"), ("S3", "XX")] {
            meta.push_sample(id, vec![(field.clone(), sex.to_string())]);
        }
        let config = GeneLofConfig {
            filter_an: true,
            ..Default::default()
        };
        // Three samples: expected AN 6, every variant passes.
        let result = generate_gene_lof_matrix(&matrix, Some(&meta), None, &config).unwrap();
        assert_eq!(result.n_groups(), 2);
    }

    #[test]
    fn test_mixed_freq_lengths_error() {
        let rows = vec![
            variant(100, vec![Frequency::new(1, 10)], vec![tc("G1", "T1", &["stop_gained"], Some("HC"))]),
            variant(
                200,
                vec![Frequency::new(1, 10), Frequency::new(1, 5)],
                vec![tc("G1", "T1", &["stop_gained"], Some("HC"))],
            ),
        ];
        let calls = vec![vec![Genotype::Het], vec![Genotype::Het]];
        let matrix = VariantMatrix::from_dense(rows, vec!["S1".to_string()], &calls).unwrap();
        let result = generate_gene_lof_matrix(&matrix, None, None, &GeneLofConfig::default());
        assert!(matches!(result, Err(SummaryError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_all_transcripts_keeps_each_transcript() {
        let mut second = tc("G1", "T9", &["stop_gained"], Some("HC"));
        second.canonical = None;
        let rows = vec![variant(
            100,
            vec![Frequency::new(1, 10)],
            vec![tc("G1", "T1", &["stop_gained"], Some("HC")), second],
        )];
        let calls = vec![vec![Genotype::Het]];
        let matrix = VariantMatrix::from_dense(rows, vec!["S1".to_string()], &calls).unwrap();

        let worst = generate_gene_lof_matrix(&matrix, None, None, &GeneLofConfig::default()).unwrap();
        assert_eq!(worst.n_groups(), 1);

        let config = GeneLofConfig {
            all_transcripts: true,
            ..Default::default()
        };
        let all = generate_gene_lof_matrix(&matrix, None, None, &config).unwrap();
        assert_eq!(all.n_groups(), 2);
        assert!(all.rows().iter().any(|r| r.key.detail
            == GroupDetail::Transcript {
                transcript_id: "T9".to_string(),
                canonical: false
            }));
    }

    #[test]
    fn test_config_yaml() {
        let yaml = "filter_to_rare: true\nadditional_csq_set: []\n";
        let config: GeneLofConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.filter_to_rare);
        assert!(config.additional_csq_set.is_empty());
        assert_eq!(config.lof_csq_set.len(), 4);
    }
}
