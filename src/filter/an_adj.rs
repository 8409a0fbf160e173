//! Allele-number based call-rate criterion.
//!
//! The observed allele number of a variant is compared with the maximum
//! attainable AN for its chromosomal context, given how many XX and XY
//! samples were called.

use crate::data::{Frequency, Locus, LocusClass, ReferenceGenome, SampleMetadata};
use crate::error::{Result, SummaryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of samples per sex karyotype label; `None` collects missing labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplesBySex(pub BTreeMap<Option<String>, u64>);

impl SamplesBySex {
    /// Count samples per karyotype from a metadata column.
    pub fn from_metadata(metadata: &SampleMetadata, sex_field: &str) -> Result<Self> {
        Ok(Self(metadata.counter(sex_field)?))
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Number of samples with `label`; absent labels count as zero.
    pub fn count(&self, label: &str) -> u64 {
        self.0.get(&Some(label.to_string())).copied().unwrap_or(0)
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for SamplesBySex {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (Some(k.into()), v)).collect())
    }
}

/// Settings of the AN criterion that name metadata fields and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnAdjConfig {
    /// Metadata column holding the sex karyotype.
    pub sex_field: String,
    pub xy_label: String,
    pub xx_label: String,
    /// Fraction of the expected AN a variant must reach.
    pub an_proportion_cutoff: f64,
    pub reference_genome: ReferenceGenome,
}

impl Default for AnAdjConfig {
    fn default() -> Self {
        Self {
            sex_field: "sex_imputation.sex_karyotype".to_string(),
            xy_label: "XY".to_string(),
            xx_label: "XX".to_string(),
            an_proportion_cutoff: 0.8,
            reference_genome: ReferenceGenome::GRCh38,
        }
    }
}

/// Resolved AN criterion, ready to evaluate per variant.
#[derive(Debug, Clone, PartialEq)]
pub struct AnAdjCriterion {
    n_total: u64,
    n_xy: u64,
    n_xx: u64,
    freq_index: usize,
    cutoff: f64,
    genome: ReferenceGenome,
}

impl AnAdjCriterion {
    /// Build the criterion from per-karyotype sample counts.
    pub fn new(samples_by_sex: &SamplesBySex, config: &AnAdjConfig, freq_index: usize) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.an_proportion_cutoff) {
            return Err(SummaryError::InvalidParameter(
                "AN proportion cutoff must be between 0 and 1".to_string(),
            ));
        }
        for label in [&config.xy_label, &config.xx_label] {
            if samples_by_sex.count(label) == 0 {
                tracing::warn!("No samples with sex karyotype '{}'", label);
            }
        }
        Ok(Self {
            n_total: samples_by_sex.total(),
            n_xy: samples_by_sex.count(&config.xy_label),
            n_xx: samples_by_sex.count(&config.xx_label),
            freq_index,
            cutoff: config.an_proportion_cutoff,
            genome: config.reference_genome,
        })
    }

    /// Build the criterion by counting karyotypes in sample metadata.
    pub fn from_metadata(metadata: &SampleMetadata, config: &AnAdjConfig, freq_index: usize) -> Result<Self> {
        let samples_by_sex = SamplesBySex::from_metadata(metadata, &config.sex_field)?;
        tracing::info!(
            "Samples by sex karyotype: {} total, {} {}, {} {}",
            samples_by_sex.total(),
            samples_by_sex.count(&config.xx_label),
            config.xx_label,
            samples_by_sex.count(&config.xy_label),
            config.xy_label
        );
        Self::new(&samples_by_sex, config, freq_index)
    }

    /// Maximum attainable AN for a locus class; `None` outside
    /// autosomes, PARs and the non-PAR sex chromosomes.
    pub fn expected_max_an(&self, class: LocusClass) -> Option<u64> {
        match class {
            LocusClass::AutosomeOrPar => Some(2 * self.n_total),
            LocusClass::XNonPar => Some(self.n_xy + 2 * self.n_xx),
            LocusClass::YNonPar => Some(self.n_xy),
            LocusClass::Other => None,
        }
    }

    /// Whether the observed AN reaches the cutoff fraction of the expected
    /// maximum. Missing when the locus class has no expectation or AN is missing.
    pub fn evaluate(&self, locus: &Locus, freq: &[Frequency]) -> Option<bool> {
        let expected = self.expected_max_an(locus.class(self.genome))?;
        let an = freq.get(self.freq_index)?.an?;
        Some(an as f64 >= self.cutoff * expected as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> SamplesBySex {
        // 60 XX, 40 XY
        [("XX", 60), ("XY", 40)].into_iter().collect()
    }

    fn criterion(cutoff: f64) -> AnAdjCriterion {
        let config = AnAdjConfig {
            an_proportion_cutoff: cutoff,
            ..Default::default()
        };
        AnAdjCriterion::new(&samples(), &config, 0).unwrap()
    }

    fn freq(an: u64) -> Vec<Frequency> {
        vec![Frequency::new(1, an)]
    }

    #[test]
    fn test_expected_max_an() {
        let c = criterion(0.8);
        assert_eq!(c.expected_max_an(LocusClass::AutosomeOrPar), Some(200));
        assert_eq!(c.expected_max_an(LocusClass::XNonPar), Some(160));
        assert_eq!(c.expected_max_an(LocusClass::YNonPar), Some(40));
        assert_eq!(c.expected_max_an(LocusClass::Other), None);
    }

    #[test]
    fn test_autosome_threshold() {
        let c = criterion(0.8);
        let locus = Locus::new("chr1", 1000);
        assert_eq!(c.evaluate(&locus, &freq(160)), Some(true));
        assert_eq!(c.evaluate(&locus, &freq(159)), Some(false));
    }

    #[test]
    fn test_sex_chromosomes() {
        let c = criterion(0.8);
        // X non-PAR expects 160, threshold 128.
        assert_eq!(c.evaluate(&Locus::new("chrX", 50_000_000), &freq(128)), Some(true));
        assert_eq!(c.evaluate(&Locus::new("chrX", 50_000_000), &freq(127)), Some(false));
        // X PAR uses the autosomal expectation.
        assert_eq!(c.evaluate(&Locus::new("chrX", 100_000), &freq(128)), Some(false));
        // Y non-PAR expects 40, threshold 32.
        assert_eq!(c.evaluate(&Locus::new("chrY", 10_000_000), &freq(32)), Some(true));
    }

    #[test]
    fn test_missing_cases() {
        let c = criterion(0.8);
        assert_eq!(c.evaluate(&Locus::new("chrM", 100), &freq(1000)), None);
        assert_eq!(c.evaluate(&Locus::new("chr1", 100), &[]), None);
        let no_an = vec![Frequency { ac: Some(1), an: None, af: None }];
        assert_eq!(c.evaluate(&Locus::new("chr1", 100), &no_an), None);
    }

    #[test]
    fn test_monotone_in_cutoff() {
        let locus = Locus::new("chr2", 5000);
        let an = freq(120);
        let mut previous = false;
        for step in (0..=10).rev() {
            let passes = criterion(step as f64 / 10.0).evaluate(&locus, &an).unwrap();
            // Lowering the cutoff never turns a pass into a fail.
            assert!(passes || !previous);
            previous = passes;
        }
        assert!(previous);
    }

    #[test]
    fn test_invalid_cutoff() {
        let config = AnAdjConfig {
            an_proportion_cutoff: 1.5,
            ..Default::default()
        };
        assert!(AnAdjCriterion::new(&samples(), &config, 0).is_err());
    }

    #[test]
    fn test_from_metadata_counts_missing_karyotypes() {
        let mut meta = SampleMetadata::new();
        let field = "sex_imputation.sex_karyotype".to_string();
        meta.push_sample("S1", vec![(field.clone(), "XX".to_string())]);
        meta.push_sample("S2", vec![(field.clone(), "XY".to_string())]);
        meta.push_sample("S3", vec![(field, "".to_string())]);

        let c = AnAdjCriterion::from_metadata(&meta, &AnAdjConfig::default(), 0).unwrap();
        assert_eq!(c.expected_max_an(LocusClass::AutosomeOrPar), Some(6));
        assert_eq!(c.expected_max_an(LocusClass::XNonPar), Some(3));
    }
}
