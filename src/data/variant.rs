//! Variant records and tables.

use crate::data::alleles::{allele_type, AlleleType};
use crate::data::locus::Locus;
use crate::error::{Result, SummaryError};
use crate::frequency::FreqBin;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Allele count, allele number and allele frequency for one subset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frequency {
    #[serde(rename = "AC", default)]
    pub ac: Option<u64>,
    #[serde(rename = "AN", default)]
    pub an: Option<u64>,
    #[serde(rename = "AF", default)]
    pub af: Option<f64>,
}

impl Frequency {
    pub fn new(ac: u64, an: u64) -> Self {
        let af = if an > 0 { Some(ac as f64 / an as f64) } else { None };
        Self {
            ac: Some(ac),
            an: Some(an),
            af,
        }
    }

    pub fn with_af(ac: u64, an: u64, af: f64) -> Self {
        Self {
            ac: Some(ac),
            an: Some(an),
            af: Some(af),
        }
    }
}

/// VEP annotation of one variant on one transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptConsequence {
    pub gene_id: String,
    #[serde(default)]
    pub gene_symbol: Option<String>,
    pub transcript_id: String,
    #[serde(default)]
    pub biotype: Option<String>,
    #[serde(default)]
    pub consequence_terms: Vec<String>,
    /// VEP sets this to 1 on canonical transcripts and leaves it absent otherwise.
    #[serde(default)]
    pub canonical: Option<u8>,
    /// LOFTEE call: HC, LC or OS.
    #[serde(default)]
    pub lof: Option<String>,
    #[serde(default)]
    pub lof_flags: Option<String>,
    #[serde(default)]
    pub polyphen_prediction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_severe_consequence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csq_score: Option<f64>,
}

impl TranscriptConsequence {
    pub fn is_canonical(&self) -> bool {
        self.canonical == Some(1)
    }

    pub fn is_protein_coding(&self) -> bool {
        self.biotype.as_deref() == Some("protein_coding")
    }

    /// LOFTEE flags are absent or empty.
    pub fn has_no_lof_flags(&self) -> bool {
        self.lof_flags.as_deref().map_or(true, str::is_empty)
    }
}

/// VEP output attached to a variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VepAnnotation {
    #[serde(default)]
    pub transcript_consequences: Vec<TranscriptConsequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_csq_by_gene: Option<Vec<TranscriptConsequence>>,
    #[serde(default)]
    pub most_severe_consequence: Option<String>,
}

/// A bi-allelic variant and its site-level annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub locus: Locus,
    pub alleles: Vec<String>,
    /// Failed filters; empty means PASS.
    #[serde(default)]
    pub filters: BTreeSet<String>,
    #[serde(default)]
    pub freq: Vec<Frequency>,
    #[serde(default)]
    pub lof: Option<String>,
    #[serde(default)]
    pub no_lof_flags: Option<bool>,
    #[serde(default)]
    pub vep: VepAnnotation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_severe_csq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_coding: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq_bin: Option<FreqBin>,
}

impl VariantRecord {
    pub fn new(locus: Locus, reference: &str, alternate: &str) -> Self {
        Self {
            locus,
            alleles: vec![reference.to_string(), alternate.to_string()],
            filters: BTreeSet::new(),
            freq: Vec::new(),
            lof: None,
            no_lof_flags: None,
            vep: VepAnnotation::default(),
            most_severe_csq: None,
            protein_coding: None,
            freq_bin: None,
        }
    }

    /// Identifier of the form `contig:position:ref:alt`.
    pub fn variant_id(&self) -> String {
        format!("{}:{}", self.locus, self.alleles.join(":"))
    }

    pub fn is_pass(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn allele_type(&self) -> Option<AlleleType> {
        allele_type(&self.alleles)
    }

    pub fn is_indel(&self) -> bool {
        self.allele_type().is_some_and(|t| t.is_indel())
    }

    /// Frequency struct at `index`, if the array is long enough.
    pub fn freq_at(&self, index: usize) -> Option<&Frequency> {
        self.freq.get(index)
    }
}

/// An ordered collection of variant records.
#[derive(Debug, Clone, Default)]
pub struct VariantTable {
    records: Vec<VariantRecord>,
}

impl VariantTable {
    pub fn new(records: Vec<VariantRecord>) -> Self {
        Self { records }
    }

    /// Load records from a JSON-lines file, one record per line.
    pub fn from_jsonl<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: VariantRecord =
                serde_json::from_str(&line).map_err(|e| SummaryError::Parse {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            records.push(record);
        }
        Ok(Self { records })
    }

    /// Write records as JSON lines.
    pub fn to_jsonl<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for record in &self.records {
            serde_json::to_writer(&mut writer, record)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[VariantRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariantRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<VariantRecord> {
        self.records
    }

    /// Keep records matching a predicate.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&VariantRecord) -> bool,
    {
        Self {
            records: self.records.into_iter().filter(|r| predicate(r)).collect(),
        }
    }
}

impl FromIterator<VariantRecord> for VariantTable {
    fn from_iter<I: IntoIterator<Item = VariantRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
