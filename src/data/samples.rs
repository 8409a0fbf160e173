//! Per-sample metadata.

use crate::error::{Result, SummaryError};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Sample metadata loaded from a TSV, values kept as strings.
///
/// Nested fields such as `sex_imputation.sex_karyotype` are flattened into
/// dotted column names.
#[derive(Debug, Clone, Default)]
pub struct SampleMetadata {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// sample_id -> column_name -> value; missing values are absent.
    data: HashMap<String, HashMap<String, String>>,
}

impl SampleMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Subsequent rows: sample ID followed by values
    ///
    /// Empty cells and `NA` are treated as missing.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| SummaryError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(SummaryError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }
        let column_names: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();

        let mut metadata = Self {
            sample_ids: Vec::new(),
            column_names,
            data: HashMap::new(),
        };
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let values: Vec<(String, String)> = metadata
                .column_names
                .iter()
                .zip(fields[1..].iter())
                .map(|(c, v)| (c.clone(), v.to_string()))
                .collect();
            metadata.push_sample(fields[0], values);
        }

        if metadata.sample_ids.is_empty() {
            return Err(SummaryError::EmptyData("No samples in metadata".to_string()));
        }
        Ok(metadata)
    }

    /// Add a sample with `(column, value)` pairs; new columns are registered.
    pub fn push_sample(&mut self, sample_id: &str, values: Vec<(String, String)>) {
        let mut sample_data = HashMap::new();
        for (column, value) in values {
            if !self.column_names.contains(&column) {
                self.column_names.push(column.clone());
            }
            let trimmed = value.trim();
            if !(trimmed.is_empty() || trimmed == "NA" || trimmed == "na") {
                sample_data.insert(column, trimmed.to_string());
            }
        }
        self.sample_ids.push(sample_id.to_string());
        self.data.insert(sample_id.to_string(), sample_data);
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Value for a sample and column; `None` when missing.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&str> {
        self.data
            .get(sample_id)
            .and_then(|m| m.get(column))
            .map(String::as_str)
    }

    /// Count samples per value of a column (missing values under `None`).
    pub fn counter(&self, column: &str) -> Result<BTreeMap<Option<String>, u64>> {
        if !self.column_names.iter().any(|c| c == column) {
            return Err(SummaryError::MissingColumn(column.to_string()));
        }
        let mut counts = BTreeMap::new();
        for sid in &self.sample_ids {
            let value = self.get(sid, column).map(String::from);
            *counts.entry(value).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Restrict and reorder metadata to the given sample IDs.
    pub fn align_to(&self, sample_ids: &[String]) -> Result<Self> {
        let mut new_data = HashMap::new();
        for sid in sample_ids {
            let sample_data = self.data.get(sid).ok_or_else(|| {
                SummaryError::SampleMismatch(format!("Sample '{}' not found in metadata", sid))
            })?;
            new_data.insert(sid.clone(), sample_data.clone());
        }
        Ok(Self {
            sample_ids: sample_ids.to_vec(),
            column_names: self.column_names.clone(),
            data: new_data,
        })
    }
}
