//! Variant × sample genotype matrix with sparse storage.

use crate::data::variant::{VariantRecord, VariantTable};
use crate::error::{Result, SummaryError};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Diploid (or haploid) genotype call reduced to what aggregation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genotype {
    HomRef,
    Het,
    HomVar,
    Missing,
}

impl Genotype {
    /// Storage code; `HomRef` is the implicit zero of the sparse matrix.
    fn code(self) -> u8 {
        match self {
            Self::HomRef => 0,
            Self::Het => 1,
            Self::HomVar => 2,
            Self::Missing => 3,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            0 => Self::HomRef,
            1 => Self::Het,
            2 => Self::HomVar,
            _ => Self::Missing,
        }
    }

    /// Parse a VCF-style call such as `0/1`, `1|1`, `1` or `./.`.
    pub fn parse(call: &str) -> Option<Self> {
        let call = call.trim();
        if call.is_empty() || call.split(['/', '|']).any(|a| a == ".") {
            return Some(Self::Missing);
        }
        let mut n_ref = 0usize;
        let mut n_alt = 0usize;
        for allele in call.split(['/', '|']) {
            match allele.parse::<u32>().ok()? {
                0 => n_ref += 1,
                _ => n_alt += 1,
            }
        }
        Some(match (n_ref, n_alt) {
            (_, 0) => Self::HomRef,
            (0, _) => Self::HomVar,
            _ => Self::Het,
        })
    }

    pub fn is_defined(self) -> bool {
        self != Self::Missing
    }
}

/// Genotype calls for every variant row and sample column.
///
/// Rows carry the full variant annotations; columns are sample IDs.
/// Uses CSR format so that row-wise scans visit only non-reference calls.
#[derive(Debug, Clone)]
pub struct VariantMatrix {
    rows: Vec<VariantRecord>,
    sample_ids: Vec<String>,
    /// Sparse genotype codes (variants × samples).
    genotypes: CsMat<u8>,
}

impl VariantMatrix {
    pub fn new(
        rows: Vec<VariantRecord>,
        sample_ids: Vec<String>,
        genotypes: CsMat<u8>,
    ) -> Result<Self> {
        let (nrows, ncols) = genotypes.shape();
        if nrows != rows.len() {
            return Err(SummaryError::DimensionMismatch {
                expected: nrows,
                actual: rows.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(SummaryError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            rows,
            sample_ids,
            genotypes,
        })
    }

    /// Build from dense per-row genotype vectors.
    pub fn from_dense(
        rows: Vec<VariantRecord>,
        sample_ids: Vec<String>,
        calls: &[Vec<Genotype>],
    ) -> Result<Self> {
        if calls.len() != rows.len() {
            return Err(SummaryError::DimensionMismatch {
                expected: rows.len(),
                actual: calls.len(),
            });
        }
        let n_samples = sample_ids.len();
        let mut tri_mat = TriMat::new((rows.len(), n_samples));
        for (row, row_calls) in calls.iter().enumerate() {
            if row_calls.len() != n_samples {
                return Err(SummaryError::DimensionMismatch {
                    expected: n_samples,
                    actual: row_calls.len(),
                });
            }
            for (col, gt) in row_calls.iter().enumerate() {
                if *gt != Genotype::HomRef {
                    tri_mat.add_triplet(row, col, gt.code());
                }
            }
        }
        Self::new(rows, sample_ids, tri_mat.to_csr())
    }

    /// Load genotypes from a TSV file and attach them to the variants of `table`.
    ///
    /// Expected format:
    /// - First row: `variant_id` followed by sample IDs
    /// - Subsequent rows: `contig:position:ref:alt` followed by calls
    ///
    /// Every variant of `table` must have a genotype row.
    pub fn from_tsv<P: AsRef<Path>>(table: VariantTable, path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| SummaryError::EmptyData("Empty genotype TSV".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(SummaryError::EmptyData(
                "Genotype TSV must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();
        let n_samples = sample_ids.len();

        let row_index: HashMap<String, usize> = table
            .iter()
            .enumerate()
            .map(|(idx, rec)| (rec.variant_id(), idx))
            .collect();

        let mut seen = vec![false; table.len()];
        let mut tri_mat = TriMat::new((table.len(), n_samples));
        for (line_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let Some(&row) = row_index.get(fields[0]) else {
                tracing::debug!("Skipping genotypes for unknown variant {}", fields[0]);
                continue;
            };
            if fields.len() - 1 != n_samples {
                return Err(SummaryError::DimensionMismatch {
                    expected: n_samples,
                    actual: fields.len() - 1,
                });
            }
            if seen[row] {
                return Err(SummaryError::Parse {
                    line: line_idx + 2,
                    reason: format!("Duplicate genotypes for variant {}", fields[0]),
                });
            }
            seen[row] = true;
            for (col, call) in fields[1..].iter().enumerate() {
                let gt = Genotype::parse(call).ok_or_else(|| SummaryError::Parse {
                    line: line_idx + 2,
                    reason: format!("Invalid genotype '{}'", call),
                })?;
                if gt != Genotype::HomRef {
                    tri_mat.add_triplet(row, col, gt.code());
                }
            }
        }

        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(SummaryError::EmptyData(format!(
                "No genotypes for variant {}",
                table.records()[missing].variant_id()
            )));
        }

        Self::new(table.into_records(), sample_ids, tri_mat.to_csr())
    }

    /// Genotype at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Genotype {
        Genotype::from_code(self.genotypes.get(row, col).copied().unwrap_or(0))
    }

    #[inline]
    pub fn n_variants(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    #[inline]
    pub fn rows(&self) -> &[VariantRecord] {
        &self.rows
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Non-reference calls of one row as `(sample index, genotype)`.
    pub fn non_ref_calls(&self, row: usize) -> Vec<(usize, Genotype)> {
        self.genotypes
            .outer_view(row)
            .map(|v| {
                v.iter()
                    .map(|(col, &code)| (col, Genotype::from_code(code)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Subset the matrix to the specified rows (by index).
    pub fn subset_rows(&self, indices: &[usize]) -> Result<Self> {
        let mut tri_mat = TriMat::new((indices.len(), self.n_samples()));
        let mut new_rows = Vec::with_capacity(indices.len());

        for (new_row, &old_row) in indices.iter().enumerate() {
            if old_row >= self.n_variants() {
                return Err(SummaryError::InvalidParameter(format!(
                    "Variant index {} out of bounds",
                    old_row
                )));
            }
            new_rows.push(self.rows[old_row].clone());
            for (col, gt) in self.non_ref_calls(old_row) {
                tri_mat.add_triplet(new_row, col, gt.code());
            }
        }

        Self::new(new_rows, self.sample_ids.clone(), tri_mat.to_csr())
    }
}
