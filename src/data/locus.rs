//! Genomic loci and chromosome-class predicates.

use crate::error::{Result, SummaryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reference genome build, which fixes the pseudo-autosomal coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferenceGenome {
    GRCh37,
    #[default]
    GRCh38,
}

impl ReferenceGenome {
    /// Pseudo-autosomal regions on X as 1-based inclusive intervals.
    fn x_par(&self) -> [(u64, u64); 2] {
        match self {
            Self::GRCh37 => [(60_001, 2_699_520), (154_931_044, 155_260_560)],
            Self::GRCh38 => [(10_001, 2_781_479), (155_701_383, 156_030_895)],
        }
    }

    /// Pseudo-autosomal regions on Y as 1-based inclusive intervals.
    fn y_par(&self) -> [(u64, u64); 2] {
        match self {
            Self::GRCh37 => [(10_001, 2_649_520), (59_034_050, 59_373_566)],
            Self::GRCh38 => [(10_001, 2_781_479), (56_887_903, 57_217_415)],
        }
    }
}

/// Chromosomal context of a locus, as far as ploidy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocusClass {
    /// Autosome, or a pseudo-autosomal region of X or Y.
    AutosomeOrPar,
    XNonPar,
    YNonPar,
    /// Mitochondria, unplaced contigs, decoys.
    Other,
}

/// A position on a reference contig (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locus {
    pub contig: String,
    pub position: u64,
}

impl Locus {
    pub fn new(contig: &str, position: u64) -> Self {
        Self {
            contig: contig.to_string(),
            position,
        }
    }

    /// Contig name with any `chr` prefix removed.
    pub fn bare_contig(&self) -> &str {
        self.contig.strip_prefix("chr").unwrap_or(&self.contig)
    }

    pub fn in_autosome(&self) -> bool {
        matches!(self.bare_contig().parse::<u8>(), Ok(1..=22))
    }

    fn in_intervals(&self, intervals: &[(u64, u64)]) -> bool {
        intervals
            .iter()
            .any(|&(start, end)| self.position >= start && self.position <= end)
    }

    pub fn in_x_par(&self, genome: ReferenceGenome) -> bool {
        self.bare_contig() == "X" && self.in_intervals(&genome.x_par())
    }

    pub fn in_y_par(&self, genome: ReferenceGenome) -> bool {
        self.bare_contig() == "Y" && self.in_intervals(&genome.y_par())
    }

    pub fn in_autosome_or_par(&self, genome: ReferenceGenome) -> bool {
        self.in_autosome() || self.in_x_par(genome) || self.in_y_par(genome)
    }

    pub fn in_x_nonpar(&self, genome: ReferenceGenome) -> bool {
        self.bare_contig() == "X" && !self.in_x_par(genome)
    }

    pub fn in_y_nonpar(&self, genome: ReferenceGenome) -> bool {
        self.bare_contig() == "Y" && !self.in_y_par(genome)
    }

    /// Classify the locus for ploidy-aware allele number expectations.
    pub fn class(&self, genome: ReferenceGenome) -> LocusClass {
        if self.in_autosome_or_par(genome) {
            LocusClass::AutosomeOrPar
        } else if self.in_x_nonpar(genome) {
            LocusClass::XNonPar
        } else if self.in_y_nonpar(genome) {
            LocusClass::YNonPar
        } else {
            LocusClass::Other
        }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contig, self.position)
    }
}

impl FromStr for Locus {
    type Err = SummaryError;

    /// Parse `contig:position`.
    fn from_str(s: &str) -> Result<Self> {
        let (contig, pos) = s.rsplit_once(':').ok_or_else(|| {
            SummaryError::InvalidParameter(format!("Locus '{}' is not contig:position", s))
        })?;
        let position = pos.parse::<u64>().map_err(|_| {
            SummaryError::InvalidParameter(format!("Invalid position in locus '{}'", s))
        })?;
        Ok(Self::new(contig, position))
    }
}
