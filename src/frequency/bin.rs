//! Allele count / allele frequency bins.

use crate::data::Frequency;
use crate::error::{Result, SummaryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mutually exclusive frequency bin of a variant.
///
/// Variants are ordered from absent to near-fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FreqBin {
    #[serde(rename = "Not found")]
    NotFound,
    #[serde(rename = "Singleton")]
    Singleton,
    #[serde(rename = "Doubleton")]
    Doubleton,
    #[serde(rename = "AC 3 - 5")]
    Ac3To5,
    #[serde(rename = "AC 6 - 0.01%")]
    Ac6To0_01Pct,
    #[serde(rename = "0.01% - 0.1%")]
    Pct0_01To0_1,
    #[serde(rename = "0.1% - 1%")]
    Pct0_1To1,
    #[serde(rename = "1% - 10%")]
    Pct1To10,
    #[serde(rename = "10% - 95%")]
    Pct10To95,
    #[serde(rename = ">95%")]
    Over95Pct,
}

impl FreqBin {
    /// Every bin, in ascending frequency order.
    pub const ALL: [FreqBin; 10] = [
        Self::NotFound,
        Self::Singleton,
        Self::Doubleton,
        Self::Ac3To5,
        Self::Ac6To0_01Pct,
        Self::Pct0_01To0_1,
        Self::Pct0_1To1,
        Self::Pct1To10,
        Self::Pct10To95,
        Self::Over95Pct,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotFound => "Not found",
            Self::Singleton => "Singleton",
            Self::Doubleton => "Doubleton",
            Self::Ac3To5 => "AC 3 - 5",
            Self::Ac6To0_01Pct => "AC 6 - 0.01%",
            Self::Pct0_01To0_1 => "0.01% - 0.1%",
            Self::Pct0_1To1 => "0.1% - 1%",
            Self::Pct1To10 => "1% - 10%",
            Self::Pct10To95 => "10% - 95%",
            Self::Over95Pct => ">95%",
        }
    }

    /// Classify an (AC, AF) pair.
    ///
    /// Conditions are tested in order and the first true one wins; AC checks
    /// always take priority over AF checks. A missing AC or AF makes the
    /// conditions reading it false, so evaluation falls through to the
    /// `10% - 95%` default.
    pub fn classify(ac: Option<u64>, af: Option<f64>) -> Self {
        let ac_is = |pred: fn(u64) -> bool| ac.is_some_and(pred);
        let af_is = |pred: fn(f64) -> bool| af.is_some_and(pred);

        if ac_is(|ac| ac == 0) {
            Self::NotFound
        } else if ac_is(|ac| ac == 1) {
            Self::Singleton
        } else if ac_is(|ac| ac == 2) {
            Self::Doubleton
        } else if ac_is(|ac| ac <= 5) {
            Self::Ac3To5
        } else if af_is(|af| af < 1e-4) {
            Self::Ac6To0_01Pct
        } else if af_is(|af| af < 1e-3) {
            Self::Pct0_01To0_1
        } else if af_is(|af| af < 1e-2) {
            Self::Pct0_1To1
        } else if af_is(|af| af < 1e-1) {
            Self::Pct1To10
        } else if af_is(|af| af > 0.95) {
            Self::Over95Pct
        } else {
            Self::Pct10To95
        }
    }
}

impl fmt::Display for FreqBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FreqBin {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|bin| bin.label() == s)
            .copied()
            .ok_or_else(|| SummaryError::InvalidParameter(format!("Unknown frequency bin '{}'", s)))
    }
}

/// Frequency bin of the struct at `index` of a frequency array.
///
/// Returns `None` only when there is no struct at `index`.
pub fn freq_bin(freq: &[Frequency], index: usize) -> Option<FreqBin> {
    freq.get(index).map(|f| FreqBin::classify(f.ac, f.af))
}
