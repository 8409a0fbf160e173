//! Frequency binning of variants.

mod bin;

pub use bin::{freq_bin, FreqBin};
