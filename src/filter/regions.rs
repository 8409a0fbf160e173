//! Low-confidence genomic region filtering.

use crate::data::{Locus, VariantRecord};
use crate::error::{Result, SummaryError};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Decides whether a locus lies in a low-confidence region.
pub trait RegionFilter: Sync {
    /// `filter_decoy` additionally treats decoy-overlapping regions as low confidence.
    fn is_low_confidence(&self, locus: &Locus, filter_decoy: bool) -> bool;
}

/// Sorted, merged 1-based inclusive intervals per contig.
#[derive(Debug, Clone, Default)]
struct IntervalSet {
    by_contig: HashMap<String, Vec<(u64, u64)>>,
}

impl IntervalSet {
    fn insert(&mut self, contig: &str, start: u64, end: u64) {
        let bare = contig.strip_prefix("chr").unwrap_or(contig);
        self.by_contig
            .entry(bare.to_string())
            .or_default()
            .push((start, end));
    }

    fn finish(&mut self) {
        for intervals in self.by_contig.values_mut() {
            intervals.sort_unstable();
            let mut merged: Vec<(u64, u64)> = Vec::with_capacity(intervals.len());
            for &(start, end) in intervals.iter() {
                match merged.last_mut() {
                    Some(last) if start <= last.1.saturating_add(1) => last.1 = last.1.max(end),
                    _ => merged.push((start, end)),
                }
            }
            *intervals = merged;
        }
    }

    fn contains(&self, locus: &Locus) -> bool {
        let Some(intervals) = self.by_contig.get(locus.bare_contig()) else {
            return false;
        };
        let pos = locus.position;
        let idx = intervals.partition_point(|&(start, _)| start <= pos);
        idx > 0 && intervals[idx - 1].1 >= pos
    }

    fn load_bed<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let reader = BufReader::new(File::open(path)?);
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 {
                return Err(SummaryError::Parse {
                    line: idx + 1,
                    reason: "BED line needs contig, start and end".to_string(),
                });
            }
            let parse = |s: &str| {
                s.trim().parse::<u64>().map_err(|_| SummaryError::Parse {
                    line: idx + 1,
                    reason: format!("Invalid coordinate '{}'", s),
                })
            };
            let (start, end) = (parse(fields[1])?, parse(fields[2])?);
            if end > start {
                // BED is 0-based half-open.
                self.insert(fields[0], start + 1, end);
            }
        }
        Ok(())
    }
}

/// Low-confidence regions (LCR, segmental duplications) and decoy regions
/// held as interval lists.
#[derive(Debug, Clone, Default)]
pub struct IntervalRegions {
    low_confidence: IntervalSet,
    decoy: IntervalSet,
}

impl IntervalRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load low-confidence BED files and an optional decoy BED file.
    pub fn from_bed<P: AsRef<Path>>(low_confidence: &[P], decoy: Option<P>) -> Result<Self> {
        let mut regions = Self::new();
        for path in low_confidence {
            regions.low_confidence.load_bed(path)?;
        }
        if let Some(path) = decoy {
            regions.decoy.load_bed(path)?;
        }
        regions.low_confidence.finish();
        regions.decoy.finish();
        Ok(regions)
    }

    /// Add a 1-based inclusive low-confidence interval.
    pub fn add_low_confidence(mut self, contig: &str, start: u64, end: u64) -> Self {
        self.low_confidence.insert(contig, start, end);
        self.low_confidence.finish();
        self
    }

    /// Add a 1-based inclusive decoy interval.
    pub fn add_decoy(mut self, contig: &str, start: u64, end: u64) -> Self {
        self.decoy.insert(contig, start, end);
        self.decoy.finish();
        self
    }
}

impl RegionFilter for IntervalRegions {
    fn is_low_confidence(&self, locus: &Locus, filter_decoy: bool) -> bool {
        self.low_confidence.contains(locus) || (filter_decoy && self.decoy.contains(locus))
    }
}

/// Drop records in low-confidence regions.
pub fn filter_low_conf_regions(
    records: Vec<VariantRecord>,
    regions: &dyn RegionFilter,
    filter_decoy: bool,
) -> Vec<VariantRecord> {
    records
        .into_iter()
        .filter(|r| !regions.is_low_confidence(&r.locus, filter_decoy))
        .collect()
}
