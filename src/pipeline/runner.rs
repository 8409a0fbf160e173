//! Pipeline runner for composing variant table steps and summary outputs.

use crate::data::{
    GeneLofMatrix, SampleMetadata, SummaryCountsTable, VariantMatrix, VariantRecord, VariantTable,
};
use crate::error::{Result, SummaryError};
use crate::filter::{filter_low_conf_regions, RegionFilter, RowFilter};
use crate::frequency::freq_bin;
use crate::gene_lof::{generate_gene_lof_matrix, GeneLofConfig, TranscriptExpression};
use crate::summary::{get_summary_counts, SummaryCountsConfig};
use crate::vep::{filter_vep_to_canonical_transcripts, process_consequences};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A step in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStep {
    // === Table Filtering ===
    /// Keep variants with an empty filters set.
    FilterPass,
    /// Drop variants in low-confidence regions.
    FilterLowConfRegions { filter_decoy: bool },
    /// Keep variants with AF below 5%.
    FilterRare { freq_index: usize },

    // === Annotation ===
    /// Restrict consequences to canonical transcripts.
    FilterCanonical,
    /// Annotate worst consequence per gene.
    ProcessConsequences,
    /// Annotate the frequency bin.
    AnnotateFreqBin { freq_index: usize },

    // === Outputs ===
    /// Category counts, total and per frequency bin.
    SummaryCounts(SummaryCountsConfig),
    /// Gene-level LoF matrix; needs genotypes.
    GeneLofMatrix(GeneLofConfig),
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Steps to execute.
    pub steps: Vec<PipelineStep>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(SummaryError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(SummaryError::from)
    }
}

/// Data a pipeline runs on. Only `variants` is required; steps that need
/// another input fail when it is absent.
pub struct PipelineInputs<'a> {
    pub variants: VariantTable,
    /// Genotype TSV matched against the variants when a matrix is needed.
    pub genotypes: Option<PathBuf>,
    pub metadata: Option<&'a SampleMetadata>,
    pub expression: Option<&'a TranscriptExpression>,
    pub regions: Option<&'a dyn RegionFilter>,
}

impl<'a> PipelineInputs<'a> {
    pub fn new(variants: VariantTable) -> Self {
        Self {
            variants,
            genotypes: None,
            metadata: None,
            expression: None,
            regions: None,
        }
    }

    pub fn genotypes(mut self, path: impl Into<PathBuf>) -> Self {
        self.genotypes = Some(path.into());
        self
    }

    pub fn metadata(mut self, metadata: &'a SampleMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn expression(mut self, expression: &'a TranscriptExpression) -> Self {
        self.expression = Some(expression);
        self
    }

    pub fn regions(mut self, regions: &'a dyn RegionFilter) -> Self {
        self.regions = Some(regions);
        self
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Name of the pipeline that produced the output.
    pub name: String,
    /// Variant table after all table steps.
    pub variants: VariantTable,
    pub summary_counts: Option<SummaryCountsTable>,
    pub gene_lof: Option<GeneLofMatrix>,
}

/// Builder for constructing and running pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Keep PASS variants.
    pub fn filter_pass(mut self) -> Self {
        self.steps.push(PipelineStep::FilterPass);
        self
    }

    /// Drop variants in low-confidence (and optionally decoy) regions.
    pub fn filter_low_conf_regions(mut self, filter_decoy: bool) -> Self {
        self.steps
            .push(PipelineStep::FilterLowConfRegions { filter_decoy });
        self
    }

    /// Keep rare variants (AF < 5% at `freq_index`).
    pub fn filter_rare(mut self, freq_index: usize) -> Self {
        self.steps.push(PipelineStep::FilterRare { freq_index });
        self
    }

    /// Restrict consequences to canonical transcripts.
    pub fn filter_canonical(mut self) -> Self {
        self.steps.push(PipelineStep::FilterCanonical);
        self
    }

    /// Annotate the worst consequence per gene.
    pub fn process_consequences(mut self) -> Self {
        self.steps.push(PipelineStep::ProcessConsequences);
        self
    }

    /// Annotate frequency bins.
    pub fn annotate_freq_bin(mut self, freq_index: usize) -> Self {
        self.steps
            .push(PipelineStep::AnnotateFreqBin { freq_index });
        self
    }

    /// Add summary counts output.
    pub fn summary_counts(mut self, config: SummaryCountsConfig) -> Self {
        self.steps.push(PipelineStep::SummaryCounts(config));
        self
    }

    /// Add gene-level LoF matrix output.
    pub fn gene_lof_matrix(mut self, config: GeneLofConfig) -> Self {
        self.steps.push(PipelineStep::GeneLofMatrix(config));
        self
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            steps: self.steps.clone(),
        }
    }

    /// Run the pipeline.
    pub fn run(&self, inputs: PipelineInputs<'_>) -> Result<PipelineOutput> {
        if self.steps.is_empty() {
            return Err(SummaryError::Pipeline("Pipeline has no steps".to_string()));
        }
        tracing::info!("Running pipeline '{}' ({} steps)", self.name, self.steps.len());

        let PipelineInputs {
            variants,
            genotypes,
            metadata,
            expression,
            regions,
        } = inputs;
        let mut state = PipelineState {
            variants,
            genotypes,
            metadata,
            expression,
            regions,
            summary_counts: None,
            gene_lof: None,
        };

        for (i, step) in self.steps.iter().enumerate() {
            tracing::debug!("Step {}: {:?}", i + 1, step);
            state = state.apply(step).map_err(|e| {
                SummaryError::Pipeline(format!("Step {} ({:?}) failed: {}", i + 1, step, e))
            })?;
        }

        Ok(PipelineOutput {
            name: self.name.clone(),
            variants: state.variants,
            summary_counts: state.summary_counts,
            gene_lof: state.gene_lof,
        })
    }
}

/// Internal state during pipeline execution.
struct PipelineState<'a> {
    variants: VariantTable,
    genotypes: Option<PathBuf>,
    metadata: Option<&'a SampleMetadata>,
    expression: Option<&'a TranscriptExpression>,
    regions: Option<&'a dyn RegionFilter>,
    summary_counts: Option<SummaryCountsTable>,
    gene_lof: Option<GeneLofMatrix>,
}

impl<'a> PipelineState<'a> {
    fn map_records<F>(&mut self, f: F)
    where
        F: Fn(VariantRecord) -> VariantRecord,
    {
        let variants = std::mem::take(&mut self.variants);
        self.variants = variants.into_records().into_iter().map(f).collect();
    }

    fn apply(mut self, step: &PipelineStep) -> Result<Self> {
        match step {
            // === Table Filtering ===
            PipelineStep::FilterPass => {
                let variants = std::mem::take(&mut self.variants);
                self.variants = variants.filter(|r| r.is_pass());
            }
            PipelineStep::FilterLowConfRegions { filter_decoy } => {
                let regions = self.regions.ok_or_else(|| {
                    SummaryError::Pipeline("Region filtering needs low confidence regions".to_string())
                })?;
                let records = std::mem::take(&mut self.variants).into_records();
                self.variants = VariantTable::new(filter_low_conf_regions(records, regions, *filter_decoy));
            }
            PipelineStep::FilterRare { freq_index } => {
                let filter = RowFilter::new().freq_index(*freq_index).rare_only();
                let variants = std::mem::take(&mut self.variants);
                self.variants = variants.filter(|r| filter.keep(r));
            }

            // === Annotation ===
            PipelineStep::FilterCanonical => {
                self.map_records(filter_vep_to_canonical_transcripts);
            }
            PipelineStep::ProcessConsequences => {
                self.map_records(process_consequences);
            }
            PipelineStep::AnnotateFreqBin { freq_index } => {
                let index = *freq_index;
                self.map_records(|mut r| {
                    r.freq_bin = freq_bin(&r.freq, index);
                    r
                });
            }

            // === Outputs ===
            PipelineStep::SummaryCounts(config) => {
                self.summary_counts = Some(get_summary_counts(
                    self.variants.clone(),
                    self.regions,
                    config,
                )?);
            }
            PipelineStep::GeneLofMatrix(config) => {
                let path = self.genotypes.as_ref().ok_or_else(|| {
                    SummaryError::Pipeline("Gene LoF matrix needs a genotype file".to_string())
                })?;
                let matrix = VariantMatrix::from_tsv(self.variants.clone(), path)?;
                self.gene_lof = Some(generate_gene_lof_matrix(
                    &matrix,
                    self.metadata,
                    self.expression,
                    config,
                )?);
            }
        }
        tracing::debug!("{} variants after step", self.variants.len());
        Ok(self)
    }
}

/// Convenience function to run the standard summary-counts pipeline.
pub fn run_summary_counts(
    variants: VariantTable,
    regions: Option<&dyn RegionFilter>,
    config: SummaryCountsConfig,
) -> Result<SummaryCountsTable> {
    let mut inputs = PipelineInputs::new(variants);
    inputs.regions = regions;
    Pipeline::new()
        .name("summary_counts")
        .summary_counts(config)
        .run(inputs)?
        .summary_counts
        .ok_or_else(|| SummaryError::Pipeline("Summary counts were not computed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Frequency, Locus, TranscriptConsequence};
    use crate::filter::IntervalRegions;
    use crate::frequency::FreqBin;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lof_csq(lof: &str) -> TranscriptConsequence {
        TranscriptConsequence {
            gene_id: "ENSG1".to_string(),
            gene_symbol: Some("ABC".to_string()),
            transcript_id: "ENST1".to_string(),
            biotype: Some("protein_coding".to_string()),
            consequence_terms: vec!["stop_gained".to_string()],
            canonical: Some(1),
            lof: Some(lof.to_string()),
            ..Default::default()
        }
    }

    fn create_test_variants() -> VariantTable {
        let mut records = Vec::new();
        for (pos, ac, lof) in [(100, 1, "HC"), (200, 3, "HC"), (300, 40, "LC"), (400, 1, "OS")] {
            let mut rec = VariantRecord::new(Locus::new("chr1", pos), "G", "A");
            rec.freq = vec![Frequency::new(ac, 100)];
            rec.vep.transcript_consequences = vec![lof_csq(lof)];
            records.push(rec);
        }
        let mut failed = VariantRecord::new(Locus::new("chr1", 500), "G", "A");
        failed.filters.insert("RF".to_string());
        failed.freq = vec![Frequency::new(1, 100)];
        records.push(failed);
        VariantTable::new(records)
    }

    fn create_test_genotypes() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "variant_id\tS1\tS2").unwrap();
        writeln!(file, "chr1:100:G:A\t0/1\t0/0").unwrap();
        writeln!(file, "chr1:200:G:A\t1/1\t./.").unwrap();
        writeln!(file, "chr1:300:G:A\t0/1\t0/1").unwrap();
        writeln!(file, "chr1:400:G:A\t0/0\t0/1").unwrap();
        writeln!(file, "chr1:500:G:A\t0/1\t0/1").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new()
            .name("test")
            .filter_pass()
            .filter_low_conf_regions(true)
            .filter_canonical()
            .annotate_freq_bin(0)
            .summary_counts(SummaryCountsConfig::default());

        let config = pipeline.to_config(Some("Test pipeline"));
        assert_eq!(config.steps.len(), 5);
        assert_eq!(config.name, "test");
        assert_eq!(config.steps[1], PipelineStep::FilterLowConfRegions { filter_decoy: true });
    }

    #[test]
    fn test_pipeline_config_yaml() {
        let pipeline = Pipeline::new()
            .name("example")
            .filter_pass()
            .filter_rare(0)
            .summary_counts(SummaryCountsConfig {
                fill_missing_bins: true,
                ..Default::default()
            })
            .gene_lof_matrix(GeneLofConfig::default());

        let config = pipeline.to_config(Some("Example pipeline"));
        let yaml = config.to_yaml().unwrap();

        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(Pipeline::from_config(&parsed).steps().len(), 4);
    }

    #[test]
    fn test_summary_pipeline_run() {
        let output = Pipeline::new()
            .name("summary")
            .filter_pass()
            .annotate_freq_bin(0)
            .summary_counts(SummaryCountsConfig::default())
            .run(PipelineInputs::new(create_test_variants()))
            .unwrap();

        assert_eq!(output.variants.len(), 4);
        assert!(output.variants.iter().all(|r| r.freq_bin.is_some()));
        let summary = output.summary_counts.unwrap();
        assert_eq!(summary.globals.num_variants, 4);
        assert_eq!(summary.globals.pass_loftee, 2);
        assert_eq!(summary.globals.loftee_os, 1);
        assert_eq!(summary.get(FreqBin::Singleton).unwrap().num_variants, 2);
        assert!(output.gene_lof.is_none());
    }

    #[test]
    fn test_region_step_needs_regions() {
        let result = Pipeline::new()
            .filter_low_conf_regions(false)
            .run(PipelineInputs::new(create_test_variants()));
        match result {
            Err(SummaryError::Pipeline(msg)) => assert!(msg.starts_with("Step 1")),
            other => panic!("unexpected result: {:?}", other.map(|o| o.name)),
        }

        let regions = IntervalRegions::new().add_low_confidence("chr1", 150, 250);
        let output = Pipeline::new()
            .filter_low_conf_regions(false)
            .run(PipelineInputs::new(create_test_variants()).regions(&regions))
            .unwrap();
        assert_eq!(output.variants.len(), 4);
    }

    #[test]
    fn test_gene_lof_pipeline_run() {
        let genotypes = create_test_genotypes();
        let output = Pipeline::new()
            .name("gene_lof")
            .filter_rare(0)
            .gene_lof_matrix(GeneLofConfig::default())
            .run(PipelineInputs::new(create_test_variants()).genotypes(genotypes.path()))
            .unwrap();

        // The LC variant is common and is also not an unflagged HC call.
        let matrix = output.gene_lof.unwrap();
        assert_eq!(matrix.n_groups(), 1);
        let row = &matrix.rows()[0];
        assert_eq!(row.sites.n_sites, 2);
        assert_eq!(matrix.entry(0, 0).num_hets, 1);
        assert_eq!(matrix.entry(0, 0).num_homs, 1);
        assert_eq!(matrix.entry(0, 1).defined_sites, 1);
    }

    #[test]
    fn test_gene_lof_needs_genotypes() {
        let result = Pipeline::new()
            .gene_lof_matrix(GeneLofConfig::default())
            .run(PipelineInputs::new(create_test_variants()));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_pipeline() {
        assert!(Pipeline::new()
            .run(PipelineInputs::new(create_test_variants()))
            .is_err());
    }

    #[test]
    fn test_run_summary_counts() {
        let summary =
            run_summary_counts(create_test_variants(), None, SummaryCountsConfig::default()).unwrap();
        assert_eq!(summary.globals_named()[0], ("total_num_variants".to_string(), 4));
    }
}
