//! VSS - Variant Summary Statistics CLI
//!
//! Command-line interface for frequency bins, summary counts and gene-level
//! LoF matrices over annotated variant tables.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use variant_summary::data::{SampleMetadata, VariantMatrix, VariantTable};
use variant_summary::error::Result;
use variant_summary::filter::{IntervalRegions, RegionFilter};
use variant_summary::frequency::freq_bin;
use variant_summary::gene_lof::{generate_gene_lof_matrix, GeneLofConfig, TranscriptExpression};
use variant_summary::pipeline::{Pipeline, PipelineConfig, PipelineInputs};
use variant_summary::summary::{get_summary_counts, SummaryCountsConfig};

/// Variant Summary Statistics
#[derive(Parser)]
#[command(name = "vss")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Low-confidence region files shared by several subcommands.
#[derive(clap::Args, Debug, Clone)]
struct RegionArgs {
    /// BED file(s) of low-confidence regions (LCR, segmental duplications)
    #[arg(long = "lcr")]
    low_confidence: Vec<PathBuf>,

    /// BED file of decoy regions
    #[arg(long)]
    decoy: Option<PathBuf>,
}

impl RegionArgs {
    fn load(&self) -> Result<Option<IntervalRegions>> {
        if self.low_confidence.is_empty() && self.decoy.is_none() {
            return Ok(None);
        }
        tracing::info!("Loading low confidence regions...");
        Ok(Some(IntervalRegions::from_bed(
            self.low_confidence.as_slice(),
            self.decoy.clone(),
        )?))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Path to variant table (JSON lines)
        #[arg(short, long)]
        variants: PathBuf,

        /// Path to genotype TSV
        #[arg(short, long)]
        genotypes: Option<PathBuf>,

        /// Path to sample metadata TSV
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Path to transcript expression TSV
        #[arg(short, long)]
        expression: Option<PathBuf>,

        #[command(flatten)]
        regions: RegionArgs,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Count variants per category, in total and per frequency bin
    SummaryCounts {
        /// Path to variant table (JSON lines)
        #[arg(short, long)]
        variants: PathBuf,

        #[command(flatten)]
        regions: RegionArgs,

        /// Also remove variants in decoy regions
        #[arg(long)]
        filter_decoy: bool,

        /// Index of the frequency subset used for binning
        #[arg(long, default_value = "0")]
        freq_index: usize,

        /// Write zero rows for bins without variants
        #[arg(long)]
        fill_missing_bins: bool,

        /// Output path for per-bin counts TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for global totals JSON
        #[arg(long)]
        globals: Option<PathBuf>,
    },

    /// Build the gene-level LoF matrix
    GeneLof {
        /// Path to variant table (JSON lines)
        #[arg(short, long)]
        variants: PathBuf,

        /// Path to genotype TSV
        #[arg(short, long)]
        genotypes: PathBuf,

        /// Path to sample metadata TSV (for AN filtering)
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Path to transcript expression TSV
        #[arg(short, long)]
        expression: Option<PathBuf>,

        /// YAML file with matrix parameters; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Index of the frequency subset
        #[arg(long)]
        freq_index: Option<usize>,

        /// Use every transcript instead of the worst consequence per gene
        #[arg(long)]
        all_transcripts: bool,

        /// Filter on allele number as a proxy for call rate
        #[arg(long)]
        filter_an: bool,

        /// Keep only variants with AF < 5%
        #[arg(long)]
        filter_to_rare: bool,

        /// Classify LoF by consequence term (data without LOFTEE)
        #[arg(long)]
        pre_loftee: bool,

        /// Remove variants with AF >= 95%
        #[arg(long)]
        remove_ultra_common: bool,

        /// Output path for group rows TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for per-sample entries TSV
        #[arg(long)]
        entries: Option<PathBuf>,
    },

    /// Annotate frequency bins and report variants per bin
    FreqBin {
        /// Path to variant table (JSON lines)
        #[arg(short, long)]
        variants: PathBuf,

        /// Index of the frequency subset
        #[arg(long, default_value = "0")]
        freq_index: usize,

        /// Output path for the annotated variant table
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for example YAML
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            variants,
            genotypes,
            metadata,
            expression,
            regions,
            output,
        } => cmd_run(
            &config,
            &variants,
            genotypes,
            metadata.as_deref(),
            expression.as_deref(),
            &regions,
            &output,
        ),

        Commands::SummaryCounts {
            variants,
            regions,
            filter_decoy,
            freq_index,
            fill_missing_bins,
            output,
            globals,
        } => cmd_summary_counts(
            &variants,
            &regions,
            SummaryCountsConfig {
                freq_index,
                filter_decoy,
                fill_missing_bins,
            },
            &output,
            globals.as_deref(),
        ),

        Commands::GeneLof {
            variants,
            genotypes,
            metadata,
            expression,
            config,
            freq_index,
            all_transcripts,
            filter_an,
            filter_to_rare,
            pre_loftee,
            remove_ultra_common,
            output,
            entries,
        } => load_gene_lof_config(config.as_deref()).and_then(|mut cfg| {
            if let Some(index) = freq_index {
                cfg.freq_index = index;
            }
            cfg.all_transcripts |= all_transcripts;
            cfg.filter_an |= filter_an;
            cfg.filter_to_rare |= filter_to_rare;
            cfg.pre_loftee |= pre_loftee;
            cfg.remove_ultra_common |= remove_ultra_common;
            cmd_gene_lof(
                &variants,
                &genotypes,
                metadata.as_deref(),
                expression.as_deref(),
                &cfg,
                &output,
                entries.as_deref(),
            )
        }),

        Commands::FreqBin {
            variants,
            freq_index,
            output,
        } => cmd_freq_bin(&variants, freq_index, output.as_deref()),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_variants(path: &Path) -> Result<VariantTable> {
    tracing::info!("Loading variants from {:?}...", path);
    let variants = VariantTable::from_jsonl(path)?;
    tracing::info!("Loaded {} variants", variants.len());
    Ok(variants)
}

fn load_gene_lof_config(path: Option<&Path>) -> Result<GeneLofConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&text)?)
        }
        None => Ok(GeneLofConfig::default()),
    }
}

/// Run a pipeline from configuration
fn cmd_run(
    config_path: &Path,
    variants_path: &Path,
    genotypes_path: Option<PathBuf>,
    metadata_path: Option<&Path>,
    expression_path: Option<&Path>,
    region_args: &RegionArgs,
    output_dir: &Path,
) -> Result<()> {
    tracing::info!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = fs::read_to_string(config_path)?;
    let config = PipelineConfig::from_yaml(&config_str)?;

    let variants = load_variants(variants_path)?;
    let metadata = metadata_path.map(SampleMetadata::from_tsv).transpose()?;
    let expression = expression_path
        .map(TranscriptExpression::from_tsv)
        .transpose()?;
    let regions = region_args.load()?;

    let mut inputs = PipelineInputs::new(variants);
    inputs.genotypes = genotypes_path;
    inputs.metadata = metadata.as_ref();
    inputs.expression = expression.as_ref();
    inputs.regions = regions.as_ref().map(|r| r as &dyn RegionFilter);

    let pipeline = Pipeline::from_config(&config);
    let output = pipeline.run(inputs)?;

    fs::create_dir_all(output_dir)?;
    if let Some(summary) = &output.summary_counts {
        let path = output_dir.join("summary_counts.tsv");
        tracing::info!("Writing summary counts to {:?}...", path);
        summary.to_tsv(&path)?;
        summary.globals_to_json(output_dir.join("summary_counts_globals.json"))?;
        println!("{}", summary);
    }
    if let Some(matrix) = &output.gene_lof {
        let path = output_dir.join("gene_lof_rows.tsv");
        tracing::info!("Writing gene LoF matrix to {:?}...", path);
        matrix.rows_to_tsv(&path)?;
        matrix.entries_to_tsv(output_dir.join("gene_lof_entries.tsv"))?;
        println!("{} groups x {} samples", matrix.n_groups(), matrix.n_samples());
    }
    let table_path = output_dir.join("variants.jsonl");
    output.variants.to_jsonl(&table_path)?;

    tracing::info!("Done! Pipeline '{}' wrote {:?}", output.name, output_dir);
    Ok(())
}

/// Summary counts per frequency bin
fn cmd_summary_counts(
    variants_path: &Path,
    region_args: &RegionArgs,
    config: SummaryCountsConfig,
    output_path: &Path,
    globals_path: Option<&Path>,
) -> Result<()> {
    let variants = load_variants(variants_path)?;
    let regions = region_args.load()?;

    let summary = get_summary_counts(
        variants,
        regions.as_ref().map(|r| r as &dyn RegionFilter),
        &config,
    )?;

    tracing::info!("Writing summary counts to {:?}...", output_path);
    summary.to_tsv(output_path)?;
    if let Some(path) = globals_path {
        summary.globals_to_json(path)?;
    }

    println!("{}", summary);
    Ok(())
}

/// Gene-level LoF matrix
fn cmd_gene_lof(
    variants_path: &Path,
    genotypes_path: &Path,
    metadata_path: Option<&Path>,
    expression_path: Option<&Path>,
    config: &GeneLofConfig,
    output_path: &Path,
    entries_path: Option<&Path>,
) -> Result<()> {
    let variants = load_variants(variants_path)?;
    tracing::info!("Loading genotypes from {:?}...", genotypes_path);
    let matrix = VariantMatrix::from_tsv(variants, genotypes_path)?;
    tracing::info!(
        "Loaded {} variants x {} samples",
        matrix.n_variants(),
        matrix.n_samples()
    );
    let metadata = metadata_path.map(SampleMetadata::from_tsv).transpose()?;
    let expression = expression_path
        .map(TranscriptExpression::from_tsv)
        .transpose()?;

    let result = generate_gene_lof_matrix(&matrix, metadata.as_ref(), expression.as_ref(), config)?;

    tracing::info!("Writing {} groups to {:?}...", result.n_groups(), output_path);
    result.rows_to_tsv(output_path)?;
    if let Some(path) = entries_path {
        result.entries_to_tsv(path)?;
    }

    println!("{} groups x {} samples", result.n_groups(), result.n_samples());
    Ok(())
}

/// Frequency bins of a variant table
fn cmd_freq_bin(variants_path: &Path, freq_index: usize, output_path: Option<&Path>) -> Result<()> {
    let variants = load_variants(variants_path)?;
    let annotated: VariantTable = variants
        .into_records()
        .into_iter()
        .map(|mut r| {
            r.freq_bin = freq_bin(&r.freq, freq_index);
            r
        })
        .collect();

    let mut per_bin: BTreeMap<_, u64> = BTreeMap::new();
    for r in annotated.iter() {
        *per_bin.entry(r.freq_bin).or_default() += 1;
    }

    println!("Variants per Frequency Bin");
    for (bin, n) in &per_bin {
        let label = bin.map_or("NA", |b| b.label());
        println!("  {:<14} {}", label, n);
    }

    if let Some(path) = output_path {
        tracing::info!("Writing annotated variants to {:?}...", path);
        annotated.to_jsonl(path)?;
    }
    Ok(())
}

/// Write an example pipeline configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let config = Pipeline::new()
        .name("gnomad_summary")
        .filter_pass()
        .annotate_freq_bin(0)
        .summary_counts(SummaryCountsConfig::default())
        .gene_lof_matrix(GeneLofConfig::default())
        .to_config(Some("Summary counts and gene-level LoF matrix"));

    let yaml = config.to_yaml()?;
    fs::write(output_path, &yaml)?;

    tracing::info!("Example configuration written to {:?}", output_path);
    println!("{}", yaml);
    Ok(())
}
