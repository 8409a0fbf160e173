//! Integration tests for the summary-counts pipeline.

use std::io::Write;
use tempfile::NamedTempFile;
use variant_summary::prelude::*;

/// JSON line for a bi-allelic variant with one canonical protein-coding
/// consequence.
fn variant_line(
    contig: &str,
    pos: u64,
    alleles: (&str, &str),
    filters: &[&str],
    ac: u64,
    an: u64,
    term: &str,
    lof: Option<(&str, Option<&str>)>,
) -> String {
    let af = if an > 0 { ac as f64 / an as f64 } else { 0.0 };
    let (lof_call, flags) = match lof {
        Some((call, flags)) => (
            format!("\"{}\"", call),
            flags.map_or("null".to_string(), |f| format!("\"{}\"", f)),
        ),
        None => ("null".to_string(), "null".to_string()),
    };
    let filters: Vec<String> = filters.iter().map(|f| format!("\"{}\"", f)).collect();
    format!(
        concat!(
            "{{\"locus\":{{\"contig\":\"{}\",\"position\":{}}},\"alleles\":[\"{}\",\"{}\"],",
            "\"filters\":[{}],\"freq\":[{{\"AC\":{},\"AN\":{},\"AF\":{}}}],",
            "\"vep\":{{\"transcript_consequences\":[{{\"gene_id\":\"ENSG1\",\"gene_symbol\":\"ABC\",",
            "\"transcript_id\":\"ENST1\",\"biotype\":\"protein_coding\",\"consequence_terms\":[\"{}\"],",
            "\"canonical\":1,\"lof\":{},\"lof_flags\":{}}}]}}}}"
        ),
        contig,
        pos,
        alleles.0,
        alleles.1,
        filters.join(","),
        ac,
        an,
        af,
        term,
        lof_call,
        flags
    )
}

/// Variant table covering every LOFTEE category, failed filters,
/// low-confidence and decoy regions, and a broad frequency spectrum.
fn create_variant_file() -> NamedTempFile {
    let lines = vec![
        // Singleton HC without flags.
        variant_line("chr1", 1_000, ("C", "T"), &[], 1, 10_000, "stop_gained", Some(("HC", None))),
        // Doubleton HC with flags.
        variant_line(
            "chr1",
            2_000,
            ("G", "A"),
            &[],
            2,
            10_000,
            "stop_gained",
            Some(("HC", Some("SINGLE_EXON"))),
        ),
        // AC 3 - 5 frameshift deletion, LC.
        variant_line("chr1", 3_000, ("CA", "C"), &[], 4, 10_000, "frameshift_variant", Some(("LC", None))),
        // Rare splice site, OS.
        variant_line("chr2", 4_000, ("A", "G"), &[], 50, 100_000, "splice_region_variant", Some(("OS", None))),
        // Common missense.
        variant_line("chr2", 5_000, ("T", "C"), &[], 3_000, 10_000, "missense_variant", None),
        // Near fixed synonymous insertion.
        variant_line("chrX", 6_000_000, ("A", "AT"), &[], 9_700, 10_000, "synonymous_variant", None),
        // Not found.
        variant_line("chr3", 7_000, ("G", "T"), &[], 0, 10_000, "intron_variant", None),
        // Fails filters.
        variant_line("chr1", 8_000, ("C", "G"), &["AC0", "RF"], 1, 10_000, "stop_gained", Some(("HC", None))),
        // Low-confidence region.
        variant_line("chr4", 9_500, ("C", "G"), &[], 1, 10_000, "stop_gained", Some(("HC", None))),
        // Decoy region.
        variant_line("chr5", 10_500, ("C", "G"), &[], 1, 10_000, "missense_variant", None),
    ];
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

fn create_regions() -> IntervalRegions {
    let mut lcr = NamedTempFile::new().unwrap();
    writeln!(lcr, "track name=lcr").unwrap();
    writeln!(lcr, "chr4\t9000\t10000").unwrap();
    lcr.flush().unwrap();
    let mut decoy = NamedTempFile::new().unwrap();
    writeln!(decoy, "chr5\t10000\t11000").unwrap();
    decoy.flush().unwrap();
    IntervalRegions::from_bed(&[lcr.path()], Some(decoy.path())).unwrap()
}

#[test]
fn test_summary_counts_end_to_end() {
    let file = create_variant_file();
    let variants = VariantTable::from_jsonl(file.path()).unwrap();
    assert_eq!(variants.len(), 10);

    let regions = create_regions();
    let config = SummaryCountsConfig {
        filter_decoy: true,
        ..Default::default()
    };
    let summary = get_summary_counts(variants, Some(&regions), &config).unwrap();

    let g = &summary.globals;
    assert_eq!(g.num_variants, 7);
    assert_eq!(g.indels, 2);
    assert_eq!(g.snps, 5);
    assert_eq!(g.lof, 4);
    assert_eq!(g.pass_loftee, 2);
    assert_eq!(g.pass_loftee_no_flag, 1);
    assert_eq!(g.loftee_os, 1);
    assert_eq!(g.fail_loftee, 1);

    assert_eq!(summary.get(FreqBin::NotFound).unwrap().num_variants, 1);
    assert_eq!(summary.get(FreqBin::Singleton).unwrap().pass_loftee_no_flag, 1);
    assert_eq!(summary.get(FreqBin::Doubleton).unwrap().pass_loftee, 1);
    assert_eq!(summary.get(FreqBin::Ac3To5).unwrap().fail_loftee, 1);
    assert_eq!(summary.get(FreqBin::Pct0_01To0_1).unwrap().loftee_os, 1);
    assert_eq!(summary.get(FreqBin::Pct10To95).unwrap().num_variants, 1);
    assert_eq!(summary.get(FreqBin::Over95Pct).unwrap().indels, 1);

    // Totals equal the sum of the per-bin rows.
    assert_eq!(summary.row_total(), summary.globals);
    let bins: Vec<_> = summary.rows.iter().map(|r| r.freq_bin).collect();
    let mut sorted = bins.clone();
    sorted.sort();
    assert_eq!(bins, sorted);
}

#[test]
fn test_decoy_toggle() {
    let file = create_variant_file();
    let regions = create_regions();

    let without = get_summary_counts(
        VariantTable::from_jsonl(file.path()).unwrap(),
        Some(&regions),
        &SummaryCountsConfig::default(),
    )
    .unwrap();
    let with = get_summary_counts(
        VariantTable::from_jsonl(file.path()).unwrap(),
        Some(&regions),
        &SummaryCountsConfig {
            filter_decoy: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(without.globals.num_variants, with.globals.num_variants + 1);
}

#[test]
fn test_outputs_written() {
    let file = create_variant_file();
    let summary = get_summary_counts(
        VariantTable::from_jsonl(file.path()).unwrap(),
        None,
        &SummaryCountsConfig {
            fill_missing_bins: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(summary.len(), FreqBin::ALL.len());

    let tsv = NamedTempFile::new().unwrap();
    summary.to_tsv(tsv.path()).unwrap();
    let text = std::fs::read_to_string(tsv.path()).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.starts_with("freq_bin\tnum_variants\tindels\tsnps\tLOF"));
    assert_eq!(text.lines().count(), FreqBin::ALL.len() + 1);
    assert!(text.lines().any(|l| l.starts_with("Not found\t1\t")));

    let json = NamedTempFile::new().unwrap();
    summary.globals_to_json(json.path()).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json.path()).unwrap()).unwrap();
    assert_eq!(value["summary_counts"]["total_num_variants"], 9);
    assert_eq!(value["summary_counts"]["total_LOF"], 5);
}

#[test]
fn test_pipeline_from_yaml() {
    let file = create_variant_file();
    let regions = create_regions();

    let config = Pipeline::new()
        .name("summary")
        .filter_pass()
        .filter_low_conf_regions(true)
        .annotate_freq_bin(0)
        .summary_counts(SummaryCountsConfig::default())
        .to_config(None);
    let yaml = config.to_yaml().unwrap();
    let pipeline = Pipeline::from_config(&PipelineConfig::from_yaml(&yaml).unwrap());

    let inputs = PipelineInputs::new(VariantTable::from_jsonl(file.path()).unwrap()).regions(&regions);
    let output = pipeline.run(inputs).unwrap();

    assert_eq!(output.variants.len(), 7);
    assert_eq!(
        output
            .variants
            .iter()
            .filter(|r| r.freq_bin == Some(FreqBin::Singleton))
            .count(),
        1
    );
    assert_eq!(output.summary_counts.unwrap().globals.num_variants, 7);
}
