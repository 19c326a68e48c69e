//! Simulation Result Evaluation Tool
//!
//! Collects weighted speedups from simulator logs and normalizes them against
//! the unmitigated baseline.
//!
//! # Output Format
//!
//! - **Result table**: `per_core_simulation_results.csv`, one row per run
//! - **Normalized table**: `plot.csv`, geomean per (method, mode class, config)
//! - **Run report**: optional JSON with skip and crash counts
//!
//! # Usage
//!
//! ```bash
//! # Collect benign runs and normalize them
//! cargo run --release --bin eval_results -- collect --root results/ --normalized plot.csv
//!
//! # Malicious runs with a measured catalog
//! cargo run --release --bin eval_results -- collect --root results/ --type malicious \
//!     --catalog configs/catalog.toml
//!
//! # Re-normalize an existing table
//! cargo run --release --bin eval_results -- normalize --input per_core_simulation_results.csv
//!
//! # Measure solo IPCs from single-core baseline runs
//! cargo run --release --bin eval_results -- calibrate --root results/ --output catalog.toml
//! ```

use mitigation_eval::export::{NORMALIZED_TABLE_FILE, RESULT_TABLE_FILE};
use mitigation_eval::prelude::*;
use std::path::Path;
use std::sync::Arc;

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("eval_results", String::as_str);
    if args.len() < 2 {
        print_usage(program);
        std::process::exit(1);
    }

    let flags = &args[2..];
    let result = match args[1].as_str() {
        "collect" => run_collect(flags),
        "normalize" => run_normalize(flags),
        "calibrate" => run_calibrate(flags),
        "generate-config" => match flags.first() {
            Some(path) => generate_config(path),
            None => usage_error("generate-config requires a path argument"),
        },
        "generate-catalog" => match flags.first() {
            Some(path) => generate_catalog(path),
            None => usage_error("generate-catalog requires a path argument"),
        },
        "--help" | "-h" => {
            print_usage(program);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage(program);
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Simulation Result Evaluation Tool

Usage:
    {program} collect --root <dir> [options]       Collect weighted speedups
        --type <benign|malicious>                  Simulation type (default: benign)
        --config <path.toml>                       Evaluation config
        --catalog <path.toml>                      Run catalog (default: built-in)
        --output <path.csv>                        Result table (default: {RESULT_TABLE_FILE})
        --normalized <path.csv>                    Also write the normalized table
        --summary <path.json>                      Also write the run report
        --threads <n>                              Worker threads
    {program} normalize --input <path.csv> [--output <path.csv>]
                                                   Normalize a result table (default: {NORMALIZED_TABLE_FILE})
    {program} calibrate --root <dir> --output <path.toml> [--catalog <path.toml>]
                                                   Measure solo IPCs into a catalog
    {program} generate-config <path.toml>          Write a sample config
    {program} generate-catalog <path.toml>         Write the built-in catalog
    {program} --help                               Show this help

Set RUST_LOG=debug for per-file output.
"#
    );
}

fn usage_error(message: &str) -> Result<()> {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

/// `--name value` pairs after the command.
struct Flags<'a> {
    args: &'a [String],
}

impl<'a> Flags<'a> {
    fn new(args: &'a [String]) -> Self {
        Self { args }
    }

    fn get(&self, name: &str) -> Option<&'a str> {
        let pos = self.args.iter().position(|a| a == name)?;
        match self.args.get(pos + 1) {
            Some(value) if !value.starts_with("--") => Some(value.as_str()),
            _ => {
                eprintln!("Error: {name} requires a value");
                std::process::exit(1);
            }
        }
    }

    fn require(&self, name: &str) -> &'a str {
        match self.get(name) {
            Some(value) => value,
            None => {
                eprintln!("Error: missing required {name}");
                std::process::exit(1);
            }
        }
    }
}

fn run_collect(args: &[String]) -> Result<()> {
    let flags = Flags::new(args);
    let root = flags.require("--root");

    let mut config = match flags.get("--config") {
        Some(path) => {
            let config = EvalConfig::load_toml(path)?;
            println!("✅ Loaded configuration: {path}");
            config
        }
        None => EvalConfig::default(),
    };
    if let Some(sim_type) = flags.get("--type") {
        config = config.with_sim_type(sim_type.parse().map_err(Error::config)?);
    }
    if let Some(path) = flags.get("--catalog") {
        config = config.with_catalog_path(path);
    }
    if let Some(threads) = flags.get("--threads") {
        match threads.parse::<usize>() {
            Ok(n) if n > 0 => config = config.with_threads(n),
            _ => return Err(Error::config(format!("invalid thread count '{threads}'"))),
        }
    }
    config.validate().map_err(Error::config)?;

    let catalog = Arc::new(config.load_catalog()?);
    println!(
        "Collecting {} runs under {} ({} traces, {} mixes in catalog)",
        config.collect.sim_type,
        root,
        catalog.traces.len(),
        catalog.mixes.len()
    );

    let collector = ResultCollector::with_shared_catalog(&config, catalog);
    let output = collector.collect(root)?;
    print_collection_summary(&output.summary);

    let table_path = flags.get("--output").unwrap_or(RESULT_TABLE_FILE);
    write_result_table_file(table_path, &output, config.collect.layout)?;
    println!("✅ Result table: {table_path}");

    let mut report = RunReport::new(&config, output.summary.clone());
    if let Some(path) = flags.get("--normalized") {
        let normalized = CrossConfigNormalizer::new().normalize_results(&output.rows);
        write_normalized_table_file(path, &normalized.rows)?;
        println!("✅ Normalized table: {path} ({} groups)", normalized.rows.len());
        report = report.with_normalization(normalized.summary);
    }

    if let Some(path) = flags.get("--summary") {
        report.save_json(path)?;
        println!("✅ Run report: {path}");
    }

    Ok(())
}

fn run_normalize(args: &[String]) -> Result<()> {
    let flags = Flags::new(args);
    let input = flags.require("--input");
    let output = flags.get("--output").unwrap_or(NORMALIZED_TABLE_FILE);

    let rows = read_result_table_file(input)?;
    let normalized = CrossConfigNormalizer::new().normalize(&rows);
    write_normalized_table_file(output, &normalized.rows)?;

    let s = &normalized.summary;
    println!("Rows normalized:       {}", s.rows_normalized);
    println!("Rows without baseline: {}", s.rows_without_baseline);
    println!("Undefined values:      {}", s.undefined_values);
    println!("Groups:                {} ({} undefined)", s.groups, s.undefined_groups);
    println!("✅ Normalized table: {output}");
    Ok(())
}

fn run_calibrate(args: &[String]) -> Result<()> {
    let flags = Flags::new(args);
    let root = flags.require("--root");
    let output = flags.require("--output");

    let base = match flags.get("--catalog") {
        Some(path) => RunCatalog::load_toml(path)?,
        None => RunCatalog::builtin(),
    };

    let calibration = Calibration::measure(root, &LogFieldExtractor::new(1))?;
    if calibration.is_empty() {
        return Err(Error::invalid_input(format!(
            "no single-mode baseline logs with a reported IPC under {root}"
        )));
    }
    for trace in &calibration.crashed {
        println!("⚠️  {trace}: single run reported no IPC, keeping catalog value");
    }
    for path in &calibration.duplicates {
        println!("⚠️  {}: trace already calibrated, ignored", path.display());
    }

    let catalog = calibration.apply(base);
    catalog.validate().map_err(Error::catalog)?;
    catalog.save_toml(output)?;
    println!(
        "✅ Wrote catalog with {} measured IPCs: {output}",
        calibration.ipcs.len()
    );
    Ok(())
}

fn generate_config(path: &str) -> Result<()> {
    let config = EvalConfig::default()
        .with_catalog_path("configs/catalog.toml")
        .with_threads(8)
        .with_metadata(ExperimentMetadata {
            name: "Mitigation sweep".to_string(),
            description: Some("Weighted speedup across mitigation thresholds".to_string()),
            tags: Some(vec!["benign".to_string()]),
        });
    config.save_toml(path)?;
    println!("✅ Generated sample config: {path}");
    println!("\nEdit the following fields before running:");
    println!("  - catalog_path: Catalog file (remove to use the built-in catalog)");
    println!("  - collect.sim_type: benign or malicious");
    Ok(())
}

fn generate_catalog(path: &str) -> Result<()> {
    let catalog = RunCatalog::builtin();
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    catalog.save_toml(path)?;
    println!(
        "✅ Generated catalog with {} traces and {} mixes: {path}",
        catalog.traces.len(),
        catalog.mixes.len()
    );
    Ok(())
}

fn print_collection_summary(s: &CollectionSummary) {
    println!();
    println!("Files discovered:   {}", s.files_discovered);
    println!("Other sim type:     {}", s.filtered_out);
    println!("Rows produced:      {}", s.rows_produced);
    println!("Crashed / faulted:  {} / {}", s.crashed_runs, s.faulted_runs);
    println!(
        "Skipped:            {} (name {}, unresolved {}, unreadable {}, duplicate {})",
        s.files_skipped,
        s.skipped_unparseable_name,
        s.skipped_unresolved,
        s.skipped_unreadable,
        s.skipped_duplicate
    );
    println!("Elapsed:            {} ms on {} threads", s.elapsed_ms, s.threads_used);
    println!();
}
