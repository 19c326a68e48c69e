//! End-to-end tests: logs → result table → normalized table.

use mitigation_eval::export::{read_result_table, write_result_table};
use mitigation_eval::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_log(dir: &Path, name: &str, per_core: &[u64], total: u64, ipc: &str) {
    fs::create_dir_all(dir).unwrap();
    let mut log = String::new();
    for (core, instrs) in per_core.iter().enumerate() {
        log.push_str(&format!("  -- th[{core}] : retired {instrs} instrs\n"));
    }
    log.push_str(&format!(
        "  -- total number of fetched instructions : {total} (IPC = {ipc})\n"
    ));
    fs::write(dir.join(name), log).unwrap();
}

fn four_core_config() -> EvalConfig {
    EvalConfig::default().with_cores(4, 1).with_threads(2)
}

fn four_core_catalog() -> RunCatalog {
    RunCatalog::empty()
        .with_trace("500", 0.8)
        .with_trace("505", 0.4)
        .with_mix("high", vec!["500", "505", "500", "505"])
}

#[test]
fn test_concrete_rate_scenario() {
    let dir = TempDir::new().unwrap();
    write_log(
        dir.path(),
        "benign.para.512.rate.500.out",
        &[300000, 250000, 200000, 150000],
        1200000,
        "1.200",
    );

    let output = ResultCollector::new(&four_core_config(), four_core_catalog())
        .collect(dir.path())
        .unwrap();
    let row = &output.rows[0];

    let expected = [0.375, 0.3125, 0.25, 0.1875];
    for (got, want) in row.speedup.per_core.iter().zip(expected) {
        assert!((got - want).abs() < 1e-12, "{got} != {want}");
    }
    assert!((row.sum() - 1.125).abs() < 1e-12);
}

#[test]
fn test_collect_export_normalize() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");

    // Baseline: every core at 0.25 speedup for rate.500 and mix.high
    write_log(&logs, "baseline.rate.500.out", &[100; 4], 400, "0.8");
    write_log(&logs, "baseline.mix.high.out", &[100; 4], 400, "1.0");

    // para at 512 keeps baseline throughput, at 128 loses 15% on rate
    write_log(&logs, "benign.para.512.rate.500.out", &[100; 4], 400, "0.8");
    write_log(&logs, "benign.para.128.rate.500.out", &[85; 4], 400, "0.8");
    write_log(&logs, "benign.para.128.mix.high.out", &[50; 4], 400, "1.0");

    // No baseline for rate.505
    write_log(&logs, "benign.para.128.rate.505.out", &[100; 4], 400, "0.8");

    let config = four_core_config();
    let output = ResultCollector::new(&config, four_core_catalog())
        .collect(&logs)
        .unwrap();
    assert_eq!(output.summary.rows_produced, 6);

    let table_path = dir.path().join("out").join(mitigation_eval::export::RESULT_TABLE_FILE);
    write_result_table_file(&table_path, &output, TableLayout::PerCore).unwrap();

    let table = read_result_table_file(&table_path).unwrap();
    assert_eq!(table.len(), 6);

    let from_table = CrossConfigNormalizer::new().normalize(&table);
    let direct = CrossConfigNormalizer::new().normalize_results(&output.rows);
    assert_eq!(from_table.rows.len(), direct.rows.len());
    for (a, b) in from_table.rows.iter().zip(&direct.rows) {
        assert_eq!((&a.method, a.mode_class, &a.config), (&b.method, b.mode_class, &b.config));
        let (x, y) = (a.geomean.unwrap(), b.geomean.unwrap());
        assert!((x - y).abs() < 1e-12);
    }

    let s = &direct.summary;
    assert_eq!(s.rows_normalized, 3);
    assert_eq!(s.rows_without_baseline, 1);
    assert_eq!(s.groups, 3);

    let find = |class: ModeClass, config: &str| {
        direct
            .rows
            .iter()
            .find(|r| r.mode_class == class && r.config == config)
            .and_then(|r| r.geomean)
            .unwrap()
    };
    assert!((find(ModeClass::Rate, "512") - 1.0).abs() < 1e-12);
    assert!((find(ModeClass::Rate, "128") - 0.85).abs() < 1e-12);
    assert!((find(ModeClass::MixHigh, "128") - 0.5).abs() < 1e-12);

    let plot_path = dir.path().join("out").join("plot.csv");
    write_normalized_table_file(&plot_path, &direct.rows).unwrap();
    let plot = fs::read_to_string(&plot_path).unwrap();
    let lines: Vec<&str> = plot.lines().collect();
    assert_eq!(lines[0], "method,mode3,config,geomean_normalized_sum");
    assert!(lines[1].starts_with("para,mix_high,128,"));
    assert!(lines[2].starts_with("para,rate,128,"));
    assert!(lines[3].starts_with("para,rate,512,"));

    let report_path = dir.path().join("out").join("summary.json");
    RunReport::new(&config, output.summary.clone())
        .with_normalization(direct.summary.clone())
        .save_json(&report_path)
        .unwrap();
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["collection"]["rows_produced"], 6);
    assert_eq!(report["normalization"]["rows_without_baseline"], 1);
}

#[test]
fn test_sum_layout_round_trips_through_normalizer() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path(), "baseline.rate.500.out", &[100; 4], 400, "0.8");
    write_log(dir.path(), "benign.hydra.ooc.rate.500.out", &[50; 4], 400, "0.8");

    let output = ResultCollector::new(&four_core_config(), four_core_catalog())
        .collect(dir.path())
        .unwrap();

    let mut buf = Vec::new();
    write_result_table(&mut buf, &output, TableLayout::Sum).unwrap();
    let table = read_result_table(buf.as_slice()).unwrap();

    let normalized = CrossConfigNormalizer::new().normalize(&table);
    assert_eq!(normalized.rows.len(), 1);
    assert_eq!(normalized.rows[0].config, "ooc");
    assert!((normalized.rows[0].geomean.unwrap() - 0.5).abs() < 1e-12);
}

#[test]
fn test_calibrated_catalog_feeds_collection() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    // Solo run of trace 500 reaches IPC 0.5
    write_log(root, "baseline.single.500.out", &[500], 1000, "0.5");
    write_log(root, "benign.para.512.rate.500.out", &[100; 4], 400, "1.0");

    let calibration = Calibration::measure(root, &LogFieldExtractor::new(1)).unwrap();
    assert_eq!(calibration.ipcs.get("500"), Some(&0.5));

    let catalog_path = root.join("catalog.toml");
    calibration
        .apply(four_core_catalog())
        .save_toml(&catalog_path)
        .unwrap();

    let config = four_core_config().with_catalog_path(&catalog_path);
    let catalog = config.load_catalog().unwrap();
    assert_eq!(catalog.trace_ipc("500"), Some(0.5));

    let output = ResultCollector::new(&config, catalog).collect(root).unwrap();
    let rate = output
        .rows
        .iter()
        .find(|r| r.run.run_base == "rate.500")
        .unwrap();
    // 100 instrs over 400 cycles against solo IPC 0.5 on each of 4 cores
    assert!((rate.sum() - 2.0).abs() < 1e-12);
}
