use std::fs;
use std::path::Path;

use nntune_report::app::pipeline::{load_inputs, run_report};
use nntune_report::cli::ReportArgs;
use nntune_report::domain::ComparisonKind;
use nntune_report::error::ErrorKind;
use nntune_report::io::read_yoda;

const RUNCARD: &str = r#"
input:
  folders: [runs]
  patterns: ["/A/"]
  unpatterns: ["/A/ignored"]
  expfiles: [data.yoda]
  weights:
    "/A/y": 2.0
model:
  seed: 7
  scan: false
  noscan_setup: {epochs: 10}
minimizer:
  bounds:
    - {name: a, min: 0.0, max: 4.0}
    - {name: b, min: 5.0, max: 25.0}
  restarts: 1
"#;

fn scatter(path: &str, annotations: &[(&str, f64)], y: &[f64], yerr: f64) -> String {
    let mut s = format!("# BEGIN YODA_SCATTER2D_V2 {path}\nPath: {path}\nType: Scatter2D\n");
    for (k, v) in annotations {
        s.push_str(&format!("{k}: {v}\n"));
    }
    s.push_str("---\n");
    for (i, v) in y.iter().enumerate() {
        s.push_str(&format!("{} 0.5 0.5 {v} {yerr} {yerr}\n", i as f64 + 0.5));
    }
    s.push_str("# END YODA_SCATTER2D_V2\n\n");
    s
}

fn write_run(dir: &Path, name: &str, a: f64, b: f64) {
    let params = [("a", a), ("b", b)];
    let text = [
        scatter("/A/x", &params, &[10.0 + a, 20.0 - a, 30.0 + b], 0.5),
        scatter("/A/y", &params, &[5.0 * a, 100.0 + b], 1.0),
        scatter("/A/ignored", &params, &[1.0], 0.1),
        scatter("/B/z", &params, &[1.0], 0.1),
    ]
    .concat();
    fs::write(dir.join(name), text).unwrap();
}

fn linear_model() -> String {
    r#"{"layers": [{"weights": [[0.0, 0.0]], "bias": [0.0], "activation": "linear"}], "loss": [0.4, 0.05]}"#
        .to_string()
}

fn setup(root: &Path) -> ReportArgs {
    fs::write(root.join("runcard.yml"), RUNCARD).unwrap();
    let runs = root.join("runs");
    fs::create_dir(&runs).unwrap();
    write_run(&runs, "run1.yoda", 1.0, 10.0);
    write_run(&runs, "run2.yoda", 2.0, 15.0);
    write_run(&runs, "run3.yoda", 3.0, 20.0);

    let data = [
        scatter("/REF/A/x", &[], &[12.0, 18.0, 45.0], 1.0),
        scatter("/REF/A/y", &[], &[10.0, 116.0], 2.0),
        scatter("/REF/B/z", &[], &[1.0], 0.1),
    ]
    .concat();
    fs::write(root.join("data.yoda"), data).unwrap();

    let models: Vec<String> = (0..5).map(|_| linear_model()).collect();
    fs::write(
        root.join("models.json"),
        format!("{{\"models\": [{}]}}", models.join(",")),
    )
    .unwrap();
    fs::write(
        root.join("fit.json"),
        r#"{"best_x": [2.0, 15.0], "best_error": [0.5, 2.0],
            "trace": [{"evaluations": 10, "fbest": 4.0}, {"evaluations": 50, "fbest": 1.5}],
            "covariance": [[0.25, 0.1], [0.1, 4.0]]}"#,
    )
    .unwrap();
    fs::write(
        root.join("bench.json"),
        r#"{"single_closure_test_results": [
            {"details": [{"params": "a", "true_params": 1.0, "predicted_params": 1.1},
                         {"params": "b", "true_params": 10.0, "predicted_params": 9.0}]},
            {"details": [{"params": "a", "true_params": 2.0, "predicted_params": 2.1},
                         {"params": "b", "true_params": 20.0, "predicted_params": 20.0}]}
        ]}"#,
    )
    .unwrap();

    ReportArgs {
        runcard: root.join("runcard.yml"),
        models: root.join("models.json"),
        fit: root.join("fit.json"),
        output: root.join("report"),
        benchmark: Some(root.join("bench.json")),
    }
}

#[test]
fn check_loads_runs_and_aligned_data() {
    let dir = tempfile::tempdir().unwrap();
    let args = setup(dir.path());
    let inputs = load_inputs(&args.runcard).unwrap();
    assert_eq!(inputs.runs.n_runs(), 3);
    assert_eq!(inputs.runs.n_params(), 2);
    assert_eq!(inputs.runs.n_bins(), 5);
    assert_eq!(inputs.runs.x()[(2, 1)], 20.0);
    assert_eq!(inputs.data.len(), 2);
    assert!(inputs.data.get("/A/y").unwrap().is_weighted());
}

#[test]
fn full_report_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let args = setup(dir.path());
    let out = run_report(&args).unwrap();

    let report = dir.path().join("report");
    let plots = report.join("plots");
    for name in [
        "minimizer.svg",
        "chi2_0.svg",
        "chi2_1.svg",
        "correlations.svg",
        "0_data.svg",
        "1_data.svg",
        "model_loss.svg",
        "bounds_0.svg",
        "bounds_1.svg",
        "errors.svg",
        "benchmark_a.svg",
        "benchmark_b.svg",
    ] {
        assert!(plots.join(name).is_file(), "missing plots/{name}");
    }
    for name in [
        "best_model.yoda",
        "chi2.csv",
        "index.html",
        "data.html",
        "model.html",
        "benchmark.html",
        "minimization.html",
        "raw.html",
        "config.html",
    ] {
        assert!(report.join(name).is_file(), "missing {name}");
    }

    let export = read_yoda(&report.join("best_model.yoda")).unwrap();
    assert_eq!(export.len(), 2);
    assert_eq!(export[0].path, "/A/x");
    assert_eq!(export[0].annotation("a"), Some("2"));
    assert_eq!(export[0].annotation("b"), Some("15"));
    // The linear models predict the per-bin run mean.
    assert!((export[0].points[0].y - 12.0).abs() < 1e-9);

    assert_eq!(out.entries.len(), 3);
    assert!(out.entries.iter().all(|e| e.model.is_some() && e.best_run.is_some()));
    let weighted = out
        .entries
        .iter()
        .find(|e| e.kind == ComparisonKind::Weighted)
        .unwrap();
    assert_eq!(weighted.title, "/A/y");
    assert!(out.summary.best_chi2.is_finite());
    assert_eq!(out.summary.profiles, 2);
    assert_eq!(out.summary.benchmark_params, 2);
}

#[test]
fn empty_run_folder_aborts_with_discovery_error() {
    let dir = tempfile::tempdir().unwrap();
    let args = setup(dir.path());
    for entry in fs::read_dir(dir.path().join("runs")).unwrap() {
        fs::remove_file(entry.unwrap().path()).unwrap();
    }
    let err = run_report(&args).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Discovery);
    assert!(!dir.path().join("report").join("best_model.yoda").exists());
}
