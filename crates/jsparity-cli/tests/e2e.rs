// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests running a real fixture corpus under Node.js.
//!
//! Node stands in for both the reference and the subject runtime, so every
//! well-formed case must pass: the interesting coverage is the full
//! pipeline (parse, materialize, execute twice, eval in-process, judge),
//! not runtime differences. Skipped with a note when `node` is not
//! installed.

use std::process::Command;
use std::time::Duration;

use camino::Utf8PathBuf;
use jsparity_core::prelude::{run_fixture, HarnessConfig, Runtime, Verdict};
use serial_test::serial;
use tempfile::TempDir;

fn node_available() -> bool {
    Command::new("node")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn write_fixture(temp: &TempDir, text: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(temp.path().join("corpus.txt")).unwrap();
    std::fs::write(&path, text).unwrap();
    path
}

fn node_config(fixture: Utf8PathBuf) -> HarnessConfig {
    HarnessConfig::new(fixture)
        .with_runtimes(Runtime::new("node"), Runtime::new("node"))
        .with_timeout(Duration::from_secs(60))
}

/// A corpus touching every case shape: plain literals, escapes, operators,
/// `[c]` expansion (including a lone surrogate), an expected error, and a
/// `[todo]` known failure.
const CORPUS: &str = concat!(
    "/*=plain*/\"abc\"*/\n",
    "/*=concat*/\"a\" + \"b\" + \"c\"*/\n",
    "/*=escapes*/\"a\\nb\\tc\"*/\n",
    "/*=empty*/\"\"*/\n",
    "/*=repeat [c]*/\"ab\".repeat(100)*/\n",
    "/*=surrogate [c]*/String.fromCharCode(0xD800)*/\n",
    "/*=bad:-:SyntaxError*/)(*/\n",
    "/*=numeric [todo]*/1 + 2*/\n",
);

#[test]
#[serial(node)]
fn full_corpus_passes_under_node() {
    if !node_available() {
        eprintln!("node not found, skipping e2e test");
        return;
    }

    let temp = TempDir::new().unwrap();
    let config = node_config(write_fixture(&temp, CORPUS));

    let report = run_fixture(&config).unwrap();
    assert_eq!(report.cases.len(), 8);
    for case in &report.cases {
        match (case.name.as_str(), &case.verdict) {
            ("numeric [todo]", Verdict::Todo) => {}
            (_, Verdict::Pass) => {}
            (name, verdict) => panic!("case '{name}' got {verdict:?}"),
        }
    }
    assert!(report.is_success());
}

#[test]
#[serial(node)]
fn cli_reports_a_passing_run() {
    if !node_available() {
        eprintln!("node not found, skipping e2e test");
        return;
    }

    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(&temp, "/*=str1*/\"abc\"*/\n/*=bad:-:SyntaxError*/)(*/\n");

    let output = Command::new(env!("CARGO_BIN_EXE_jsparity"))
        .arg(fixture.as_str())
        .args(["--reference", "node", "--subject", "node"])
        .output()
        .expect("failed to run jsparity");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout:\n{stdout}");
    assert!(stdout.contains("2 cases, 2 passed, 0 failed"), "{stdout}");
}

#[test]
#[serial(node)]
fn cli_exits_nonzero_on_divergence() {
    if !node_available() {
        eprintln!("node not found, skipping e2e test");
        return;
    }

    let temp = TempDir::new().unwrap();
    // Expected to fail but node accepts it, so the run must fail.
    let fixture = write_fixture(&temp, "/*=stale:-:SyntaxError*/\"ok\"*/\n");

    let output = Command::new(env!("CARGO_BIN_EXE_jsparity"))
        .arg(fixture.as_str())
        .args(["--reference", "node", "--subject", "node"])
        .output()
        .expect("failed to run jsparity");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("stale"), "{stderr}");
}

#[test]
#[serial(node)]
fn work_dir_flag_keeps_materialized_programs() {
    if !node_available() {
        eprintln!("node not found, skipping e2e test");
        return;
    }

    let temp = TempDir::new().unwrap();
    let fixture = write_fixture(&temp, "/*=str1*/\"abc\"*/\n");
    let keep = temp.path().join("programs");

    let output = Command::new(env!("CARGO_BIN_EXE_jsparity"))
        .arg(fixture.as_str())
        .args(["--reference", "node", "--subject", "node"])
        .args(["--work-dir", keep.to_str().unwrap()])
        .output()
        .expect("failed to run jsparity");

    assert!(output.status.success());
    assert!(keep.join("case_0000.js").is_file());
}
