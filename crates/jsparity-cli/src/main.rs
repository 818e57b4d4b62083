// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Command-line driver for the differential conformance harness.
//!
//! This is the entry point for the `jsparity` command: run a fixture
//! corpus under a reference and a subject JavaScript runtime and report
//! per-case verdicts.

use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use jsparity_core::prelude::{run_fixture, HarnessConfig, Runtime, Verdict};
use miette::Result;
use tracing_subscriber::{self, EnvFilter};

/// Differential conformance harness for JavaScript string semantics
#[derive(Debug, Parser)]
#[command(name = "jsparity")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Fixture corpus to run
    fixture: Utf8PathBuf,

    /// Reference runtime executable (default: `JSPARITY_REFERENCE` env var, then `node`)
    #[arg(long)]
    reference: Option<String>,

    /// Subject runtime executable (default: `JSPARITY_SUBJECT` env var, then `bun`)
    #[arg(long)]
    subject: Option<String>,

    /// Per-child deadline in seconds (default: `JSPARITY_TIMEOUT_SECS` env var, then 30)
    #[arg(long)]
    timeout: Option<u64>,

    /// Keep materialized programs in this directory instead of a temp dir
    #[arg(long)]
    work_dir: Option<Utf8PathBuf>,

    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    let default_directive = directive_for_verbosity(cli.verbose);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        // stdout carries the verdicts; logs go to stderr.
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&cli);

    let started = Instant::now();
    let report = run_fixture(&config)?;
    let elapsed = started.elapsed();

    for case in &report.cases {
        match &case.verdict {
            Verdict::Pass => println!("  {} ✓", case.name),
            Verdict::Todo => println!("  {} (todo)", case.name),
            Verdict::Fail(_) => println!("  {} ✗", case.name),
        }
    }

    println!();
    println!(
        "{} cases, {} passed, {} failed, {} todo ({:.1}s)",
        report.cases.len(),
        report.passed(),
        report.failed(),
        report.todo(),
        elapsed.as_secs_f64(),
    );

    if !report.is_success() {
        eprintln!();
        for case in report.failures() {
            if let Verdict::Fail(message) = &case.verdict {
                eprintln!("FAIL {}:\n  {message}\n", case.name);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

fn build_config(cli: &Cli) -> HarnessConfig {
    let mut config = HarnessConfig::new(cli.fixture.clone());
    if let Some(reference) = &cli.reference {
        config.reference = Runtime::new(reference);
    }
    if let Some(subject) = &cli.subject {
        config.subject = Runtime::new(subject);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(dir) = &cli.work_dir {
        config = config.with_work_dir(dir.clone());
    }
    config
}

fn directive_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "jsparity_core=debug,warn",
        _ => "trace",
    }
}
