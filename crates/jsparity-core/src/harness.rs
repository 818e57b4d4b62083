// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Run loop: parse the corpus, materialize every case, execute each one
//! through both runtimes and the in-process sandbox, and collect verdicts.
//!
//! Fixture malformation and `[c]` evaluation failures abort the whole run;
//! everything downstream of materialization (spawn failures, timeouts,
//! divergences) is filed as a per-case verdict so one broken case never
//! hides the rest of the corpus.
//!
//! `[todo]` cases invert at this level: a failure files as a skipped
//! verdict, a pass files as a failure telling the author to drop the tag.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use ecow::EcoString;
use miette::{Context, IntoDiagnostic, Result};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::HarnessConfig;
use crate::executor::{self, ExecError, Runtime};
use crate::fixture::{self, TestCase};
use crate::materialize::{self, CaseSequence, MaterializedProgram};
use crate::oracle::{self, Divergence};
use crate::sync::{self, BridgeError};

/// Outcome of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// All signals agreed with the expectation.
    Pass,
    /// A signal diverged or an execution failed; the message says which.
    Fail(String),
    /// A `[todo]` case that still fails, filed as skipped.
    Todo,
}

/// One case's name and verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    /// The case name from the fixture, tags included.
    pub name: EcoString,
    /// The verdict.
    pub verdict: Verdict,
}

/// Verdicts for a whole run, in fixture order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Per-case reports, one per fixture case.
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    /// Number of passing cases.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Pass))
    }

    /// Number of failing cases.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Fail(_)))
    }

    /// Number of `[todo]` cases filed as skipped.
    #[must_use]
    pub fn todo(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Todo))
    }

    /// Whether the run had no failures. Todo cases do not count against
    /// success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// The failing reports, in fixture order.
    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases
            .iter()
            .filter(|report| matches!(report.verdict, Verdict::Fail(_)))
    }

    fn count(&self, predicate: impl Fn(&Verdict) -> bool) -> usize {
        self.cases
            .iter()
            .filter(|report| predicate(&report.verdict))
            .count()
    }
}

/// A per-case failure from anywhere in the pipeline. Turned into a
/// [`Verdict`], never propagated as a run-level error.
#[derive(Debug, Error)]
enum CaseFailure {
    #[error(transparent)]
    Divergence(#[from] Divergence),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Everything one case's worker needs, owned so it can cross the thread
/// boundary of the deadline bridge.
struct CaseJob {
    case: TestCase,
    program: MaterializedProgram,
    work_dir: Utf8PathBuf,
    reference: Runtime,
    subject: Runtime,
    timeout: std::time::Duration,
}

impl CaseJob {
    /// Executes both runtimes in a fixed order (reference first), derives
    /// the in-process signal, and judges the three together.
    fn run(self) -> Result<(), CaseFailure> {
        let capture_stderr = self.case.expects_error();
        let reference = executor::execute(
            &self.reference,
            &self.program.path,
            &self.work_dir,
            capture_stderr,
            self.timeout,
        )?;
        let subject = executor::execute(
            &self.subject,
            &self.program.path,
            &self.work_dir,
            capture_stderr,
            self.timeout,
        )?;
        let eval = executor::eval_signal(&self.program.payload);
        oracle::judge(&self.case, &reference, &subject, eval.as_ref())?;
        Ok(())
    }
}

/// Runs the configured fixture corpus end to end.
///
/// # Errors
///
/// Returns an error for run-level problems: an unreadable or malformed
/// fixture, a missing runtime, a `[c]` payload that fails to evaluate, or
/// an unusable work directory. Per-case failures are reported in the
/// returned [`RunReport`] instead.
#[instrument(skip_all, fields(fixture = %config.fixture))]
pub fn run_fixture(config: &HarnessConfig) -> Result<RunReport> {
    config.reference.probe()?;
    config.subject.probe()?;

    let text = fs::read_to_string(&config.fixture)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read fixture '{}'", config.fixture))?;
    let cases = fixture::parse_fixture(&text)?;
    info!(cases = cases.len(), "parsed fixture corpus");

    // The temp-dir guard must outlive every child execution.
    let (work_dir, _temp_guard) = resolve_work_dir(config)?;

    let mut sequence = CaseSequence::new();
    let mut reports = Vec::with_capacity(cases.len());
    for case in cases {
        let program = materialize::materialize(&case, &work_dir, &mut sequence)?;
        let verdict = run_case(&case, program, &work_dir, config);
        debug!(case = %case.name, ?verdict, "case judged");
        reports.push(CaseReport {
            name: case.name,
            verdict,
        });
    }

    Ok(RunReport { cases: reports })
}

/// Runs one materialized case behind the deadline bridge and applies the
/// `[todo]` inversion to the outcome.
fn run_case(
    case: &TestCase,
    program: MaterializedProgram,
    work_dir: &Utf8Path,
    config: &HarnessConfig,
) -> Verdict {
    let job = CaseJob {
        case: case.clone(),
        program,
        work_dir: work_dir.to_owned(),
        reference: config.reference.clone(),
        subject: config.subject.clone(),
        timeout: config.case_timeout,
    };

    let outcome = match sync::run_with_deadline(config.bridge_deadline(), move || job.run()) {
        Ok(result) => result,
        Err(bridge) => Err(CaseFailure::Bridge(bridge)),
    };

    if case.requires_todo {
        match outcome {
            Err(failure) => {
                debug!(case = %case.name, %failure, "todo case still fails");
                Verdict::Todo
            }
            Ok(()) => Verdict::Fail(format!(
                "case '{}' passed; remove the [todo] tag from its name",
                case.name
            )),
        }
    } else {
        match outcome {
            Ok(()) => Verdict::Pass,
            Err(failure) => Verdict::Fail(failure.to_string()),
        }
    }
}

/// Resolves the directory programs are written to, creating a temp dir
/// when the configuration doesn't pin one.
fn resolve_work_dir(config: &HarnessConfig) -> Result<(Utf8PathBuf, Option<tempfile::TempDir>)> {
    match &config.work_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to create work directory '{dir}'"))?;
            Ok((dir.clone(), None))
        }
        None => {
            let temp = tempfile::tempdir()
                .into_diagnostic()
                .wrap_err("Failed to create temporary work directory")?;
            let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
                .map_err(|path| miette::miette!("temporary directory path is not UTF-8: {path:?}"))?;
            Ok((dir, Some(temp)))
        }
    }
}
