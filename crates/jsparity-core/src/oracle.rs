// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Equivalence oracle.
//!
//! Given the three signals for a case — reference-runtime result,
//! subject-runtime result, in-process eval — the oracle decides whether
//! they agree with the case's expectation. The checking is deliberately
//! asymmetric: success output must match byte-for-byte (that is the whole
//! conformance claim), while error cases only require non-zero exits and a
//! literal stderr substring, because error message formatting legitimately
//! differs between runtimes.
//!
//! Every violated condition is its own [`Divergence`] variant naming the
//! signal that disagreed; a failure message that doesn't say *which* of
//! the three opinions diverged is useless to whoever has to debug it.

use thiserror::Error;

use crate::executor::{EvalSignal, ExecutionResult};
use crate::fixture::TestCase;
use crate::sandbox::EvalError;

/// A disagreement between the three signals and the case's expectation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Divergence {
    /// Reference runtime failed where success was expected.
    #[error("reference runtime exited with code {code}, expected 0")]
    ReferenceExit {
        /// The non-zero exit code.
        code: i32,
    },

    /// Subject runtime failed where success was expected.
    #[error("subject runtime exited with code {code}, expected 0")]
    SubjectExit {
        /// The non-zero exit code.
        code: i32,
    },

    /// Reference runtime succeeded where failure was expected.
    #[error("reference runtime exited with 0, expected a failure")]
    ReferenceUnexpectedSuccess,

    /// Subject runtime succeeded where failure was expected.
    #[error("subject runtime exited with 0, expected a failure")]
    SubjectUnexpectedSuccess,

    /// The two runtimes printed different stdout text.
    #[error("stdout diverged between runtimes:\n  reference: {reference:?}\n  subject:   {subject:?}")]
    StdoutMismatch {
        /// Reference stdout text.
        reference: String,
        /// Subject stdout text.
        subject: String,
    },

    /// The sandbox rejected a payload that both runtimes accepted.
    #[error("in-process eval failed where success was expected: {source}")]
    EvalRejected {
        /// The sandbox error.
        #[source]
        source: EvalError,
    },

    /// The sandbox accepted a payload that was expected to fail.
    #[error("in-process eval produced a string where an error was expected")]
    EvalUnexpectedSuccess,

    /// The sandbox's `print` output differs from the subject's stdout.
    #[error("in-process eval output diverged from subject stdout:\n  eval:    {eval:?}\n  subject: {subject:?}")]
    EvalOutputMismatch {
        /// What `print` accumulated in the sandbox.
        eval: String,
        /// What the subject runtime printed.
        subject: String,
    },

    /// Subject stderr does not contain the expected error substring.
    #[error("subject stderr does not contain {expected:?}:\n{stderr}")]
    StderrMissingSubstring {
        /// The expected substring (already trimmed at parse time).
        expected: String,
        /// The subject's captured stderr text.
        stderr: String,
    },
}

/// Judges one case from its three signals.
///
/// All three executions must have completed before this runs; the oracle
/// never compares partial results.
///
/// # Errors
///
/// Returns the first [`Divergence`] found, in signal order: exit codes,
/// then the in-process eval, then output comparison.
pub fn judge(
    case: &TestCase,
    reference: &ExecutionResult,
    subject: &ExecutionResult,
    eval: Option<&EvalSignal>,
) -> Result<(), Divergence> {
    match &case.expected_error {
        None => judge_success(reference, subject, eval),
        Some(expected) => judge_error(expected, reference, subject, eval),
    }
}

fn judge_success(
    reference: &ExecutionResult,
    subject: &ExecutionResult,
    eval: Option<&EvalSignal>,
) -> Result<(), Divergence> {
    if reference.exit_code != 0 {
        return Err(Divergence::ReferenceExit {
            code: reference.exit_code,
        });
    }
    if subject.exit_code != 0 {
        return Err(Divergence::SubjectExit {
            code: subject.exit_code,
        });
    }

    if let Some(Err(source)) = eval {
        return Err(Divergence::EvalRejected {
            source: source.clone(),
        });
    }

    let reference_out = reference.stdout_text();
    let subject_out = subject.stdout_text();
    if reference_out != subject_out {
        return Err(Divergence::StdoutMismatch {
            reference: reference_out,
            subject: subject_out,
        });
    }

    if let Some(Ok(run)) = eval {
        if run.printed != subject_out {
            return Err(Divergence::EvalOutputMismatch {
                eval: run.printed.clone(),
                subject: subject_out,
            });
        }
    }

    Ok(())
}

fn judge_error(
    expected: &str,
    reference: &ExecutionResult,
    subject: &ExecutionResult,
    eval: Option<&EvalSignal>,
) -> Result<(), Divergence> {
    if reference.exit_code == 0 {
        return Err(Divergence::ReferenceUnexpectedSuccess);
    }
    if subject.exit_code == 0 {
        return Err(Divergence::SubjectUnexpectedSuccess);
    }

    if let Some(Ok(_)) = eval {
        return Err(Divergence::EvalUnexpectedSuccess);
    }

    let stderr = subject.stderr_text().unwrap_or_default();
    if !stderr.trim().contains(expected) {
        return Err(Divergence::StderrMissingSubstring {
            expected: expected.to_string(),
            stderr,
        });
    }

    Ok(())
}
