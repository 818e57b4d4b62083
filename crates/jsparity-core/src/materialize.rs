// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Case materialization: turning a parsed [`TestCase`] into a runnable
//! program file.
//!
//! Every emitted program has the same shape: a shared prelude that defines
//! the single `print` capability and opens a `print(` call, the case's
//! payload bytes, and an epilogue that closes the call. The payload region
//! is recoverable byte-for-byte from the emitted file, which keeps the
//! fixture→file mapping auditable.
//!
//! `[c]`-tagged payloads are sandbox expressions: they are evaluated here
//! and the resulting string is re-encoded as an ASCII-only JavaScript
//! string literal. That literal is what both runtimes must then parse and
//! print identically — programmatically generated literals are how the
//! corpus covers sizes and code units nobody would hand-write.

use camino::{Utf8Path, Utf8PathBuf};
use miette::{Context, IntoDiagnostic, Result};
use tracing::debug;

use crate::fixture::{FixtureError, TestCase};
use crate::sandbox;

/// Shared program prelude: defines `print` and opens the call.
///
/// The payload is wrapped in its own parentheses so that a malformed
/// payload such as `)(` stays a syntax error (`print(()(...))`) instead of
/// collapsing into an accidentally-valid call expression.
pub const PRELUDE: &str =
    "\"use strict\";\nconst print = (message) => console.log(message);\nprint((\n";

/// Shared program epilogue: closes the `print((` call.
pub const EPILOGUE: &str = "\n));\n";

/// Run-scoped ordinal counter for program filenames.
///
/// Filenames are derived from this sequence, never from case names, so no
/// two cases can collide on disk regardless of what the fixture calls them.
#[derive(Debug, Default)]
pub struct CaseSequence {
    next: usize,
}

impl CaseSequence {
    /// Creates a sequence starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next ordinal and advances.
    fn advance(&mut self) -> usize {
        let current = self.next;
        self.next += 1;
        current
    }
}

/// A materialized program: one file on disk plus the payload bytes that
/// went into it. Owned by the harness for the duration of one run; cleanup
/// of the containing directory is the caller's concern.
#[derive(Debug, Clone)]
pub struct MaterializedProgram {
    /// Path of the emitted program file.
    pub path: Utf8PathBuf,
    /// The payload bytes embedded between prelude and epilogue.
    pub payload: Vec<u8>,
}

impl MaterializedProgram {
    /// Extracts the payload region from emitted file bytes.
    ///
    /// Returns `None` if the bytes do not have the prelude/epilogue shape.
    #[must_use]
    pub fn payload_region(file_bytes: &[u8]) -> Option<&[u8]> {
        file_bytes
            .strip_prefix(PRELUDE.as_bytes())?
            .strip_suffix(EPILOGUE.as_bytes())
    }
}

/// Materializes one case into `work_dir`, deriving the payload bytes from
/// the raw body or, for `[c]` cases, from sandbox evaluation.
///
/// # Errors
///
/// Returns a fatal error if a `[c]` payload fails to evaluate (a fixture
/// bug, not a test failure) or if the program file cannot be written.
pub fn materialize(
    case: &TestCase,
    work_dir: &Utf8Path,
    sequence: &mut CaseSequence,
) -> Result<MaterializedProgram> {
    let payload = payload_bytes(case)?;

    let ordinal = sequence.advance();
    let path = work_dir.join(format!("case_{ordinal:04}.js"));

    let mut file_bytes = Vec::with_capacity(PRELUDE.len() + payload.len() + EPILOGUE.len());
    file_bytes.extend_from_slice(PRELUDE.as_bytes());
    file_bytes.extend_from_slice(&payload);
    file_bytes.extend_from_slice(EPILOGUE.as_bytes());

    std::fs::write(&path, &file_bytes)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write program for case '{}' to '{path}'", case.name))?;

    debug!(case = %case.name, %path, bytes = file_bytes.len(), "materialized program");

    Ok(MaterializedProgram { path, payload })
}

/// Derives the payload bytes for a case.
fn payload_bytes(case: &TestCase) -> Result<Vec<u8>, FixtureError> {
    if case.requires_eval {
        let value =
            sandbox::evaluate_to_string(&case.payload).map_err(|source| FixtureError::EvalFailed {
                name: case.name.clone(),
                source,
            })?;
        Ok(value.to_source_literal().into_bytes())
    } else {
        Ok(case.payload.clone().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn literal_case(name: &str, payload: &str) -> TestCase {
        TestCase {
            name: name.into(),
            expected_error: None,
            payload: payload.to_string(),
            requires_eval: false,
            requires_todo: false,
        }
    }

    fn work_dir(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn emitted_file_wraps_payload() {
        let temp = TempDir::new().unwrap();
        let mut seq = CaseSequence::new();
        let case = literal_case("str1", r#""abc""#);

        let program = materialize(&case, &work_dir(&temp), &mut seq).unwrap();
        let bytes = std::fs::read(&program.path).unwrap();

        assert!(bytes.starts_with(PRELUDE.as_bytes()));
        assert!(bytes.ends_with(EPILOGUE.as_bytes()));
        assert_eq!(program.payload, br#""abc""#);
    }

    #[test]
    fn payload_region_round_trips() {
        let temp = TempDir::new().unwrap();
        let mut seq = CaseSequence::new();
        let case = literal_case("rt", "\"a\" + \"b\"");

        let program = materialize(&case, &work_dir(&temp), &mut seq).unwrap();
        let bytes = std::fs::read(&program.path).unwrap();

        assert_eq!(
            MaterializedProgram::payload_region(&bytes),
            Some(program.payload.as_slice())
        );
    }

    #[test]
    fn ordinal_names_never_collide() {
        let temp = TempDir::new().unwrap();
        let mut seq = CaseSequence::new();
        let dir = work_dir(&temp);

        // Same case name twice: files must still be distinct.
        let a = materialize(&literal_case("same", "1"), &dir, &mut seq).unwrap();
        let b = materialize(&literal_case("same2", "2"), &dir, &mut seq).unwrap();

        assert_ne!(a.path, b.path);
        assert_eq!(a.path.file_name(), Some("case_0000.js"));
        assert_eq!(b.path.file_name(), Some("case_0001.js"));
    }

    #[test]
    fn eval_case_is_expanded_to_a_literal() {
        let temp = TempDir::new().unwrap();
        let mut seq = CaseSequence::new();
        let case = TestCase {
            name: "weird[c]".into(),
            expected_error: None,
            payload: r#""a".repeat(20000)"#.to_string(),
            requires_eval: true,
            requires_todo: false,
        };

        let program = materialize(&case, &work_dir(&temp), &mut seq).unwrap();
        // 20000 'a's plus the surrounding quotes.
        assert_eq!(program.payload.len(), 20002);
        assert!(program.payload.starts_with(b"\"aaaa"));
        assert!(program.payload.ends_with(b"aa\""));
    }

    #[test]
    fn eval_case_escapes_surrogates_to_ascii() {
        let temp = TempDir::new().unwrap();
        let mut seq = CaseSequence::new();
        let case = TestCase {
            name: "surrogate[c]".into(),
            expected_error: None,
            payload: "String.fromCharCode(0xD800)".to_string(),
            requires_eval: true,
            requires_todo: false,
        };

        let program = materialize(&case, &work_dir(&temp), &mut seq).unwrap();
        assert_eq!(program.payload, br#""\uD800""#);
    }

    #[test]
    fn eval_failure_is_fatal_and_names_the_case() {
        let temp = TempDir::new().unwrap();
        let mut seq = CaseSequence::new();
        let case = TestCase {
            name: "broken[c]".into(),
            expected_error: None,
            payload: "nonsense(".to_string(),
            requires_eval: true,
            requires_todo: false,
        };

        let err = materialize(&case, &work_dir(&temp), &mut seq).unwrap_err();
        assert!(err.to_string().contains("broken[c]"));
    }
}
