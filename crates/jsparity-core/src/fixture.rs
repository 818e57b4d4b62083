// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Fixture corpus parser.
//!
//! A fixture is a flat text file of delimited blocks, each describing one
//! conformance case:
//!
//! ```text
//! /*=str1*/"abc"*/
//! /*=bad:-:SyntaxError*/)(*/
//! /*=weird[c]*/"a".repeat(20000)*/
//! ```
//!
//! A block opens with `/*=`, its header runs to the first `*/`, and its
//! body runs to the next `*/`. The header is `name` or
//! `name:-:expected-error-substring`. Two tags are recognized anywhere in
//! the name: `[c]` (the body is a sandbox expression evaluated at
//! materialization time) and `[todo]` (the case is known to fail and files
//! as skipped).
//!
//! Malformed blocks are fatal: a fixture that silently loses a case is
//! worse than one that refuses to run. The parser is pure and does no I/O.

use std::collections::HashSet;

use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

use crate::sandbox::EvalError;

/// Opens a fixture block.
pub const BLOCK_START: &str = "/*=";
/// Terminates both the header and the body of a block.
pub const BLOCK_END: &str = "*/";
/// Separates the case name from the expected-error substring.
pub const HEADER_SEP: &str = ":-:";

/// Name tag marking a payload as a sandbox expression.
const EVAL_TAG: &str = "[c]";
/// Name tag marking a case as a known failure.
const TODO_TAG: &str = "[todo]";

/// One parsed conformance case. Immutable after parsing; identified by
/// `name`, which is unique within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Case name, including any tags.
    pub name: EcoString,
    /// Expected stderr substring for error-expected cases.
    pub expected_error: Option<String>,
    /// Raw body text between the header and body terminators.
    pub payload: String,
    /// Whether the payload is a sandbox expression (`[c]` tag).
    pub requires_eval: bool,
    /// Whether the case is a known failure (`[todo]` tag).
    pub requires_todo: bool,
}

impl TestCase {
    /// Whether this case expects both runtimes to fail.
    #[must_use]
    pub fn expects_error(&self) -> bool {
        self.expected_error.is_some()
    }
}

/// A fatal fixture-authoring error. Any of these aborts the whole run;
/// partial reporting over a corrupt corpus is never allowed.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum FixtureError {
    /// Content before the first block that is not whitespace.
    #[error("fixture has stray content before the first '/*=' block")]
    #[diagnostic(help("every non-blank region must belong to a /*=name*/body*/ block"))]
    StrayLeadingContent,

    /// A block with fewer than two `*/` terminators.
    #[error("fixture block for case '{name}' is missing a '*/' terminator")]
    UnterminatedBlock {
        /// Name of the offending case (best-effort if the header is cut off).
        name: EcoString,
    },

    /// A block with more than two `*/` terminators.
    #[error("fixture block for case '{name}' contains an extra '*/' sentinel")]
    #[diagnostic(help("a block is exactly header */ body */; bodies cannot contain '*/'"))]
    ExtraTerminator {
        /// Name of the offending case.
        name: EcoString,
    },

    /// Non-whitespace text between a block's body terminator and the next block.
    #[error("stray content after the body of case '{name}'")]
    TrailingContent {
        /// Name of the offending case.
        name: EcoString,
    },

    /// A header with more than one `:-:` separator.
    #[error("fixture header for case '{name}' contains more than one ':-:' separator")]
    ExtraHeaderSeparator {
        /// Name of the offending case.
        name: EcoString,
    },

    /// A block whose name is empty after trimming.
    #[error("fixture block #{ordinal} has an empty case name")]
    EmptyName {
        /// One-based block ordinal.
        ordinal: usize,
    },

    /// Two blocks sharing a name; case identity is the name.
    #[error("duplicate case name '{name}'")]
    DuplicateName {
        /// The repeated name.
        name: EcoString,
    },

    /// A `[c]`-tagged payload whose sandbox evaluation failed. This is a
    /// bug in the fixture, surfaced immediately rather than filed as a
    /// test failure.
    #[error("failed to evaluate [c] payload for case '{name}'")]
    EvalFailed {
        /// Name of the offending case.
        name: EcoString,
        /// The underlying sandbox error.
        #[source]
        source: EvalError,
    },
}

/// Parses a fixture corpus into an ordered sequence of [`TestCase`]s.
///
/// # Errors
///
/// Returns the first [`FixtureError`] encountered; fixture malformation is
/// always fatal to the run.
pub fn parse_fixture(text: &str) -> Result<Vec<TestCase>, FixtureError> {
    let mut segments = text.split(BLOCK_START);

    // Everything before the first sentinel must be blank.
    let leading = segments.next().unwrap_or("");
    if !leading.trim().is_empty() {
        return Err(FixtureError::StrayLeadingContent);
    }

    let mut cases = Vec::new();
    let mut seen = HashSet::new();

    for (index, segment) in segments.enumerate() {
        // Whitespace-only segments (e.g. a trailing newline region) are ignored.
        if segment.trim().is_empty() {
            continue;
        }

        let parts: Vec<&str> = segment.split(BLOCK_END).collect();
        let name_hint = name_hint(parts.first().copied().unwrap_or(""));

        let (header, body, trailing) = match parts.as_slice() {
            [header, body, trailing] => (*header, *body, *trailing),
            [..] if parts.len() > 3 => {
                return Err(FixtureError::ExtraTerminator { name: name_hint });
            }
            _ => {
                return Err(FixtureError::UnterminatedBlock { name: name_hint });
            }
        };

        if !trailing.trim().is_empty() {
            return Err(FixtureError::TrailingContent { name: name_hint });
        }

        let header_parts: Vec<&str> = header.split(HEADER_SEP).collect();
        let (raw_name, expected_error) = match header_parts.as_slice() {
            [name] => (*name, None),
            [name, error] => (*name, Some(error.trim().to_string())),
            _ => {
                return Err(FixtureError::ExtraHeaderSeparator { name: name_hint });
            }
        };

        let name = EcoString::from(raw_name.trim());
        if name.is_empty() {
            return Err(FixtureError::EmptyName { ordinal: index + 1 });
        }
        if !seen.insert(name.clone()) {
            return Err(FixtureError::DuplicateName { name });
        }

        cases.push(TestCase {
            requires_eval: name.contains(EVAL_TAG),
            requires_todo: name.contains(TODO_TAG),
            name,
            expected_error,
            payload: body.to_string(),
        });
    }

    Ok(cases)
}

/// Best-effort case name for error messages, taken from the header region.
fn name_hint(header: &str) -> EcoString {
    EcoString::from(
        header
            .split(HEADER_SEP)
            .next()
            .unwrap_or("")
            .trim(),
    )
}
