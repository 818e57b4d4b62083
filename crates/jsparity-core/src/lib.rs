// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Differential conformance harness for JavaScript string semantics.
//!
//! A fixture corpus of delimited cases is materialized into small
//! JavaScript programs, each of which is executed under a reference
//! runtime, a subject runtime, and an in-process expression sandbox. The
//! three signals are then judged against the case's expectation: success
//! cases must print byte-identical output everywhere, error cases must
//! fail everywhere with the expected stderr substring.
//!
//! The pipeline, in fixture order per case:
//!
//! 1. [`fixture`] parses the corpus (fatal on malformation),
//! 2. [`materialize`] writes the program file, expanding `[c]` payloads
//!    through the [`sandbox`],
//! 3. [`executor`] runs both runtimes and derives the in-process signal,
//! 4. [`oracle`] judges the three signals,
//! 5. [`harness`] drives the loop and collects [`harness::RunReport`].

pub mod config;
pub mod executor;
pub mod fixture;
pub mod harness;
pub mod materialize;
pub mod oracle;
pub mod sandbox;
pub mod sync;

/// Convenience re-exports for embedding the harness.
pub mod prelude {
    pub use crate::config::HarnessConfig;
    pub use crate::executor::Runtime;
    pub use crate::fixture::{parse_fixture, TestCase};
    pub use crate::harness::{run_fixture, CaseReport, RunReport, Verdict};
    pub use crate::oracle::Divergence;
}
