// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Harness configuration.
//!
//! Defaults come from the environment so CI can swap runtimes without
//! touching invocations: `JSPARITY_REFERENCE` (default `node`),
//! `JSPARITY_SUBJECT` (default `bun`), `JSPARITY_TIMEOUT_SECS` (default
//! 30). The CLI layers its flags on top of these.

use std::env;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::executor::Runtime;

/// Default reference runtime executable.
pub const DEFAULT_REFERENCE: &str = "node";

/// Default subject runtime executable.
pub const DEFAULT_SUBJECT: &str = "bun";

/// Default per-child deadline in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Fixture corpus to run.
    pub fixture: Utf8PathBuf,
    /// Baseline interpreter treated as ground truth.
    pub reference: Runtime,
    /// Interpreter under test.
    pub subject: Runtime,
    /// Directory for materialized programs; a temp dir when `None`.
    pub work_dir: Option<Utf8PathBuf>,
    /// Wall-clock deadline per child process.
    pub case_timeout: Duration,
}

impl HarnessConfig {
    /// Creates a configuration for `fixture` with environment defaults.
    #[must_use]
    pub fn new(fixture: Utf8PathBuf) -> Self {
        Self {
            fixture,
            reference: Runtime::new(env_or("JSPARITY_REFERENCE", DEFAULT_REFERENCE)),
            subject: Runtime::new(env_or("JSPARITY_SUBJECT", DEFAULT_SUBJECT)),
            work_dir: None,
            case_timeout: Duration::from_secs(env_timeout_secs()),
        }
    }

    /// Overrides both runtimes.
    #[must_use]
    pub fn with_runtimes(mut self, reference: Runtime, subject: Runtime) -> Self {
        self.reference = reference;
        self.subject = subject;
        self
    }

    /// Overrides the per-child deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.case_timeout = timeout;
        self
    }

    /// Keeps materialized programs in `dir` instead of a temp dir.
    #[must_use]
    pub fn with_work_dir(mut self, dir: Utf8PathBuf) -> Self {
        self.work_dir = Some(dir);
        self
    }

    /// Deadline for a whole case: two child executions plus slack for
    /// materialization and judgement.
    #[must_use]
    pub fn bridge_deadline(&self) -> Duration {
        self.case_timeout * 2 + Duration::from_secs(5)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_timeout_secs() -> u64 {
    env::var("JSPARITY_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
}
