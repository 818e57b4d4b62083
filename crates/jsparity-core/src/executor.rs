// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Dual-runtime execution.
//!
//! Each materialized program is executed three ways: under the reference
//! runtime, under the subject runtime, and in-process through the
//! expression sandbox. The two child processes are invoked as
//! `<executable> <program-file>` with the case directory as working
//! directory, stdin closed, stdout always captured, and stderr captured
//! only when the case expects an error (otherwise it streams through to
//! the developer's terminal).
//!
//! Children are bounded by a wall-clock deadline: a hung runtime is
//! killed and reported as a distinct timeout failure, never as a generic
//! divergence and never as a stuck harness.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::sandbox::{self, EvalError, JsString, Value};

/// Line terminator appended by the `print` capability.
pub const LINE_ENDING: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// How often a child is polled for exit while the deadline runs down.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One of the two external runtimes (reference or subject).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    command: String,
}

impl Runtime {
    /// Creates a runtime from an executable name or path.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The executable this runtime invokes.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Checks that the runtime executable is present and runnable.
    ///
    /// Only spawnability is checked, not the exit status of `--version`;
    /// not every runtime supports that flag.
    ///
    /// # Errors
    ///
    /// Returns an error with an installation hint if `<command> --version`
    /// cannot be spawned at all.
    pub fn probe(&self) -> miette::Result<()> {
        let result = Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match result {
            Ok(_) => Ok(()),
            Err(_) => miette::bail!(
                "runtime '{}' not found in PATH or not runnable.\n\
                 Install it or point the harness at another executable\n\
                 (JSPARITY_REFERENCE / JSPARITY_SUBJECT, or the --reference/--subject flags).",
                self.command
            ),
        }
    }
}

/// Captured outcome of one child-process execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Child exit code (-1 if terminated by a signal).
    pub exit_code: i32,
    /// Captured stdout bytes.
    pub stdout: Vec<u8>,
    /// Captured stderr bytes; `None` when stderr was passed through.
    pub stderr: Option<Vec<u8>>,
}

impl ExecutionResult {
    /// stdout decoded as text (lossy; runtimes emit U+FFFD themselves for
    /// unpaired surrogates, so lossy decoding is the right comparison).
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Captured stderr decoded as text, if stderr was captured.
    #[must_use]
    pub fn stderr_text(&self) -> Option<String> {
        self.stderr
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// An execution-level failure, distinct from an output divergence.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecError {
    /// The runtime could not be spawned at all.
    #[error("failed to spawn '{command}'")]
    Spawn {
        /// The executable that failed to start.
        command: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The child did not exit before the deadline and was killed.
    #[error("'{command}' did not exit within {}s and was killed", timeout.as_secs())]
    Timeout {
        /// The executable that hung.
        command: String,
        /// The deadline that expired.
        timeout: Duration,
    },

    /// An I/O error while driving the child (pipes, wait).
    #[error("I/O error while running '{command}'")]
    Io {
        /// The executable being driven.
        command: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Runs `runtime` on `program` and captures its outcome.
///
/// # Errors
///
/// Returns [`ExecError`] for spawn failures, pipe errors, and deadline
/// expiry. A non-zero child exit is not an error here; the oracle decides
/// what exit codes mean.
pub fn execute(
    runtime: &Runtime,
    program: &Utf8Path,
    case_dir: &Utf8Path,
    capture_stderr: bool,
    timeout: Duration,
) -> Result<ExecutionResult, ExecError> {
    let mut child = Command::new(&runtime.command)
        .arg(program.as_str())
        .current_dir(case_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(if capture_stderr {
            Stdio::piped()
        } else {
            Stdio::inherit()
        })
        .spawn()
        .map_err(|source| ExecError::Spawn {
            command: runtime.command.clone(),
            source,
        })?;

    // Drain pipes on background threads so a chatty child can't deadlock
    // against a full pipe while we wait for it to exit.
    let stdout_reader = child.stdout.take().map(spawn_drain);
    let stderr_reader = child.stderr.take().map(spawn_drain);

    let status = wait_with_deadline(&mut child, &runtime.command, timeout)?;

    let stdout = join_drain(stdout_reader, &runtime.command)?;
    let stderr = match stderr_reader {
        Some(reader) => Some(join_drain(Some(reader), &runtime.command)?.unwrap_or_default()),
        None => None,
    };

    let exit_code = status.code().unwrap_or(-1);
    debug!(
        command = %runtime.command,
        program = %program,
        exit_code,
        "runtime finished"
    );

    Ok(ExecutionResult {
        exit_code,
        stdout: stdout.unwrap_or_default(),
        stderr,
    })
}

/// Reads a child stream to EOF on its own thread.
fn spawn_drain<R: Read + Send + 'static>(mut stream: R) -> thread::JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn join_drain(
    handle: Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    command: &str,
) -> Result<Option<Vec<u8>>, ExecError> {
    let Some(handle) = handle else {
        return Ok(None);
    };
    let bytes = handle
        .join()
        .unwrap_or_else(|_| Ok(Vec::new()))
        .map_err(|source| ExecError::Io {
            command: command.to_string(),
            source,
        })?;
    Ok(Some(bytes))
}

/// Polls the child until it exits or the deadline passes; kills it on expiry.
fn wait_with_deadline(
    child: &mut Child,
    command: &str,
    timeout: Duration,
) -> Result<ExitStatus, ExecError> {
    let started = Instant::now();
    loop {
        let status = child.try_wait().map_err(|source| ExecError::Io {
            command: command.to_string(),
            source,
        })?;
        if let Some(status) = status {
            return Ok(status);
        }
        if started.elapsed() >= timeout {
            // Best-effort kill; the child may have exited in between.
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecError::Timeout {
                command: command.to_string(),
                timeout,
            });
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

// ──────────────────────────────────────────────────────────────────────────
// In-process eval signal
// ──────────────────────────────────────────────────────────────────────────

/// Accumulator behind the single injected `print` capability.
///
/// `print` appends the message plus the platform line terminator; nothing
/// else of the host is visible to evaluated payloads.
#[derive(Debug, Default)]
struct PrintSink {
    buffer: String,
}

impl PrintSink {
    fn print(&mut self, message: &JsString) {
        self.buffer.push_str(&message.to_text_lossy());
        self.buffer.push_str(LINE_ENDING);
    }
}

/// A successful in-process evaluation: the payload's string value and what
/// `print` accumulated for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalRun {
    /// The value the payload expression evaluated to.
    pub value: JsString,
    /// Output accumulated through the `print` capability.
    pub printed: String,
}

/// The third signal: either a successful evaluation or a captured error.
pub type EvalSignal = Result<EvalRun, EvalError>;

/// Evaluates the payload bytes in-process.
///
/// Returns `None` when the bytes are not valid UTF-8 — a payload that
/// cannot be decoded simply has no in-process opinion, and must never
/// crash the harness. Decoding or evaluation failure inside the sandbox is
/// captured as the `Err` side of the signal, not propagated.
#[must_use]
pub fn eval_signal(payload: &[u8]) -> Option<EvalSignal> {
    let source = std::str::from_utf8(payload).ok()?;
    let signal = sandbox::evaluate(source).and_then(|value| match value {
        Value::Str(value) => {
            let mut sink = PrintSink::default();
            sink.print(&value);
            Ok(EvalRun {
                value,
                printed: sink.buffer,
            })
        }
        Value::Number(_) => Err(EvalError::NotAString),
    });
    Some(signal)
}
