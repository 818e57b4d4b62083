// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Deadline bridge between a case's pipeline and the run loop.
//!
//! The run loop is synchronous and must observe a deterministic number of
//! verdicts, so each case's execute-and-judge pipeline runs on a worker
//! thread joined with a wall-clock deadline. A pipeline that never settles
//! surfaces as [`BridgeError::DeadlineExpired`] instead of stalling the
//! whole run, and a worker that dies without reporting (a panic) surfaces
//! as [`BridgeError::WorkerLost`] rather than being re-thrown — the todo
//! handling in the harness needs to *inspect* failures, not unwind on them.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// A failure of the bridge itself, as opposed to the pipeline it ran.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum BridgeError {
    /// The pipeline did not settle before the deadline.
    #[error("case did not complete within {}s", deadline.as_secs())]
    #[diagnostic(help("a hung child process should have been killed by the executor's own timeout; this usually means the harness itself is stuck"))]
    DeadlineExpired {
        /// The deadline that expired.
        deadline: Duration,
    },

    /// The worker terminated without sending a result (it panicked).
    #[error("case worker terminated without reporting a result")]
    WorkerLost,
}

/// Runs `task` on a worker thread and waits for its result up to `deadline`.
///
/// On deadline expiry the worker is detached, not joined: the executor's
/// per-child timeout bounds how long it can actually linger.
///
/// # Errors
///
/// Returns [`BridgeError::DeadlineExpired`] if no result arrives in time,
/// or [`BridgeError::WorkerLost`] if the worker panicked.
pub fn run_with_deadline<T, F>(deadline: Duration, task: F) -> Result<T, BridgeError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    let worker = thread::spawn(move || {
        // A send error means the receiver gave up; nothing left to do.
        let _ = sender.send(task());
    });

    match receiver.recv_timeout(deadline) {
        Ok(value) => {
            let _ = worker.join();
            Ok(value)
        }
        Err(RecvTimeoutError::Timeout) => Err(BridgeError::DeadlineExpired { deadline }),
        Err(RecvTimeoutError::Disconnected) => {
            let _ = worker.join();
            Err(BridgeError::WorkerLost)
        }
    }
}
