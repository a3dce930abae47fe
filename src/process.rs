//! Thin wrapper around external process invocation.
//!
//! `git` (changed-files detection) and `bazel` (fan-out queries) are the only
//! child processes the core spawns. Both go through [`run`] so unit tests can
//! swap in canned `(stdout, status)` pairs instead of shelling out (§9).

use std::path::Path;
use std::process::Output;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
}

/// Output of a completed child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

impl From<Output> for ProcessOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            status: output.status.code(),
        }
    }
}

/// Runs `program` with `args` in `cwd`, returning its captured output.
///
/// This is the only place in the crate that calls [`tokio::process::Command`]
/// directly; `changes.rs` and `changes/bazel.rs` both go through it so that
/// their own logic can be unit-tested against canned [`ProcessOutput`] values.
pub async fn run(program: &str, args: &[&str], cwd: &Path) -> Result<ProcessOutput, ProcessError> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;
    Ok(output.into())
}

/// Same as [`run`], but abandons the child if it does not finish within `timeout_secs`.
pub async fn run_with_timeout(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout_secs: u64,
) -> Result<ProcessOutput, ProcessError> {
    let fut = tokio::process::Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output();
    match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), fut).await {
        Ok(Ok(output)) => Ok(output.into()),
        Ok(Err(source)) => Err(ProcessError::Spawn {
            program: program.to_string(),
            source,
        }),
        Err(_) => Err(ProcessError::Timeout {
            program: program.to_string(),
            secs: timeout_secs,
        }),
    }
}
