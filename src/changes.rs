//! Component B — Changed-files provider.
//!
//! Two modes share one output shape: PR mode diffs merge-base against the PR
//! head; push/manual mode diffs the TI service's `last_successful_commit`
//! against the current SHA, treating an empty `last_successful_commit` as a
//! bootstrap signal that forces a full run. Both go through [`crate::process`]
//! so the diff-parsing logic here stays unit-testable without a real repo.

pub mod bazel;
pub mod checksum;

use crate::error::ChangesError;
use crate::model::{File, FileStatus};
use crate::process::{self, ProcessOutput};
use std::path::Path;

/// Where the PR/push distinction and the pinned commits come from; supplied
/// by the surrounding CI worker, not derived here.
#[derive(Debug, Clone)]
pub enum DiffMode {
    /// `merge_base..pr_head`, PR builds.
    PullRequest { merge_base: String, pr_head: String },
    /// `last_successful_commit..current_sha`; `last_successful_commit` empty
    /// means "bootstrap," forcing a full run.
    Push {
        last_successful_commit: String,
        current_sha: String,
    },
}

/// Result of listing changed files for one step.
#[derive(Debug, Clone, Default)]
pub struct ChangedFiles {
    pub files: Vec<File>,
    /// Set when push mode's `last_successful_commit` was empty.
    pub is_bootstrap: bool,
}

/// Lists changed files for `mode`, running `git diff --name-status` under `workspace`.
pub async fn changed_files(
    workspace: &Path,
    mode: &DiffMode,
    step_id: &str,
) -> Result<ChangedFiles, ChangesError> {
    match mode {
        DiffMode::PullRequest { merge_base, pr_head } => {
            let range = format!("{merge_base}..{pr_head}");
            let output = process::run(
                "git",
                &["diff", "--name-status", &range],
                workspace,
            )
            .await
            .map_err(|source| ChangesError::GitFailed {
                step_id: step_id.to_string(),
                source,
            })?;
            Ok(ChangedFiles {
                files: parse_name_status(&output)?,
                is_bootstrap: false,
            })
        }
        DiffMode::Push {
            last_successful_commit,
            current_sha,
        } => {
            if last_successful_commit.is_empty() {
                return Ok(ChangedFiles {
                    files: Vec::new(),
                    is_bootstrap: true,
                });
            }
            let range = format!("{last_successful_commit}..{current_sha}");
            let output = process::run(
                "git",
                &["diff", "--name-status", &range],
                workspace,
            )
            .await
            .map_err(|source| ChangesError::GitFailed {
                step_id: step_id.to_string(),
                source,
            })?;
            Ok(ChangedFiles {
                files: parse_name_status(&output)?,
                is_bootstrap: false,
            })
        }
    }
}

/// Parses `git diff --name-status` output. Rename entries (`R###`) are
/// expanded to a delete of the old path plus an add of the new path (§4.B).
/// Unrecognized status codes are logged by the caller and stop iteration
/// without raising an error, per §4.B.
fn parse_name_status(output: &ProcessOutput) -> Result<Vec<File>, ChangesError> {
    let mut files = Vec::new();
    for line in output.stdout_str().lines() {
        let mut parts = line.split('\t');
        let code = match parts.next() {
            Some(c) if !c.is_empty() => c,
            _ => continue,
        };
        let status_char = code.chars().next().unwrap_or('?');
        match status_char {
            'A' => {
                if let Some(path) = parts.next() {
                    files.push(File {
                        name: path.to_string(),
                        status: FileStatus::Added,
                    });
                }
            }
            'M' => {
                if let Some(path) = parts.next() {
                    files.push(File {
                        name: path.to_string(),
                        status: FileStatus::Modified,
                    });
                }
            }
            'D' => {
                if let Some(path) = parts.next() {
                    files.push(File {
                        name: path.to_string(),
                        status: FileStatus::Deleted,
                    });
                }
            }
            'R' => {
                let (old, new) = (parts.next(), parts.next());
                if let (Some(old), Some(new)) = (old, new) {
                    files.push(File {
                        name: old.to_string(),
                        status: FileStatus::Deleted,
                    });
                    files.push(File {
                        name: new.to_string(),
                        status: FileStatus::Added,
                    });
                }
            }
            _ => {
                // Unknown status: terminate iteration without raising an error (§4.B).
                tracing::warn!(code, "unrecognized git status code; stopping diff scan");
                break;
            }
        }
    }
    Ok(files)
}
