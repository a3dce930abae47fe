//! §4.B.1 — Bazel fan-out policy.
//!
//! When a changed file ends in `BUILD.bazel`, a single build-file edit can
//! touch every test under that package. This module decides, for one such
//! file, whether to signal "run everything," add the package to a module
//! list the runner can target directly, or expand to the exact Java sources
//! the query reports.

use crate::error::ChangesError;
use crate::process;
use std::path::Path;

/// Outcome of fanning a single `BUILD.bazel` change out to its real targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutResult {
    /// The repository-root build file changed; treat the whole repo as changed.
    RunEverything,
    /// Enough sources live under this package that targeting its `tests` rule
    /// directly is cheaper than listing every file.
    Module(String),
    /// Exact `.java` sources to treat as changed.
    Sources(Vec<String>),
}

/// Above this many declared `java` sources in a package, prefer adding the
/// whole module to the module list over listing exact sources (§4.B.1).
pub const MODULE_THRESHOLD: usize = 50;

/// Resolves one `BUILD.bazel` change under `pkg_dir` (relative to `workspace`).
pub async fn fan_out(
    workspace: &Path,
    pkg_dir: &str,
    step_id: &str,
) -> Result<FanOutResult, ChangesError> {
    if is_repo_root_build_file(pkg_dir) {
        return Ok(FanOutResult::RunEverything);
    }

    let query = format!("kind(\"java\", {pkg_dir}:*)");
    let output = process::run("bazel", &["query", &query], workspace)
        .await
        .map_err(|source| ChangesError::BazelFailed {
            step_id: step_id.to_string(),
            source,
        })?;
    let labels: Vec<&str> = output
        .stdout_str()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .into_iter()
        .collect();
    let count = labels.len();

    if count == 0 {
        // No declared java sources; treat every .java file under the directory as changed.
        let ls_output = process::run("find", &[pkg_dir, "-name", "*.java"], workspace)
            .await
            .map_err(|source| ChangesError::BazelFailed {
                step_id: step_id.to_string(),
                source,
            })?;
        let sources = ls_output
            .stdout_str()
            .lines()
            .map(|s| s.to_string())
            .collect();
        return Ok(FanOutResult::Sources(sources));
    }

    if count >= MODULE_THRESHOLD {
        return Ok(FanOutResult::Module(pkg_dir.to_string()));
    }

    Ok(FanOutResult::Sources(
        labels.into_iter().map(|l| l.to_string()).collect(),
    ))
}

fn is_repo_root_build_file(pkg_dir: &str) -> bool {
    pkg_dir.is_empty() || pkg_dir == "." || pkg_dir == "//"
}
