//! Shared auto-detection/package-attachment logic for the three JVM-family
//! runners (Maven, Gradle, Bazel). SBT shares the same source layout
//! conventions but implements its own thin wrapper in `runner/sbt.rs`.

use crate::classify::classify;
use crate::error::RunnerError;
use crate::model::{File, NodeType, PackagedFile, RunnableTest, SelectionReason};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const JVM_EXTENSIONS: [&str; 4] = ["java", "scala", "kt", "kts"];

fn package_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;?\s*$").unwrap())
}

/// Walks `workspace` for JVM source files and extracts the `package`
/// declaration from each header (§4.E #1).
pub async fn auto_detect_packages(workspace: &Path) -> Result<Vec<String>, RunnerError> {
    let workspace = workspace.to_path_buf();
    let packages = tokio::task::spawn_blocking(move || {
        let mut packages = Vec::new();
        for path in walk_source_files(&workspace) {
            if let Ok(content) = std::fs::read_to_string(&path)
                && let Some(caps) = package_regex().captures(&content)
            {
                packages.push(caps[1].to_string());
            }
        }
        packages.sort();
        packages.dedup();
        packages
    })
    .await
    .unwrap_or_default();
    Ok(packages)
}

/// Walks `workspace`, classifies every JVM source file (§4.A), and returns
/// the ones that classify as tests (§4.E #2).
pub async fn auto_detect_tests(
    workspace: &Path,
    test_globs: &[String],
) -> Result<Vec<RunnableTest>, RunnerError> {
    let workspace = workspace.to_path_buf();
    let test_globs = test_globs.to_vec();
    let tests = tokio::task::spawn_blocking(move || {
        let mut tests = Vec::new();
        for path in walk_source_files(&workspace) {
            let rel = relative_str(&workspace, &path);
            let node = classify(&rel, &test_globs);
            if node.node_type == NodeType::Test {
                tests.push(RunnableTest::new(node.package, node.class, SelectionReason::SourceCode));
            }
        }
        tests
    })
    .await
    .unwrap_or_default();
    Ok(tests)
}

/// Attaches each file's package (derived from its path via the classifier,
/// not its contents) for the JVM-family runners (§4.E #3).
pub async fn read_packages(_workspace: &Path, files: Vec<File>) -> Result<Vec<PackagedFile>, RunnerError> {
    Ok(files
        .into_iter()
        .map(|f| {
            let node = classify(&f.name, &[]);
            let package = if node.package.is_empty() { None } else { Some(node.package) };
            PackagedFile { file: f, package }
        })
        .collect())
}

fn relative_str(workspace: &Path, path: &Path) -> String {
    path.strip_prefix(workspace)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn walk_source_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk_source_files_into(root, &mut out);
    out
}

fn walk_source_files_into(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_source_files_into(&path, out);
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str())
            && JVM_EXTENSIONS.contains(&ext)
        {
            out.push(path);
        }
    }
}
