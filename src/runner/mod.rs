//! Component E/F — Runner registry and per-build-tool command synthesis.
//!
//! Every runner implements the same four-operation capability set (§4.E);
//! the registry is a flat match on `(language, build_tool)` rather than a
//! class hierarchy, per Design Notes §9 ("model each runner as a value
//! implementing the four operations... use a tagged variant for the
//! registry"). Grounded on `framework.rs`'s `TestFramework` trait plus
//! `main.rs`'s match-based framework construction.

pub mod bazel;
pub mod command;
pub mod dotnet;
pub mod gradle;
pub(crate) mod jvm_common;
pub mod maven;
pub mod nunit;
pub mod pytest;
pub mod rspec;
pub mod sbt;
pub mod unittest;

use crate::error::RunnerError;
use crate::model::{PackagedFile, RunnableTest};
use async_trait::async_trait;
use std::path::Path;

/// Inputs to [`Runner::get_cmd`] (§4.E #4).
pub struct GetCmdInput<'a> {
    pub selected_tests: &'a [RunnableTest],
    pub user_args: &'a str,
    pub workspace: &'a Path,
    pub agent_config_path: &'a Path,
    pub agent_install_dir: &'a Path,
    pub ignore_instr: bool,
    pub run_all: bool,
}

/// The capability set every build-tool-specific runner implements (§4.E).
#[async_trait]
pub trait Runner: Send + Sync {
    /// Extracts top-level package names from source-code headers. Only
    /// meaningful for the JVM family; other languages return an empty list.
    async fn auto_detect_packages(&self, workspace: &Path) -> Result<Vec<String>, RunnerError>;

    /// Globs `workspace`, classifies each match (§4.A), and keeps the tests.
    async fn auto_detect_tests(
        &self,
        workspace: &Path,
        test_globs: &[String],
    ) -> Result<Vec<RunnableTest>, RunnerError>;

    /// Attaches a `package` attribute to each file, for JVM-family runners.
    async fn read_packages(
        &self,
        workspace: &Path,
        files: Vec<crate::model::File>,
    ) -> Result<Vec<PackagedFile>, RunnerError>;

    /// Produces the shell command for this step (§4.F).
    async fn get_cmd(&self, input: GetCmdInput<'_>) -> Result<String, RunnerError>;
}

/// Looks up the [`Runner`] for a `(language, build_tool)` pair (§4.E's
/// keyed table). Unsupported combinations are a configuration error (§7).
pub fn resolve(language: &str, build_tool: &str) -> Result<Box<dyn Runner>, RunnerError> {
    let jvm = matches!(language, "java" | "kotlin" | "scala");
    match (language, build_tool) {
        (_, "maven") if jvm => Ok(Box::new(maven::MavenRunner)),
        (_, "gradle") if jvm => Ok(Box::new(gradle::GradleRunner)),
        (_, "bazel") if jvm => Ok(Box::new(bazel::BazelRunner)),
        ("scala", "sbt") => Ok(Box::new(sbt::SbtRunner)),
        ("csharp", "dotnet") => Ok(Box::new(dotnet::DotnetRunner)),
        ("csharp", "nunitconsole") => Ok(Box::new(nunit::NunitConsoleRunner)),
        ("python", "pytest") => Ok(Box::new(pytest::PytestRunner)),
        ("python", "unittest") => Ok(Box::new(unittest::UnittestRunner)),
        ("ruby", "rspec") => Ok(Box::new(rspec::RspecRunner)),
        _ => Err(RunnerError::Unsupported {
            language: language.to_string(),
            build_tool: build_tool.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_documented_combination() {
        let combos = [
            ("java", "maven"),
            ("kotlin", "maven"),
            ("scala", "maven"),
            ("java", "gradle"),
            ("java", "bazel"),
            ("scala", "sbt"),
            ("csharp", "dotnet"),
            ("csharp", "nunitconsole"),
            ("python", "pytest"),
            ("python", "unittest"),
            ("ruby", "rspec"),
        ];
        for (lang, tool) in combos {
            assert!(resolve(lang, tool).is_ok(), "{lang}/{tool} should resolve");
        }
    }

    #[test]
    fn unsupported_combination_is_a_configuration_error() {
        let err = resolve("python", "bazel").unwrap_err();
        assert!(matches!(err, RunnerError::Unsupported { .. }));
    }
}
