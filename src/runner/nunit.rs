//! NUnit console runner (§4.F). Same injector-per-DLL shape as Dotnet, but
//! `nunit3-console`'s own filter syntax (`--where "class =~ ... || ..."`)
//! instead of `dotnet test --filter`.

use crate::error::RunnerError;
use crate::model::{File, PackagedFile, RunnableTest};
use crate::runner::command::{dedup_qualified_classes, join_nonempty, skip_sentinel_if_empty};
use crate::runner::{GetCmdInput, Runner};
use async_trait::async_trait;
use std::path::Path;

pub struct NunitConsoleRunner;

#[async_trait]
impl Runner for NunitConsoleRunner {
    async fn auto_detect_packages(&self, _workspace: &Path) -> Result<Vec<String>, RunnerError> {
        Ok(Vec::new())
    }

    async fn auto_detect_tests(
        &self,
        workspace: &Path,
        test_globs: &[String],
    ) -> Result<Vec<RunnableTest>, RunnerError> {
        Ok(crate::classify::auto_detect_tests_by_extension(workspace, &["cs", "vb", "fs"], test_globs).await)
    }

    async fn read_packages(
        &self,
        _workspace: &Path,
        files: Vec<File>,
    ) -> Result<Vec<PackagedFile>, RunnerError> {
        Ok(files.into_iter().map(|file| PackagedFile { file, package: None }).collect())
    }

    async fn get_cmd(&self, input: GetCmdInput<'_>) -> Result<String, RunnerError> {
        if let Some(sentinel) = skip_sentinel_if_empty(input.run_all, input.selected_tests) {
            return Ok(sentinel);
        }

        let mut lines = Vec::new();
        if !input.ignore_instr {
            let injector = input.agent_install_dir.join("injector");
            for dll in dlls_from_user_args(input.user_args) {
                lines.push(format!("\"{}\" \"{}\" \"{}\"", injector.display(), dll, input.agent_config_path.display()));
            }
        }

        let filter = if input.run_all {
            String::new()
        } else {
            let clauses: Vec<String> = dedup_qualified_classes(input.selected_tests)
                .iter()
                .map(|c| format!("class =~ {c}"))
                .collect();
            format!("--where \"{}\"", clauses.join(" || "))
        };

        lines.push(join_nonempty(&["nunit3-console", input.user_args, &filter]));
        Ok(lines.join("\n"))
    }
}

/// Extracts every `.dll`-suffixed token from `user_args` (shared with
/// `runner::dotnet`, whose injector phase has the same shape).
pub(crate) fn dlls_from_user_args(user_args: &str) -> Vec<String> {
    user_args
        .split_whitespace()
        .filter(|t| t.ends_with(".dll"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectionReason;
    use std::path::PathBuf;

    #[tokio::test]
    async fn renders_or_joined_class_filter() {
        let tests = vec![
            RunnableTest::new("", "N1", SelectionReason::SourceCode),
            RunnableTest::new("", "N2", SelectionReason::SourceCode),
        ];
        let runner = NunitConsoleRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &tests,
                user_args: "Tests.dll",
                workspace: Path::new("."),
                agent_config_path: &PathBuf::from("/tmp/cfg.yaml"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: true,
                run_all: false,
            })
            .await
            .unwrap();
        assert_eq!(cmd, "nunit3-console Tests.dll --where \"class =~ N1 || class =~ N2\"");
    }

    #[test]
    fn extracts_dll_tokens_only() {
        assert_eq!(dlls_from_user_args("Tests.dll --noheader Other.dll"), vec!["Tests.dll", "Other.dll"]);
    }
}
