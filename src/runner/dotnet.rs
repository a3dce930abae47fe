//! Dotnet runner (§4.F).
//!
//! Two-phase command, newline-joined: one injector invocation per test DLL
//! found in `user_args` (wiring the agent config into that DLL before it
//! loads), then the actual `dotnet test` invocation. Archive extraction for
//! the injector/agent itself is out of this crate's scope (§1); this runner
//! only assumes `agent_install_dir` already holds it.

use crate::error::RunnerError;
use crate::model::{File, PackagedFile, RunnableTest};
use crate::runner::command::{dedup_qualified_classes, skip_sentinel_if_empty};
use crate::runner::{GetCmdInput, Runner};
use async_trait::async_trait;
use std::path::Path;

pub struct DotnetRunner;

#[async_trait]
impl Runner for DotnetRunner {
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
            for dll in super::nunit::dlls_from_user_args(input.user_args) {
                lines.push(format!("\"{}\" \"{}\" \"{}\"", injector.display(), dll, input.agent_config_path.display()));
            }
        }

        let mut test_cmd = "dotnet test --no-build".to_string();
        if input.run_all {
            if !input.user_args.is_empty() {
                test_cmd.push(' ');
                test_cmd.push_str(input.user_args);
            }
        } else {
            let filter = dedup_qualified_classes(input.selected_tests)
                .iter()
                .map(|c| format!("FullyQualifiedName~{c}"))
                .collect::<Vec<_>>()
                .join("|");
            test_cmd.push_str(&format!(" --filter \"{filter}\""));
        }
        lines.push(test_cmd);

        Ok(lines.join("\n"))
    }
}
