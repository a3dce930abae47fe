//! Pytest runner (§4.F).
//!
//! When instrumented, the agent wraps the whole `pytest` invocation (it
//! needs to observe the interpreter from the outside to record callgraph
//! edges), so the rendered command is `python3 <script> . --test_harness
//! "pytest <args>"` rather than a bare `pytest` call. `ignore_instr` drops
//! that wrapper and calls `python3 -m pytest` directly with an inline `-k`
//! filter instead of `--test_files`.

use crate::error::RunnerError;
use crate::model::{File, PackagedFile, RunnableTest};
use crate::runner::command::{dedup_qualified_classes, skip_sentinel_if_empty};
use crate::runner::{GetCmdInput, Runner};
use async_trait::async_trait;
use std::path::Path;

const DEFAULT_JUNIT_PATH: &str = "harness_test_results.xml";

pub struct PytestRunner;

#[async_trait]
impl Runner for PytestRunner {
    async fn auto_detect_packages(&self, _workspace: &Path) -> Result<Vec<String>, RunnerError> {
        Ok(Vec::new())
    }

    async fn auto_detect_tests(
        &self,
        workspace: &Path,
        test_globs: &[String],
    ) -> Result<Vec<RunnableTest>, RunnerError> {
        Ok(crate::classify::auto_detect_tests_by_extension(workspace, &["py"], test_globs).await)
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

        let args = default_args(input.user_args);

        if input.ignore_instr {
            let filter = if input.run_all {
                String::new()
            } else {
                format!("-k \"{}\" ", or_joined_classes(input.selected_tests))
            };
            return Ok(format!("python3 -m pytest {filter}{args}").trim().to_string());
        }

        let script = input.agent_install_dir.join("python_agent.py");
        let mut cmd = format!("python3 {} . --test_harness \"pytest {args}\"", script.display());
        if !input.run_all {
            cmd.push_str(" --test_files ");
            cmd.push_str(&dedup_qualified_classes(input.selected_tests).join(","));
        }
        Ok(cmd)
    }
}

fn default_args(user_args: &str) -> String {
    if user_args.is_empty() {
        format!("--junitxml='{DEFAULT_JUNIT_PATH}${{SHARD_INDEX}}' -o junit_family='xunit1'")
    } else {
        user_args.to_string()
    }
}

fn or_joined_classes(tests: &[RunnableTest]) -> String {
    dedup_qualified_classes(tests).join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn matches_the_full_run_no_args_scenario() {
        let runner = PytestRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &[],
                user_args: "",
                workspace: Path::new("."),
                agent_config_path: &PathBuf::from("/tmp/cfg.ini"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: false,
                run_all: true,
            })
            .await
            .unwrap();
        assert!(cmd.starts_with("python3 /opt/agent/python_agent.py . --test_harness \"pytest --junitxml='harness_test_results.xml${SHARD_INDEX}' -o junit_family='xunit1'\""));
    }

    #[tokio::test]
    async fn ignore_instr_runs_bare_pytest_module() {
        use crate::model::SelectionReason;
        let tests = vec![RunnableTest::new("", "test_widget", SelectionReason::SourceCode)];
        let runner = PytestRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &tests,
                user_args: "",
                workspace: Path::new("."),
                agent_config_path: &PathBuf::from("/tmp/cfg.ini"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: true,
                run_all: false,
            })
            .await
            .unwrap();
        assert!(cmd.starts_with("python3 -m pytest -k \"test_widget\""));
    }
}
