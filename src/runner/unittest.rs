//! Unittest runner (§4.F). Same shape as [`crate::runner::pytest`],
//! substituting `unittest` for `pytest` and the unittest-specific agent
//! entry point.

use crate::error::RunnerError;
use crate::model::{File, PackagedFile, RunnableTest};
use crate::runner::command::{dedup_qualified_classes, skip_sentinel_if_empty};
use crate::runner::{GetCmdInput, Runner};
use async_trait::async_trait;
use std::path::Path;

pub struct UnittestRunner;

#[async_trait]
impl Runner for UnittestRunner {
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

        if input.ignore_instr {
            let mut cmd = "python3 -m unittest".to_string();
            if !input.run_all {
                for class in dedup_qualified_classes(input.selected_tests) {
                    cmd.push(' ');
                    cmd.push_str(&class);
                }
            }
            if !input.user_args.is_empty() {
                cmd.push(' ');
                cmd.push_str(input.user_args);
            }
            return Ok(cmd);
        }

        let script = input.agent_install_dir.join("python_agent.py");
        let mut cmd = format!("python3 {} . --test_harness \"unittest {}\"", script.display(), input.user_args);
        if !input.run_all {
            cmd.push_str(" --test_files ");
            cmd.push_str(&dedup_qualified_classes(input.selected_tests).join(","));
        }
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectionReason;
    use std::path::PathBuf;

    #[tokio::test]
    async fn ignore_instr_lists_classes_positionally() {
        let tests = vec![RunnableTest::new("pkg", "WidgetTest", SelectionReason::SourceCode)];
        let runner = UnittestRunner;
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
        assert_eq!(cmd, "python3 -m unittest pkg.WidgetTest");
    }
}
