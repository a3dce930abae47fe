//! Gradle runner (§4.F).
//!
//! Uses the wrapper (`./gradlew`) when the workspace has one, falling back
//! to a bare `gradle` on the PATH. `user_args` is split on the first `||`;
//! pipelines use the trailing half as a fallback clause that still runs if
//! the primary Gradle invocation fails, so it's reattached verbatim after
//! the filter is rendered rather than folded into the main invocation.

use crate::error::RunnerError;
use crate::model::{File, PackagedFile, RunnableTest};
use crate::runner::command::{append_or_clause, dedup_qualified_classes, join_nonempty, skip_sentinel_if_empty, split_trailing_or_clause};
use crate::runner::{GetCmdInput, Runner};
use async_trait::async_trait;
use std::path::Path;

pub struct GradleRunner;

#[async_trait]
impl Runner for GradleRunner {
    async fn auto_detect_packages(&self, workspace: &Path) -> Result<Vec<String>, RunnerError> {
        super::jvm_common::auto_detect_packages(workspace).await
    }

    async fn auto_detect_tests(
        &self,
        workspace: &Path,
        test_globs: &[String],
    ) -> Result<Vec<RunnableTest>, RunnerError> {
        super::jvm_common::auto_detect_tests(workspace, test_globs).await
    }

    async fn read_packages(
        &self,
        workspace: &Path,
        files: Vec<File>,
    ) -> Result<Vec<PackagedFile>, RunnerError> {
        super::jvm_common::read_packages(workspace, files).await
    }

    async fn get_cmd(&self, input: GetCmdInput<'_>) -> Result<String, RunnerError> {
        if let Some(sentinel) = skip_sentinel_if_empty(input.run_all, input.selected_tests) {
            return Ok(sentinel);
        }

        let program = if input.workspace.join("gradlew").exists() { "./gradlew" } else { "gradle" };
        let (before, after) = split_trailing_or_clause(input.user_args);

        let agent = if input.ignore_instr {
            String::new()
        } else {
            let jar = input.agent_install_dir.join("java-agent.jar");
            format!("-DHARNESS_JAVA_AGENT=-javaagent:{}={}", jar.display(), input.agent_config_path.display())
        };

        let filter = if input.run_all {
            String::new()
        } else {
            dedup_qualified_classes(input.selected_tests)
                .iter()
                .map(|c| format!("--tests \"{c}\""))
                .collect::<Vec<_>>()
                .join(" ")
        };

        let cmd = join_nonempty(&[program, &before, &agent, &filter]);
        Ok(append_or_clause(cmd, after.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectionReason;
    use std::path::PathBuf;

    #[tokio::test]
    async fn matches_the_single_test_or_clause_scenario() {
        let tests = vec![RunnableTest::new("pkg2", "cls2", SelectionReason::SourceCode)];
        let runner = GradleRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &tests,
                user_args: "test -Duser.timezone=X || true",
                workspace: Path::new("/nonexistent-workspace"),
                agent_config_path: &PathBuf::from("/tmp/agent.yaml"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: false,
                run_all: false,
            })
            .await
            .unwrap();

        assert_eq!(
            cmd,
            "gradle test -Duser.timezone=X -DHARNESS_JAVA_AGENT=-javaagent:/opt/agent/java-agent.jar=/tmp/agent.yaml --tests \"pkg2.cls2\" || true"
        );
    }

    #[tokio::test]
    async fn uses_gradlew_when_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gradlew"), "#!/bin/sh\n").unwrap();
        let tests = vec![RunnableTest::new("p", "C", SelectionReason::SourceCode)];
        let runner = GradleRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &tests,
                user_args: "",
                workspace: dir.path(),
                agent_config_path: &PathBuf::from("/tmp/agent.yaml"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: true,
                run_all: false,
            })
            .await
            .unwrap();
        assert!(cmd.starts_with("./gradlew"));
    }
}
