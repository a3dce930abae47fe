//! SBT runner (§4.F). Scala-only; shares JVM source-layout conventions with
//! Maven/Gradle/Bazel but its own agent-attach and filter syntax (SBT
//! settings expressions, not CLI flags).

use crate::error::RunnerError;
use crate::model::{File, PackagedFile, RunnableTest};
use crate::runner::command::{dedup_qualified_classes, join_nonempty, skip_sentinel_if_empty};
use crate::runner::{GetCmdInput, Runner};
use async_trait::async_trait;
use std::path::Path;

pub struct SbtRunner;

#[async_trait]
impl Runner for SbtRunner {
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

        let agent = if input.ignore_instr {
            String::new()
        } else {
            let jar = input.agent_install_dir.join("java-agent.jar");
            format!(
                "'set javaOptions ++= Seq(\"-javaagent:{}={}\")'",
                jar.display(),
                input.agent_config_path.display()
            )
        };

        let filter = if input.run_all {
            String::new()
        } else {
            format!("'testOnly {}'", dedup_qualified_classes(input.selected_tests).join(" "))
        };

        Ok(join_nonempty(&["sbt", input.user_args, &agent, &filter]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectionReason;
    use std::path::PathBuf;

    #[tokio::test]
    async fn renders_set_javaoptions_and_testonly() {
        let tests = vec![RunnableTest::new("com.acme", "WidgetSpec", SelectionReason::SourceCode)];
        let runner = SbtRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &tests,
                user_args: "",
                workspace: Path::new("."),
                agent_config_path: &PathBuf::from("/tmp/cfg.ini"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: false,
                run_all: false,
            })
            .await
            .unwrap();
        assert!(cmd.contains("'set javaOptions ++= Seq(\"-javaagent:/opt/agent/java-agent.jar=/tmp/cfg.ini\")'"));
        assert!(cmd.contains("'testOnly com.acme.WidgetSpec'"));
    }
}
