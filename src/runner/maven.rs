//! Maven runner (§4.F).
//!
//! The instrumentation agent attaches via `-DargLine`, which Maven passes
//! through to the forked JVM running Surefire. Any `-Duser.*` token already
//! present in `user_args` is relocated into that same `-DargLine` value —
//! Surefire only forwards JVM args named there, not bare `-D` flags on the
//! `mvn` command line itself — with everything else left as trailing `mvn`
//! arguments (goals like `clean test`).
//!
//! Open Question (§9): the historical `argLine` quoting condition
//! (`strings.HasPrefix(instrArg, "")`) was always true, so this
//! implementation always double-quotes `argLine` rather than reproducing
//! the dead conditional.

use crate::error::RunnerError;
use crate::model::{File, PackagedFile, RunnableTest};
use crate::runner::command::{dedup_qualified_classes, skip_sentinel_if_empty};
use crate::runner::{GetCmdInput, Runner};
use async_trait::async_trait;
use std::path::Path;

pub struct MavenRunner;

#[async_trait]
impl Runner for MavenRunner {
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

        let (relocated, remaining) = relocate_user_props(input.user_args);
        let mut tokens: Vec<String> = vec!["mvn".to_string()];

        if !input.run_all {
            let classes = dedup_qualified_classes(input.selected_tests);
            tokens.push(format!("-Dtest={}", classes.join(",")));
            tokens.push("-am".to_string());
        }

        if !input.ignore_instr {
            let jar = input.agent_install_dir.join("java-agent.jar");
            let mut arg_line = relocated.join(" ");
            if !arg_line.is_empty() {
                arg_line.push(' ');
            }
            arg_line.push_str(&format!("-javaagent:{}={}", jar.display(), input.agent_config_path.display()));
            tokens.push(format!("-DargLine=\"{arg_line}\""));
        }

        if !remaining.is_empty() {
            tokens.push(remaining.join(" "));
        }

        Ok(tokens.join(" "))
    }
}

/// Splits `user_args` tokens into `-Duser.*` properties (relocated into
/// `argLine`) and everything else (left as trailing `mvn` goals/args), each
/// preserving its original relative order.
fn relocate_user_props(user_args: &str) -> (Vec<String>, Vec<String>) {
    let mut relocated = Vec::new();
    let mut remaining = Vec::new();
    for token in user_args.split_whitespace() {
        if token.starts_with("-Duser.") {
            relocated.push(token.to_string());
        } else {
            remaining.push(token.to_string());
        }
    }
    (relocated, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectionReason;
    use std::path::PathBuf;

    fn test_named(pkg: &str, class: &str) -> RunnableTest {
        RunnableTest::new(pkg, class, SelectionReason::SourceCode)
    }

    #[tokio::test]
    async fn matches_the_two_test_two_duser_arg_scenario() {
        let tests = vec![test_named("pkg1", "cls1"), test_named("pkg2", "cls2")];
        let runner = MavenRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &tests,
                user_args: "clean test -Duser.timezone=US/Mountain -Duser.locale=en/US",
                workspace: Path::new("."),
                agent_config_path: &PathBuf::from("/tmp/agent.ini"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: false,
                run_all: false,
            })
            .await
            .unwrap();

        assert!(cmd.starts_with("mvn -Dtest=pkg1.cls1,pkg2.cls2 -am -DargLine=\""));
        assert!(cmd.contains("-Duser.timezone=US/Mountain -Duser.locale=en/US -javaagent:/opt/agent/java-agent.jar=/tmp/agent.ini"));
        assert!(cmd.ends_with("clean test"));
    }

    #[tokio::test]
    async fn empty_selection_yields_skip_sentinel() {
        let runner = MavenRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &[],
                user_args: "",
                workspace: Path::new("."),
                agent_config_path: &PathBuf::from("/tmp/agent.ini"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: false,
                run_all: false,
            })
            .await
            .unwrap();
        assert_eq!(cmd, crate::runner::command::SKIP_SENTINEL);
    }

    #[tokio::test]
    async fn run_all_with_ignored_instrumentation_is_bare() {
        let runner = MavenRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &[],
                user_args: "clean test",
                workspace: Path::new("."),
                agent_config_path: &PathBuf::from("/tmp/agent.ini"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: true,
                run_all: true,
            })
            .await
            .unwrap();
        assert_eq!(cmd, "mvn clean test");
    }

    #[test]
    fn duplicate_tests_collapse_before_rendering() {
        let tests = vec![test_named("p", "A"), test_named("p", "A")];
        assert_eq!(dedup_qualified_classes(&tests), vec!["p.A".to_string()]);
    }
}
