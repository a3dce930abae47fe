//! Bazel runner (§4.F).
//!
//! Bazel targets tests by label, not by class name, so selected tests must
//! be resolved to `//pkg:target` labels before they can be filtered. A
//! test's label comes from `autodetect.rule` when the Bazel changed-files
//! fan-out (§4.B.1) already resolved it; otherwise this runner queries the
//! build graph directly, falling back to a source-file lookup. Any test
//! that resolves to nothing is dropped; if resolution empties the whole
//! selection, the skip sentinel is emitted (§4.F).

use crate::error::RunnerError;
use crate::model::{File, PackagedFile, RunnableTest, dedup_by_package_class};
use crate::process;
use crate::runner::command::{join_nonempty, skip_sentinel_if_empty, SKIP_SENTINEL};
use crate::runner::{GetCmdInput, Runner};
use async_trait::async_trait;
use std::path::Path;

pub struct BazelRunner;

#[async_trait]
impl Runner for BazelRunner {
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

        let agent_define = if input.ignore_instr {
            None
        } else {
            let jar = input.agent_install_dir.join("java-agent.jar");
            Some(format!("--define=HARNESS_ARGS=-javaagent:{}={}", jar.display(), input.agent_config_path.display()))
        };

        if input.run_all {
            return Ok(match &agent_define {
                Some(define) => format!("bazel {} {}", input.user_args, define),
                None => join_nonempty(&["bazel", input.user_args]),
            });
        }

        let mut labels = Vec::new();
        for test in dedup_by_package_class(input.selected_tests) {
            if let Some(label) = resolve_label(input.workspace, test).await {
                labels.push(label);
            }
        }

        if labels.is_empty() {
            return Ok(SKIP_SENTINEL.to_string());
        }

        Ok(match &agent_define {
            Some(define) => format!("bazel {} {} {}", input.user_args, define, labels.join(" ")),
            None => join_nonempty(&["bazel", input.user_args, &labels.join(" ")]),
        })
    }
}

/// Resolves one test's Bazel label (§4.F): pre-resolved `autodetect_rule`
/// first, then a direct attribute query, then a source-file-based query
/// chain. Returns `None` if every strategy fails.
async fn resolve_label(workspace: &Path, test: &RunnableTest) -> Option<String> {
    if let Some(rule) = &test.autodetect_rule {
        return Some(rule.clone());
    }

    let qualified = test.qualified_class();
    let attr_query = format!("attr(name, \"{qualified}\", //...)");
    if let Ok(output) = process::run("bazel", &["query", &attr_query], workspace).await
        && let Some(label) = first_nonempty_line(&output.stdout_str())
    {
        return Some(label);
    }

    let source_pattern = format!("{}.java", test.class);
    let find_output = process::run("find", &[".", "-name", &source_pattern], workspace).await.ok()?;
    let path = first_nonempty_line(&find_output.stdout_str())?;

    let fullname_output = process::run("bazel", &["query", &path], workspace).await.ok()?;
    let fullname = first_nonempty_line(&fullname_output.stdout_str())?;

    let srcs_query = format!("attr('srcs', {fullname}, //...)");
    let srcs_output = process::run("bazel", &["query", &srcs_query], workspace).await.ok()?;
    srcs_output
        .stdout_str()
        .lines()
        .map(str::trim)
        .find(|l| l.contains("java_test"))
        .map(str::to_string)
}

fn first_nonempty_line(s: &str) -> Option<String> {
    s.lines().map(str::trim).find(|l| !l.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectionReason;
    use std::path::PathBuf;

    fn test_with_rule(rule: &str) -> RunnableTest {
        let mut t = RunnableTest::new("m1", "A", SelectionReason::SourceCode);
        t.autodetect_rule = Some(rule.to_string());
        t
    }

    #[tokio::test]
    async fn matches_the_pre_resolved_rules_scenario() {
        let mut t1 = test_with_rule("//m1:a");
        t1.class = "A".to_string();
        let mut t2 = test_with_rule("//m1:b");
        t2.class = "B".to_string();
        let tests = vec![t1, t2];

        let runner = BazelRunner;
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

        assert_eq!(cmd, "bazel  --define=HARNESS_ARGS=-javaagent:/opt/agent/java-agent.jar=/tmp/cfg.ini //m1:a //m1:b");
    }

    #[tokio::test]
    async fn unresolvable_test_yields_skip_sentinel() {
        let tests = vec![RunnableTest::new("m1", "Unresolvable", SelectionReason::SourceCode)];
        let runner = BazelRunner;
        let cmd = runner
            .get_cmd(GetCmdInput {
                selected_tests: &tests,
                user_args: "",
                workspace: Path::new("/nonexistent-bazel-workspace-xyz"),
                agent_config_path: &PathBuf::from("/tmp/cfg.ini"),
                agent_install_dir: &PathBuf::from("/opt/agent"),
                ignore_instr: false,
                run_all: false,
            })
            .await
            .unwrap();
        assert_eq!(cmd, SKIP_SENTINEL);
    }
}
