//! RSpec runner (§4.F). Ruby has no instrumentation config file — the agent
//! is switched on with a `TI=1` environment variable on the `bundle exec`
//! invocation instead (§4.J point 3), and is injected into the bundle with
//! `bundle add` rather than a separate downloaded binary path.

use crate::error::RunnerError;
use crate::model::{File, PackagedFile, RunnableTest};
use crate::runner::command::{dedup_qualified_classes, skip_sentinel_if_empty};
use crate::runner::{GetCmdInput, Runner};
use async_trait::async_trait;
use std::path::Path;

const DEFAULT_JUNIT_PATH: &str = "harness_test_results.xml";

pub struct RspecRunner;

#[async_trait]
impl Runner for RspecRunner {
    async fn auto_detect_packages(&self, _workspace: &Path) -> Result<Vec<String>, RunnerError> {
        Ok(Vec::new())
    }

    async fn auto_detect_tests(
        &self,
        workspace: &Path,
        test_globs: &[String],
    ) -> Result<Vec<RunnableTest>, RunnerError> {
        Ok(crate::classify::auto_detect_tests_by_extension(workspace, &["rb"], test_globs).await)
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
            lines.push(format!("bundle add harness_ruby_agent --path {} || true", input.agent_install_dir.display()));
        }

        let args = if input.user_args.is_empty() {
            lines.push("bundle add rspec_junit_formatter || true".to_string());
            format!("--format RspecJunitFormatter --out '{DEFAULT_JUNIT_PATH}${{SHARD_INDEX}}'")
        } else {
            input.user_args.to_string()
        };

        let specs = if input.run_all {
            String::new()
        } else {
            dedup_qualified_classes(input.selected_tests).join(" ")
        };

        let main = if input.ignore_instr {
            format!("bundle exec rspec {args} {specs}")
        } else {
            format!("TI=1 bundle exec rspec {args} {specs}")
        };
        lines.push(main.trim().to_string());

        Ok(lines.join(" && "))
    }
}
