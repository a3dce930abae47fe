//! Component C — Test selector.
//!
//! Calls the remote TI service (via [`crate::ti_client::TiClient`]) with the
//! changed-files list and either passes the response through unfiltered
//! (when `select_all` or no globs are configured) or filters it by include
//! globs (§4.C). Every error path — network, malformed response, an invalid
//! `RunnableTest`, zero changed files on a non-bootstrap PR — degrades to
//! "run everything," never propagates as a hard failure, matching §7's
//! "Selection failure" classification.

use crate::classify::build_globset;
use crate::config::TiConfigFile;
use crate::model::{File, RunnableTest, SelectTestsResponse};
use crate::ti_client::{SelectTestsRequest, TiClient};

/// Inputs to one selection call (§4.C).
#[derive(Debug, Clone)]
pub struct SelectionInput<'a> {
    pub changed_files: Vec<File>,
    pub run_only_selected: bool,
    pub step_id: &'a str,
    pub test_globs: Vec<String>,
    pub rerun_failed: bool,
    pub is_bootstrap: bool,
    /// Manual runs (missing source/target branch or SHA) short-circuit to
    /// `run_only_selected = false` regardless of the caller's request.
    pub is_manual: bool,
}

/// Outcome of a selection call: either a concrete test list, or a signal to
/// run every test ("run-all").
#[derive(Debug, Clone)]
pub enum Selection {
    RunAll,
    Tests(Vec<RunnableTest>),
}

pub async fn select_tests(
    client: &dyn TiClient,
    ti_config: Option<&TiConfigFile>,
    input: SelectionInput<'_>,
) -> Selection {
    if input.is_manual {
        return Selection::RunAll;
    }
    if !input.is_bootstrap && input.changed_files.is_empty() {
        tracing::warn!(step_id = input.step_id, "zero changed files on non-bootstrap run; falling back to run-all");
        return Selection::RunAll;
    }

    let run_only_selected = input.run_only_selected;
    let ignore_globs = ti_config.map(|c| c.config.ignore.clone()).unwrap_or_default();
    let filtered_files = filter_ignored(&input.changed_files, &ignore_globs);

    let request = SelectTestsRequest {
        select_all: !run_only_selected,
        files: filtered_files,
        ti_config: None,
        test_globs: input.test_globs.clone(),
    };

    let response = match client.select_tests(input.step_id, request).await {
        Ok(r) => r,
        Err(message) => {
            tracing::warn!(step_id = input.step_id, message, "ti service call failed; falling back to run-all");
            return Selection::RunAll;
        }
    };

    if response.select_all {
        return Selection::RunAll;
    }

    if let Some(poisoned) = response.tests.iter().find(|t| !t.is_valid()) {
        tracing::warn!(
            step_id = input.step_id,
            package = poisoned.package,
            "ti service returned a test with an empty class; falling back to run-all"
        );
        return Selection::RunAll;
    }

    let tests = if input.test_globs.is_empty() {
        response.tests
    } else {
        filter_by_globs(response.tests, &input.test_globs)
    };

    Selection::Tests(tests)
}

/// Retains only tests whose class matches some include glob and no exclude
/// glob. This crate only implements this glob-filtered path — the
/// dedupe-by-class-only path some implementations carry is not ported
/// (Open Question 2).
fn filter_by_globs(tests: Vec<RunnableTest>, test_globs: &[String]) -> Vec<RunnableTest> {
    let (includes, excludes): (Vec<_>, Vec<_>) = test_globs
        .iter()
        .cloned()
        .partition(|g| !g.starts_with('!'));
    let excludes: Vec<String> = excludes.into_iter().map(|g| g.trim_start_matches('!').to_string()).collect();

    let include_set = build_globset(&includes);
    let exclude_set = build_globset(&excludes);

    tests
        .into_iter()
        .filter(|t| {
            let qualified = t.qualified_class();
            let included = include_set.as_ref().is_none_or(|gs| gs.is_match(&qualified));
            let excluded = exclude_set.as_ref().is_some_and(|gs| gs.is_match(&qualified));
            included && !excluded
        })
        .collect()
}

/// Removes any changed file matching an `ignore` glob from `.ticonfig.yaml`
/// before it's sent to the TI service — such files should never contribute
/// to selection (§6).
fn filter_ignored(files: &[File], ignore_globs: &[String]) -> Vec<File> {
    if ignore_globs.is_empty() {
        return files.to_vec();
    }
    let globset = build_globset(ignore_globs);
    files
        .iter()
        .filter(|f| !globset.as_ref().is_some_and(|gs| gs.is_match(&f.name)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileStatus, SelectionReason};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubClient {
        response: Result<SelectTestsResponse, String>,
    }

    #[async_trait]
    impl TiClient for StubClient {
        async fn select_tests(
            &self,
            _step_id: &str,
            _request: SelectTestsRequest,
        ) -> Result<SelectTestsResponse, String> {
            self.response.clone()
        }
        async fn fetch_weights(&self, _step_id: &str, _strategy: &str) -> Result<HashMap<String, f64>, String> {
            Ok(HashMap::new())
        }
        async fn last_successful_commit(&self, _step_id: &str) -> Result<String, String> {
            Ok(String::new())
        }
        async fn download_agent(
            &self,
            _l: &str,
            _o: &str,
            _a: &str,
            _b: &str,
        ) -> Result<crate::ti_client::AgentDownload, String> {
            Err("n/a".to_string())
        }
        async fn upload_success(&self, _s: &str, _p: Vec<u8>) -> Result<(), String> {
            Ok(())
        }
        async fn upload_failed(&self, _s: &str, _p: Vec<u8>) -> Result<(), String> {
            Ok(())
        }
    }

    fn sample_file() -> File {
        File {
            name: "src/Widget.java".to_string(),
            status: FileStatus::Modified,
        }
    }

    #[tokio::test]
    async fn manual_run_short_circuits_to_run_all() {
        let client = StubClient {
            response: Ok(SelectTestsResponse::default()),
        };
        let selection = select_tests(
            &client,
            None,
            SelectionInput {
                changed_files: vec![sample_file()],
                run_only_selected: true,
                step_id: "s1",
                test_globs: vec![],
                rerun_failed: false,
                is_bootstrap: false,
                is_manual: true,
            },
        )
        .await;
        assert!(matches!(selection, Selection::RunAll));
    }

    #[tokio::test]
    async fn zero_changed_files_on_non_bootstrap_falls_back() {
        let client = StubClient {
            response: Ok(SelectTestsResponse::default()),
        };
        let selection = select_tests(
            &client,
            None,
            SelectionInput {
                changed_files: vec![],
                run_only_selected: true,
                step_id: "s1",
                test_globs: vec![],
                rerun_failed: false,
                is_bootstrap: false,
                is_manual: false,
            },
        )
        .await;
        assert!(matches!(selection, Selection::RunAll));
    }

    #[tokio::test]
    async fn service_error_falls_back_to_run_all() {
        let client = StubClient {
            response: Err("connection reset".to_string()),
        };
        let selection = select_tests(
            &client,
            None,
            SelectionInput {
                changed_files: vec![sample_file()],
                run_only_selected: true,
                step_id: "s1",
                test_globs: vec![],
                rerun_failed: false,
                is_bootstrap: false,
                is_manual: false,
            },
        )
        .await;
        assert!(matches!(selection, Selection::RunAll));
    }

    #[tokio::test]
    async fn invalid_test_with_empty_class_poisons_selection() {
        let mut response = SelectTestsResponse {
            select_all: false,
            ..Default::default()
        };
        response.tests.push(RunnableTest::new("pkg", "", SelectionReason::SourceCode));
        let client = StubClient { response: Ok(response) };
        let selection = select_tests(
            &client,
            None,
            SelectionInput {
                changed_files: vec![sample_file()],
                run_only_selected: true,
                step_id: "s1",
                test_globs: vec![],
                rerun_failed: false,
                is_bootstrap: false,
                is_manual: false,
            },
        )
        .await;
        assert!(matches!(selection, Selection::RunAll));
    }

    #[tokio::test]
    async fn filters_tests_by_include_glob() {
        let mut response = SelectTestsResponse {
            select_all: false,
            ..Default::default()
        };
        response.tests.push(RunnableTest::new("com.acme", "Widget", SelectionReason::SourceCode));
        response.tests.push(RunnableTest::new("com.other", "Gadget", SelectionReason::SourceCode));
        let client = StubClient { response: Ok(response) };
        let selection = select_tests(
            &client,
            None,
            SelectionInput {
                changed_files: vec![sample_file()],
                run_only_selected: true,
                step_id: "s1",
                test_globs: vec!["com.acme.*".to_string()],
                rerun_failed: false,
                is_bootstrap: false,
                is_manual: false,
            },
        )
        .await;
        match selection {
            Selection::Tests(tests) => {
                assert_eq!(tests.len(), 1);
                assert_eq!(tests[0].class, "Widget");
            }
            Selection::RunAll => panic!("expected filtered selection"),
        }
    }

    #[test]
    fn filter_ignored_removes_matching_files() {
        let files = vec![
            File { name: "vendor/lib.py".to_string(), status: FileStatus::Modified },
            File { name: "src/app.py".to_string(), status: FileStatus::Modified },
        ];
        let result = filter_ignored(&files, &["vendor/**".to_string()]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "src/app.py");
    }
}
