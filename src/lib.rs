//! # ti-core
//!
//! The Test Intelligence execution core: the part of a CI test step that
//! decides which tests to run, how to split them across shards, and how to
//! turn that decision into the shell command a step executor runs — then
//! ingests the resulting reports and callgraphs once the step is done.
//!
//! ## Architecture
//!
//! ### Change detection ([`changes`])
//!
//! Resolves which files changed for a step, via `git diff --name-status`
//! for PR/push diffs ([`changes::changed_files`]) or a Bazel target fan-out
//! ([`changes::bazel::fan_out`]). [`changes::checksum`] computes the
//! git-tree-wide checksum used to detect non-code-path-only changes.
//!
//! ### Classification ([`classify`])
//!
//! Classifies a file path into a [`model::Node`] (test, source, or other)
//! using per-language extension and naming-convention rules.
//!
//! ### Selection ([`selector`])
//!
//! [`selector::select_tests`] combines changed files, `.ticonfig.yaml`
//! ignore rules, and a [`ti_client::TiClient`] call into a
//! [`selector::Selection`] — either "run everything" or a concrete test
//! list.
//!
//! ### Splitting ([`splitter`])
//!
//! [`splitter::split`] bin-packs a test list across shards using a weighted
//! first-fit-decreasing algorithm, keyed by one of several
//! [`splitter::Strategy`] values.
//!
//! ### Runners ([`runner`])
//!
//! Each supported `(language, build_tool)` pair gets a [`runner::Runner`]
//! implementation providing test auto-detection and command synthesis.
//! [`runner::resolve`] is the registry lookup.
//!
//! ### Callgraphs ([`callgraph`])
//!
//! [`callgraph::parse_and_merge`] combines per-shard callgraph records into
//! one [`model::Callgraph`]; [`callgraph::codec`] encodes/decodes it as Avro
//! for upload.
//!
//! ### Reports ([`report`])
//!
//! [`report::collect`] globs and parses JUnit ([`report::junit`]) and TRX
//! ([`report::trx`]) test reports into a flat [`model::TestCase`] list, then
//! [`report::aggregate`] and [`report::render_env_file`] summarize them.
//!
//! ### Orchestrator ([`orchestrator`])
//!
//! [`orchestrator::plan`] and [`orchestrator::finish`] wire every other
//! module together for one CI step.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ti_core::orchestrator::{self, StepContext};
//! use ti_core::ti_client::NullTiClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = NullTiClient;
//!     let coords = orchestrator::shard_coordinates_from_env();
//!     let ctx = StepContext {
//!         step_id: "build-1".to_string(),
//!         workspace: std::path::PathBuf::from("."),
//!         language: "python".to_string(),
//!         build_tool: "pytest".to_string(),
//!         test_globs: vec![],
//!         run_only_selected: false,
//!         rerun_failed: false,
//!         split_strategy: "test_count".to_string(),
//!         user_args: String::new(),
//!         diff_mode: ti_core::changes::DiffMode::Push {
//!             last_successful_commit: String::new(),
//!             current_sha: "HEAD".to_string(),
//!         },
//!         is_manual: false,
//!         os: "linux".to_string(),
//!         arch: "amd64".to_string(),
//!         agent_install_dir: std::path::PathBuf::from("/tmp/ti-agent"),
//!         instrumentation_dir: std::path::PathBuf::from("/tmp/ti-instr"),
//!         instr_packages: vec![],
//!         coords,
//!         ti_config: None,
//!     };
//!     let plan = orchestrator::plan(&client, &ctx).await?;
//!     println!("{}", plan.shell_command);
//!     Ok(())
//! }
//! ```

pub mod callgraph;
pub mod changes;
pub mod classify;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod process;
pub mod profiling;
pub mod report;
pub mod runner;
pub mod selector;
pub mod splitter;
pub mod ti_client;

pub use config::{load_config, load_ti_config, Config};
pub use error::{TiError, TiResult};
pub use model::{Callgraph, RunnableTest, TestCase};
pub use orchestrator::{StepContext, StepOutcome, StepPlan};
pub use selector::Selection;
pub use ti_client::TiClient;
