//! Component J — Orchestrator.
//!
//! Drives components A–I for one CI step and returns the shell command the
//! surrounding step-execution framework (out of scope, §1) should run. The
//! orchestrator itself never spawns the test process — it only resolves the
//! Runner, selects and splits tests, writes the instrumentation config, and
//! (after the framework has run the command) ingests reports/callgraphs and
//! uploads. Grounded on the original `orchestrator.rs`'s single struct
//! wiring together a handful of seam traits, with one `step_id` threaded
//! everywhere for error context.

use crate::callgraph;
use crate::callgraph::codec::{self, SchemaVersion};
use crate::changes::{self, DiffMode};
use crate::config::TiConfigFile;
use crate::error::{OrchestratorError, TiResult};
use crate::model::{Callgraph, RunnableTest, TestCase};
use crate::report::{self, Counts};
use crate::runner::{self, GetCmdInput};
use crate::selector::{self, Selection, SelectionInput};
use crate::splitter::{self, ShardCoordinates};
use crate::ti_client::TiClient;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Everything the orchestrator needs for one step beyond what the
/// selector/splitter/runner already take as direct arguments.
pub struct StepContext<'a> {
    pub step_id: String,
    pub workspace: PathBuf,
    pub language: String,
    pub build_tool: String,
    pub test_globs: Vec<String>,
    pub run_only_selected: bool,
    pub rerun_failed: bool,
    pub split_strategy: String,
    pub user_args: String,
    pub diff_mode: DiffMode,
    /// Missing source branch, target branch, or SHA (§4.C); short-circuits
    /// selection and forces `ignore_instr`.
    pub is_manual: bool,
    pub os: String,
    pub arch: String,
    pub agent_install_dir: PathBuf,
    pub instrumentation_dir: PathBuf,
    /// Packages to instrument; forwarded verbatim into the config file.
    pub instr_packages: Vec<String>,
    pub coords: ShardCoordinates,
    pub ti_config: Option<&'a TiConfigFile>,
}

/// The command plus bookkeeping the caller needs to run it and later call
/// [`finish`].
#[derive(Debug, Clone)]
pub struct StepPlan {
    pub shell_command: String,
    pub selected_tests: Vec<RunnableTest>,
    pub run_all: bool,
    pub instrumentation_config_path: Option<PathBuf>,
}

/// What [`finish`] produced after the planned command ran.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub cases: Vec<TestCase>,
    pub counts: Counts,
    pub env_file: String,
    pub callgraph: Callgraph,
}

/// Steps 1–5 of §4.J: determine instrumentation, select, split, and
/// synthesize the shell command. Does not run anything.
pub async fn plan(client: &dyn TiClient, ctx: &StepContext<'_>) -> TiResult<StepPlan> {
    let ignore_instr = ctx.is_manual || !ctx.run_only_selected;

    let active_runner = runner::resolve(&ctx.language, &ctx.build_tool)
        .map_err(|source| OrchestratorError::Configuration { step_id: ctx.step_id.clone(), source })?;

    let mut pre_lines: Vec<String> = Vec::new();
    let agent_config_path = ctx.instrumentation_dir.join(default_config_file_name(&ctx.language));

    let selection = if ignore_instr {
        Selection::RunAll
    } else {
        let changed_files = changes::changed_files(&ctx.workspace, &ctx.diff_mode, &ctx.step_id)
            .await
            .map(|c| c.files)
            .unwrap_or_else(|err| {
                tracing::warn!(step_id = ctx.step_id, error = %err, "changed-files detection failed; treating as zero changed files");
                Vec::new()
            });

        let selection = selector::select_tests(
            client,
            ctx.ti_config,
            SelectionInput {
                changed_files,
                run_only_selected: ctx.run_only_selected,
                step_id: &ctx.step_id,
                test_globs: ctx.test_globs.clone(),
                rerun_failed: ctx.rerun_failed,
                is_bootstrap: false,
                is_manual: ctx.is_manual,
            },
        )
        .await;

        let download = client
            .download_agent(&ctx.language, &ctx.os, &ctx.arch, &ctx.build_tool)
            .await
            .map_err(|message| OrchestratorError::Download { step_id: ctx.step_id.clone(), message })?;
        pre_lines.push(render_agent_download(&download.url, &ctx.agent_install_dir));

        if ctx.language != "ruby" {
            write_instrumentation_config(&ctx.step_id, &ctx.language, &agent_config_path, &ctx.instrumentation_dir, &ctx.instr_packages)?;
        }

        selection
    };

    let (run_all, selected_tests) = materialize_selection(client, active_runner.as_ref(), ctx, selection).await?;

    let test_cmd = active_runner
        .get_cmd(GetCmdInput {
            selected_tests: &selected_tests,
            user_args: &ctx.user_args,
            workspace: &ctx.workspace,
            agent_config_path: &agent_config_path,
            agent_install_dir: &ctx.agent_install_dir,
            ignore_instr,
            run_all,
        })
        .await
        .map_err(|source| OrchestratorError::Configuration { step_id: ctx.step_id.clone(), source })?;

    let mut lines = pre_lines;
    lines.push(test_cmd);
    let shell_command = lines.join("\n");

    Ok(StepPlan {
        shell_command,
        selected_tests,
        run_all,
        instrumentation_config_path: (!ignore_instr && ctx.language != "ruby").then_some(agent_config_path),
    })
}

/// Step 6 of §4.J: after the planned command ran, parse reports and
/// callgraphs, encode, and upload.
pub async fn finish(
    client: &dyn TiClient,
    step_id: &str,
    report_globs: &[String],
    root_suite_name: &str,
    callgraph_shard_files: &[PathBuf],
    vis_relations_file: Option<&Path>,
    schema_version: SchemaVersion,
    step_succeeded: bool,
) -> TiResult<StepOutcome> {
    let cases = report::collect(report_globs, root_suite_name).await?;
    let counts = report::aggregate(&cases);
    let env_file = report::render_env_file(&cases, &counts);

    let mut graph = callgraph::parse_and_merge(callgraph_shard_files).await?;
    if let Some(vis_file) = vis_relations_file {
        graph.vis_relations = callgraph::parse_vis_relations(vis_file).await?;
    }

    let payload = codec::encode(&graph, schema_version)?;
    let upload_result = if step_succeeded {
        client.upload_success(step_id, payload).await
    } else {
        client.upload_failed(step_id, payload).await
    };
    upload_result.map_err(|message| OrchestratorError::Upload { step_id: step_id.to_string(), message })?;

    Ok(StepOutcome { cases, counts, env_file, callgraph: graph })
}

/// Resolves `selection` into a concrete `(run_all, tests)` pair for
/// `get_cmd`, applying the Splitter (§4.D) when more than one shard is
/// active and the §4.D.1 detection-failure fallback (only shard 0 runs
/// everything; other shards get an empty selection).
async fn materialize_selection(
    client: &dyn TiClient,
    active_runner: &dyn runner::Runner,
    ctx: &StepContext<'_>,
    selection: Selection,
) -> TiResult<(bool, Vec<RunnableTest>)> {
    if ctx.coords.split_total <= 1 {
        return Ok(match selection {
            Selection::RunAll => (true, Vec::new()),
            Selection::Tests(tests) => (false, tests),
        });
    }

    let full_set = match selection {
        Selection::Tests(tests) => Some(tests),
        Selection::RunAll => match active_runner.auto_detect_tests(&ctx.workspace, &ctx.test_globs).await {
            Ok(tests) if !tests.is_empty() => Some(tests),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(step_id = ctx.step_id, error = %err, "test auto-detection failed");
                None
            }
        },
    };

    let Some(tests) = full_set else {
        return Ok(if ctx.coords.split_index == 0 { (true, Vec::new()) } else { (false, Vec::new()) });
    };

    let strategy = splitter::resolve_strategy(&ctx.split_strategy);
    let weights = if strategy.uses_oracle() {
        client.fetch_weights(&ctx.step_id, strategy.as_str()).await.unwrap_or_else(|message| {
            tracing::warn!(step_id = ctx.step_id, message, "timing oracle call failed; falling back to equal weights");
            HashMap::new()
        })
    } else {
        HashMap::new()
    };

    Ok((false, splitter::split(&tests, strategy, &weights, ctx.coords)))
}

fn default_config_file_name(language: &str) -> &'static str {
    match language {
        "csharp" => "agent.yaml",
        _ => "agent.ini",
    }
}

fn render_agent_download(url: &str, install_dir: &Path) -> String {
    format!("mkdir -p \"{}\" && curl -fsSL \"{}\" -o \"{}\"", install_dir.display(), url, install_dir.join("agent.download").display())
}

/// Writes the instrumentation config file (§6): INI for the JVM family and
/// Python, YAML for C#. Ruby has no config file — it switches the agent on
/// with `TI=1` on the command line itself (see `runner::rspec`) — so callers
/// never invoke this for `language == "ruby"`.
fn write_instrumentation_config(
    step_id: &str,
    language: &str,
    path: &Path,
    out_dir: &Path,
    instr_packages: &[String],
) -> TiResult<()> {
    let contents = if language == "csharp" {
        render_yaml_config(out_dir, instr_packages)
    } else {
        render_ini_config(out_dir, instr_packages)
    };
    std::fs::write(path, contents).map_err(|source| OrchestratorError::Io { step_id: step_id.to_string(), source })?;
    Ok(())
}

fn render_ini_config(out_dir: &Path, instr_packages: &[String]) -> String {
    format!(
        "outDir: {}\nlogLevel: 0\nlogConsole: false\nwriteTo: COVERAGE_JSON\ninstrPackages: {}\n",
        out_dir.display(),
        instr_packages.join(",")
    )
}

fn render_yaml_config(out_dir: &Path, instr_packages: &[String]) -> String {
    let mut out = format!("outDir: {}\nlogLevel: 0\nlogConsole: false\nwriteTo: COVERAGE_JSON\ninstrPackages:\n", out_dir.display());
    for pkg in instr_packages {
        out.push_str("  - ");
        out.push_str(pkg);
        out.push('\n');
    }
    out
}

/// Reads the sharding environment variables (§6) and computes the
/// `(split_index, split_total)` pair the caller passes to [`plan`], per
/// §4.D's `split_index = step_total * stage_index + step_index` formula.
/// A non-empty `HARNESS_MATRIX_AXIS` JSON object collapses the stage
/// dimension to 1×1. `HARNESS_NODE_INDEX`, when present, overrides the
/// computed `split_index` outright — it's a direct sharding hint from a
/// node pool that bypasses the step/stage matrix entirely.
pub fn shard_coordinates_from_env() -> ShardCoordinates {
    let step_index = env_usize("HARNESS_STEP_INDEX", 0);
    let step_total = env_usize("HARNESS_STEP_TOTAL", 1).max(1);

    let matrix_axis_active = std::env::var("HARNESS_MATRIX_AXIS").is_ok_and(|raw| is_nonempty_json_object(&raw));
    let (stage_index, stage_total) =
        if matrix_axis_active { (0, 1) } else { (env_usize("HARNESS_STAGE_INDEX", 0), env_usize("HARNESS_STAGE_TOTAL", 1).max(1)) };

    let split_index = std::env::var("HARNESS_NODE_INDEX")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(step_total * stage_index + step_index);

    ShardCoordinates { split_index, split_total: step_total * stage_total }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn is_nonempty_json_object(raw: &str) -> bool {
    matches!(serde_json::from_str::<serde_json::Value>(raw), Ok(serde_json::Value::Object(map)) if !map.is_empty())
}
