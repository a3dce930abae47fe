//! ti-core CLI - Test Intelligence execution core.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use ti_core::callgraph::codec::SchemaVersion;
use ti_core::changes::DiffMode;
use ti_core::config;
use ti_core::orchestrator::{self, StepContext};
use ti_core::report::DEFAULT_ROOT_SUITE_NAME;
use ti_core::ti_client::NullTiClient;

#[derive(Parser)]
#[command(name = "ti-core")]
#[command(about = "Test Intelligence execution core", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "ti-core.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve selection/splitting and print the shell command for this step.
    Plan {
        /// Workspace root to run detection and git diffs in.
        #[arg(long, default_value = ".")]
        workspace: PathBuf,

        /// PR merge-base SHA. Requires --pr-head; mutually exclusive with --last-successful-commit.
        #[arg(long)]
        merge_base: Option<String>,
        /// PR head SHA.
        #[arg(long)]
        pr_head: Option<String>,
        /// Last successful commit SHA for push-mode diffing; empty means bootstrap.
        #[arg(long)]
        last_successful_commit: Option<String>,
        /// Current commit SHA for push-mode diffing.
        #[arg(long, default_value = "HEAD")]
        current_sha: String,

        /// Treat this run as manually triggered (forces a full, uninstrumented run).
        #[arg(long)]
        manual: bool,

        #[arg(long, default_value = "linux")]
        os: String,
        #[arg(long, default_value = "amd64")]
        arch: String,
        #[arg(long, default_value = "/tmp/ti-agent")]
        agent_install_dir: PathBuf,
        #[arg(long, default_value = "/tmp/ti-instrumentation")]
        instrumentation_dir: PathBuf,
        /// Comma-separated packages to instrument.
        #[arg(long, value_delimiter = ',')]
        instr_packages: Vec<String>,

        /// Extra arguments forwarded to the underlying test command.
        #[arg(long, default_value = "")]
        user_args: String,
    },

    /// Ingest reports and callgraph shards produced by a step and upload.
    Finish {
        #[arg(long)]
        step_id: String,
        /// Glob patterns for JUnit/TRX report files.
        #[arg(long)]
        report_glob: Vec<String>,
        /// Glob-expanded callgraph shard files to merge.
        #[arg(long)]
        callgraph_shard: Vec<PathBuf>,
        /// Optional CSV file of visualization relations.
        #[arg(long)]
        vis_relations_file: Option<PathBuf>,
        /// Avro schema version to encode with: "v1" or "v1_1".
        #[arg(long, default_value = "v1_1")]
        schema_version: String,
        /// Whether the step's own command exited successfully.
        #[arg(long)]
        step_succeeded: bool,
    },

    /// Validate configuration file.
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    ti_core::profiling::init();
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Plan {
            workspace,
            merge_base,
            pr_head,
            last_successful_commit,
            current_sha,
            manual,
            os,
            arch,
            agent_install_dir,
            instrumentation_dir,
            instr_packages,
            user_args,
        } => {
            plan_step(
                &cli.config,
                workspace,
                merge_base,
                pr_head,
                last_successful_commit,
                current_sha,
                manual,
                os,
                arch,
                agent_install_dir,
                instrumentation_dir,
                instr_packages,
                user_args,
            )
            .await
        }
        Commands::Finish { step_id, report_glob, callgraph_shard, vis_relations_file, schema_version, step_succeeded } => {
            finish_step(step_id, report_glob, callgraph_shard, vis_relations_file, &schema_version, step_succeeded).await
        }
        Commands::Validate => validate_config(&cli.config),
    }
}

#[allow(clippy::too_many_arguments)]
async fn plan_step(
    config_path: &std::path::Path,
    workspace: PathBuf,
    merge_base: Option<String>,
    pr_head: Option<String>,
    last_successful_commit: Option<String>,
    current_sha: String,
    manual: bool,
    os: String,
    arch: String,
    agent_install_dir: PathBuf,
    instrumentation_dir: PathBuf,
    instr_packages: Vec<String>,
    user_args: String,
) -> Result<()> {
    let cfg = config::load_config(config_path).with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let ti_config = config::load_ti_config(&workspace).context("failed to load .ticonfig.yaml")?;

    let diff_mode = match (merge_base, pr_head, last_successful_commit) {
        (Some(merge_base), Some(pr_head), _) => DiffMode::PullRequest { merge_base, pr_head },
        (_, _, Some(last_successful_commit)) => DiffMode::Push { last_successful_commit, current_sha },
        _ => DiffMode::Push { last_successful_commit: String::new(), current_sha },
    };

    let coords = orchestrator::shard_coordinates_from_env();
    info!(split_index = coords.split_index, split_total = coords.split_total, "resolved shard coordinates");

    let client = NullTiClient;
    let ctx = StepContext {
        step_id: cfg.step.step_id.clone(),
        workspace,
        language: cfg.step.language.clone(),
        build_tool: cfg.step.build_tool.clone(),
        test_globs: cfg.step.test_globs.clone(),
        run_only_selected: cfg.step.run_only_selected,
        rerun_failed: cfg.step.rerun_failed,
        split_strategy: cfg.step.split_strategy.clone(),
        user_args,
        diff_mode,
        is_manual: manual,
        os,
        arch,
        agent_install_dir,
        instrumentation_dir,
        instr_packages,
        coords,
        ti_config: ti_config.as_ref(),
    };

    let plan = orchestrator::plan(&client, &ctx).await?;
    ti_core::profile_log!("plan resolved: run_all={} selected={}", plan.run_all, plan.selected_tests.len());
    println!("{}", plan.shell_command);
    Ok(())
}

async fn finish_step(
    step_id: String,
    report_globs: Vec<String>,
    callgraph_shards: Vec<PathBuf>,
    vis_relations_file: Option<PathBuf>,
    schema_version: &str,
    step_succeeded: bool,
) -> Result<()> {
    let schema_version = match schema_version {
        "v1" => SchemaVersion::V1,
        "v1_1" | "v1.1" => SchemaVersion::V1_1,
        other => return Err(anyhow!("unrecognized schema version '{other}', expected 'v1' or 'v1_1'")),
    };

    let root_suite_name = std::env::var("HARNESS_JUNIT_ROOT_SUITE_NAME").unwrap_or_else(|_| DEFAULT_ROOT_SUITE_NAME.to_string());

    let client = NullTiClient;
    let outcome = orchestrator::finish(
        &client,
        &step_id,
        &report_globs,
        &root_suite_name,
        &callgraph_shards,
        vis_relations_file.as_deref(),
        schema_version,
        step_succeeded,
    )
    .await?;

    info!(total = outcome.counts.total, passed = outcome.counts.passed, failed = outcome.counts.failed, "reports ingested");
    ti_core::profile_log!("finish complete: total={} failed={}", outcome.counts.total, outcome.counts.failed);
    print!("{}", outcome.env_file);
    Ok(())
}

fn validate_config(config_path: &std::path::Path) -> Result<()> {
    match config::load_config(config_path) {
        Ok(cfg) => {
            println!("Configuration is valid!");
            println!();
            println!("Step: {}", cfg.step.step_id);
            println!("  Language: {}", cfg.step.language);
            println!("  Build tool: {}", cfg.step.build_tool);
            println!("  Split strategy: {}", cfg.step.split_strategy);
            println!("  Run only selected: {}", cfg.step.run_only_selected);
            println!("Report:");
            println!("  Output dir: {}", cfg.report.output_dir);
            println!("  JUnit: {} ({})", cfg.report.junit, cfg.report.junit_file);
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}
