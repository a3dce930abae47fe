//! Serde schema for this crate's two configuration surfaces:
//! the step-level TOML config (how *this* binary is invoked) and the
//! repository's `.ticonfig.yaml` (§6), which only honors an `ignore` glob list.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Top-level step configuration, loaded from TOML by [`super::load_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub step: StepConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

fn default_split_strategy() -> String {
    "test_count".to_string()
}

/// Per-step settings: identity, language/build-tool pair, and globs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub step_id: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub build_tool: String,
    #[serde(default)]
    pub test_globs: Vec<String>,
    #[serde(default)]
    pub run_only_selected: bool,
    #[serde(default)]
    pub rerun_failed: bool,
    #[serde(default = "default_split_strategy")]
    pub split_strategy: String,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            step_id: String::new(),
            language: String::new(),
            build_tool: String::new(),
            test_globs: Vec::new(),
            run_only_selected: false,
            rerun_failed: false,
            split_strategy: default_split_strategy(),
        }
    }
}

fn default_output_dir() -> String {
    "ti-results".to_string()
}

fn default_junit_file() -> String {
    "junit.xml".to_string()
}

/// Where report output is written and which formats to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_true")]
    pub junit: bool,
    #[serde(default = "default_junit_file")]
    pub junit_file: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            junit: true,
            junit_file: default_junit_file(),
        }
    }
}

/// `.ticonfig.yaml` at the workspace root (§6). Only `ignore` is honored; any
/// other top-level key is ignored rather than rejected, matching the
/// "unsupported fields are just unused" stance the teacher's config takes
/// with unknown TOML keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TiConfigFile {
    #[serde(default)]
    pub config: TiConfigBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TiConfigBody {
    #[serde(default)]
    pub ignore: Vec<String>,
}
