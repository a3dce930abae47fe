//! Error taxonomy for the Test Intelligence execution core.
//!
//! Each module gets its own `thiserror` enum carrying structured context
//! (step id, file path, language — per §7); [`TiError`] composes them for
//! callers that just want one `Result` type to propagate with `?`. Severity
//! is not encoded in the type itself: §7 partitions failures into
//! fatal/recovered/logged-by-behavior (which path the caller takes), not by
//! a distinct Rust type per severity class.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("unrecognized path encoding for {path}")]
    InvalidPath { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum ChangesError {
    #[error("git process failed for step {step_id}: {source}")]
    GitFailed {
        step_id: String,
        #[source]
        source: crate::process::ProcessError,
    },
    #[error("unrecognized git status code '{code}' for {path}")]
    UnknownStatus { code: String, path: String },
    #[error("bazel query failed for step {step_id}: {source}")]
    BazelFailed {
        step_id: String,
        #[source]
        source: crate::process::ProcessError,
    },
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("ti service request failed for step {step_id}: {message}")]
    ServiceCall { step_id: String, message: String },
    #[error("ti service returned a malformed response for step {step_id}: {message}")]
    MalformedResponse { step_id: String, message: String },
    #[error("failed to read .ticonfig.yaml at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse .ticonfig.yaml at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("timing oracle request failed for step {step_id}: {message}")]
    OracleCall { step_id: String, message: String },
    #[error("unknown splitter strategy '{strategy}'")]
    UnknownStrategy { strategy: String },
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no runner registered for language '{language}' and build tool '{build_tool}'")]
    Unsupported { language: String, build_tool: String },
    #[error("missing required configuration field '{field}' for {language} runner")]
    MissingField { language: String, field: String },
    #[error("failed to resolve bazel target for {qualified_class} in step {step_id}")]
    UnresolvedBazelTarget { step_id: String, qualified_class: String },
}

#[derive(Debug, Error)]
pub enum CallgraphError {
    #[error("malformed callgraph record at {file}:{line}: {message}")]
    MalformedRecord {
        file: PathBuf,
        line: u64,
        message: String,
    },
    #[error("failed to read callgraph shard {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("callgraph codec error for schema version '{version}': {message}")]
    Codec { version: String, message: String },
    #[error("failed to encode callgraph: {source}")]
    Encode { source: String },
    #[error("failed to decode callgraph: {source}")]
    Decode { source: String },
    #[error("callgraph container held no records")]
    EmptyContainer,
    #[error("unrecognized node type '{found}'")]
    InvalidNodeType { found: String },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read report file {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse report file {file}: {message}")]
    Parse { file: PathBuf, message: String },
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("configuration error for step {step_id}: {source}")]
    Configuration {
        step_id: String,
        #[source]
        source: RunnerError,
    },
    #[error("upload failed for step {step_id}: {message}")]
    Upload { step_id: String, message: String },
    #[error("download failed for step {step_id}: {message}")]
    Download { step_id: String, message: String },
    #[error("failed to write instrumentation config for step {step_id}: {source}")]
    Io {
        step_id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error composing every module's error enum.
#[derive(Debug, Error)]
pub enum TiError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Changes(#[from] ChangesError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error(transparent)]
    Callgraph(#[from] CallgraphError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Process(#[from] crate::process::ProcessError),
}

pub type TiResult<T> = Result<T, TiError>;
