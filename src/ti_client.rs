//! Seam to the remote TI service.
//!
//! Deliberately out of scope (per spec.md §1): the HTTP client implementation
//! itself. [`TiClient`] is the trait boundary the orchestrator, selector, and
//! splitter call through; the host binds a real HTTP-backed implementation.
//! Modeled on the teacher's `SandboxProvider` trait — an `async_trait` seam
//! with no assumption about what's on the other side.

use crate::model::SelectTestsResponse;
use async_trait::async_trait;
use std::collections::HashMap;

/// Inputs to a selection request (§4.C).
#[derive(Debug, Clone)]
pub struct SelectTestsRequest {
    pub select_all: bool,
    pub files: Vec<crate::model::File>,
    pub ti_config: Option<String>,
    pub test_globs: Vec<String>,
}

/// One agent's download coordinates, resolved by `(language, os, arch, build_tool)`.
#[derive(Debug, Clone)]
pub struct AgentDownload {
    pub url: String,
    pub checksum: Option<String>,
}

#[async_trait]
pub trait TiClient: Send + Sync {
    async fn select_tests(
        &self,
        step_id: &str,
        request: SelectTestsRequest,
    ) -> Result<SelectTestsResponse, String>;

    /// Timing oracle: a weight map keyed by the splitter's chosen key.
    /// Returns an empty map for `file_size`/`test_count` strategies (the
    /// caller never has to special-case that — an absent key just falls
    /// back to the mean-or-1.0 default, see `splitter.rs`).
    async fn fetch_weights(&self, step_id: &str, strategy: &str) -> Result<HashMap<String, f64>, String>;

    async fn last_successful_commit(&self, step_id: &str) -> Result<String, String>;

    async fn download_agent(
        &self,
        language: &str,
        os: &str,
        arch: &str,
        build_tool: &str,
    ) -> Result<AgentDownload, String>;

    async fn upload_success(&self, step_id: &str, payload: Vec<u8>) -> Result<(), String>;

    async fn upload_failed(&self, step_id: &str, payload: Vec<u8>) -> Result<(), String>;
}

/// A `TiClient` that never selects, never weights, and rejects uploads —
/// useful as a default in tests and for local `ti-core` binary runs that
/// exercise command synthesis without a live service.
pub struct NullTiClient;

#[async_trait]
impl TiClient for NullTiClient {
    async fn select_tests(
        &self,
        _step_id: &str,
        _request: SelectTestsRequest,
    ) -> Result<SelectTestsResponse, String> {
        Ok(SelectTestsResponse {
            select_all: true,
            ..Default::default()
        })
    }

    async fn fetch_weights(&self, _step_id: &str, _strategy: &str) -> Result<HashMap<String, f64>, String> {
        Ok(HashMap::new())
    }

    async fn last_successful_commit(&self, _step_id: &str) -> Result<String, String> {
        Ok(String::new())
    }

    async fn download_agent(
        &self,
        _language: &str,
        _os: &str,
        _arch: &str,
        _build_tool: &str,
    ) -> Result<AgentDownload, String> {
        Err("no TI service configured".to_string())
    }

    async fn upload_success(&self, _step_id: &str, _payload: Vec<u8>) -> Result<(), String> {
        Ok(())
    }

    async fn upload_failed(&self, _step_id: &str, _payload: Vec<u8>) -> Result<(), String> {
        Ok(())
    }
}
