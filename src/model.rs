//! Wire and in-memory data model shared by every module in this crate.
//!
//! Everything here is per-step and in-memory; nothing in this module is
//! durable state. Callgraphs and reports only ever leave the process as
//! upload payloads (see [`crate::callgraph::codec`] and [`crate::report`]).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Why a test was selected for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    SourceCode,
    NewTest,
    UpdatedTest,
    FlakyTest,
}

/// A single test chosen for execution.
///
/// Identity for deduplication purposes is the pair `(package, class)`;
/// `method` is only meaningful downstream (report matching).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnableTest {
    #[serde(default)]
    pub package: String,
    pub class: String,
    #[serde(default)]
    pub method: Option<String>,
    pub selection_reason: SelectionReason,
    /// Opaque rule reference, set only by the Bazel runner's autodetection.
    #[serde(default)]
    pub autodetect_rule: Option<String>,
}

impl RunnableTest {
    pub fn new(package: impl Into<String>, class: impl Into<String>, reason: SelectionReason) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
            method: None,
            selection_reason: reason,
            autodetect_rule: None,
        }
    }

    /// A test with an empty class poisons the whole selection (§3 invariant).
    pub fn is_valid(&self) -> bool {
        !self.class.is_empty()
    }

    /// Fully qualified `package.class`, the key most runners filter on.
    pub fn qualified_class(&self) -> String {
        if self.package.is_empty() {
            self.class.clone()
        } else {
            format!("{}.{}", self.package, self.class)
        }
    }
}

/// Deduplicate a slice of tests on `(package, class)`, preserving first-seen order.
pub fn dedup_by_package_class(tests: &[RunnableTest]) -> Vec<&RunnableTest> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for t in tests {
        let key = (t.package.clone(), t.class.clone());
        if seen.insert(key) {
            out.push(t);
        }
    }
    out
}

/// Status of a file in a diff between two commits, or between merge-base and PR head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
}

/// A changed file as reported by the Changed-Files Provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub status: FileStatus,
}

/// A changed file annotated with its Java-family package, as produced by a
/// runner's `read_packages` capability (§4.E #3). Non-JVM runners pass
/// `package: None` through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagedFile {
    pub file: File,
    #[serde(default)]
    pub package: Option<String>,
}

/// The role a source file plays, as determined by the File Classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Source,
    Test,
    Resource,
}

/// A callgraph node: one unit of source, test, or resource code.
///
/// Identity is `id`; two nodes are never merged by any field other than id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i32,
    pub class_id: i32,
    #[serde(default)]
    pub package: String,
    pub class: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: String,
    pub file: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub calls_reflection: bool,
    #[serde(default)]
    pub always_run: bool,
    #[serde(default)]
    pub has_failed: bool,
}

impl Node {
    /// The all-fields-default placeholder used by the callgraph parser to mean
    /// "no source node was attached to this record."
    pub fn is_zero(&self) -> bool {
        self.id == 0
            && self.class_id == 0
            && self.package.is_empty()
            && self.class.is_empty()
            && self.method.is_empty()
            && self.file.is_empty()
    }
}

/// An edge collection: one node's id to the ids of the nodes it relates to.
///
/// Two independent collections of this shape coexist in a [`Callgraph`]:
/// `test_relations` (source → covering tests) and `vis_relations`
/// (source → visualization neighbors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source_id: i32,
    pub tests: Vec<i32>,
}

/// The full per-step callgraph: nodes plus both relation collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Callgraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub test_relations: Vec<Relation>,
    #[serde(default)]
    pub vis_relations: Vec<Relation>,
}

impl Callgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.test_relations.is_empty() && self.vis_relations.is_empty()
    }
}

/// Status of one executed test case, as parsed from a JUnit or TRX report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    #[default]
    Passed,
    Failed,
    Skipped,
    Error,
}

/// The failure/error/skip payload attached to a non-passing [`TestCase`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: TestStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result_type: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

/// One parsed test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub suite_name: String,
    #[serde(default)]
    pub class_name: String,
    pub file_name: String,
    /// Clamped non-negative on parse; see [`clamp_duration`].
    pub duration_ms: i64,
    pub result: TestResult,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
}

/// Clamp a parsed duration to the `duration_ms >= 0` invariant (§3).
pub fn clamp_duration(duration_ms: i64) -> i64 {
    duration_ms.max(0)
}

/// Maximum length of any free-form report string field (§4.I); longer strings
/// are right-truncated to their last 8000 characters.
pub const MAX_REPORT_STRING_LEN: usize = 8000;

/// Right-truncate `s` to its last [`MAX_REPORT_STRING_LEN`] characters.
pub fn truncate_report_string(s: &str) -> String {
    let char_count = s.chars().count();
    if char_count <= MAX_REPORT_STRING_LEN {
        return s.to_string();
    }
    s.chars()
        .skip(char_count - MAX_REPORT_STRING_LEN)
        .collect()
}

/// The response from the remote TI service's selection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectTestsResponse {
    #[serde(default)]
    pub total_tests: u64,
    #[serde(default)]
    pub selected_tests: u64,
    #[serde(default)]
    pub new_tests: u64,
    #[serde(default)]
    pub updated_tests: u64,
    #[serde(default)]
    pub src_code_tests: u64,
    /// When true, `tests` is advisory only and the caller must run everything.
    #[serde(default)]
    pub select_all: bool,
    #[serde(default)]
    pub tests: Vec<RunnableTest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_class_is_invalid() {
        let t = RunnableTest::new("pkg", "", SelectionReason::SourceCode);
        assert!(!t.is_valid());
    }

    #[test]
    fn qualified_class_without_package() {
        let t = RunnableTest::new("", "Cls", SelectionReason::SourceCode);
        assert_eq!(t.qualified_class(), "Cls");
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let tests = vec![
            RunnableTest::new("p", "A", SelectionReason::SourceCode),
            RunnableTest::new("p", "B", SelectionReason::SourceCode),
            RunnableTest::new("p", "A", SelectionReason::NewTest),
        ];
        let deduped = dedup_by_package_class(&tests);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].class, "A");
        assert_eq!(deduped[1].class, "B");
    }

    #[test]
    fn duration_clamped_to_zero() {
        assert_eq!(clamp_duration(-5), 0);
        assert_eq!(clamp_duration(42), 42);
    }

    #[test]
    fn truncate_keeps_last_8000_chars() {
        let s = "a".repeat(8005) + "TAIL";
        let truncated = truncate_report_string(&s);
        assert_eq!(truncated.len(), MAX_REPORT_STRING_LEN);
        assert!(truncated.ends_with("TAIL"));
    }

    #[test]
    fn callgraph_empty_iff_all_three_collections_empty() {
        assert!(Callgraph::default().is_empty());
        let mut cg = Callgraph::default();
        cg.nodes.push(Node {
            id: 1,
            class_id: 1,
            package: "p".into(),
            class: "C".into(),
            method: String::new(),
            params: String::new(),
            file: "C.java".into(),
            node_type: NodeType::Source,
            calls_reflection: false,
            always_run: false,
            has_failed: false,
        });
        assert!(!cg.is_empty());
    }
}
