//! Component I — JUnit / TRX report ingestion (§4.I).
//!
//! Glob-expands the configured report paths, dispatches each matched file to
//! whichever dialect parser fits its content ([`junit`] or [`trx`]), and
//! aggregates the resulting flat [`TestCase`] stream into [`Counts`] for
//! both a rendered summary and the `§6` environment-file export. A file that
//! fails to parse is logged and skipped — aggregation continues over
//! whatever the rest of the glob matched (§7, "parsing errors").

pub mod junit;
pub mod trx;

use crate::error::ReportError;
use crate::model::{TestCase, TestStatus};
use quick_xml::events::BytesStart;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default value of `HARNESS_JUNIT_ROOT_SUITE_NAME` (§6) — the suite name
/// conventionally used by dialects (PHPUnit among them) that wrap every
/// other suite in one root carrying the shared `file` attribute.
pub const DEFAULT_ROOT_SUITE_NAME: &str = "Root Suite";

/// Reserved `skipped` message marking a test-intelligence-initiated skip
/// (a test TI chose not to run), counted separately from ordinary skips.
pub const TI_SKIP_MESSAGE: &str = "Skipped by Test Intelligence";

/// Extracts a string attribute from a start/empty tag. Shared by the JUnit
/// and TRX parsers so both read quick-xml attributes the same way.
pub(crate) fn xml_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| String::from_utf8(a.value.to_vec()).ok())
}

/// Parses a duration string: first as a float of seconds (thousands-separator
/// commas stripped, e.g. some JUnit writers emit `"1,234.5"`), falling back
/// to an `HH:MM:SS(.fff)` duration literal (TRX/NUnit style). Unparseable
/// input is zero; the result is always clamped non-negative per the
/// `duration_ms >= 0` invariant (§3).
pub(crate) fn parse_duration_ms(raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    let no_commas = raw.replace(',', "");
    if let Ok(seconds) = no_commas.parse::<f64>() {
        return crate::model::clamp_duration((seconds * 1000.0).round() as i64);
    }
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() == 3
        && let (Ok(hours), Ok(minutes), Ok(seconds)) = (parts[0].parse::<i64>(), parts[1].parse::<i64>(), parts[2].parse::<f64>())
    {
        let total_ms = (hours * 3600 + minutes * 60) * 1000 + (seconds * 1000.0).round() as i64;
        return crate::model::clamp_duration(total_ms);
    }
    0
}

/// Glob-expands `patterns` against the filesystem (§4.I): `~/` expands to
/// the user's home, `**` matches recursively via the crate's one globset
/// engine (Design Notes §9), and results across all patterns are
/// de-duplicated.
pub fn expand_report_globs(patterns: &[String]) -> Result<Vec<PathBuf>, ReportError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for pattern in patterns {
        let expanded = shellexpand::tilde(pattern).into_owned().replace('\\', "/");
        let glob = globset::Glob::new(&expanded).map_err(|e| ReportError::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        let matcher = glob.compile_matcher();
        for path in walk(&literal_root(&expanded)) {
            let rel = clean_rel(&path);
            if matcher.is_match(&rel) && seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }
    Ok(out)
}

/// The longest path prefix of `pattern` with no glob metacharacter — the
/// directory (or lone file) the walk needs to start from.
fn literal_root(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for seg in pattern.split('/') {
        if seg.is_empty() || seg.contains(['*', '?', '[']) {
            break;
        }
        root.push(seg);
    }
    if root.as_os_str().is_empty() {
        PathBuf::from(if pattern.starts_with('/') { "/" } else { "." })
    } else {
        root
    }
}

fn clean_rel(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").trim_start_matches("./").to_string()
}

fn walk(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if root.is_file() {
        out.push(root.to_path_buf());
        return out;
    }
    walk_into(root, &mut out);
    out
}

fn walk_into(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_into(&path, out);
        } else {
            out.push(path);
        }
    }
}

/// Reads and parses one report file, dispatching on content: TRX documents
/// are rooted at a `<TestRun>` element, anything else is treated as JUnit
/// XML (§4.I's "an alternative parser accepts... TRX").
async fn parse_report_file(path: &Path, root_suite_name: &str) -> Result<Vec<TestCase>, ReportError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ReportError::Io { file: path.to_path_buf(), source })?;
    let result = if looks_like_trx(&content) {
        trx::parse(&content)
    } else {
        junit::parse(&content, root_suite_name)
    };
    result.map_err(|e| match e {
        ReportError::Parse { message, .. } => ReportError::Parse { file: path.to_path_buf(), message },
        other => other,
    })
}

fn looks_like_trx(content: &str) -> bool {
    content.contains("<TestRun")
}

/// Parses every file `patterns` glob-matches, tolerating per-file failures
/// (logged and skipped — §7) and returning the flat `TestCase` stream for
/// everything that did parse.
pub async fn collect(patterns: &[String], root_suite_name: &str) -> Result<Vec<TestCase>, ReportError> {
    let files = expand_report_globs(patterns)?;
    let mut cases = Vec::new();
    for file in files {
        match parse_report_file(&file, root_suite_name).await {
            Ok(mut parsed) => cases.append(&mut parsed),
            Err(err) => tracing::warn!(file = %file.display(), error = %err, "failed to parse report file; skipping"),
        }
    }
    Ok(cases)
}

/// Per-status aggregate over a `TestCase` stream (§4.I, §6).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counts {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub skipped_by_ti: u64,
    pub error: u64,
    /// Reserved for report dialects whose status can't map onto
    /// [`TestStatus`]'s closed set; this crate's parsers never produce one,
    /// so this stays zero, but the field is kept so downstream consumers
    /// of the rendered summary see the same shape the spec names.
    pub unknown: u64,
    pub duration_ms_total: i64,
}

impl Counts {
    pub fn executed(&self) -> u64 {
        self.total - self.skipped
    }

    /// `(failed + error) / total`, four decimal places, zero when `total == 0` (§6).
    pub fn failed_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.failed + self.error) as f64 / self.total as f64
        }
    }
}

/// Aggregates a flat `TestCase` stream into per-status `Counts`.
pub fn aggregate(cases: &[TestCase]) -> Counts {
    let mut counts = Counts::default();
    for case in cases {
        counts.total += 1;
        counts.duration_ms_total += case.duration_ms;
        match case.result.status {
            TestStatus::Passed => counts.passed += 1,
            TestStatus::Failed => counts.failed += 1,
            TestStatus::Error => counts.error += 1,
            TestStatus::Skipped => {
                counts.skipped += 1;
                if case.result.message.as_deref() == Some(TI_SKIP_MESSAGE) {
                    counts.skipped_by_ti += 1;
                }
            }
        }
    }
    counts
}

/// The five slowest cases, rendered as `"<class#name>: <ceil-seconds>s"` (§6).
pub fn top_five_slowest(cases: &[TestCase]) -> Vec<String> {
    let mut sorted: Vec<&TestCase> = cases.iter().collect();
    sorted.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms).then_with(|| a.name.cmp(&b.name)));
    sorted
        .into_iter()
        .take(5)
        .map(|c| {
            let seconds = (c.duration_ms as f64 / 1000.0).ceil() as i64;
            format!("{}#{}: {}s", c.class_name, c.name, seconds)
        })
        .collect()
}

/// Renders the `KEY=VALUE` environment-file export (§6).
pub fn render_env_file(cases: &[TestCase], counts: &Counts) -> String {
    let slowest = top_five_slowest(cases);
    let slowest_json = serde_json::to_string(&slowest).unwrap_or_else(|_| "[]".to_string());
    format!(
        "total_tests={}\nexecuted_count={}\npassed_count={}\nfailed_count={}\nskipped_count={}\nfailed_ratio={:.4}\nduration_ms_total={}\ntop_five_slowest_tests={}\n",
        counts.total,
        counts.executed(),
        counts.passed,
        counts.failed,
        counts.skipped,
        counts.failed_ratio(),
        counts.duration_ms_total,
        slowest_json,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestResult;

    fn case(status: TestStatus, duration_ms: i64, message: Option<&str>) -> TestCase {
        TestCase {
            name: "t".to_string(),
            suite_name: "s".to_string(),
            class_name: "C".to_string(),
            file_name: "C.java".to_string(),
            duration_ms,
            result: TestResult { status, message: message.map(str::to_string), result_type: None, desc: None },
            stdout: None,
            stderr: None,
        }
    }

    #[test]
    fn aggregate_counts_every_status() {
        let cases = vec![
            case(TestStatus::Passed, 100, None),
            case(TestStatus::Failed, 50, None),
            case(TestStatus::Error, 10, None),
            case(TestStatus::Skipped, 0, None),
            case(TestStatus::Skipped, 0, Some(TI_SKIP_MESSAGE)),
        ];
        let counts = aggregate(&cases);
        assert_eq!(counts.total, 5);
        assert_eq!(counts.passed, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.error, 1);
        assert_eq!(counts.skipped, 2);
        assert_eq!(counts.skipped_by_ti, 1);
        assert_eq!(counts.executed(), 3);
    }

    #[test]
    fn failed_ratio_is_zero_on_empty_total() {
        assert_eq!(Counts::default().failed_ratio(), 0.0);
    }

    #[test]
    fn failed_ratio_counts_failed_and_error() {
        let cases = vec![case(TestStatus::Passed, 1, None), case(TestStatus::Failed, 1, None), case(TestStatus::Error, 1, None)];
        let counts = aggregate(&cases);
        assert!((counts.failed_ratio() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn top_five_slowest_is_capped_and_descending() {
        let cases: Vec<_> = (0..8).map(|i| case(TestStatus::Passed, i * 1000, None)).collect();
        let slowest = top_five_slowest(&cases);
        assert_eq!(slowest.len(), 5);
        assert!(slowest[0].ends_with("7s"));
    }

    #[test]
    fn duration_parses_seconds_float_with_commas_stripped() {
        assert_eq!(parse_duration_ms("1,5"), 15000);
    }

    #[test]
    fn duration_parses_hh_mm_ss_literal() {
        assert_eq!(parse_duration_ms("00:01:02.5"), 62500);
    }

    #[test]
    fn duration_defaults_to_zero_on_garbage() {
        assert_eq!(parse_duration_ms("not-a-duration"), 0);
    }

    #[test]
    fn env_file_contains_every_documented_key() {
        let cases = vec![case(TestStatus::Passed, 100, None)];
        let counts = aggregate(&cases);
        let rendered = render_env_file(&cases, &counts);
        for key in ["total_tests", "executed_count", "passed_count", "failed_count", "skipped_count", "failed_ratio", "duration_ms_total", "top_five_slowest_tests"] {
            assert!(rendered.contains(&format!("{key}=")), "missing key {key}");
        }
    }

    #[tokio::test]
    async fn expand_report_globs_matches_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("reports/sub")).unwrap();
        std::fs::write(dir.path().join("reports/a.xml"), "").unwrap();
        std::fs::write(dir.path().join("reports/sub/b.xml"), "").unwrap();
        let pattern = format!("{}/reports/**/*.xml", dir.path().display());
        let found = expand_report_globs(&[pattern.clone(), pattern]).unwrap();
        assert_eq!(found.len(), 2);
    }
}
