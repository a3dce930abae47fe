//! TRX (Visual Studio Test Results) parser (§4.I).
//!
//! TRX separates test identity from test outcome into two independent
//! element families: `<UnitTest>`/`<TestMethod>` under `<TestDefinitions>`
//! carries the class name, and `<UnitTestResult>` under `<Results>` carries
//! the duration/outcome, joined only by a shared `testId` GUID. This parser
//! makes one pass collecting both families keyed by `testId`, then joins
//! them once at the end — the ordering of the two sections in the document
//! is not guaranteed, so no join can happen inline during the Start/End walk.
//!
//! Grounded on `report/junit.rs`'s quick-xml-events parsing idiom, adapted
//! from JUnit's single-family nested-suite shape to TRX's two-family
//! deferred join.

use super::{parse_duration_ms, xml_attr};
use crate::error::ReportError;
use crate::model::{clamp_duration, truncate_report_string, TestCase, TestResult, TestStatus};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::path::PathBuf;

/// `suite_name` TRX has no concept of; every case is attributed to one
/// synthetic suite so downstream aggregation still has a stable label.
const TRX_SUITE_NAME: &str = "TRX";

struct RawResult {
    test_id: String,
    test_name: String,
    duration: String,
    outcome: String,
    message: Option<String>,
    stack_trace: Option<String>,
    stdout: Option<String>,
}

/// Which child element of the current `<UnitTestResult>`/`<TestMethod>` is
/// being captured as text.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    ErrorMessage,
    StackTrace,
    StdOut,
}

/// Parses `content` (a TRX document) into a flat `TestCase` stream.
pub fn parse(content: &str) -> Result<Vec<TestCase>, ReportError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut class_by_test_id: HashMap<String, String> = HashMap::new();
    let mut results: Vec<RawResult> = Vec::new();

    let mut current_result: Option<RawResult> = None;
    let mut current_test_method_owner: Option<String> = None;
    let mut capture = Capture::None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ReportError::Parse { file: PathBuf::new(), message: e.to_string() })?;
        match event {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"UnitTest" => {
                    current_test_method_owner = xml_attr(&e, b"id");
                }
                b"TestMethod" => {
                    if let (Some(id), Some(class_name)) = (current_test_method_owner.clone(), xml_attr(&e, b"className")) {
                        class_by_test_id.insert(id, class_name);
                    }
                }
                b"UnitTestResult" => {
                    current_result = Some(RawResult {
                        test_id: xml_attr(&e, b"testId").unwrap_or_default(),
                        test_name: xml_attr(&e, b"testName").unwrap_or_default(),
                        duration: xml_attr(&e, b"duration").unwrap_or_default(),
                        outcome: xml_attr(&e, b"outcome").unwrap_or_default(),
                        message: None,
                        stack_trace: None,
                        stdout: None,
                    });
                }
                b"Message" => capture = Capture::ErrorMessage,
                b"StackTrace" => capture = Capture::StackTrace,
                b"StdOut" => capture = Capture::StdOut,
                _ => {}
            },
            Event::CData(e) | Event::Text(e) => {
                let text = e.unescape().map(|s| s.into_owned()).unwrap_or_else(|_| String::from_utf8_lossy(e.as_ref()).into_owned());
                if let Some(r) = current_result.as_mut() {
                    match capture {
                        Capture::ErrorMessage => r.message.get_or_insert_with(String::new).push_str(&text),
                        Capture::StackTrace => r.stack_trace.get_or_insert_with(String::new).push_str(&text),
                        Capture::StdOut => r.stdout.get_or_insert_with(String::new).push_str(&text),
                        Capture::None => {}
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"UnitTest" => current_test_method_owner = None,
                b"UnitTestResult" => {
                    if let Some(r) = current_result.take() {
                        results.push(r);
                    }
                }
                b"Message" | b"StackTrace" | b"StdOut" => capture = Capture::None,
                _ => {}
            },
            _ => {}
        }
    }

    Ok(results.into_iter().map(|r| finalize(r, &class_by_test_id)).collect())
}

fn finalize(r: RawResult, class_by_test_id: &HashMap<String, String>) -> TestCase {
    let class_name = class_by_test_id.get(&r.test_id).cloned().unwrap_or_default();
    let status = match r.outcome.as_str() {
        "Failed" => TestStatus::Failed,
        "Error" | "" => TestStatus::Error,
        "Passed" => TestStatus::Passed,
        _ => TestStatus::Skipped,
    };
    let desc = match (r.message, r.stack_trace) {
        (Some(m), Some(s)) => Some(format!("{m}\n{s}")),
        (Some(m), None) => Some(m),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    };
    TestCase {
        name: truncate_report_string(&r.test_name),
        suite_name: TRX_SUITE_NAME.to_string(),
        class_name: truncate_report_string(&class_name),
        file_name: String::new(),
        duration_ms: clamp_duration(parse_duration_ms(&r.duration)),
        result: TestResult {
            status,
            message: None,
            result_type: None,
            desc: desc.map(|d| truncate_report_string(&d)),
        },
        stdout: r.stdout.map(|s| truncate_report_string(&s)),
        stderr: None,
    }
}
