//! Helpers shared by every runner's `get_cmd` (§4.F).
//!
//! Free functions over `&[RunnableTest]`, not a shared base type — per
//! Design Notes §9 ("avoid deep inheritance; shared helpers... are free
//! functions"). Grounded on `provider.rs`'s `Command`/`shell_escape`, but
//! renders runner-specific token shapes directly rather than through a
//! single generic shell-command builder, since each build tool's filter
//! syntax is its own small grammar (`-Dtest=a,b`, `--tests "a"`, `//a //b`…).

use crate::model::RunnableTest;

/// The literal sentinel emitted whenever `run_all` is false and the
/// selection is empty (§4.F, §8.1).
pub const SKIP_SENTINEL: &str = "echo \"Skipping test run, received no tests to execute\"";

/// Returns the skip sentinel when `run_all` is false and `selected` is
/// empty; otherwise `None`, meaning the caller should render a real command.
pub fn skip_sentinel_if_empty(run_all: bool, selected: &[RunnableTest]) -> Option<String> {
    if !run_all && selected.is_empty() {
        Some(SKIP_SENTINEL.to_string())
    } else {
        None
    }
}

/// Deduplicates `tests` on `(package, class)`, preserving first-seen order,
/// and returns their qualified `pkg.class` names (§4.F: "every runner must
/// deduplicate tests on the (package, class) pair before rendering the
/// filter").
pub fn dedup_qualified_classes(tests: &[RunnableTest]) -> Vec<String> {
    crate::model::dedup_by_package_class(tests)
        .into_iter()
        .map(RunnableTest::qualified_class)
        .collect()
}

/// Splits `user_args` on the first `||`, returning `(before, after)` with
/// both halves trimmed. `after` is `None` when there is no `||`. Used by
/// Gradle and Bazel, which reattach the tail as trailing shell `||` clauses
/// so a fallback command still runs if the primary one fails (§4.F).
pub fn split_trailing_or_clause(user_args: &str) -> (String, Option<String>) {
    match user_args.split_once("||") {
        Some((before, after)) => (before.trim().to_string(), Some(after.trim().to_string())),
        None => (user_args.trim().to_string(), None),
    }
}

/// Appends `" || {tail}"` to `cmd` when `tail` is present.
pub fn append_or_clause(mut cmd: String, tail: Option<&str>) -> String {
    if let Some(tail) = tail
        && !tail.is_empty()
    {
        cmd.push_str(" || ");
        cmd.push_str(tail);
    }
    cmd
}

/// Joins non-empty string fragments with a single space, skipping any
/// fragment that is empty after trimming. Keeps runner command builders
/// from accumulating stray double spaces when an optional segment (the
/// agent attach, a filter clause) is absent — except where the spec's own
/// worked examples show a deliberate double space from an empty `user_args`
/// slot (Bazel; see `runner/bazel.rs`), which callers render directly.
pub fn join_nonempty(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectionReason;

    #[test]
    fn skip_sentinel_only_when_empty_and_not_run_all() {
        assert!(skip_sentinel_if_empty(false, &[]).is_some());
        assert!(skip_sentinel_if_empty(true, &[]).is_none());
        let t = vec![RunnableTest::new("p", "C", SelectionReason::SourceCode)];
        assert!(skip_sentinel_if_empty(false, &t).is_none());
    }

    #[test]
    fn dedup_collapses_duplicate_package_class() {
        let tests = vec![
            RunnableTest::new("p", "A", SelectionReason::SourceCode),
            RunnableTest::new("p", "A", SelectionReason::NewTest),
            RunnableTest::new("p", "B", SelectionReason::SourceCode),
        ];
        assert_eq!(dedup_qualified_classes(&tests), vec!["p.A".to_string(), "p.B".to_string()]);
    }

    #[test]
    fn splits_on_first_or_clause_only() {
        let (before, after) = split_trailing_or_clause("test -Dx=1 || true || false");
        assert_eq!(before, "test -Dx=1");
        assert_eq!(after.as_deref(), Some("true || false"));
    }

    #[test]
    fn no_or_clause_returns_none_tail() {
        let (before, after) = split_trailing_or_clause("test -Dx=1");
        assert_eq!(before, "test -Dx=1");
        assert!(after.is_none());
    }
}
