//! Component A — File classifier.
//!
//! A single pure function, [`classify`], maps a repository-relative path to a
//! [`Node`]. No filesystem access, no allocation beyond the returned `Node`
//! itself — the rules are a small ordered table over path shape, matching the
//! teacher's preference for free functions over stateful objects wherever a
//! trait would add nothing.

use crate::model::{Node, NodeType};
use globset::{Glob, GlobSetBuilder};

/// Rules are applied in this order; the first match wins (§4.A).
pub fn classify(path: &str, test_globs: &[String]) -> Node {
    let path = normalize_path(path);

    if let Some(node) = classify_jvm(&path) {
        return node;
    }
    if path.contains("src/test/resources/") {
        return resource_node(&path);
    }
    if let Some(ext) = extension(&path) {
        match ext {
            "cs" | "vb" | "fs" => return classify_dotnet(&path, test_globs),
            "py" => return classify_python(&path, test_globs),
            "rb" => return classify_ruby(&path, test_globs),
            _ => {}
        }
    }
    other_node(&path)
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

fn extension(path: &str) -> Option<&str> {
    path.rsplit('.').next().filter(|ext| *ext != path)
}

fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => name,
    }
}

fn classify_jvm(path: &str) -> Option<Node> {
    const LANG_EXTS: [&str; 4] = ["java", "scala", "kt", "kts"];
    let ext = extension(path)?;
    if !LANG_EXTS.contains(&ext) {
        return None;
    }

    let (prefix, node_type) = if let Some(idx) = find_prefix(path, "src/main/") {
        (idx, NodeType::Source)
    } else if let Some(idx) = find_prefix(path, "src/test/") {
        (idx, NodeType::Test)
    } else {
        return None;
    };

    // prefix points just past "src/main/" or "src/test/"; the next path
    // segment is the language name (java/scala/kotlin), then the package path.
    let rest = &path[prefix..];
    let after_lang = match rest.split_once('/') {
        Some((lang_dir, _)) if lang_dir == "resources" => return None,
        Some((_, after)) => after,
        None => return None,
    };

    let (pkg_path, _file_name) = match after_lang.rsplit_once('/') {
        Some((pkg, file)) => (pkg, file),
        None => ("", after_lang),
    };
    let package = pkg_path.replace('/', ".");
    let class = file_stem(path).to_string();

    Some(Node {
        id: 0,
        class_id: 0,
        package,
        class,
        method: String::new(),
        params: String::new(),
        file: path.to_string(),
        node_type,
        calls_reflection: false,
        always_run: false,
        has_failed: false,
    })
}

fn find_prefix(path: &str, marker: &str) -> Option<usize> {
    path.find(marker).map(|idx| idx + marker.len())
}

fn resource_node(path: &str) -> Node {
    Node {
        id: 0,
        class_id: 0,
        package: String::new(),
        class: String::new(),
        method: String::new(),
        params: String::new(),
        file: path.to_string(),
        node_type: NodeType::Resource,
        calls_reflection: false,
        always_run: false,
        has_failed: false,
    }
}

fn other_node(path: &str) -> Node {
    Node {
        id: 0,
        class_id: 0,
        package: String::new(),
        class: file_stem(path).to_string(),
        method: String::new(),
        params: String::new(),
        file: path.to_string(),
        node_type: NodeType::Source,
        calls_reflection: false,
        always_run: false,
        has_failed: false,
    }
}

/// Builds a [`globset::GlobSet`] using `**`-capable double-star glob syntax,
/// the one glob engine this crate uses everywhere (classifier, selector,
/// report-path expansion) per Design Notes §9.
pub fn build_globset(patterns: &[String]) -> Option<globset::GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().ok()
}

fn matches_any(globset: &Option<globset::GlobSet>, path: &str) -> bool {
    globset.as_ref().is_some_and(|gs| gs.is_match(path))
}

fn classify_dotnet(path: &str, test_globs: &[String]) -> Node {
    let globset = build_globset(test_globs);
    let node_type = if matches_any(&globset, path) {
        NodeType::Test
    } else {
        NodeType::Source
    };
    Node {
        id: 0,
        class_id: 0,
        package: String::new(),
        class: file_stem(path).to_string(),
        method: String::new(),
        params: String::new(),
        file: path.to_string(),
        node_type,
        calls_reflection: false,
        always_run: false,
        has_failed: false,
    }
}

fn classify_python(path: &str, test_globs: &[String]) -> Node {
    let name = path.rsplit('/').next().unwrap_or(path);
    let globset = build_globset(test_globs);
    let is_test = name.starts_with("test_") || name.ends_with("_test.py") || matches_any(&globset, path);
    let node_type = if is_test { NodeType::Test } else { NodeType::Source };
    Node {
        id: 0,
        class_id: 0,
        package: String::new(),
        class: file_stem(path).to_string(),
        method: String::new(),
        params: String::new(),
        file: path.to_string(),
        node_type,
        calls_reflection: false,
        always_run: false,
        has_failed: false,
    }
}

fn classify_ruby(path: &str, test_globs: &[String]) -> Node {
    let name = path.rsplit('/').next().unwrap_or(path);
    let globset = build_globset(test_globs);
    let is_test = name.ends_with("_spec.rb") || matches_any(&globset, path);
    let node_type = if is_test { NodeType::Test } else { NodeType::Source };
    Node {
        id: 0,
        class_id: 0,
        package: String::new(),
        class: file_stem(path).to_string(),
        method: String::new(),
        params: String::new(),
        file: path.to_string(),
        node_type,
        calls_reflection: false,
        always_run: false,
        has_failed: false,
    }
}

/// Language detection for a callgraph: the extension of the first node's
/// `file` field, mapped through the same rules `classify` uses (§4.A last
/// paragraph).
pub fn detect_language(first_file: &str) -> Option<&'static str> {
    match extension(first_file)? {
        "java" | "scala" | "kt" | "kts" => Some("jvm"),
        "cs" | "vb" | "fs" => Some("dotnet"),
        "py" => Some("python"),
        "rb" => Some("ruby"),
        _ => None,
    }
}

/// Walks `workspace` for files with any of `extensions`, classifies each
/// (§4.A), and returns the ones that classify as tests. Shared by the
/// dotnet/Python/Ruby runners' `auto_detect_tests` (§4.E #2) — the JVM
/// family uses `runner::jvm_common` instead, since it also needs the
/// package-header extraction `auto_detect_packages` requires.
pub async fn auto_detect_tests_by_extension(
    workspace: &std::path::Path,
    extensions: &'static [&'static str],
    test_globs: &[String],
) -> Vec<crate::model::RunnableTest> {
    use crate::model::{NodeType, RunnableTest, SelectionReason};

    let workspace = workspace.to_path_buf();
    let test_globs = test_globs.to_vec();
    tokio::task::spawn_blocking(move || {
        let mut out = Vec::new();
        walk_files(&workspace, extensions, &mut out, &workspace);
        out.into_iter()
            .filter_map(|rel| {
                let node = classify(&rel, &test_globs);
                (node.node_type == NodeType::Test)
                    .then(|| RunnableTest::new(node.package, node.class, SelectionReason::SourceCode))
            })
            .collect()
    })
    .await
    .unwrap_or_default()
}

fn walk_files(dir: &std::path::Path, extensions: &[&str], out: &mut Vec<String>, root: &std::path::Path) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_files(&path, extensions, out, root);
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str())
            && extensions.contains(&ext)
        {
            let rel = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
            out.push(rel);
        }
    }
}
