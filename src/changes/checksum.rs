//! Git-file-checksum format (§6).
//!
//! One checksum per tracked file, derived from `git ls-tree` rather than file
//! contents, so computing the whole-repo set is one process spawn instead of
//! one read per file. Non-code paths are collapsed into a single synthetic
//! `__NON_CODE__` entry — the ignore-list mechanism (`.ticonfig.yaml`) only
//! needs to distinguish "did anything non-code change," not which file.

use crate::error::ChangesError;
use crate::process;
use std::collections::BTreeMap;
use std::path::Path;
use xxhash_rust::xxh64::xxh64;

/// Extensions the checksum set treats as individually significant; anything
/// else folds into `__NON_CODE__`. Mirrors the language set
/// [`crate::classify`] recognizes.
const CODE_EXTENSIONS: [&str; 9] = ["java", "scala", "kt", "kts", "cs", "vb", "fs", "py", "rb"];

pub const NON_CODE_KEY: &str = "__NON_CODE__";

/// Builds the `{path → checksum}` map for `workspace`'s `HEAD` tree.
pub async fn git_file_checksums(workspace: &Path, step_id: &str) -> Result<BTreeMap<String, u64>, ChangesError> {
    let output = process::run("git", &["ls-tree", "-r", "HEAD", "."], workspace)
        .await
        .map_err(|source| ChangesError::GitFailed { step_id: step_id.to_string(), source })?;
    Ok(parse_ls_tree(&output.stdout_str()))
}

fn parse_ls_tree(stdout: &str) -> BTreeMap<String, u64> {
    let mut checksums = BTreeMap::new();
    let mut non_code_paths = Vec::new();

    for line in stdout.lines() {
        let Some((meta, path)) = line.split_once('\t') else { continue };
        let Some(sha) = meta.split_whitespace().nth(2) else { continue };
        if sha.len() < 16 {
            continue;
        }
        if is_code_path(path) {
            if let Ok(value) = u64::from_str_radix(&sha[..16], 16) {
                checksums.insert(path.to_string(), value);
            }
        } else {
            non_code_paths.push(path.to_string());
        }
    }

    if !non_code_paths.is_empty() {
        non_code_paths.sort();
        let joined = non_code_paths.join("#");
        checksums.insert(NON_CODE_KEY.to_string(), xxh64(joined.as_bytes(), 0));
    }

    checksums
}

fn is_code_path(path: &str) -> bool {
    path.rsplit('.').next().is_some_and(|ext| ext != path && CODE_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_16_hex_chars_of_sha_as_u64() {
        let stdout = "100644 blob 0123456789abcdef0123456789abcdef01234567\tsrc/Widget.java\n";
        let checksums = parse_ls_tree(stdout);
        assert_eq!(checksums["src/Widget.java"], 0x0123456789abcdef);
    }

    #[test]
    fn non_code_paths_collapse_into_one_synthetic_entry() {
        let stdout = "100644 blob 0000000000000000000000000000000000000000\tREADME.md\n\
                      100644 blob 1111111111111111111111111111111111111111\tLICENSE\n";
        let checksums = parse_ls_tree(stdout);
        assert_eq!(checksums.len(), 1);
        assert!(checksums.contains_key(NON_CODE_KEY));
    }

    #[test]
    fn non_code_hash_is_order_independent() {
        let a = "100644 blob 0000000000000000000000000000000000000000\tb.txt\n\
                 100644 blob 1111111111111111111111111111111111111111\ta.txt\n";
        let b = "100644 blob 1111111111111111111111111111111111111111\ta.txt\n\
                 100644 blob 0000000000000000000000000000000000000000\tb.txt\n";
        assert_eq!(parse_ls_tree(a)[NON_CODE_KEY], parse_ls_tree(b)[NON_CODE_KEY]);
    }

    #[test]
    fn code_and_non_code_paths_coexist() {
        let stdout = "100644 blob 0123456789abcdef0123456789abcdef01234567\tsrc/main.py\n\
                      100644 blob fedcba9876543210fedcba9876543210fedcba98\tREADME.md\n";
        let checksums = parse_ls_tree(stdout);
        assert_eq!(checksums.len(), 2);
        assert!(checksums.contains_key("src/main.py"));
        assert!(checksums.contains_key(NON_CODE_KEY));
    }
}
