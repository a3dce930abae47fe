//! Configuration loading for the Test Intelligence execution core.
//!
//! Two surfaces: this binary's own step configuration (TOML, loaded with
//! [`load_config`]/[`load_config_str`]) and the target repository's
//! `.ticonfig.yaml` (YAML, loaded with [`load_ti_config`]). Environment
//! expansion (`${VAR}`, `${VAR:-default}`) follows the teacher's
//! character-by-character parser so step config can reference CI-provided
//! env vars the same way the teacher's provider configs do.

pub mod schema;

pub use schema::*;

use crate::error::SelectionError;
use anyhow::{Context, Result};
use std::path::Path;

/// Loads step configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    load_config_str(&content)
}

/// Loads step configuration from a TOML string.
pub fn load_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("failed to parse config as TOML")?;
    Ok(config)
}

/// Loads `.ticonfig.yaml` from `workspace`, if present. A missing file is not
/// an error — it just means no `ignore` globs are configured (§4.C).
pub fn load_ti_config(workspace: &Path) -> Result<Option<TiConfigFile>, SelectionError> {
    let path = workspace.join(".ticonfig.yaml");
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|source| SelectionError::ConfigRead {
        path: path.clone(),
        source,
    })?;
    let parsed: TiConfigFile =
        serde_yaml::from_str(&content).map_err(|source| SelectionError::ConfigParse { path, source })?;
    Ok(Some(parsed))
}

/// Expands `${VAR}` and `${VAR:-default}` references in `value`, leaving
/// unrecognized `$` sequences untouched. `$$` escapes to a literal `$`.
pub fn expand_env_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                result.push('$');
            }
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut default_value: Option<String> = None;
                let mut found_close = false;

                while let Some(&c) = chars.peek() {
                    if c == '}' {
                        chars.next();
                        found_close = true;
                        break;
                    }
                    if c == ':' {
                        chars.next();
                        if chars.peek() == Some(&'-') {
                            chars.next();
                            let mut default = String::new();
                            while let Some(&c) = chars.peek() {
                                if c == '}' {
                                    break;
                                }
                                default.push(c);
                                chars.next();
                            }
                            default_value = Some(default);
                        }
                        continue;
                    }
                    name.push(c);
                    chars.next();
                }

                if !found_close {
                    // Unterminated ${...}: leave as-is verbatim.
                    result.push_str("${");
                    result.push_str(&name);
                    if let Some(d) = &default_value {
                        result.push_str(":-");
                        result.push_str(d);
                    }
                    continue;
                }

                match std::env::var(&name) {
                    Ok(v) => result.push_str(&v),
                    Err(_) => {
                        if let Some(d) = default_value {
                            result.push_str(&d);
                        }
                    }
                }
            }
            _ => {
                result.push('$');
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_simple_var() {
        unsafe { std::env::set_var("TI_CORE_TEST_VAR", "hello") };
        assert_eq!(expand_env_value("${TI_CORE_TEST_VAR}"), "hello");
        unsafe { std::env::remove_var("TI_CORE_TEST_VAR") };
    }

    #[test]
    fn falls_back_to_default_when_unset() {
        unsafe { std::env::remove_var("TI_CORE_MISSING_VAR") };
        assert_eq!(expand_env_value("${TI_CORE_MISSING_VAR:-fallback}"), "fallback");
    }

    #[test]
    fn escapes_double_dollar() {
        assert_eq!(expand_env_value("$$literal"), "$literal");
    }

    #[test]
    fn leaves_unterminated_braces_untouched() {
        assert_eq!(expand_env_value("${UNCLOSED"), "${UNCLOSED");
    }

    #[test]
    fn loads_step_config_from_toml() {
        let toml = r#"
            [step]
            step_id = "step-1"
            language = "python"
            build_tool = "pytest"
        "#;
        let cfg = load_config_str(toml).unwrap();
        assert_eq!(cfg.step.step_id, "step-1");
        assert_eq!(cfg.step.split_strategy, "test_count");
    }

    #[test]
    fn missing_ticonfig_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_ti_config(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn reads_ignore_globs_from_ticonfig() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".ticonfig.yaml"),
            "config:\n  ignore:\n    - \"vendor/**\"\n",
        )
        .unwrap();
        let parsed = load_ti_config(dir.path()).unwrap().unwrap();
        assert_eq!(parsed.config.ignore, vec!["vendor/**".to_string()]);
    }
}
