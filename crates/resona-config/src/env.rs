use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Failure while substituting `{{ env.VAR }}` placeholders
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    /// Referenced variable is unset and no default was given
    #[error("environment variable not found: `{name}` (line {line})")]
    MissingVar { name: String, line: usize },

    /// Placeholder uses a scope other than `env.`
    #[error("only variables scoped with 'env.' are supported: `{key}` (line {line})")]
    UnsupportedScope { key: String, line: usize },
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // group 1: dotted key, group 2: optional default("...") value
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// `{{ env.VAR | default("fallback") }}` substitutes the fallback when the
/// variable is unset. Comment lines are left untouched so that commented-out
/// settings never require their variables to exist.
pub fn expand_env(input: &str) -> Result<String, ExpandError> {
    let lines = input
        .lines()
        .enumerate()
        .map(|(index, line)| expand_line(line, index + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let mut output = lines.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str, line_number: usize) -> Result<String, ExpandError> {
    if line.trim_start().starts_with('#') {
        return Ok(line.to_string());
    }

    let mut expanded = String::with_capacity(line.len());
    let mut cursor = 0;

    for captures in placeholder().captures_iter(line) {
        let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        expanded.push_str(&line[cursor..whole.start()]);

        let var_name = key
            .as_str()
            .strip_prefix("env.")
            .filter(|name| !name.is_empty() && !name.contains('.'))
            .ok_or_else(|| ExpandError::UnsupportedScope {
                key: key.as_str().to_string(),
                line: line_number,
            })?;

        match (std::env::var(var_name), captures.get(2)) {
            (Ok(value), _) => expanded.push_str(&value),
            (Err(_), Some(default)) => expanded.push_str(default.as_str()),
            (Err(_), None) => {
                return Err(ExpandError::MissingVar {
                    name: var_name.to_string(),
                    line: line_number,
                });
            }
        }

        cursor = whole.end();
    }

    expanded.push_str(&line[cursor..]);
    Ok(expanded)
}
