//! Stylesheet custom-property extraction.
//!
//! Parses the configured variables stylesheet (`--name: value` declarations),
//! resolves `var()` references including fallbacks and nested references, and
//! exposes the result as a JSON document importable by scripts.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{BundlerError, Result};

/// Resolution depth cap to keep malformed reference chains from recursing.
const MAX_RESOLUTION_DEPTH: usize = 100;

/// Failures while resolving `var()` references.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VariablesError {
    #[error("undefined variable '{0}' with no fallback")]
    Undefined(String),

    #[error("circular reference: {}", .0.join(" -> "))]
    Circular(Vec<String>),

    #[error("maximum variable resolution depth exceeded")]
    MaxDepthExceeded,
}

/// Custom properties from a stylesheet, fully resolved, in source order.
///
/// Keys are stored without the leading `--` so scripts can read them as
/// plain object properties.
#[derive(Debug, Clone, Default)]
pub struct StyleVariables {
    values: IndexMap<String, String>,
}

impl StyleVariables {
    /// Parse custom-property declarations out of CSS source and resolve
    /// every `var()` reference. Later declarations of the same name win.
    pub fn parse(source: &str) -> std::result::Result<Self, VariablesError> {
        let stripped = strip_comments(source);
        let raw = collect_declarations(&stripped);

        let mut values = IndexMap::with_capacity(raw.len());
        for name in raw.keys() {
            let mut visited = HashSet::new();
            visited.insert(name.clone());
            let resolved = resolve(&raw, &raw[name], &mut visited, 0)?;
            values.insert(name.trim_start_matches("--").to_string(), resolved);
        }

        Ok(Self { values })
    }

    /// Read and parse the variables stylesheet at `path`.
    ///
    /// A missing file yields an empty set; projects without shared
    /// variables should not have to create one.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no variables stylesheet, skipping");
            return Ok(Self::default());
        }
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source).map_err(|e| BundlerError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name.trim_start_matches("--"))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The resolved variables as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Remove `/* ... */` comments. Unterminated comments run to the end.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start..].find("*/") {
            Some(end) => rest = &rest[start + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Collect `--name: value` declarations in source order.
fn collect_declarations(source: &str) -> IndexMap<String, String> {
    let mut declarations = IndexMap::new();
    let mut i = 0;

    while let Some(offset) = source[i..].find("--") {
        let start = i + offset;

        // A declaration only starts at the top of a block or after another
        // declaration; this skips double hyphens inside values.
        let preceded_ok = source[..start].trim_end().ends_with(['{', ';'])
            || source[..start].trim().is_empty();
        if !preceded_ok {
            i = start + 2;
            continue;
        }

        let Some(colon) = source[start..].find(':') else {
            break;
        };
        let name = source[start..start + colon].trim().to_string();
        if !is_valid_name(&name) {
            i = start + 2;
            continue;
        }

        let value_start = start + colon + 1;
        let value_end = source[value_start..]
            .find([';', '}'])
            .map(|p| value_start + p)
            .unwrap_or(source.len());
        let value = source[value_start..value_end].trim().to_string();

        if !value.is_empty() {
            declarations.insert(name, value);
        }
        i = value_end;
    }

    declarations
}

fn is_valid_name(name: &str) -> bool {
    name.len() > 2
        && name.starts_with("--")
        && !name.contains(|c: char| c.is_whitespace() || matches!(c, '{' | '}' | ';' | ':'))
}

/// Expand every `var()` reference in `value`, with cycle detection.
fn resolve(
    definitions: &IndexMap<String, String>,
    value: &str,
    visited: &mut HashSet<String>,
    depth: usize,
) -> std::result::Result<String, VariablesError> {
    if depth > MAX_RESOLUTION_DEPTH {
        return Err(VariablesError::MaxDepthExceeded);
    }

    if !value.contains("var(") {
        return Ok(value.to_string());
    }

    let mut result = value.to_string();
    while let Some((start, end, name, fallback)) = find_var_reference(&result) {
        if visited.contains(&name) {
            let mut chain: Vec<String> = visited.iter().cloned().collect();
            chain.push(name);
            return Err(VariablesError::Circular(chain));
        }

        let replacement = match definitions.get(&name) {
            Some(raw) => {
                visited.insert(name.clone());
                let resolved = resolve(definitions, raw, visited, depth + 1)?;
                visited.remove(&name);
                resolved
            }
            None => match fallback {
                Some(fb) => resolve(definitions, &fb, visited, depth + 1)?,
                None => return Err(VariablesError::Undefined(name)),
            },
        };

        result = format!("{}{}{}", &result[..start], replacement, &result[end..]);
    }

    Ok(result)
}

/// Find the first `var()` reference: (start, end, name, optional fallback).
fn find_var_reference(s: &str) -> Option<(usize, usize, String, Option<String>)> {
    let start = s.find("var(")?;
    let rest = &s[start + 4..];

    let mut paren_depth = 1;
    let mut end_offset = None;
    let mut comma_pos = None;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => paren_depth += 1,
            ')' => {
                paren_depth -= 1;
                if paren_depth == 0 {
                    end_offset = Some(i);
                    break;
                }
            }
            ',' if paren_depth == 1 && comma_pos.is_none() => comma_pos = Some(i),
            _ => {}
        }
    }

    let end_offset = end_offset?;
    let content = &rest[..end_offset];
    let end = start + 4 + end_offset + 1;

    let (name, fallback) = match comma_pos {
        Some(comma) => (
            content[..comma].trim().to_string(),
            Some(content[comma + 1..].trim().to_string()),
        ),
        None => (content.trim().to_string(), None),
    };

    Some((start, end, name, fallback))
}
