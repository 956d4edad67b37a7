//! Parsing of subunit2html Tempest reports

use crate::error::{RcaError, Result};
use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// A failing test extracted from a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempestFailure {
    pub test_name: String,
    pub traceback: String,
}

/// Extracts failing tests from the subunit2html layout
pub struct ReportParser {
    row: Regex,
    failed_case: Regex,
    traceback: Regex,
    row_prefix: Regex,
    entity: Regex,
}

impl ReportParser {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| RcaError::Internal(format!("report pattern: {}", e)))
        };

        Ok(Self {
            row: compile(r"(?is)<tr\b[^>]*>(.*?)</tr>")?,
            failed_case: compile(
                r#"(?is)<td\s+class\s*=\s*['"](?:failCase|errorCase)['"][^>]*>\s*<div\s+class\s*=\s*['"]testcase['"][^>]*>(.*?)</div>"#,
            )?,
            traceback: compile(r"(?is)<pre\b[^>]*>(.*?)</pre>")?,
            row_prefix: compile(r"^\s*[a-z]{2}\d+\.\d+:\s?")?,
            entity: compile(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")?,
        })
    }

    /// Distinct failing tests in report order; the first occurrence of a name wins
    pub fn parse(&self, html: &str) -> Vec<TempestFailure> {
        let mut failures: IndexMap<String, String> = IndexMap::new();

        for row in self.row.captures_iter(html) {
            let row = &row[1];
            let Some(case) = self.failed_case.captures(row) else {
                continue;
            };

            let test_name = self.decode_entities(case[1].trim());
            if test_name.is_empty() {
                continue;
            }

            let traceback = self
                .traceback
                .captures(row)
                .map(|pre| self.clean_traceback(&pre[1]))
                .unwrap_or_default();

            failures.entry(test_name).or_insert(traceback);
        }

        failures
            .into_iter()
            .map(|(test_name, traceback)| TempestFailure { test_name, traceback })
            .collect()
    }

    fn clean_traceback(&self, raw: &str) -> String {
        let decoded = self.decode_entities(raw);
        self.row_prefix.replace(&decoded, "").trim_end().to_string()
    }

    /// Decode named and numeric HTML character references
    pub fn decode_entities(&self, text: &str) -> String {
        self.entity
            .replace_all(text, |caps: &Captures| {
                let entity = &caps[1];
                let decoded = if let Some(hex) = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                {
                    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok().and_then(char::from_u32)
                } else {
                    match entity {
                        "lt" => Some('<'),
                        "gt" => Some('>'),
                        "amp" => Some('&'),
                        "quot" => Some('"'),
                        "apos" => Some('\''),
                        "nbsp" => Some(' '),
                        _ => None,
                    }
                };

                decoded
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Last `max_chars` characters of `text`
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    match text.char_indices().nth(count - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
