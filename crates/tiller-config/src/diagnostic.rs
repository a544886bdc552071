// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment reports where deserialization failed; this module turns those
//! reports into miette diagnostics that point at the offending line of
//! `tiller.toml` and suggest the closest valid key or value.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler similarity a candidate must exceed to be suggested.
const SIMILARITY_FLOOR: f64 = 0.75;

/// A configuration problem, renderable as a miette report.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no section accepts.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(tiller::config::unknown_key), help("{}", hint(suggestion.as_deref(), valid_keys)))]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted by the section.
        valid_keys: String,
        #[label("not a key of this section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// An enumerated setting (such as `ledger.backend`) with an unsupported value.
    #[error("`{value}` is not a valid value for `{key}`")]
    #[diagnostic(code(tiller::config::unknown_value), help("{}", hint(suggestion.as_deref(), allowed)))]
    UnknownValue {
        key: String,
        value: String,
        suggestion: Option<String>,
        allowed: String,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(tiller::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(tiller::config::missing_key), help("add `{key} = <value>` to tiller.toml"))]
    MissingKey { key: String },

    /// The file parsed, but a value breaks a routing rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(tiller::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(tiller::config::other))]
    Other(String),
}

fn hint(suggestion: Option<&str>, choices: &str) -> String {
    match suggestion {
        Some(best) => format!("did you mean `{best}`? Choices: {choices}"),
        None => format!("choices: {choices}"),
    }
}

/// Maps every error carried by a figment failure to a diagnostic.
///
/// `toml_sources` pairs each candidate file path with its contents so unknown
/// keys can be located; a single entry is also used for inline sources.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let key = |field: &str| {
                let mut parts: Vec<&str> = error.path.iter().map(String::as_str).collect();
                if parts.last() != Some(&field) {
                    parts.push(field);
                }
                parts.join(".")
            };
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(&error, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: closest_match(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::UnknownVariant(value, allowed) => ConfigError::UnknownValue {
                    key: error.path.join("."),
                    value: value.clone(),
                    suggestion: closest_match(value, allowed),
                    allowed: allowed.join(", "),
                },
                Kind::MissingField(field) => ConfigError::MissingKey { key: key(field) },
                Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                    key: error.path.join("."),
                    found: found.to_string(),
                    expected: expected.clone(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Resolves the span of `field` in whichever source the error came from.
fn locate(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let source = match (origin, toml_sources) {
        (Some(path), _) => toml_sources.iter().find(|(p, _)| *p == path),
        (None, [only]) => Some(only),
        (None, _) => None,
    };

    source
        .and_then(|(path, content)| {
            let offset = find_key_offset(content, &error.path, field)?;
            Some((
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field` inside the table named by `path`.
///
/// Scans line by line, tracking the current `[table]` or `[[array]]` header.
/// Numeric path segments (array indices) are ignored, so the first array
/// entry containing the key is reported.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let wanted: Vec<&str> = path
        .iter()
        .map(String::as_str)
        .filter(|seg| seg.parse::<usize>().is_err())
        .collect();
    let wanted = wanted.join(".");

    let mut table = String::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            table = trimmed
                .trim_end()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .trim()
                .to_string();
            continue;
        }
        if table != wanted {
            continue;
        }
        let Some(rest) = trimmed.strip_prefix(field) else {
            continue;
        };
        if rest.trim_start().starts_with('=') {
            return Some(start + (line.len() - trimmed.len()));
        }
    }
    None
}

/// The candidate most similar to `input`, if any clears the similarity floor.
pub fn closest_match(input: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(input, c), *c))
        .filter(|(score, _)| *score > SIMILARITY_FLOOR)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

/// Prints each error to stderr as a graphical miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
