// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered through miette.
//!
//! Figment errors are regrouped by what went wrong in a `scholar.toml`:
//! a misspelled key, a misspelled `[assistants.<kind>]` table, a wrong value
//! type. Prompt problems found later by the prompt book use the same type so
//! the CLI prints every configuration failure the same way.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use scholar_core::AssistantKind;
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Keys accepted inside `[assistants]` besides the per-kind tables.
const ASSISTANTS_KEYS: &[&str] = &["base_prompt", "base_prompt_file"];

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that the section does not define.
    #[error("unknown key `{key}` in [{section}]")]
    #[diagnostic(
        code(scholar::config::unknown_key),
        help("{}", did_you_mean(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a key of [{section}]")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// An `[assistants.<name>]` table whose name is not an assistant kind.
    #[error("unknown assistant kind `{name}`")]
    #[diagnostic(
        code(scholar::config::unknown_kind),
        help("{}", did_you_mean(suggestion.as_deref(), &kind_names()))
    )]
    UnknownAssistantKind {
        name: String,
        suggestion: Option<String>,
        #[label("no such assistant kind")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for `{key}`: {detail}")]
    #[diagnostic(code(scholar::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(scholar::config::missing_key),
        help("add `{key} = <value>` to your scholar.toml")
    )]
    MissingKey { key: String },

    /// No prompt is configured for an assistant kind.
    #[error("no prompt configured for assistant kind `{kind}`")]
    #[diagnostic(
        code(scholar::config::missing_prompt),
        help("set `assistants.{kind}.prompt`, `assistants.{kind}.prompt_file`, or the {env_var} environment variable")
    )]
    MissingPrompt { kind: String, env_var: String },

    /// A prompt file named in config or the environment could not be read.
    #[error("cannot read {owner} prompt file `{path}`: {reason}")]
    #[diagnostic(
        code(scholar::config::prompt_file),
        help("fix the path or inline the prompt instead")
    )]
    PromptFile {
        /// `base` or the assistant kind name.
        owner: String,
        path: String,
        reason: String,
    },

    #[error("validation error: {message}")]
    #[diagnostic(code(scholar::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(scholar::config::other))]
    Other(String),
}

fn did_you_mean(suggestion: Option<&str>, valid: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid: {valid}"),
        None => format!("valid: {valid}"),
    }
}

fn kind_names() -> String {
    AssistantKind::all()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Converts every error inside a `figment::Error` into diagnostics.
///
/// `toml_sources` pairs a file path (or `<inline>`) with its contents and is
/// only used to attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section: Vec<String> = error.path.iter().map(ToString::to_string).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let source = source_for(&error, toml_sources);
                    unknown_field(&section, field, expected, source)
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&section, field),
                },
                Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                    key: section.join("."),
                    detail: format!("found {actual}"),
                    expected: expected.to_string(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn unknown_field(
    section: &[String],
    field: &str,
    expected: &[&str],
    source: Option<(&str, &str)>,
) -> ConfigError {
    let (span, src) = match source.and_then(|(path, content)| {
        locate_key(content, section, field).map(|offset| (path, content, offset))
    }) {
        Some((path, content, offset)) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.to_string())),
        ),
        None => (None, None),
    };

    // Under [assistants], a name unlike the base prompt keys was meant as a kind table.
    if section == ["assistants"] && suggest_key(field, ASSISTANTS_KEYS).is_none() {
        let kinds: Vec<String> = AssistantKind::all().map(|k| k.to_string()).collect();
        let kinds: Vec<&str> = kinds.iter().map(String::as_str).collect();
        return ConfigError::UnknownAssistantKind {
            name: field.to_string(),
            suggestion: suggest_key(field, &kinds),
            span,
            src,
        };
    }

    ConfigError::UnknownKey {
        key: field.to_string(),
        section: if section.is_empty() {
            "root".to_string()
        } else {
            section.join(".")
        },
        suggestion: suggest_key(field, expected),
        valid_keys: expected.join(", "),
        span,
        src,
    }
}

fn dotted(section: &[String], field: &str) -> String {
    section
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(field))
        .collect::<Vec<_>>()
        .join(".")
}

/// The loaded TOML file the error came from, if we have its contents.
fn source_for<'a>(
    error: &figment::error::Error,
    toml_sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let origin = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(path)) => Some(path.display().to_string()),
        _ => None,
    };
    toml_sources
        .iter()
        .find(|(path, _)| origin.as_deref().is_none_or(|o| o == path))
        .map(|(path, content)| (path.as_str(), content.as_str()))
}

/// Byte offset of `key` inside the `[section]` table of a TOML document.
///
/// Table headers are tracked line by line, so a key is only matched under its
/// own header. A key that names a sub-table (`[assistants.therapyGTP]` for
/// section `assistants`) is found in the header itself.
pub fn locate_key(content: &str, section: &[String], key: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        let indent = line.len() - line.trim_start().len();

        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = header.trim().to_string();
            let names_key = match current.rsplit_once('.') {
                Some((parent, last)) => parent == wanted && last == key,
                None => wanted.is_empty() && current == key,
            };
            if names_key && let Some(at) = line.rfind(key) {
                return Some(offset + at);
            }
        } else if current == wanted
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Best valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
