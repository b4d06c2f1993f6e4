// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt book: resolves the base prompt and each assistant kind's prompt.
//!
//! Precedence per prompt: inline config value, then config `*_file`, then the
//! `SCHOLAR_PROMPT_<SUFFIX>` environment variable, then a file named by
//! `SCHOLAR_PROMPT_<SUFFIX>_PATH`. Literal `\n` sequences are turned into
//! newlines so single-line environment values can carry paragraphs.

use std::collections::HashMap;

use scholar_core::{AssistantKind, ScholarError};
use tracing::debug;

use crate::diagnostic::ConfigError;
use crate::model::AssistantsConfig;

/// Environment variable prefix for prompt overrides.
pub const PROMPT_ENV_PREFIX: &str = "SCHOLAR_PROMPT_";

/// Resolved prompts, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct PromptBook {
    base: Option<String>,
    kinds: HashMap<AssistantKind, String>,
}

impl PromptBook {
    /// Resolves prompts from config and the process environment.
    pub fn load(config: &AssistantsConfig) -> Result<Self, ScholarError> {
        Self::load_with(config, |name| std::env::var(name).ok())
    }

    /// Resolves prompts from config and an explicit environment lookup.
    pub fn load_with(
        config: &AssistantsConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ScholarError> {
        let base = resolve(
            "base",
            config.base_prompt.as_deref(),
            config.base_prompt_file.as_deref(),
            "BASE",
            &env,
        )?;

        let mut kinds = HashMap::new();
        for kind in AssistantKind::all() {
            let section = config.kind(kind);
            if let Some(prompt) = resolve(
                &kind.to_string(),
                section.prompt.as_deref(),
                section.prompt_file.as_deref(),
                kind.env_suffix(),
                &env,
            )? {
                kinds.insert(kind, prompt);
            }
        }

        debug!(
            has_base = base.is_some(),
            kinds = kinds.len(),
            "prompt book loaded"
        );
        Ok(Self { base, kinds })
    }

    /// Builds a book from literal prompts.
    pub fn from_prompts(
        base: Option<String>,
        prompts: impl IntoIterator<Item = (AssistantKind, String)>,
    ) -> Self {
        Self {
            base: base.map(|b| normalize(&b)),
            kinds: prompts
                .into_iter()
                .map(|(kind, p)| (kind, normalize(&p)))
                .collect(),
        }
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// The kind's own prompt. Missing prompts are a configuration error.
    pub fn prompt(&self, kind: AssistantKind) -> Result<&str, ScholarError> {
        self.kinds.get(&kind).map(String::as_str).ok_or_else(|| {
            ScholarError::Config(format!(
                "no prompt configured for assistant kind `{kind}` (set assistants.{kind}.prompt or {})",
                env_var(kind.env_suffix())
            ))
        })
    }

    /// Full assistant instructions: base prompt (if any) followed by the kind's prompt.
    pub fn instructions(&self, kind: AssistantKind) -> Result<String, ScholarError> {
        let prompt = self.prompt(kind)?;
        Ok(match &self.base {
            Some(base) => format!("{base}\n\n{prompt}"),
            None => prompt.to_string(),
        })
    }

    /// Diagnostics for every kind without a prompt.
    pub fn missing(&self) -> Vec<ConfigError> {
        AssistantKind::all()
            .filter(|kind| !self.kinds.contains_key(kind))
            .map(|kind| ConfigError::MissingPrompt {
                kind: kind.to_string(),
                env_var: env_var(kind.env_suffix()),
            })
            .collect()
    }
}

fn env_var(suffix: &str) -> String {
    format!("{PROMPT_ENV_PREFIX}{suffix}")
}

fn resolve(
    owner: &str,
    inline: Option<&str>,
    file: Option<&str>,
    suffix: &str,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<Option<String>, ScholarError> {
    if let Some(text) = inline.filter(|t| !t.trim().is_empty()) {
        return Ok(Some(normalize(text)));
    }
    if let Some(path) = file {
        return read_prompt_file(owner, path).map(Some);
    }
    let name = env_var(suffix);
    if let Some(text) = env(&name).filter(|t| !t.trim().is_empty()) {
        return Ok(Some(normalize(&text)));
    }
    if let Some(path) = env(&format!("{name}_PATH")).filter(|p| !p.trim().is_empty()) {
        return read_prompt_file(owner, path.trim()).map(Some);
    }
    Ok(None)
}

fn read_prompt_file(owner: &str, path: &str) -> Result<String, ScholarError> {
    std::fs::read_to_string(path)
        .map(|text| normalize(&text))
        .map_err(|e| {
            let diagnostic = ConfigError::PromptFile {
                owner: owner.to_string(),
                path: path.to_string(),
                reason: e.to_string(),
            };
            ScholarError::Config(diagnostic.to_string())
        })
}

fn normalize(text: &str) -> String {
    text.replace("\\n", "\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn inline_beats_env() {
        let mut config = AssistantsConfig::default();
        config.type_x.prompt = Some("inline".to_string());
        let book =
            PromptBook::load_with(&config, env_of(&[("SCHOLAR_PROMPT_TYPEX", "from env")])).unwrap();
        assert_eq!(book.prompt(AssistantKind::TypeX).unwrap(), "inline");
    }

    #[test]
    fn env_value_normalizes_escaped_newlines() {
        let config = AssistantsConfig::default();
        let book = PromptBook::load_with(
            &config,
            env_of(&[("SCHOLAR_PROMPT_WHATS_TRENDY", "line one\\nline two")]),
        )
        .unwrap();
        assert_eq!(
            book.prompt(AssistantKind::WhatsTrendy).unwrap(),
            "line one\nline two"
        );
    }

    #[test]
    fn env_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.md");
        std::fs::write(&path, "Answer from the course files.\n").unwrap();
        let path_str = path.to_string_lossy().into_owned();

        let config = AssistantsConfig::default();
        let book = PromptBook::load_with(&config, move |name| {
            (name == "SCHOLAR_PROMPT_COURSE_PATH").then(|| path_str.clone())
        })
        .unwrap();
        assert_eq!(
            book.prompt(AssistantKind::Course).unwrap(),
            "Answer from the course files."
        );
    }

    #[test]
    fn config_file_beats_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.md");
        std::fs::write(&path, "from file").unwrap();

        let mut config = AssistantsConfig::default();
        config.references.prompt_file = Some(path.to_string_lossy().into_owned());
        let book = PromptBook::load_with(
            &config,
            env_of(&[("SCHOLAR_PROMPT_REFERENCES", "from env")]),
        )
        .unwrap();
        assert_eq!(book.prompt(AssistantKind::References).unwrap(), "from file");
    }

    #[test]
    fn unreadable_prompt_file_is_config_error() {
        let mut config = AssistantsConfig::default();
        config.course.prompt_file = Some("/nonexistent/prompt.md".to_string());
        let err = PromptBook::load_with(&config, |_| None).unwrap_err();
        assert!(matches!(err, ScholarError::Config(_)));
        assert!(
            err.to_string()
                .contains("cannot read course prompt file `/nonexistent/prompt.md`"),
            "got: {err}"
        );
    }

    #[test]
    fn missing_prompt_is_reported_at_use() {
        let book = PromptBook::from_prompts(None, [(AssistantKind::TypeX, "x".to_string())]);
        let err = book.prompt(AssistantKind::TherapyGpt).unwrap_err();
        assert!(err.to_string().contains("SCHOLAR_PROMPT_THERAPY_GPT"));
        assert_eq!(book.missing().len(), 5);
    }

    #[test]
    fn instructions_prepend_base() {
        let book = PromptBook::from_prompts(
            Some("You are helpful.".to_string()),
            [(AssistantKind::Course, "Stay on topic.".to_string())],
        );
        assert_eq!(
            book.instructions(AssistantKind::Course).unwrap(),
            "You are helpful.\n\nStay on topic."
        );
        let no_base = PromptBook::from_prompts(None, [(AssistantKind::Course, "Only".to_string())]);
        assert_eq!(no_base.instructions(AssistantKind::Course).unwrap(), "Only");
    }
}
