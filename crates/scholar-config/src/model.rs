// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Scholar assistant platform.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use scholar_core::AssistantKind;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Top-level Scholar configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScholarConfig {
    /// Process-level settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Reasoning engine (OpenAI Assistants) settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Relational store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Object store settings for raw course files.
    #[serde(default)]
    pub objects: ObjectsConfig,

    /// Course file ingestion settings.
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Prompts and pinned assistants per assistant kind.
    #[serde(default)]
    pub assistants: AssistantsConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used for engine-side assistant names.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "scholar".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Reasoning engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// OpenAI API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for every assistant this process creates.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on a whole chat turn (post message, run, poll, fetch reply).
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,

    /// Interval between status polls for files, vector stores, and runs.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for an uploaded file or vector store to finish processing.
    #[serde(default = "default_processing_timeout_secs")]
    pub processing_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            turn_timeout_secs: default_turn_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            processing_timeout_secs: default_processing_timeout_secs(),
        }
    }
}

impl EngineConfig {
    /// Resolves the API key from config, then `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
            .map(SecretString::from)
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_turn_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_processing_timeout_secs() -> u64 {
    60
}

/// Relational store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("scholar").join("scholar.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("scholar.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Object store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectsConfig {
    /// Directory under which object paths are resolved.
    #[serde(default = "default_objects_root")]
    pub root_dir: String,
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self {
            root_dir: default_objects_root(),
        }
    }
}

fn default_objects_root() -> String {
    dirs::data_dir()
        .map(|p| p.join("scholar").join("objects"))
        .unwrap_or_else(|| std::path::PathBuf::from("scholar-objects"))
        .to_string_lossy()
        .into_owned()
}

/// Course file ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestionConfig {
    /// Attempts per file before giving up on a transient engine failure.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts; attempt `n` waits `n * backoff_ms`.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Upper bound on a single registration attempt.
    #[serde(default = "default_ingestion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            timeout_secs: default_ingestion_timeout_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_ingestion_timeout_secs() -> u64 {
    180
}

/// Prompts and pinned engine assistants.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantsConfig {
    /// Prompt prepended to every kind's prompt.
    #[serde(default)]
    pub base_prompt: Option<String>,

    /// File holding the base prompt. Used when `base_prompt` is unset.
    #[serde(default)]
    pub base_prompt_file: Option<String>,

    #[serde(default, rename = "typeX")]
    pub type_x: AssistantKindConfig,

    #[serde(default)]
    pub references: AssistantKindConfig,

    #[serde(default, rename = "academicReferences")]
    pub academic_references: AssistantKindConfig,

    #[serde(default, rename = "therapyGPT")]
    pub therapy_gpt: AssistantKindConfig,

    #[serde(default, rename = "whatsTrendy")]
    pub whats_trendy: AssistantKindConfig,

    #[serde(default)]
    pub course: AssistantKindConfig,
}

impl AssistantsConfig {
    /// The section for one assistant kind.
    pub fn kind(&self, kind: AssistantKind) -> &AssistantKindConfig {
        match kind {
            AssistantKind::TypeX => &self.type_x,
            AssistantKind::References => &self.references,
            AssistantKind::AcademicReferences => &self.academic_references,
            AssistantKind::TherapyGpt => &self.therapy_gpt,
            AssistantKind::WhatsTrendy => &self.whats_trendy,
            AssistantKind::Course => &self.course,
        }
    }
}

/// Per-kind prompt and assistant settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantKindConfig {
    /// Inline prompt. Takes precedence over `prompt_file`.
    #[serde(default)]
    pub prompt: Option<String>,

    /// Path to a file containing the prompt.
    #[serde(default)]
    pub prompt_file: Option<String>,

    /// Existing engine assistant to use for this kind. Ignored for `course`,
    /// whose assistants are created per session.
    #[serde(default)]
    pub assistant_id: Option<String>,
}
