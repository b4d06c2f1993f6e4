// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as positive timeouts, non-empty paths, and readable prompt files.

use scholar_core::AssistantKind;

use crate::diagnostic::ConfigError;
use crate::model::ScholarConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ScholarConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        invalid(format!(
            "service.log_level `{}` is not one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let base_url = config.engine.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        invalid(format!(
            "engine.base_url `{base_url}` must start with http:// or https://"
        ));
    }

    if config.engine.model.trim().is_empty() {
        invalid("engine.model must not be empty".to_string());
    }

    for (key, value) in [
        ("engine.request_timeout_secs", config.engine.request_timeout_secs),
        ("engine.turn_timeout_secs", config.engine.turn_timeout_secs),
        ("engine.poll_interval_ms", config.engine.poll_interval_ms),
        (
            "engine.processing_timeout_secs",
            config.engine.processing_timeout_secs,
        ),
        ("ingestion.timeout_secs", config.ingestion.timeout_secs),
    ] {
        if value == 0 {
            invalid(format!("{key} must be greater than 0"));
        }
    }

    if config.ingestion.max_attempts == 0 {
        invalid("ingestion.max_attempts must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if config.objects.root_dir.trim().is_empty() {
        invalid("objects.root_dir must not be empty".to_string());
    }

    if let Some(path) = &config.assistants.base_prompt_file
        && !std::path::Path::new(path).is_file()
    {
        invalid(format!(
            "assistants.base_prompt_file `{path}` does not exist"
        ));
    }

    for kind in AssistantKind::all() {
        let section = config.assistants.kind(kind);
        if let Some(path) = &section.prompt_file
            && !std::path::Path::new(path).is_file()
        {
            invalid(format!(
                "assistants.{kind}.prompt_file `{path}` does not exist"
            ));
        }
        if let Some(id) = &section.assistant_id {
            if id.trim().is_empty() {
                invalid(format!("assistants.{kind}.assistant_id must not be empty"));
            } else if kind.is_course() {
                invalid(
                    "assistants.course.assistant_id is not supported; course assistants are created per session"
                        .to_string(),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
