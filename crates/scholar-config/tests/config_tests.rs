// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Scholar configuration system.

use scholar_config::diagnostic::ConfigError;
use scholar_config::model::ScholarConfig;
use scholar_config::{load_and_validate_str, load_config_from_str};
use scholar_core::AssistantKind;

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_scholar_config() {
    let toml = r#"
[service]
name = "campus-assistant"
log_level = "debug"

[engine]
api_key = "sk-test"
model = "gpt-4o-mini"
turn_timeout_secs = 45

[storage]
database_path = "/tmp/scholar-test.db"
wal_mode = false

[objects]
root_dir = "/tmp/scholar-objects"

[ingestion]
max_attempts = 5
backoff_ms = 10

[assistants]
base_prompt = "You are a university assistant."

[assistants.typeX]
prompt = "Help with general questions."
assistant_id = "asst_typex"

[assistants.course]
prompt = "Use only the course materials."
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "campus-assistant");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.engine.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.engine.model, "gpt-4o-mini");
    assert_eq!(config.engine.turn_timeout_secs, 45);
    assert_eq!(config.engine.base_url, "https://api.openai.com/v1");
    assert_eq!(config.storage.database_path, "/tmp/scholar-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.objects.root_dir, "/tmp/scholar-objects");
    assert_eq!(config.ingestion.max_attempts, 5);
    assert_eq!(config.ingestion.backoff_ms, 10);
    assert_eq!(
        config.assistants.base_prompt.as_deref(),
        Some("You are a university assistant.")
    );
    assert_eq!(
        config.assistants.kind(AssistantKind::TypeX).assistant_id.as_deref(),
        Some("asst_typex")
    );
    assert_eq!(
        config.assistants.kind(AssistantKind::Course).prompt.as_deref(),
        Some("Use only the course materials.")
    );
}

/// Sections absent from the file fall back to defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML is valid");
    let defaults = ScholarConfig::default();
    assert_eq!(config.service.name, defaults.service.name);
    assert_eq!(config.engine.turn_timeout_secs, 120);
    assert_eq!(config.ingestion.max_attempts, 3);
    assert!(config.storage.wal_mode);
}

/// A misspelled key inside a section gets a suggestion and the section's valid keys.
#[test]
fn diagnostic_unknown_engine_key_suggests_correction() {
    let toml = r#"
[engine]
modle = "gpt-4o"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "modle"
                && suggestion.as_deref() == Some("model")
                && valid_keys.contains("turn_timeout_secs")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'modle' with suggestion 'model', got: {errors:?}"
    );
}

/// An unknown assistant kind is reported with the closest real kind.
#[test]
fn diagnostic_unknown_assistant_kind() {
    let toml = r#"
[assistants.therapyGTP]
prompt = "Be kind."
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownAssistantKind { name, suggestion, .. }
                if name == "therapyGTP" && suggestion.as_deref() == Some("therapyGPT")
        )),
        "got: {errors:?}"
    );
}

/// A misspelled key inside an assistant kind table lists that table's keys.
#[test]
fn diagnostic_unknown_key_in_kind_table() {
    let toml = r#"
[assistants.course]
promt = "Stay on the syllabus."
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, valid_keys, span, .. }
                if key == "promt"
                    && suggestion.as_deref() == Some("prompt")
                    && valid_keys.contains("prompt_file")
                    && span.is_some()
        )),
        "got: {errors:?}"
    );
}

/// Unknown top-level sections are rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// A string where a number is expected produces an invalid type diagnostic.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[ingestion]
max_attempts = "lots"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidType { key, .. } if key.contains("max_attempts")
        )),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_are_collected() {
    let toml = r#"
[engine]
turn_timeout_secs = 0

[ingestion]
max_attempts = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2, "got: {errors:?}");
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::MissingPrompt {
        kind: "course".to_string(),
        env_var: "SCHOLAR_PROMPT_COURSE".to_string(),
    };
    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("SCHOLAR_PROMPT_COURSE"), "got: {help}");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("course"));
}

/// Valid TOML passes validation end to end.
#[test]
fn load_and_validate_valid_toml() {
    let toml = r#"
[service]
log_level = "warn"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.service.log_level, "warn");
}
