// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `scholar doctor` command implementation.
//!
//! Runs diagnostic checks against the configured database, object store,
//! prompts, and reasoning engine.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use scholar_config::{PromptBook, ScholarConfig};
use scholar_core::{HealthStatus, PluginAdapter, ScholarError, StorageAdapter};
use scholar_openai::OpenAiEngine;
use scholar_storage::{FsObjectStore, SqliteStorage};

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }

    fn from_health(name: &str, health: Result<HealthStatus, ScholarError>, start: Instant) -> Self {
        match health {
            Ok(HealthStatus::Healthy) => Self::new(name, CheckStatus::Pass, "healthy", start),
            Ok(HealthStatus::Degraded(msg)) => Self::new(name, CheckStatus::Warn, msg, start),
            Ok(HealthStatus::Unhealthy(msg)) => Self::new(name, CheckStatus::Fail, msg, start),
            Err(e) => Self::new(name, CheckStatus::Fail, e.to_string(), start),
        }
    }
}

/// Run the `scholar doctor` command. With `plain`, disables colored output.
pub async fn run_doctor(config: &ScholarConfig, plain: bool) -> Result<(), ScholarError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_prompts(config),
        check_database(config).await,
        check_objects(config).await,
        check_engine(config).await,
    ];

    println!();
    println!("  scholar doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", format_result(result, use_color));
    }

    println!();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn format_result(result: &CheckResult, use_color: bool) -> String {
    use colored::Colorize;

    let duration_ms = result.duration.as_millis();
    if !use_color {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        return format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        );
    }

    let (symbol, message) = match result.status {
        CheckStatus::Pass => ("✓".green(), result.message.normal()),
        CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
        CheckStatus::Fail => ("✗".red(), result.message.red()),
    };
    format!(
        "    {symbol} {:<20} {message} ({duration_ms}ms)",
        result.name
    )
}

/// Every assistant kind needs a prompt; a missing one only breaks that kind.
fn check_prompts(config: &ScholarConfig) -> CheckResult {
    let start = Instant::now();
    match PromptBook::load(&config.assistants) {
        Ok(book) => {
            let missing = book.missing();
            if missing.is_empty() {
                CheckResult::new("Prompts", CheckStatus::Pass, "all kinds configured", start)
            } else {
                let detail = missing
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                CheckResult::new("Prompts", CheckStatus::Warn, detail, start)
            }
        }
        Err(e) => CheckResult::new("Prompts", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Opens the database (running migrations) and queries it.
async fn check_database(config: &ScholarConfig) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(&config.storage.database_path);
    if !path.exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!(
                "not found: {} (will be created on first run)",
                config.storage.database_path
            ),
            start,
        );
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }
    let health = storage.health_check().await;
    let _ = storage.close().await;
    CheckResult::from_health("Database", health, start)
}

async fn check_objects(config: &ScholarConfig) -> CheckResult {
    let start = Instant::now();
    let objects = FsObjectStore::new(&config.objects.root_dir);
    CheckResult::from_health("Object store", objects.health_check().await, start)
}

async fn check_engine(config: &ScholarConfig) -> CheckResult {
    let start = Instant::now();
    if config.engine.resolve_api_key().is_none() {
        return CheckResult::new(
            "Reasoning engine",
            CheckStatus::Warn,
            "no API key configured (set OPENAI_API_KEY)",
            start,
        );
    }
    match OpenAiEngine::new(&config.engine) {
        Ok(engine) => CheckResult::from_health("Reasoning engine", engine.health_check().await, start),
        Err(e) => CheckResult::new("Reasoning engine", CheckStatus::Fail, e.to_string(), start),
    }
}
