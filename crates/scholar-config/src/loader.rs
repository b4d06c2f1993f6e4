// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./scholar.toml` > `~/.config/scholar/scholar.toml` > `/etc/scholar/scholar.toml`
//! with environment variable overrides via `SCHOLAR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ScholarConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/scholar/scholar.toml` (system-wide)
/// 3. `~/.config/scholar/scholar.toml` (user XDG config)
/// 4. `./scholar.toml` (local directory)
/// 5. `SCHOLAR_*` environment variables
pub fn load_config() -> Result<ScholarConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ScholarConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ScholarConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ScholarConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ScholarConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ScholarConfig::default()))
        .merge(Toml::file("/etc/scholar/scholar.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("scholar/scholar.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("scholar.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that underscore-containing
/// keys survive: `SCHOLAR_ENGINE_TURN_TIMEOUT_SECS` maps to `engine.turn_timeout_secs`.
/// `SCHOLAR_PROMPT_*` variables belong to the prompt book and are skipped here.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("SCHOLAR_")
        .filter(|key| !key.starts_with("prompt_"))
        .map(|key| {
            let key_str = key.as_str().to_ascii_lowercase();
            let mapped = key_str
                .replacen("service_", "service.", 1)
                .replacen("engine_", "engine.", 1)
                .replacen("storage_", "storage.", 1)
                .replacen("objects_", "objects.", 1)
                .replacen("ingestion_", "ingestion.", 1)
                .replacen("assistants_", "assistants.", 1);
            mapped.into()
        })
}
