// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for integration testing.
//!
//! `TestHarness` assembles temp SQLite storage, a [`MockEngine`], a
//! [`MemoryObjectStore`], and a configuration with every prompt set, so
//! tests can wire up the knowledge and chat layers without external services.

use std::sync::Arc;

use scholar_config::model::{
    AssistantKindConfig, IngestionConfig, ScholarConfig, StorageConfig,
};
use scholar_config::PromptBook;
use scholar_core::{AssistantKind, Course, ScholarError, StorageAdapter, now_timestamp};
use scholar_storage::SqliteStorage;

use crate::memory_objects::MemoryObjectStore;
use crate::mock_engine::MockEngine;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    ingestion: IngestionConfig,
    turn_timeout_secs: u64,
    pinned: Vec<(AssistantKind, String)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            ingestion: IngestionConfig {
                max_attempts: 3,
                backoff_ms: 5,
                timeout_secs: 5,
            },
            turn_timeout_secs: 5,
            pinned: Vec::new(),
        }
    }

    /// Queue mock engine replies.
    pub fn with_replies(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    /// Override ingestion retry settings.
    pub fn with_ingestion(mut self, max_attempts: u32, backoff_ms: u64) -> Self {
        self.ingestion.max_attempts = max_attempts;
        self.ingestion.backoff_ms = backoff_ms;
        self
    }

    pub fn with_turn_timeout_secs(mut self, secs: u64) -> Self {
        self.turn_timeout_secs = secs;
        self
    }

    /// Pin a configured engine assistant for a non-course kind.
    pub fn with_pinned_assistant(mut self, kind: AssistantKind, id: &str) -> Self {
        self.pinned.push((kind, id.to_string()));
        self
    }

    /// Build the harness, creating and migrating the temp database.
    pub async fn build(self) -> Result<TestHarness, ScholarError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ScholarError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = ScholarConfig::default();
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        config.objects.root_dir = temp_dir.path().join("objects").to_string_lossy().to_string();
        config.ingestion = self.ingestion;
        config.engine.turn_timeout_secs = self.turn_timeout_secs;
        config.assistants.base_prompt = Some("You are a helpful study assistant.".to_string());
        for kind in AssistantKind::all() {
            let section = kind_section(&mut config, kind);
            *section = AssistantKindConfig {
                prompt: Some(format!("You are the {kind} assistant.")),
                prompt_file: None,
                assistant_id: None,
            };
        }
        for (kind, id) in self.pinned {
            kind_section(&mut config, kind).assistant_id = Some(id);
        }

        let prompts = PromptBook::load_with(&config.assistants, |_| None)?;

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;

        let engine = MockEngine::new();
        for reply in self.replies {
            engine.push_reply(reply).await;
        }

        Ok(TestHarness {
            storage: Arc::new(storage),
            engine: Arc::new(engine),
            objects: Arc::new(MemoryObjectStore::new()),
            config,
            prompts,
            _temp_dir: temp_dir,
        })
    }
}

fn kind_section(config: &mut ScholarConfig, kind: AssistantKind) -> &mut AssistantKindConfig {
    let a = &mut config.assistants;
    match kind {
        AssistantKind::TypeX => &mut a.type_x,
        AssistantKind::References => &mut a.references,
        AssistantKind::AcademicReferences => &mut a.academic_references,
        AssistantKind::TherapyGpt => &mut a.therapy_gpt,
        AssistantKind::WhatsTrendy => &mut a.whats_trendy,
        AssistantKind::Course => &mut a.course,
    }
}

/// A storage, engine, and object store stack backed by a temp directory.
///
/// The temp directory lives as long as the harness.
pub struct TestHarness {
    pub storage: Arc<SqliteStorage>,
    pub engine: Arc<MockEngine>,
    pub objects: Arc<MemoryObjectStore>,
    pub config: ScholarConfig,
    pub prompts: PromptBook,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, ScholarError> {
        Self::builder().build().await
    }

    /// Insert an active course and return it.
    pub async fn create_course(&self, code: &str, name: &str) -> Result<Course, ScholarError> {
        let now = now_timestamp();
        let course = Course {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.to_string(),
            description: None,
            created_by: "admin-test".to_string(),
            is_active: true,
            knowledge_version: 0,
            created_at: now.clone(),
            updated_at: now,
        };
        self.storage.create_course(&course).await?;
        Ok(course)
    }
}
