// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File Ingestion Pipeline: registers course files with the reasoning engine.
//!
//! A file is registered at most once. Callers for the same file serialize on a
//! per-file mutex and re-read the row once inside it; the handle is written
//! with a compare-and-set so a racing process cannot overwrite it.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use scholar_config::model::IngestionConfig;
use scholar_core::{CourseFile, ObjectStore, ReasoningEngine, ScholarError, StorageAdapter};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::index::KnowledgeIndex;

pub struct IngestionPipeline {
    storage: Arc<dyn StorageAdapter>,
    objects: Arc<dyn ObjectStore>,
    engine: Arc<dyn ReasoningEngine>,
    index: Arc<KnowledgeIndex>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        objects: Arc<dyn ObjectStore>,
        engine: Arc<dyn ReasoningEngine>,
        index: Arc<KnowledgeIndex>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            storage,
            objects,
            engine,
            index,
            locks: DashMap::new(),
            config,
        }
    }

    /// Returns the file's engine handle, registering the file first if needed.
    ///
    /// On failure the handle stays unset and the error is
    /// [`ScholarError::IngestionFailed`].
    pub async fn ensure_ingested(&self, file: &CourseFile) -> Result<String, ScholarError> {
        if let Some(handle) = &file.engine_file_id {
            return Ok(handle.clone());
        }

        let lock = self.locks.entry(file.id.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.ingest_locked(file).await
        };
        // Map entry plus our clone: nobody else is waiting on this file.
        self.locks
            .remove_if(&file.id, |_, l| Arc::strong_count(l) <= 2);
        result
    }

    async fn ingest_locked(&self, file: &CourseFile) -> Result<String, ScholarError> {
        let current = self
            .storage
            .get_course_file(&file.id)
            .await?
            .ok_or_else(|| ScholarError::NotFound {
                entity: "course file",
                id: file.id.clone(),
            })?;

        if let Some(handle) = current.engine_file_id {
            debug!(file_id = %file.id, "file ingested by an earlier caller");
            self.index.record_handle(&current.course_id, &current.id, &handle);
            return Ok(handle);
        }

        if let Some(existing) = self
            .storage
            .find_handle_by_hash(&current.content_sha256)
            .await?
        {
            let stored = self
                .storage
                .set_course_file_handle(&current.id, &existing)
                .await?;
            info!(file_id = %current.id, handle = %stored, "reused handle of identical file");
            self.index.record_handle(&current.course_id, &current.id, &stored);
            return Ok(stored);
        }

        let bytes = self
            .objects
            .get(&current.storage_path)
            .await
            .map_err(|e| ScholarError::IngestionFailed {
                file_id: current.id.clone(),
                message: format!("reading {}: {e}", current.storage_path),
                transient: e.is_transient(),
            })?;

        let handle = self.register_with_retry(&current, bytes).await?;
        let stored = self
            .storage
            .set_course_file_handle(&current.id, &handle)
            .await?;
        if stored != handle {
            warn!(
                file_id = %current.id,
                ours = %handle,
                kept = %stored,
                "handle already set by another writer"
            );
        } else {
            info!(file_id = %current.id, handle = %stored, "file ingested");
        }
        self.index.record_handle(&current.course_id, &current.id, &stored);
        Ok(stored)
    }

    /// Registers the bytes, retrying transient failures with linear backoff.
    async fn register_with_retry(
        &self,
        file: &CourseFile,
        bytes: Vec<u8>,
    ) -> Result<String, ScholarError> {
        let attempts = self.config.max_attempts.max(1);
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let outcome = tokio::time::timeout(
                timeout,
                self.engine.register_file(&file.file_name, bytes.clone()),
            )
            .await;

            let err = match outcome {
                Ok(Ok(handle)) => return Ok(handle),
                Ok(Err(e)) => e,
                Err(_) => ScholarError::unavailable(format!(
                    "registration timed out after {}s",
                    self.config.timeout_secs
                )),
            };

            let transient = err.is_transient();
            if !transient || attempt == attempts {
                last_error = Some((err, transient));
                break;
            }

            warn!(
                file_id = %file.id,
                attempt,
                max_attempts = attempts,
                error = %err,
                "file registration failed, retrying"
            );
            tokio::time::sleep(Duration::from_millis(
                self.config.backoff_ms * u64::from(attempt),
            ))
            .await;
        }

        let (err, transient) = last_error.unwrap_or_else(|| {
            (ScholarError::Internal("no registration attempt made".into()), false)
        });
        warn!(file_id = %file.id, error = %err, "file ingestion failed");
        Err(ScholarError::IngestionFailed {
            file_id: file.id.clone(),
            message: err.to_string(),
            transient,
        })
    }
}
