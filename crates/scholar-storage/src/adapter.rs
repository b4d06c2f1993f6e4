// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use scholar_config::model::StorageConfig;
use scholar_core::{
    AdapterType, AssistantKind, ChatSession, Course, CourseFile, FileClassification,
    HealthStatus, Message, PluginAdapter, ScholarError, SessionKey, StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, ScholarError> {
        self.db
            .get()
            .ok_or_else(|| ScholarError::storage("storage not initialized -- call initialize() first"))
    }

    async fn checkpoint(&self) -> Result<(), ScholarError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ScholarError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ScholarError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ScholarError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| ScholarError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ScholarError> {
        self.db()?;
        self.checkpoint().await
    }

    // --- Sessions ---

    async fn find_session(&self, key: &SessionKey) -> Result<Option<ChatSession>, ScholarError> {
        queries::sessions::find_session(self.db()?, key).await
    }

    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, ScholarError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, ScholarError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, ScholarError> {
        queries::sessions::list_sessions(self.db()?, user_id).await
    }

    async fn set_session_thread(&self, id: &str, thread_id: &str) -> Result<(), ScholarError> {
        queries::sessions::set_session_thread(self.db()?, id, thread_id).await
    }

    async fn set_session_assistant(
        &self,
        id: &str,
        assistant_id: &str,
        knowledge_version: Option<i64>,
    ) -> Result<(), ScholarError> {
        queries::sessions::set_session_assistant(self.db()?, id, assistant_id, knowledge_version)
            .await
    }

    async fn delete_session(&self, id: &str) -> Result<bool, ScholarError> {
        queries::sessions::delete_session(self.db()?, id).await
    }

    // --- Messages ---

    async fn append_message(&self, message: &Message) -> Result<(), ScholarError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn get_messages(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, ScholarError> {
        queries::messages::get_messages_for_session(self.db()?, session_id, limit).await
    }

    // --- Courses ---

    async fn create_course(&self, course: &Course) -> Result<(), ScholarError> {
        queries::courses::create_course(self.db()?, course).await
    }

    async fn get_course(&self, id: &str) -> Result<Option<Course>, ScholarError> {
        queries::courses::get_course(self.db()?, id).await
    }

    async fn get_course_by_code(&self, code: &str) -> Result<Option<Course>, ScholarError> {
        queries::courses::get_course_by_code(self.db()?, code).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>, ScholarError> {
        queries::courses::list_courses(self.db()?).await
    }

    async fn knowledge_version(&self, course_id: &str) -> Result<Option<i64>, ScholarError> {
        queries::courses::knowledge_version(self.db()?, course_id).await
    }

    // --- Course files ---

    async fn insert_course_file(&self, file: &CourseFile) -> Result<i64, ScholarError> {
        queries::course_files::insert_course_file(self.db()?, file).await
    }

    async fn get_course_file(&self, id: &str) -> Result<Option<CourseFile>, ScholarError> {
        queries::course_files::get_course_file(self.db()?, id).await
    }

    async fn list_course_files(&self, course_id: &str) -> Result<Vec<CourseFile>, ScholarError> {
        queries::course_files::list_course_files(self.db()?, course_id).await
    }

    async fn delete_course_file(&self, id: &str) -> Result<Option<i64>, ScholarError> {
        queries::course_files::delete_course_file(self.db()?, id).await
    }

    async fn reclassify_course_file(
        &self,
        id: &str,
        classification: FileClassification,
        storage_path: &str,
    ) -> Result<i64, ScholarError> {
        queries::course_files::reclassify_course_file(self.db()?, id, classification, storage_path)
            .await
    }

    async fn set_course_file_handle(
        &self,
        id: &str,
        handle: &str,
    ) -> Result<String, ScholarError> {
        queries::course_files::set_course_file_handle(self.db()?, id, handle).await
    }

    async fn find_handle_by_hash(&self, sha256: &str) -> Result<Option<String>, ScholarError> {
        queries::course_files::find_handle_by_hash(self.db()?, sha256).await
    }

    // --- Shared assistants ---

    async fn get_shared_assistant(
        &self,
        kind: AssistantKind,
    ) -> Result<Option<String>, ScholarError> {
        queries::shared_assistants::get_shared_assistant(self.db()?, kind).await
    }

    async fn put_shared_assistant(
        &self,
        kind: AssistantKind,
        assistant_id: &str,
    ) -> Result<String, ScholarError> {
        queries::shared_assistants::put_shared_assistant(self.db()?, kind, assistant_id).await
    }
}
