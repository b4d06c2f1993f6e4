// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the relational store.

use async_trait::async_trait;

use crate::error::ScholarError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AssistantKind, ChatSession, Course, CourseFile, FileClassification, Message, SessionKey,
};

/// Adapter for the relational store holding sessions, transcripts, courses,
/// and course files.
///
/// Every method that changes a course's file set returns the course's new
/// knowledge version, bumped in the same transaction as the change.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (connection, migrations).
    async fn initialize(&self) -> Result<(), ScholarError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), ScholarError>;

    // --- Sessions ---

    /// Looks up the unique session for a (user, kind, course) key.
    async fn find_session(&self, key: &SessionKey) -> Result<Option<ChatSession>, ScholarError>;

    /// Inserts a session. If a session with the same key already exists the
    /// stored row is returned instead.
    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, ScholarError>;

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, ScholarError>;

    /// A user's sessions, most recently active first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, ScholarError>;

    async fn set_session_thread(&self, id: &str, thread_id: &str) -> Result<(), ScholarError>;

    /// Records the session's assistant and the knowledge version its file set was bound at.
    async fn set_session_assistant(
        &self,
        id: &str,
        assistant_id: &str,
        knowledge_version: Option<i64>,
    ) -> Result<(), ScholarError>;

    /// Deletes a session and its messages. Returns false if it did not exist.
    async fn delete_session(&self, id: &str) -> Result<bool, ScholarError>;

    // --- Messages ---

    /// Appends a message and bumps the session's count and `updated_at`
    /// in one transaction.
    async fn append_message(&self, message: &Message) -> Result<(), ScholarError>;

    /// Messages in chronological order; `limit` keeps the most recent N.
    async fn get_messages(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, ScholarError>;

    // --- Courses ---

    async fn create_course(&self, course: &Course) -> Result<(), ScholarError>;

    async fn get_course(&self, id: &str) -> Result<Option<Course>, ScholarError>;

    async fn get_course_by_code(&self, code: &str) -> Result<Option<Course>, ScholarError>;

    async fn list_courses(&self) -> Result<Vec<Course>, ScholarError>;

    /// The course's persisted knowledge version, or `None` for an unknown course.
    async fn knowledge_version(&self, course_id: &str) -> Result<Option<i64>, ScholarError>;

    // --- Course files ---

    async fn insert_course_file(&self, file: &CourseFile) -> Result<i64, ScholarError>;

    async fn get_course_file(&self, id: &str) -> Result<Option<CourseFile>, ScholarError>;

    /// A course's files in upload order.
    async fn list_course_files(&self, course_id: &str) -> Result<Vec<CourseFile>, ScholarError>;

    /// Deletes a file row. Returns the new knowledge version, or `None` if
    /// the file did not exist.
    async fn delete_course_file(&self, id: &str) -> Result<Option<i64>, ScholarError>;

    async fn reclassify_course_file(
        &self,
        id: &str,
        classification: FileClassification,
        storage_path: &str,
    ) -> Result<i64, ScholarError>;

    /// Sets the engine handle only if none is set yet, returning whichever
    /// handle the row holds afterwards.
    async fn set_course_file_handle(&self, id: &str, handle: &str)
    -> Result<String, ScholarError>;

    /// An engine handle already recorded for identical bytes, if any.
    async fn find_handle_by_hash(&self, sha256: &str) -> Result<Option<String>, ScholarError>;

    // --- Shared assistants ---

    async fn get_shared_assistant(
        &self,
        kind: AssistantKind,
    ) -> Result<Option<String>, ScholarError>;

    /// Records the shared assistant for a kind unless one is already
    /// recorded; returns the stored id.
    async fn put_shared_assistant(
        &self,
        kind: AssistantKind,
        assistant_id: &str,
    ) -> Result<String, ScholarError>;
}
