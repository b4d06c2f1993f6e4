// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations over the configured storage and engine.

use std::path::Path;
use std::sync::Arc;

use scholar_agent::{ChatRequest, ChatService, owned_session};
use scholar_config::{PromptBook, ScholarConfig};
use scholar_core::{
    Course, FileClassification, ScholarError, StorageAdapter, now_timestamp,
};
use scholar_knowledge::{KnowledgeIndex, NewCourseFile};
use scholar_openai::OpenAiEngine;
use scholar_storage::{FsObjectStore, SqliteStorage};
use tracing::{debug, info};

/// Opened adapters shared by every non-diagnostic subcommand.
pub struct Runtime {
    config: ScholarConfig,
    storage: Arc<SqliteStorage>,
    objects: Arc<FsObjectStore>,
    index: KnowledgeIndex,
}

impl Runtime {
    /// Opens the database (running migrations) and the object store.
    pub async fn open(config: ScholarConfig) -> Result<Self, ScholarError> {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;
        let objects = Arc::new(FsObjectStore::new(&config.objects.root_dir));
        let index = KnowledgeIndex::new(storage.clone(), objects.clone());
        debug!(database = %config.storage.database_path, "runtime opened");
        Ok(Self {
            config,
            storage,
            objects,
            index,
        })
    }

    pub async fn close(&self) {
        if let Err(e) = self.storage.close().await {
            tracing::warn!(error = %e, "failed to close storage cleanly");
        }
    }

    /// Chat service backed by the configured engine. Requires an API key.
    fn chat_service(&self) -> Result<ChatService, ScholarError> {
        let engine = Arc::new(OpenAiEngine::new(&self.config.engine)?);
        let prompts = PromptBook::load(&self.config.assistants)?;
        Ok(ChatService::new(
            self.storage.clone(),
            self.objects.clone(),
            engine,
            &self.config,
            prompts,
        ))
    }

    /// Looks a course up by code, falling back to id.
    async fn course(&self, code_or_id: &str) -> Result<Course, ScholarError> {
        if let Some(course) = self.storage.get_course_by_code(code_or_id).await? {
            return Ok(course);
        }
        self.storage
            .get_course(code_or_id)
            .await?
            .ok_or_else(|| ScholarError::NotFound {
                entity: "course",
                id: code_or_id.to_string(),
            })
    }

    pub async fn course_add(
        &self,
        code: &str,
        name: &str,
        description: Option<String>,
        created_by: &str,
    ) -> Result<(), ScholarError> {
        let code = code.trim();
        let name = name.trim();
        if code.is_empty() || name.is_empty() {
            return Err(ScholarError::Validation(
                "course code and name must not be empty".into(),
            ));
        }
        let now = now_timestamp();
        let course = Course {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.to_string(),
            description: description.filter(|d| !d.trim().is_empty()),
            created_by: created_by.to_string(),
            is_active: true,
            knowledge_version: 0,
            created_at: now.clone(),
            updated_at: now,
        };
        self.storage.create_course(&course).await?;
        info!(course_id = %course.id, code, "course created");
        println!("{}  {}  {}", course.id, course.code, course.name);
        Ok(())
    }

    pub async fn course_list(&self) -> Result<(), ScholarError> {
        for course in self.storage.list_courses().await? {
            let state = if course.is_active { "" } else { "  (inactive)" };
            println!(
                "{}  {:<10} v{:<4} {}{state}",
                course.id, course.code, course.knowledge_version, course.name
            );
        }
        Ok(())
    }

    pub async fn file_add(
        &self,
        course: &str,
        path: &Path,
        classification: &str,
        name: Option<String>,
        uploaded_by: &str,
    ) -> Result<(), ScholarError> {
        let course = self.course(course).await?;
        let classification = FileClassification::parse(classification)?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ScholarError::Validation(format!("cannot read {}: {e}", path.display()))
        })?;
        let file_name = match name {
            Some(name) => name,
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    ScholarError::Validation(format!("{} has no file name", path.display()))
                })?,
        };

        let file = self
            .index
            .add_file(
                &course.id,
                NewCourseFile {
                    file_name,
                    bytes,
                    classification,
                    uploaded_by: uploaded_by.to_string(),
                },
            )
            .await?;
        println!(
            "{}  {:<8} {}  ({} bytes)",
            file.id, file.classification, file.file_name, file.file_size
        );
        Ok(())
    }

    pub async fn file_remove(&self, file_id: &str) -> Result<(), ScholarError> {
        let file = self.index.remove_file(file_id).await?;
        println!("removed {}  {}", file.id, file.file_name);
        Ok(())
    }

    pub async fn file_reclassify(
        &self,
        file_id: &str,
        classification: &str,
    ) -> Result<(), ScholarError> {
        let file = self.index.reclassify_file(file_id, classification).await?;
        println!("{}  {:<8} {}", file.id, file.classification, file.file_name);
        Ok(())
    }

    pub async fn file_list(&self, course: &str) -> Result<(), ScholarError> {
        let course = self.course(course).await?;
        let entry = self.index.get_index(&course.id).await?;
        println!("{} ({}), knowledge v{}", course.code, course.name, entry.version);
        for file in entry.files() {
            let handle = file.engine_file_id.as_deref().unwrap_or("-");
            println!(
                "  {}  {:<8} {:<40} {handle}",
                file.id, file.classification, file.file_name
            );
        }
        Ok(())
    }

    pub async fn knowledge_resolve(&self, course: &str) -> Result<(), ScholarError> {
        let course = self.course(course).await?;
        let service = self.chat_service()?;
        let resolved = service.knowledge().aggregator.resolve(&course.id).await?;
        println!("{} knowledge v{}", course.code, resolved.version);
        for handle in &resolved.handles {
            println!("  {handle}");
        }
        Ok(())
    }

    pub async fn chat_send(
        &self,
        user_id: &str,
        kind: &str,
        course: Option<String>,
        session: Option<String>,
        text: &str,
    ) -> Result<(), ScholarError> {
        let mut request = ChatRequest::new(user_id, kind, text);
        if let Some(course) = course {
            request = request.with_course(self.course(&course).await?.id);
        }
        if let Some(session) = session {
            request = request.in_session(session);
        }

        let service = self.chat_service()?;
        match service.send(request).await {
            Ok(reply) => {
                println!("{}", reply.reply);
                eprintln!("session {}", reply.session_id);
                Ok(())
            }
            Err(e) => {
                // Unpersisted replies still carry the engine's answer.
                if let ScholarError::ReplyNotPersisted { reply, .. } = &e {
                    println!("{reply}");
                }
                Err(e)
            }
        }
    }

    pub async fn chat_history(
        &self,
        user_id: &str,
        session_id: &str,
        limit: Option<i64>,
        json: bool,
    ) -> Result<(), ScholarError> {
        let session = owned_session(&*self.storage, session_id, user_id).await?;
        let messages = self.storage.get_messages(&session.id, limit).await?;
        if json {
            let out = serde_json::to_string_pretty(&messages)
                .map_err(|e| ScholarError::Internal(format!("serialize transcript: {e}")))?;
            println!("{out}");
            return Ok(());
        }
        for message in &messages {
            println!("[{}] {}: {}", message.created_at, message.role, message.content);
        }
        Ok(())
    }

    pub async fn chat_sessions(&self, user_id: &str) -> Result<(), ScholarError> {
        for session in self.storage.list_sessions(user_id).await? {
            let course = session.course_id.as_deref().unwrap_or("-");
            println!(
                "{}  {:<18} {:<36} {:>4} msgs  {}",
                session.id,
                session.assistant_kind,
                course,
                session.message_count,
                session.updated_at
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn runtime(dir: &tempfile::TempDir) -> Runtime {
        let mut config = ScholarConfig::default();
        config.storage.database_path = dir.path().join("scholar.db").to_string_lossy().into_owned();
        config.objects.root_dir = dir.path().join("objects").to_string_lossy().into_owned();
        Runtime::open(config).await.unwrap()
    }

    #[tokio::test]
    async fn course_lookup_by_code_or_id() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime(&dir).await;
        rt.course_add("CS101", "Intro to CS", None, "admin").await.unwrap();

        let by_code = rt.course("CS101").await.unwrap();
        let by_id = rt.course(&by_code.id).await.unwrap();
        assert_eq!(by_code, by_id);
        assert!(matches!(
            rt.course("MATH9").await,
            Err(ScholarError::NotFound { entity: "course", .. })
        ));
        rt.close().await;
    }

    #[tokio::test]
    async fn blank_course_code_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime(&dir).await;
        let err = rt.course_add("  ", "Intro", None, "admin").await.unwrap_err();
        assert!(matches!(err, ScholarError::Validation(_)));
    }

    #[tokio::test]
    async fn file_commands_bump_version() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime(&dir).await;
        rt.course_add("CS101", "Intro to CS", None, "admin").await.unwrap();
        let course = rt.course("CS101").await.unwrap();

        let pdf = dir.path().join("syllabus.pdf");
        std::fs::write(&pdf, b"%PDF-1.4 syllabus").unwrap();
        rt.file_add("CS101", &pdf, "behavior", None, "admin").await.unwrap();

        let entry = rt.index.get_index(&course.id).await.unwrap();
        assert_eq!(entry.version, 1);
        assert_eq!(entry.behavior.len(), 1);
        assert_eq!(entry.behavior[0].file_name, "syllabus.pdf");
        let file_id = entry.behavior[0].id.clone();

        rt.file_reclassify(&file_id, "content").await.unwrap();
        let entry = rt.index.get_index(&course.id).await.unwrap();
        assert_eq!(entry.version, 2);
        assert!(entry.behavior.is_empty());
        assert_eq!(entry.content.len(), 1);

        rt.file_remove(&file_id).await.unwrap();
        let entry = rt.index.get_index(&course.id).await.unwrap();
        assert_eq!(entry.version, 3);
        assert!(entry.is_empty());
    }

    #[tokio::test]
    async fn file_add_rejects_bad_classification_and_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime(&dir).await;
        rt.course_add("CS101", "Intro to CS", None, "admin").await.unwrap();

        let pdf = dir.path().join("notes.pdf");
        std::fs::write(&pdf, b"notes").unwrap();
        let err = rt
            .file_add("CS101", &pdf, "syllabus", None, "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, ScholarError::Validation(_)));

        let err = rt
            .file_add("CS101", &dir.path().join("missing.pdf"), "content", None, "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, ScholarError::Validation(_)));
    }

    #[tokio::test]
    async fn history_hides_other_users_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime(&dir).await;
        let err = rt
            .chat_history("u1", "no-such-session", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ScholarError::NotFound { entity: "session", .. }));
    }
}
