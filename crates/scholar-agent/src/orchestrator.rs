// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session Orchestrator: maps a logical chat session onto engine handles.
//!
//! For each (user, kind, course) key the orchestrator finds or creates the
//! session row, makes sure it has an engine assistant and thread, and keeps a
//! course session's assistant bound to the course's current file set.

use std::collections::HashMap;
use std::sync::Arc;

use scholar_config::PromptBook;
use scholar_config::model::AssistantsConfig;
use scholar_core::{
    AssistantKind, AssistantSpec, ChatSession, Course, MessageRole, ReasoningEngine,
    ScholarError, SeedMessage, SessionKey, StorageAdapter,
};
use scholar_knowledge::CourseKnowledge;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Lifecycle of a session as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No row for the key yet.
    Absent,
    /// Row exists but a handle is missing (creation failed part-way).
    Incomplete,
    /// Row has both handles.
    Active,
}

impl SessionState {
    pub fn of(session: Option<&ChatSession>) -> Self {
        match session {
            None => Self::Absent,
            Some(s) if s.engine_assistant_id.is_some() && s.engine_thread_id.is_some() => {
                Self::Active
            }
            Some(_) => Self::Incomplete,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Absent => write!(f, "absent"),
            SessionState::Incomplete => write!(f, "incomplete"),
            SessionState::Active => write!(f, "active"),
        }
    }
}

/// A session ready for a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationHandle {
    pub session: ChatSession,
    pub assistant_id: String,
    pub thread_id: String,
}

pub struct SessionOrchestrator {
    storage: Arc<dyn StorageAdapter>,
    engine: Arc<dyn ReasoningEngine>,
    knowledge: CourseKnowledge,
    prompts: PromptBook,
    pinned: HashMap<AssistantKind, String>,
    service_name: String,
    shared_create: Mutex<()>,
}

impl SessionOrchestrator {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        engine: Arc<dyn ReasoningEngine>,
        knowledge: CourseKnowledge,
        prompts: PromptBook,
        assistants: &AssistantsConfig,
        service_name: &str,
    ) -> Self {
        let pinned = AssistantKind::all()
            .filter(|kind| !kind.is_course())
            .filter_map(|kind| {
                assistants
                    .kind(kind)
                    .assistant_id
                    .clone()
                    .map(|id| (kind, id))
            })
            .collect();
        Self {
            storage,
            engine,
            knowledge,
            prompts,
            pinned,
            service_name: service_name.to_string(),
            shared_create: Mutex::new(()),
        }
    }

    /// Finds or creates the session for `key` and brings its handles up to date.
    ///
    /// Callers serialize per key; the unique index still makes a racing
    /// insert from another process return the existing row.
    pub async fn open(&self, key: &SessionKey) -> Result<ConversationHandle, ScholarError> {
        let existing = self.storage.find_session(key).await?;
        let state = SessionState::of(existing.as_ref());
        debug!(user_id = %key.user_id, kind = %key.kind, %state, "opening session");

        let session = match existing {
            Some(session) => session,
            None => {
                if let Some(course_id) = &key.course_id {
                    self.require_active_course(course_id).await?;
                }
                let fresh = ChatSession::new(uuid::Uuid::new_v4().to_string(), key);
                let stored = self.storage.create_session(&fresh).await?;
                if stored.id == fresh.id {
                    info!(session_id = %stored.id, kind = %key.kind, "session created");
                }
                stored
            }
        };

        self.ensure_handles(session).await
    }

    async fn ensure_handles(
        &self,
        mut session: ChatSession,
    ) -> Result<ConversationHandle, ScholarError> {
        let assistant_id = if session.assistant_kind.is_course() {
            self.course_assistant(&mut session).await?
        } else {
            self.bind_shared_assistant(&mut session).await?
        };

        let thread_id = match session.engine_thread_id.clone() {
            Some(thread_id) => thread_id,
            None => self.create_thread(&mut session).await?,
        };

        Ok(ConversationHandle {
            session,
            assistant_id,
            thread_id,
        })
    }

    async fn course_assistant(&self, session: &mut ChatSession) -> Result<String, ScholarError> {
        let course_id = session.course_id.clone().ok_or_else(|| {
            ScholarError::Internal(format!("course session {} has no course id", session.id))
        })?;

        let Some(assistant_id) = session.engine_assistant_id.clone() else {
            return self.create_course_assistant(session, &course_id).await;
        };

        match self.check_fresh(session, &course_id).await {
            Ok(()) => Ok(assistant_id),
            Err(ScholarError::KnowledgeStale { bound, current, .. }) => {
                info!(
                    session_id = %session.id,
                    course_id = %course_id,
                    bound,
                    current,
                    "course knowledge changed, refreshing assistant files"
                );
                let resolved = self.knowledge.aggregator.resolve(&course_id).await?;
                self.engine
                    .update_assistant_files(&assistant_id, &resolved.handles)
                    .await?;
                self.storage
                    .set_session_assistant(&session.id, &assistant_id, Some(resolved.version))
                    .await?;
                session.knowledge_version = Some(resolved.version);
                Ok(assistant_id)
            }
            Err(e) => Err(e),
        }
    }

    /// Fails with [`ScholarError::KnowledgeStale`] when the course's persisted
    /// version differs from the one the session's assistant was bound at.
    async fn check_fresh(&self, session: &ChatSession, course_id: &str) -> Result<(), ScholarError> {
        let current = self
            .storage
            .knowledge_version(course_id)
            .await?
            .ok_or_else(|| ScholarError::NotFound {
                entity: "course",
                id: course_id.to_string(),
            })?;
        match session.knowledge_version {
            Some(bound) if bound == current => Ok(()),
            bound => Err(ScholarError::KnowledgeStale {
                course_id: course_id.to_string(),
                bound: bound.unwrap_or(-1),
                current,
            }),
        }
    }

    async fn create_course_assistant(
        &self,
        session: &mut ChatSession,
        course_id: &str,
    ) -> Result<String, ScholarError> {
        let course = self.require_active_course(course_id).await?;
        let resolved = self.knowledge.aggregator.resolve(course_id).await?;

        let instructions = format!(
            "{}\n\n{}",
            course_preamble(&course),
            self.prompts.instructions(AssistantKind::Course)?
        );
        let spec = AssistantSpec {
            name: format!("{} {} ({})", self.service_name, course.code, course.name),
            instructions,
            file_ids: resolved.handles.clone(),
        };
        let assistant_id = self.engine.create_assistant(&spec).await?;
        self.storage
            .set_session_assistant(&session.id, &assistant_id, Some(resolved.version))
            .await?;

        info!(
            session_id = %session.id,
            course_id,
            assistant_id = %assistant_id,
            files = resolved.handles.len(),
            version = resolved.version,
            "course assistant created"
        );
        session.engine_assistant_id = Some(assistant_id.clone());
        session.knowledge_version = Some(resolved.version);
        Ok(assistant_id)
    }

    async fn bind_shared_assistant(
        &self,
        session: &mut ChatSession,
    ) -> Result<String, ScholarError> {
        let shared = self.shared_assistant(session.assistant_kind).await?;
        if session.engine_assistant_id.as_deref() != Some(shared.as_str()) {
            self.storage
                .set_session_assistant(&session.id, &shared, None)
                .await?;
            session.engine_assistant_id = Some(shared.clone());
        }
        Ok(shared)
    }

    /// The kind's shared assistant: pinned in config, else recorded, else created once.
    pub async fn shared_assistant(&self, kind: AssistantKind) -> Result<String, ScholarError> {
        if kind.is_course() {
            return Err(ScholarError::Internal(
                "course sessions do not use a shared assistant".into(),
            ));
        }
        if let Some(id) = self.pinned.get(&kind) {
            return Ok(id.clone());
        }
        if let Some(id) = self.storage.get_shared_assistant(kind).await? {
            return Ok(id);
        }

        let _guard = self.shared_create.lock().await;
        if let Some(id) = self.storage.get_shared_assistant(kind).await? {
            return Ok(id);
        }
        let spec = AssistantSpec {
            name: format!("{} {kind}", self.service_name),
            instructions: self.prompts.instructions(kind)?,
            file_ids: Vec::new(),
        };
        let created = self.engine.create_assistant(&spec).await?;
        let stored = self.storage.put_shared_assistant(kind, &created).await?;
        if stored != created {
            warn!(%kind, created = %created, kept = %stored, "shared assistant recorded concurrently");
        } else {
            info!(%kind, assistant_id = %stored, "shared assistant created");
        }
        Ok(stored)
    }

    /// Creates the session's thread, replaying any transcript already stored.
    async fn create_thread(&self, session: &mut ChatSession) -> Result<String, ScholarError> {
        let seed: Vec<SeedMessage> = self
            .storage
            .get_messages(&session.id, None)
            .await?
            .into_iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| SeedMessage {
                role: m.role,
                content: m.content,
            })
            .collect();

        let thread_id = self.engine.create_thread(&seed).await?;
        self.storage
            .set_session_thread(&session.id, &thread_id)
            .await?;
        info!(
            session_id = %session.id,
            thread_id = %thread_id,
            seeded = seed.len(),
            "thread created"
        );
        session.engine_thread_id = Some(thread_id.clone());
        Ok(thread_id)
    }

    async fn require_active_course(&self, course_id: &str) -> Result<Course, ScholarError> {
        let course = self
            .storage
            .get_course(course_id)
            .await?
            .ok_or_else(|| ScholarError::NotFound {
                entity: "course",
                id: course_id.to_string(),
            })?;
        if !course.is_active {
            return Err(ScholarError::Validation(format!(
                "course {} is not active",
                course.code
            )));
        }
        Ok(course)
    }
}

/// Course-specific lead-in appended to the course prompt.
fn course_preamble(course: &Course) -> String {
    let mut preamble = format!(
        "You are assisting students of {} ({}).",
        course.name, course.code
    );
    if let Some(description) = course.description.as_deref().filter(|d| !d.trim().is_empty()) {
        preamble.push_str(&format!(" Course description: {description}"));
    }
    preamble.push_str(
        "\nFiles marked as behavior documents define how you must answer. \
         Content documents are the course material; ground your answers in them.",
    );
    preamble
}
