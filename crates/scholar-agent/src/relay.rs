// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message Relay: one chat turn from request to persisted reply.
//!
//! Turns for the same session key are serialized so concurrent first messages
//! cannot race session creation; unrelated sessions never wait on each other.
//! The user message is written before the engine is called, so a dropped or
//! failed turn still leaves a valid transcript.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use scholar_core::{
    AssistantKind, ChatSession, Message, MessageRole, MessageSource, ReasoningEngine,
    ScholarError, SessionKey, StorageAdapter, now_timestamp,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::orchestrator::SessionOrchestrator;

/// An inbound chat message from an authenticated user.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub user_id: String,
    /// Assistant kind name (`typeX`, `course`, ...). May be empty when
    /// `session_id` is given.
    pub assistant_kind: String,
    pub course_id: Option<String>,
    /// Continue this session instead of looking one up by key.
    pub session_id: Option<String>,
    pub text: String,
}

impl ChatRequest {
    pub fn new(
        user_id: impl Into<String>,
        assistant_kind: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            assistant_kind: assistant_kind.into(),
            course_id: None,
            session_id: None,
            text: text.into(),
        }
    }

    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// The assistant's answer, persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub session_id: String,
    pub user_message_id: String,
    pub assistant_message_id: String,
    pub reply: String,
}

pub struct MessageRelay {
    storage: Arc<dyn StorageAdapter>,
    engine: Arc<dyn ReasoningEngine>,
    orchestrator: Arc<SessionOrchestrator>,
    locks: DashMap<SessionKey, Arc<Mutex<()>>>,
    turn_timeout: Duration,
}

impl MessageRelay {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        engine: Arc<dyn ReasoningEngine>,
        orchestrator: Arc<SessionOrchestrator>,
        turn_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            engine,
            orchestrator,
            locks: DashMap::new(),
            turn_timeout,
        }
    }

    /// Runs one turn: validate, open the session, record the user message,
    /// ask the engine, record the reply.
    pub async fn send(&self, request: ChatRequest) -> Result<ChatReply, ScholarError> {
        if request.text.trim().is_empty() {
            return Err(ScholarError::Validation("message text must not be empty".into()));
        }
        let key = self.resolve_key(&request).await?;

        let lock = self.locks.entry(key.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.send_locked(&key, &request.text).await
        };
        self.locks.remove_if(&key, |_, l| Arc::strong_count(l) <= 2);
        result
    }

    async fn send_locked(&self, key: &SessionKey, text: &str) -> Result<ChatReply, ScholarError> {
        let handle = self.orchestrator.open(key).await?;
        let session_id = handle.session.id.clone();

        let user_message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.clone(),
            role: MessageRole::User,
            content: text.to_string(),
            source: None,
            created_at: now_timestamp(),
        };
        self.storage.append_message(&user_message).await?;
        debug!(session_id = %session_id, message_id = %user_message.id, "user message recorded");

        let turn = tokio::time::timeout(
            self.turn_timeout,
            self.engine
                .run_turn(&handle.thread_id, &handle.assistant_id, text),
        )
        .await;
        let reply = match turn {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(session_id = %session_id, error = %e, transient = e.is_transient(), "engine turn failed");
                return Err(e);
            }
            Err(_) => {
                warn!(session_id = %session_id, timeout_secs = self.turn_timeout.as_secs(), "engine turn timed out");
                if let Err(e) = self.engine.cancel_turn(&handle.thread_id).await {
                    warn!(session_id = %session_id, error = %e, "could not cancel timed out turn");
                }
                return Err(ScholarError::unavailable(format!(
                    "turn timed out after {}s",
                    self.turn_timeout.as_secs()
                )));
            }
        };

        let assistant_message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.clone(),
            role: MessageRole::Assistant,
            content: reply.text.clone(),
            source: Some(MessageSource::Internal),
            created_at: now_timestamp(),
        };
        if let Err(e) = self.storage.append_message(&assistant_message).await {
            warn!(session_id = %session_id, error = %e, "reply produced but not persisted");
            return Err(ScholarError::ReplyNotPersisted {
                session_id,
                reply: reply.text,
                source: Box::new(e),
            });
        }

        info!(
            session_id = %session_id,
            kind = %key.kind,
            engine_message_id = reply.engine_message_id.as_deref().unwrap_or("-"),
            "turn completed"
        );
        Ok(ChatReply {
            session_id,
            user_message_id: user_message.id,
            assistant_message_id: assistant_message.id,
            reply: reply.text,
        })
    }

    /// Derives the session key, either from an owned existing session or
    /// from the request's kind and course.
    async fn resolve_key(&self, request: &ChatRequest) -> Result<SessionKey, ScholarError> {
        if request.user_id.trim().is_empty() {
            return Err(ScholarError::Validation("user id must not be empty".into()));
        }

        let Some(session_id) = &request.session_id else {
            let kind = AssistantKind::parse(&request.assistant_kind)?;
            return SessionKey::new(request.user_id.clone(), kind, request.course_id.clone());
        };

        let session = owned_session(&*self.storage, session_id, &request.user_id).await?;
        let key = session.key();
        if !request.assistant_kind.trim().is_empty() {
            let kind = AssistantKind::parse(&request.assistant_kind)?;
            if kind != key.kind {
                return Err(ScholarError::Validation(format!(
                    "session {session_id} is a `{}` session, not `{kind}`",
                    key.kind
                )));
            }
        }
        if let Some(course_id) = request.course_id.as_deref().filter(|c| !c.trim().is_empty())
            && key.course_id.as_deref() != Some(course_id)
        {
            return Err(ScholarError::Validation(format!(
                "session {session_id} does not belong to course {course_id}"
            )));
        }
        Ok(key)
    }
}

/// Loads a session, hiding sessions of other users behind `NotFound`.
pub async fn owned_session(
    storage: &dyn StorageAdapter,
    session_id: &str,
    user_id: &str,
) -> Result<ChatSession, ScholarError> {
    match storage.get_session(session_id).await? {
        Some(session) if session.user_id == user_id => Ok(session),
        _ => Err(ScholarError::NotFound {
            entity: "session",
            id: session_id.to_string(),
        }),
    }
}
