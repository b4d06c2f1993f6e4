// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration and message relay for the Scholar assistant platform.
//!
//! [`ChatService`] is the entry point a transport layer calls with an
//! already-authenticated user id. It wires the [`SessionOrchestrator`] and
//! [`MessageRelay`] over shared adapters and adds the transcript operations.

pub mod orchestrator;
pub mod relay;

use std::sync::Arc;
use std::time::Duration;

use scholar_config::{PromptBook, ScholarConfig};
use scholar_core::{
    ChatSession, Message, ObjectStore, ReasoningEngine, ScholarError, StorageAdapter,
};
use scholar_knowledge::CourseKnowledge;
use tracing::info;

pub use orchestrator::{ConversationHandle, SessionOrchestrator, SessionState};
pub use relay::{ChatReply, ChatRequest, MessageRelay, owned_session};

/// Chat operations over a storage, object store, and engine.
pub struct ChatService {
    storage: Arc<dyn StorageAdapter>,
    knowledge: CourseKnowledge,
    relay: MessageRelay,
}

impl ChatService {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        objects: Arc<dyn ObjectStore>,
        engine: Arc<dyn ReasoningEngine>,
        config: &ScholarConfig,
        prompts: PromptBook,
    ) -> Self {
        let knowledge = CourseKnowledge::new(
            storage.clone(),
            objects,
            engine.clone(),
            &config.ingestion,
        );
        let orchestrator = Arc::new(SessionOrchestrator::new(
            storage.clone(),
            engine.clone(),
            knowledge.clone(),
            prompts,
            &config.assistants,
            &config.service.name,
        ));
        let relay = MessageRelay::new(
            storage.clone(),
            engine,
            orchestrator,
            Duration::from_secs(config.engine.turn_timeout_secs),
        );
        Self {
            storage,
            knowledge,
            relay,
        }
    }

    /// Course knowledge layers (file administration, resolution).
    pub fn knowledge(&self) -> &CourseKnowledge {
        &self.knowledge
    }

    /// Relays one chat turn. See [`MessageRelay::send`].
    pub async fn send(&self, request: ChatRequest) -> Result<ChatReply, ScholarError> {
        self.relay.send(request).await
    }

    /// A session's transcript in chronological order; `limit` keeps the most recent N.
    pub async fn history(
        &self,
        session_id: &str,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, ScholarError> {
        let session = owned_session(&*self.storage, session_id, user_id).await?;
        self.storage.get_messages(&session.id, limit).await
    }

    /// A user's sessions, most recently active first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, ScholarError> {
        self.storage.list_sessions(user_id).await
    }

    /// Deletes a session and its transcript. Engine-side objects are left alone.
    pub async fn delete_session(&self, session_id: &str, user_id: &str) -> Result<(), ScholarError> {
        let session = owned_session(&*self.storage, session_id, user_id).await?;
        if !self.storage.delete_session(&session.id).await? {
            return Err(ScholarError::NotFound {
                entity: "session",
                id: session_id.to_string(),
            });
        }
        info!(session_id, user_id, "session deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_test_utils::TestHarness;

    fn service(harness: &TestHarness) -> ChatService {
        ChatService::new(
            harness.storage.clone(),
            harness.objects.clone(),
            harness.engine.clone(),
            &harness.config,
            harness.prompts.clone(),
        )
    }

    #[tokio::test]
    async fn history_is_owner_only() {
        let harness = TestHarness::new().await.unwrap();
        let chat = service(&harness);
        let reply = chat
            .send(ChatRequest::new("u1", "academicReferences", "cite something"))
            .await
            .unwrap();

        let history = chat.history(&reply.session_id, "u1", None).await.unwrap();
        assert_eq!(history.len(), 2);
        let last = chat.history(&reply.session_id, "u1", Some(1)).await.unwrap();
        assert_eq!(last[0].role, scholar_core::MessageRole::Assistant);

        let err = chat.history(&reply.session_id, "u2", None).await.unwrap_err();
        assert!(matches!(err, ScholarError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_cascades_and_checks_owner() {
        let harness = TestHarness::new().await.unwrap();
        let chat = service(&harness);
        let reply = chat
            .send(ChatRequest::new("u1", "typeX", "hello"))
            .await
            .unwrap();

        let err = chat.delete_session(&reply.session_id, "u2").await.unwrap_err();
        assert!(matches!(err, ScholarError::NotFound { .. }));

        chat.delete_session(&reply.session_id, "u1").await.unwrap();
        assert!(chat.list_sessions("u1").await.unwrap().is_empty());
        assert!(
            harness
                .storage
                .get_messages(&reply.session_id, None)
                .await
                .unwrap()
                .is_empty()
        );

        // A new message starts a fresh session.
        let again = chat
            .send(ChatRequest::new("u1", "typeX", "hello again"))
            .await
            .unwrap();
        assert_ne!(again.session_id, reply.session_id);
    }

    #[tokio::test]
    async fn sessions_are_listed_per_user() {
        let harness = TestHarness::new().await.unwrap();
        let chat = service(&harness);
        chat.send(ChatRequest::new("u1", "typeX", "a")).await.unwrap();
        chat.send(ChatRequest::new("u1", "whatsTrendy", "b")).await.unwrap();
        chat.send(ChatRequest::new("u2", "typeX", "c")).await.unwrap();

        assert_eq!(chat.list_sessions("u1").await.unwrap().len(), 2);
        assert_eq!(chat.list_sessions("u2").await.unwrap().len(), 1);
    }
}
