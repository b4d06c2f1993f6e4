// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI Assistants reasoning engine adapter for Scholar.
//!
//! This crate implements [`ReasoningEngine`] against the Assistants v2 API:
//! files are uploaded and indexed into vector stores, assistants search over
//! those stores, and each chat turn is a thread run polled to completion.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use scholar_config::model::EngineConfig;
use scholar_core::error::ScholarError;
use scholar_core::traits::{PluginAdapter, ReasoningEngine};
use scholar_core::types::{
    AdapterType, AssistantSpec, HealthStatus, MessageRole, SeedMessage, TurnReply,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::OpenAiClient;
use crate::types::{
    Assistant, CreateAssistantRequest, CreateRunRequest, CreateThreadRequest,
    CreateVectorStoreRequest, FileObject, MessageInput, MessageList, ModifyAssistantRequest, Run,
    RunList, RunStatus, Thread, ThreadMessage, Tool, ToolResources, VectorStore,
};

/// Run error codes that indicate engine-side pressure rather than a refusal.
const TRANSIENT_RUN_CODES: &[&str] = &["rate_limit_exceeded", "server_error"];

/// OpenAI Assistants engine implementing [`ReasoningEngine`].
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiEngine {
    client: OpenAiClient,
    model: String,
    poll_interval: Duration,
    processing_timeout: Duration,
}

impl OpenAiEngine {
    /// Creates a new engine adapter from the engine configuration section.
    pub fn new(config: &EngineConfig) -> Result<Self, ScholarError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            ScholarError::Config(
                "OpenAI API key not found. Set engine.api_key in config or OPENAI_API_KEY environment variable.".into(),
            )
        })?;

        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        info!(model = config.model, "OpenAI engine initialized");

        Ok(Self {
            client,
            model: config.model.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            processing_timeout: Duration::from_secs(config.processing_timeout_secs),
        })
    }

    /// Creates an engine with an existing client (for testing).
    #[cfg(test)]
    fn with_client(client: OpenAiClient, model: &str, poll_interval: Duration) -> Self {
        Self {
            client,
            model: model.to_string(),
            poll_interval,
            processing_timeout: Duration::from_secs(2),
        }
    }

    /// Polls an uploaded file until the engine has processed it.
    async fn wait_for_file(&self, file: FileObject) -> Result<String, ScholarError> {
        let deadline = Instant::now() + self.processing_timeout;
        let mut current = file;
        loop {
            match current.status.as_deref() {
                Some("processed") | None => return Ok(current.id),
                Some("error") => {
                    return Err(ScholarError::EngineRejected {
                        message: format!(
                            "file {} failed processing: {}",
                            current.id,
                            current.status_details.as_deref().unwrap_or("no details")
                        ),
                    });
                }
                Some(status) => {
                    if Instant::now() >= deadline {
                        return Err(ScholarError::unavailable(format!(
                            "file {} still `{status}` after {}s",
                            current.id,
                            self.processing_timeout.as_secs()
                        )));
                    }
                    tokio::time::sleep(self.poll_interval).await;
                    current = self
                        .client
                        .get_json(&format!("/files/{}", current.id))
                        .await?;
                }
            }
        }
    }

    /// Creates a vector store over the given files and waits until it is searchable.
    async fn create_vector_store(
        &self,
        name: Option<String>,
        file_ids: &[String],
    ) -> Result<String, ScholarError> {
        let request = CreateVectorStoreRequest {
            name,
            file_ids: file_ids.to_vec(),
        };
        let mut store: VectorStore = self.client.post_json("/vector_stores", &request).await?;
        let deadline = Instant::now() + self.processing_timeout;

        loop {
            match store.status.as_str() {
                "completed" => break,
                "expired" => {
                    return Err(ScholarError::unavailable(format!(
                        "vector store {} expired before indexing finished",
                        store.id
                    )));
                }
                status => {
                    if Instant::now() >= deadline {
                        return Err(ScholarError::unavailable(format!(
                            "vector store {} still `{status}` after {}s",
                            store.id,
                            self.processing_timeout.as_secs()
                        )));
                    }
                    tokio::time::sleep(self.poll_interval).await;
                    store = self
                        .client
                        .get_json(&format!("/vector_stores/{}", store.id))
                        .await?;
                }
            }
        }

        if let Some(counts) = &store.file_counts
            && counts.failed > 0
        {
            warn!(
                vector_store_id = %store.id,
                failed = counts.failed,
                completed = counts.completed,
                "some files failed to index"
            );
        }
        debug!(vector_store_id = %store.id, files = file_ids.len(), "vector store ready");
        Ok(store.id)
    }

    /// Polls a run until it leaves the queued/in-progress states.
    async fn wait_for_run(&self, thread_id: &str, run: Run) -> Result<Run, ScholarError> {
        let mut current = run;
        while current.status.is_pending() {
            tokio::time::sleep(self.poll_interval).await;
            current = self
                .client
                .get_json(&format!("/threads/{thread_id}/runs/{}", current.id))
                .await?;
        }
        Ok(current)
    }

    /// Cancels whatever run still holds the thread and waits for it to let go.
    ///
    /// A thread accepts no new messages while a run is active, so a turn that
    /// was abandoned by the caller would otherwise poison every later turn.
    async fn settle_active_run(&self, thread_id: &str) -> Result<(), ScholarError> {
        let runs: RunList = self
            .client
            .get_json(&format!("/threads/{thread_id}/runs?limit=1&order=desc"))
            .await?;
        let Some(run) = runs.data.into_iter().next() else {
            return Ok(());
        };
        if !run.status.is_active() {
            return Ok(());
        }

        warn!(thread_id, run_id = %run.id, status = ?run.status, "cancelling active run");
        let mut current: Run = if run.status == RunStatus::Cancelling {
            run
        } else {
            self.client
                .post_json(
                    &format!("/threads/{thread_id}/runs/{}/cancel", run.id),
                    &serde_json::json!({}),
                )
                .await?
        };

        let deadline = Instant::now() + self.processing_timeout;
        while current.status.is_active() {
            if Instant::now() >= deadline {
                return Err(ScholarError::unavailable(format!(
                    "run {} on thread {thread_id} still `{:?}` after cancel",
                    current.id, current.status
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
            current = self
                .client
                .get_json(&format!("/threads/{thread_id}/runs/{}", current.id))
                .await?;
        }
        debug!(thread_id, run_id = %current.id, status = ?current.status, "active run settled");
        Ok(())
    }
}

/// Maps a finished, non-completed run onto the engine error taxonomy.
fn run_outcome_error(run: &Run) -> ScholarError {
    let code = run.last_error.as_ref().and_then(|e| e.code.as_deref());
    let detail = run
        .last_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| "no details".to_string());

    match run.status {
        RunStatus::Expired => {
            ScholarError::unavailable(format!("run {} expired: {detail}", run.id))
        }
        RunStatus::Failed if code.is_some_and(|c| TRANSIENT_RUN_CODES.contains(&c)) => {
            ScholarError::unavailable(format!(
                "run {} failed ({}): {detail}",
                run.id,
                code.unwrap_or_default()
            ))
        }
        status => ScholarError::EngineRejected {
            message: format!("run {} ended as {status:?}: {detail}", run.id),
        },
    }
}

fn seed_input(message: &SeedMessage) -> Option<MessageInput> {
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => return None,
    };
    Some(MessageInput {
        role: role.to_string(),
        content: message.content.clone(),
    })
}

#[async_trait]
impl PluginAdapter for OpenAiEngine {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Engine
    }

    async fn health_check(&self) -> Result<HealthStatus, ScholarError> {
        match self.client.get_json::<serde_json::Value>("/models").await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) if e.is_transient() => Ok(HealthStatus::Degraded(e.to_string())),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), ScholarError> {
        debug!("OpenAI engine shutting down");
        Ok(())
    }
}

#[async_trait]
impl ReasoningEngine for OpenAiEngine {
    async fn register_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ScholarError> {
        let size = bytes.len();
        let uploaded = self.client.upload_file(file_name, bytes).await?;
        debug!(file_id = %uploaded.id, file_name, size, "file uploaded");
        let file_id = self.wait_for_file(uploaded).await?;
        info!(file_id = %file_id, file_name, "file registered");
        Ok(file_id)
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, ScholarError> {
        let tool_resources = if spec.file_ids.is_empty() {
            None
        } else {
            let store = self
                .create_vector_store(Some(spec.name.clone()), &spec.file_ids)
                .await?;
            Some(ToolResources::vector_stores(vec![store]))
        };

        let request = CreateAssistantRequest {
            model: self.model.clone(),
            name: spec.name.clone(),
            instructions: spec.instructions.clone(),
            tools: vec![Tool::file_search()],
            tool_resources,
        };
        let assistant: Assistant = self.client.post_json("/assistants", &request).await?;
        info!(
            assistant_id = %assistant.id,
            name = %spec.name,
            files = spec.file_ids.len(),
            "assistant created"
        );
        Ok(assistant.id)
    }

    async fn update_assistant_files(
        &self,
        assistant_id: &str,
        file_ids: &[String],
    ) -> Result<(), ScholarError> {
        let stores = if file_ids.is_empty() {
            Vec::new()
        } else {
            vec![self.create_vector_store(None, file_ids).await?]
        };

        let request = ModifyAssistantRequest {
            tools: vec![Tool::file_search()],
            tool_resources: ToolResources::vector_stores(stores),
        };
        let _: Assistant = self
            .client
            .post_json(&format!("/assistants/{assistant_id}"), &request)
            .await?;
        info!(assistant_id, files = file_ids.len(), "assistant files replaced");
        Ok(())
    }

    async fn create_thread(&self, seed: &[SeedMessage]) -> Result<String, ScholarError> {
        let request = CreateThreadRequest {
            messages: seed.iter().filter_map(seed_input).collect(),
        };
        let thread: Thread = self.client.post_json("/threads", &request).await?;
        debug!(thread_id = %thread.id, seeded = request.messages.len(), "thread created");
        Ok(thread.id)
    }

    async fn run_turn(
        &self,
        thread_id: &str,
        assistant_id: &str,
        text: &str,
    ) -> Result<TurnReply, ScholarError> {
        self.settle_active_run(thread_id).await?;

        let input = MessageInput {
            role: "user".to_string(),
            content: text.to_string(),
        };
        let _: ThreadMessage = self
            .client
            .post_json(&format!("/threads/{thread_id}/messages"), &input)
            .await?;

        let run: Run = self
            .client
            .post_json(
                &format!("/threads/{thread_id}/runs"),
                &CreateRunRequest {
                    assistant_id: assistant_id.to_string(),
                },
            )
            .await?;
        debug!(thread_id, run_id = %run.id, "run started");

        let run = self.wait_for_run(thread_id, run).await?;
        if run.status != RunStatus::Completed {
            return Err(run_outcome_error(&run));
        }

        let messages: MessageList = self
            .client
            .get_json(&format!(
                "/threads/{thread_id}/messages?run_id={}&order=desc",
                run.id
            ))
            .await?;

        let reply = messages
            .data
            .into_iter()
            .find(|m| m.role == "assistant")
            .ok_or_else(|| ScholarError::EngineRejected {
                message: format!("run {} completed without an assistant message", run.id),
            })?;

        Ok(TurnReply {
            text: reply.text(),
            engine_message_id: Some(reply.id),
        })
    }

    async fn cancel_turn(&self, thread_id: &str) -> Result<(), ScholarError> {
        self.settle_active_run(thread_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine_for(server: &MockServer) -> OpenAiEngine {
        let client = OpenAiClient::new(
            &SecretString::from("sk-test".to_string()),
            &server.uri(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry_delay(Duration::from_millis(10));
        OpenAiEngine::with_client(client, "gpt-4o", Duration::from_millis(10))
    }

    fn json_response(body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[test]
    fn new_without_api_key_is_config_error() {
        let config = EngineConfig {
            api_key: Some(String::new()),
            ..EngineConfig::default()
        };
        // Falls back to OPENAI_API_KEY; only assert the error shape when unset.
        if let Err(err) = OpenAiEngine::new(&config) {
            assert!(matches!(err, ScholarError::Config(_)));
            assert!(err.to_string().contains("OPENAI_API_KEY"));
        }
    }

    #[test]
    fn new_with_config_key_succeeds() {
        let config = EngineConfig {
            api_key: Some("sk-configured".into()),
            ..EngineConfig::default()
        };
        let engine = OpenAiEngine::new(&config).unwrap();
        assert_eq!(engine.name(), "openai");
        assert_eq!(engine.adapter_type(), AdapterType::Engine);
    }

    #[tokio::test]
    async fn register_file_polls_until_processed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(json_response(json!({"id": "file_1", "status": "uploaded"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/file_1"))
            .respond_with(json_response(json!({"id": "file_1", "status": "uploaded"})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/file_1"))
            .respond_with(json_response(json!({"id": "file_1", "status": "processed"})))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let id = engine
            .register_file("syllabus.pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        assert_eq!(id, "file_1");
    }

    #[tokio::test]
    async fn register_file_processing_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(json_response(json!({
                "id": "file_bad", "status": "error", "status_details": "unsupported file"
            })))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let err = engine
            .register_file("notes.pdf", b"junk".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ScholarError::EngineRejected { .. }));
        assert!(err.to_string().contains("unsupported file"));
    }

    #[tokio::test]
    async fn create_assistant_builds_vector_store_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vector_stores"))
            .and(body_partial_json(json!({"file_ids": ["file_b1", "file_c1"]})))
            .respond_with(json_response(json!({"id": "vs_1", "status": "in_progress"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/vector_stores/vs_1"))
            .respond_with(json_response(json!({
                "id": "vs_1", "status": "completed",
                "file_counts": {"in_progress": 0, "completed": 2, "failed": 0}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/assistants"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "name": "CS101",
                "tools": [{"type": "file_search"}],
                "tool_resources": {"file_search": {"vector_store_ids": ["vs_1"]}}
            })))
            .respond_with(json_response(json!({"id": "asst_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let id = engine
            .create_assistant(&AssistantSpec {
                name: "CS101".into(),
                instructions: "Answer from course material.".into(),
                file_ids: vec!["file_b1".into(), "file_c1".into()],
            })
            .await
            .unwrap();
        assert_eq!(id, "asst_1");
    }

    #[tokio::test]
    async fn create_assistant_without_files_skips_vector_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vector_stores"))
            .respond_with(json_response(json!({"id": "vs_x", "status": "completed"})))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/assistants"))
            .respond_with(json_response(json!({"id": "asst_2"})))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let id = engine
            .create_assistant(&AssistantSpec {
                name: "typeX".into(),
                instructions: "Be brief.".into(),
                file_ids: vec![],
            })
            .await
            .unwrap();
        assert_eq!(id, "asst_2");
    }

    #[tokio::test]
    async fn update_assistant_files_replaces_vector_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vector_stores"))
            .respond_with(json_response(json!({"id": "vs_2", "status": "completed"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/assistants/asst_1"))
            .and(body_partial_json(json!({
                "tool_resources": {"file_search": {"vector_store_ids": ["vs_2"]}}
            })))
            .respond_with(json_response(json!({"id": "asst_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        engine
            .update_assistant_files("asst_1", &["file_c2".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_thread_seeds_user_and_assistant_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .and(body_partial_json(json!({
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ]
            })))
            .respond_with(json_response(json!({"id": "thread_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let seed = vec![
            SeedMessage {
                role: MessageRole::System,
                content: "ignored".into(),
            },
            SeedMessage {
                role: MessageRole::User,
                content: "hi".into(),
            },
            SeedMessage {
                role: MessageRole::Assistant,
                content: "hello".into(),
            },
        ];
        let id = engine.create_thread(&seed).await.unwrap();
        assert_eq!(id, "thread_1");
    }

    async fn mount_idle_thread(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs"))
            .respond_with(json_response(json!({"data": []})))
            .mount(server)
            .await;
    }

    async fn mount_turn_prelude(server: &MockServer) {
        mount_idle_thread(server).await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/messages"))
            .and(body_partial_json(json!({"role": "user", "content": "What is recursion?"})))
            .respond_with(json_response(json!({"id": "msg_u1", "role": "user", "content": []})))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .and(body_partial_json(json!({"assistant_id": "asst_1"})))
            .respond_with(json_response(json!({"id": "run_1", "status": "queued"})))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn run_turn_returns_assistant_reply() {
        let server = MockServer::start().await;
        mount_turn_prelude(&server).await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_1"))
            .respond_with(json_response(json!({"id": "run_1", "status": "in_progress"})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_1"))
            .respond_with(json_response(json!({"id": "run_1", "status": "completed"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/messages"))
            .and(query_param("run_id", "run_1"))
            .respond_with(json_response(json!({
                "data": [{
                    "id": "msg_a1",
                    "role": "assistant",
                    "run_id": "run_1",
                    "content": [{"type": "text", "text": {"value": "A function calling itself.", "annotations": []}}]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let reply = engine
            .run_turn("thread_1", "asst_1", "What is recursion?")
            .await
            .unwrap();
        assert_eq!(reply.text, "A function calling itself.");
        assert_eq!(reply.engine_message_id.as_deref(), Some("msg_a1"));
    }

    #[tokio::test]
    async fn turn_after_abandoned_run_cancels_it_first() {
        let server = MockServer::start().await;
        // The earlier turn timed out on the caller's side and left run_old going.
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs"))
            .respond_with(json_response(json!({
                "data": [{"id": "run_old", "status": "in_progress"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs/run_old/cancel"))
            .respond_with(json_response(json!({"id": "run_old", "status": "cancelling"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_old"))
            .respond_with(json_response(json!({"id": "run_old", "status": "cancelled"})))
            .expect(1..)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/messages"))
            .and(body_partial_json(json!({"role": "user", "content": "What is recursion?"})))
            .respond_with(json_response(json!({"id": "msg_u2", "role": "user", "content": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .respond_with(json_response(json!({"id": "run_2", "status": "completed"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/messages"))
            .and(query_param("run_id", "run_2"))
            .respond_with(json_response(json!({
                "data": [{
                    "id": "msg_a2",
                    "role": "assistant",
                    "run_id": "run_2",
                    "content": [{"type": "text", "text": {"value": "Self reference.", "annotations": []}}]
                }]
            })))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let reply = engine
            .run_turn("thread_1", "asst_1", "What is recursion?")
            .await
            .unwrap();
        assert_eq!(reply.text, "Self reference.");
    }

    #[tokio::test]
    async fn cancel_turn_on_idle_thread_is_a_no_op() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs"))
            .respond_with(json_response(json!({
                "data": [{"id": "run_9", "status": "completed"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs/run_9/cancel"))
            .respond_with(json_response(json!({"id": "run_9", "status": "cancelled"})))
            .expect(0)
            .mount(&server)
            .await;

        engine_for(&server).cancel_turn("thread_1").await.unwrap();
    }

    #[tokio::test]
    async fn failed_run_is_rejected() {
        let server = MockServer::start().await;
        mount_turn_prelude(&server).await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_1"))
            .respond_with(json_response(json!({
                "id": "run_1", "status": "failed",
                "last_error": {"code": "invalid_prompt", "message": "prompt flagged"}
            })))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let err = engine
            .run_turn("thread_1", "asst_1", "What is recursion?")
            .await
            .unwrap_err();
        assert!(matches!(err, ScholarError::EngineRejected { .. }), "got {err:?}");
        assert!(err.to_string().contains("prompt flagged"));
    }

    #[tokio::test]
    async fn rate_limited_run_is_unavailable() {
        let server = MockServer::start().await;
        mount_turn_prelude(&server).await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_1"))
            .respond_with(json_response(json!({
                "id": "run_1", "status": "failed",
                "last_error": {"code": "rate_limit_exceeded", "message": "try later"}
            })))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let err = engine
            .run_turn("thread_1", "asst_1", "What is recursion?")
            .await
            .unwrap_err();
        assert!(err.is_transient(), "got {err:?}");
    }

    #[tokio::test]
    async fn expired_run_is_unavailable() {
        let server = MockServer::start().await;
        mount_turn_prelude(&server).await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_1"))
            .respond_with(json_response(json!({"id": "run_1", "status": "expired"})))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let err = engine
            .run_turn("thread_1", "asst_1", "What is recursion?")
            .await
            .unwrap_err();
        assert!(matches!(err, ScholarError::EngineUnavailable { .. }));
    }

    #[tokio::test]
    async fn quota_exhaustion_on_message_post_is_rejected() {
        let server = MockServer::start().await;
        mount_idle_thread(&server).await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "quota", "type": "insufficient_quota", "code": "insufficient_quota"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let err = engine
            .run_turn("thread_1", "asst_1", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ScholarError::EngineRejected { .. }));
    }

    #[tokio::test]
    async fn health_check_reports_rejection_as_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "bad key", "type": "invalid_request_error", "code": "invalid_api_key"}
            })))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let status = engine.health_check().await.unwrap();
        assert!(matches!(status, HealthStatus::Unhealthy(_)));
    }
}
