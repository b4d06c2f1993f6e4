// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock reasoning engine for deterministic testing.
//!
//! `MockEngine` implements `ReasoningEngine` in memory. Every call is counted
//! and recorded, failures can be scripted per operation, and an artificial
//! latency widens race windows for concurrency tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use scholar_core::traits::{PluginAdapter, ReasoningEngine};
use scholar_core::types::{AdapterType, AssistantSpec, HealthStatus, SeedMessage, TurnReply};
use scholar_core::ScholarError;

/// Engine operations that can have failures scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    RegisterFile,
    CreateAssistant,
    UpdateAssistantFiles,
    CreateThread,
    RunTurn,
}

/// A failure to return from the next call of an operation.
#[derive(Debug, Clone)]
pub enum ScriptedFailure {
    Unavailable(String),
    Rejected(String),
    /// Sleep this long before answering, for timeout tests.
    Hang(Duration),
}

/// One recorded `run_turn` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnCall {
    pub thread_id: String,
    pub assistant_id: String,
    pub text: String,
}

#[derive(Default)]
struct State {
    failures: HashMap<EngineOp, VecDeque<ScriptedFailure>>,
    replies: VecDeque<String>,
    registered: Vec<String>,
    assistants: Vec<(String, AssistantSpec)>,
    assistant_files: HashMap<String, Vec<String>>,
    threads: Vec<(String, Vec<SeedMessage>)>,
    turns: Vec<TurnCall>,
}

/// In-memory reasoning engine.
///
/// Handles are `file-N`, `asst-N`, `thread-N`, `msg-N`. Replies are popped from
/// a FIFO queue; when it is empty the reply echoes the user text.
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<State>,
    next_id: AtomicUsize,
    latency_ms: AtomicU64,
    register_calls: AtomicUsize,
    create_assistant_calls: AtomicUsize,
    update_calls: AtomicUsize,
    thread_calls: AtomicUsize,
    turn_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next turn.
    pub async fn push_reply(&self, text: impl Into<String>) {
        self.state.lock().await.replies.push_back(text.into());
    }

    /// Make the next call of `op` fail (or hang) as scripted.
    pub async fn fail_next(&self, op: EngineOp, failure: ScriptedFailure) {
        self.state
            .lock()
            .await
            .failures
            .entry(op)
            .or_default()
            .push_back(failure);
    }

    /// Delay applied to every `register_file` and `run_turn` call.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn create_assistant_calls(&self) -> usize {
        self.create_assistant_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn thread_calls(&self) -> usize {
        self.thread_calls.load(Ordering::SeqCst)
    }

    pub fn turn_calls(&self) -> usize {
        self.turn_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    /// File names passed to `register_file`, in call order.
    pub async fn registered_files(&self) -> Vec<String> {
        self.state.lock().await.registered.clone()
    }

    /// Specs passed to `create_assistant`, with the ids handed out.
    pub async fn created_assistants(&self) -> Vec<(String, AssistantSpec)> {
        self.state.lock().await.assistants.clone()
    }

    /// The file set an assistant currently searches over.
    pub async fn assistant_files(&self, assistant_id: &str) -> Option<Vec<String>> {
        self.state
            .lock()
            .await
            .assistant_files
            .get(assistant_id)
            .cloned()
    }

    /// Seeds passed to `create_thread`, with the ids handed out.
    pub async fn created_threads(&self) -> Vec<(String, Vec<SeedMessage>)> {
        self.state.lock().await.threads.clone()
    }

    pub async fn turns(&self) -> Vec<TurnCall> {
        self.state.lock().await.turns.clone()
    }

    fn next(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn latency(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Applies the next scripted failure for `op`, if any.
    async fn scripted(&self, op: EngineOp) -> Result<(), ScholarError> {
        let failure = self
            .state
            .lock()
            .await
            .failures
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        if let Some(failure) = &failure {
            debug!(?op, ?failure, "injecting scripted engine failure");
        }
        match failure {
            None => Ok(()),
            Some(ScriptedFailure::Unavailable(msg)) => Err(ScholarError::unavailable(msg)),
            Some(ScriptedFailure::Rejected(msg)) => {
                Err(ScholarError::EngineRejected { message: msg })
            }
            Some(ScriptedFailure::Hang(d)) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for MockEngine {
    fn name(&self) -> &str {
        "mock-engine"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Engine
    }

    async fn health_check(&self) -> Result<HealthStatus, ScholarError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ScholarError> {
        Ok(())
    }
}

#[async_trait]
impl ReasoningEngine for MockEngine {
    async fn register_file(
        &self,
        file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, ScholarError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        self.scripted(EngineOp::RegisterFile).await?;
        let id = self.next("file");
        self.state
            .lock()
            .await
            .registered
            .push(file_name.to_string());
        Ok(id)
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, ScholarError> {
        self.create_assistant_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted(EngineOp::CreateAssistant).await?;
        let id = self.next("asst");
        let mut state = self.state.lock().await;
        state.assistant_files.insert(id.clone(), spec.file_ids.clone());
        state.assistants.push((id.clone(), spec.clone()));
        Ok(id)
    }

    async fn update_assistant_files(
        &self,
        assistant_id: &str,
        file_ids: &[String],
    ) -> Result<(), ScholarError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted(EngineOp::UpdateAssistantFiles).await?;
        let mut state = self.state.lock().await;
        let Some(files) = state.assistant_files.get_mut(assistant_id) else {
            return Err(ScholarError::EngineRejected {
                message: format!("no such assistant {assistant_id}"),
            });
        };
        *files = file_ids.to_vec();
        Ok(())
    }

    async fn create_thread(&self, seed: &[SeedMessage]) -> Result<String, ScholarError> {
        self.thread_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted(EngineOp::CreateThread).await?;
        let id = self.next("thread");
        self.state
            .lock()
            .await
            .threads
            .push((id.clone(), seed.to_vec()));
        Ok(id)
    }

    async fn run_turn(
        &self,
        thread_id: &str,
        assistant_id: &str,
        text: &str,
    ) -> Result<TurnReply, ScholarError> {
        self.turn_calls.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        self.scripted(EngineOp::RunTurn).await?;
        let mut state = self.state.lock().await;
        state.turns.push(TurnCall {
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
            text: text.to_string(),
        });
        let reply = state
            .replies
            .pop_front()
            .unwrap_or_else(|| format!("mock reply to: {text}"));
        drop(state);
        Ok(TurnReply {
            text: reply,
            engine_message_id: Some(self.next("msg")),
        })
    }

    async fn cancel_turn(&self, thread_id: &str) -> Result<(), ScholarError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        debug!(thread_id, "cancel requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_calls_and_hands_out_handles() {
        let engine = MockEngine::new();
        let f = engine.register_file("a.pdf", vec![]).await.unwrap();
        let a = engine
            .create_assistant(&AssistantSpec {
                name: "n".into(),
                instructions: "i".into(),
                file_ids: vec![f.clone()],
            })
            .await
            .unwrap();
        assert!(f.starts_with("file-"));
        assert!(a.starts_with("asst-"));
        assert_eq!(engine.register_calls(), 1);
        assert_eq!(engine.assistant_files(&a).await, Some(vec![f]));
    }

    #[tokio::test]
    async fn scripted_failure_applies_once() {
        let engine = MockEngine::new();
        engine
            .fail_next(EngineOp::RunTurn, ScriptedFailure::Unavailable("503".into()))
            .await;
        let err = engine.run_turn("t", "a", "hi").await.unwrap_err();
        assert!(err.is_transient());

        engine.push_reply("hello").await;
        let reply = engine.run_turn("t", "a", "hi").await.unwrap();
        assert_eq!(reply.text, "hello");
        assert_eq!(engine.turn_calls(), 2);
        assert_eq!(engine.turns().await.len(), 1);
    }

    #[tokio::test]
    async fn default_reply_echoes_text() {
        let engine = MockEngine::new();
        let reply = engine.run_turn("t", "a", "ping").await.unwrap();
        assert_eq!(reply.text, "mock reply to: ping");
    }
}
