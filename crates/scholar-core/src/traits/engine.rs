// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reasoning engine trait: the external service that owns assistants,
//! threads, and indexed files.

use async_trait::async_trait;

use crate::error::ScholarError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AssistantSpec, SeedMessage, TurnReply};

/// Adapter for a hosted assistant engine.
///
/// Errors must be classified: [`ScholarError::EngineUnavailable`] for
/// conditions worth retrying later, [`ScholarError::EngineRejected`] for
/// terminal refusals.
#[async_trait]
pub trait ReasoningEngine: PluginAdapter {
    /// Uploads and indexes a file, returning its engine handle once the
    /// engine reports it usable.
    async fn register_file(&self, file_name: &str, bytes: Vec<u8>)
    -> Result<String, ScholarError>;

    /// Creates an assistant bound to the given file handles.
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, ScholarError>;

    /// Replaces the file set an existing assistant searches over.
    async fn update_assistant_files(
        &self,
        assistant_id: &str,
        file_ids: &[String],
    ) -> Result<(), ScholarError>;

    /// Creates a conversation thread, optionally pre-populated with prior messages.
    async fn create_thread(&self, seed: &[SeedMessage]) -> Result<String, ScholarError>;

    /// Posts the user text to the thread, runs the assistant, and waits for its reply.
    async fn run_turn(
        &self,
        thread_id: &str,
        assistant_id: &str,
        text: &str,
    ) -> Result<TurnReply, ScholarError>;

    /// Stops any run still in flight on the thread so the next turn can post.
    async fn cancel_turn(&self, thread_id: &str) -> Result<(), ScholarError>;
}
