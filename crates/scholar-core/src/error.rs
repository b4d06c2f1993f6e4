// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Scholar assistant platform.

use thiserror::Error;

/// The primary error type used across all Scholar adapter traits and core operations.
///
/// Variants split along the line callers care about: whether retrying the
/// whole operation can help ([`ScholarError::is_transient`]) or not.
#[derive(Debug, Error)]
pub enum ScholarError {
    /// Malformed input rejected before any external call (unknown assistant
    /// kind, bad classification, course/kind mismatch, empty message).
    #[error("validation error: {0}")]
    Validation(String),

    /// Registering a course file with the reasoning engine failed.
    /// The file's engine handle is left unset so a retry can succeed.
    #[error("ingestion failed for file {file_id}: {message}")]
    IngestionFailed {
        file_id: String,
        message: String,
        transient: bool,
    },

    /// An assistant's attached files predate the course's current knowledge version.
    /// Raised internally to trigger a refresh; never surfaced from a successful send.
    #[error("knowledge for course {course_id} is stale (bound at v{bound}, current v{current})")]
    KnowledgeStale {
        course_id: String,
        bound: i64,
        current: i64,
    },

    /// Timeout, transport failure, or 5xx from the reasoning engine.
    #[error("reasoning engine unavailable: {message}")]
    EngineUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Content-policy, quota, or other terminal refusal from the reasoning engine.
    #[error("reasoning engine rejected the request: {message}")]
    EngineRejected { message: String },

    /// The engine produced a reply but writing the assistant message failed.
    /// The reply text is carried so the caller can still deliver it.
    #[error("reply for session {session_id} could not be persisted: {source}")]
    ReplyNotPersisted {
        session_id: String,
        reply: String,
        source: Box<ScholarError>,
    },

    /// A referenced entity does not exist (or is not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A create-only write found something already at the target.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// Configuration errors (invalid TOML, missing prompts, missing credentials).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database, object store, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ScholarError {
    /// Shorthand for an [`ScholarError::EngineUnavailable`] without a source.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`ScholarError::Storage`] from any displayable message.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            source: message.into().into(),
        }
    }

    /// Returns true when retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::EngineUnavailable { .. } | Self::Storage { .. } => true,
            Self::IngestionFailed { transient, .. } => *transient,
            Self::ReplyNotPersisted { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ScholarError::unavailable("503").is_transient());
        assert!(ScholarError::storage("disk full").is_transient());
        assert!(!ScholarError::EngineRejected {
            message: "content policy".into()
        }
        .is_transient());
        assert!(!ScholarError::Validation("bad kind".into()).is_transient());

        let retryable = ScholarError::IngestionFailed {
            file_id: "f1".into(),
            message: "timeout".into(),
            transient: true,
        };
        assert!(retryable.is_transient());
    }

    #[test]
    fn reply_not_persisted_follows_its_cause() {
        let err = ScholarError::ReplyNotPersisted {
            session_id: "s1".into(),
            reply: "hello".into(),
            source: Box::new(ScholarError::storage("locked")),
        };
        assert!(err.is_transient());
        assert!(err.to_string().contains("s1"));
    }

    #[test]
    fn stale_message_names_versions() {
        let err = ScholarError::KnowledgeStale {
            course_id: "cs101".into(),
            bound: 3,
            current: 4,
        };
        assert_eq!(
            err.to_string(),
            "knowledge for course cs101 is stale (bound at v3, current v4)"
        );
    }
}
