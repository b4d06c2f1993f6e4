// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by adapter traits and the orchestration core.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::ScholarError;

/// Current UTC time in the millisecond RFC 3339 form used for every stored timestamp.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of external collaborator an adapter wraps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    ObjectStore,
    Engine,
}

/// Closed enumeration of conversational personas.
///
/// The string forms are the stored and configured names. Adding a kind is a
/// schema and configuration change only.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum AssistantKind {
    #[strum(serialize = "typeX")]
    #[serde(rename = "typeX")]
    TypeX,
    #[strum(serialize = "references")]
    #[serde(rename = "references")]
    References,
    #[strum(serialize = "academicReferences")]
    #[serde(rename = "academicReferences")]
    AcademicReferences,
    #[strum(serialize = "therapyGPT")]
    #[serde(rename = "therapyGPT")]
    TherapyGpt,
    #[strum(serialize = "whatsTrendy")]
    #[serde(rename = "whatsTrendy")]
    WhatsTrendy,
    #[strum(serialize = "course")]
    #[serde(rename = "course")]
    Course,
}

impl AssistantKind {
    /// Parses a stored or user-supplied kind name.
    pub fn parse(raw: &str) -> Result<Self, ScholarError> {
        Self::from_str(raw)
            .map_err(|_| ScholarError::Validation(format!("unknown assistant kind `{raw}`")))
    }

    /// All kinds in declaration order.
    pub fn all() -> impl Iterator<Item = AssistantKind> {
        Self::iter()
    }

    pub fn is_course(self) -> bool {
        self == Self::Course
    }

    /// Upper snake-case suffix used for environment variable names
    /// (`academicReferences` -> `ACADEMIC_REFERENCES`).
    pub fn env_suffix(self) -> &'static str {
        match self {
            Self::TypeX => "TYPEX",
            Self::References => "REFERENCES",
            Self::AcademicReferences => "ACADEMIC_REFERENCES",
            Self::TherapyGpt => "THERAPY_GPT",
            Self::WhatsTrendy => "WHATS_TRENDY",
            Self::Course => "COURSE",
        }
    }
}

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Channel a reply was produced through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    Internal,
    Web,
}

/// Whether a course file governs how the assistant answers or is material to answer from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileClassification {
    Behavior,
    #[default]
    Content,
}

impl FileClassification {
    /// Parses a classification, rejecting anything but `behavior` / `content`.
    pub fn parse(raw: &str) -> Result<Self, ScholarError> {
        Self::from_str(raw.trim()).map_err(|_| {
            ScholarError::Validation(format!(
                "invalid file classification `{raw}` (expected `behavior` or `content`)"
            ))
        })
    }

    /// Object-store folder the file's bytes live under.
    pub fn folder(self) -> &'static str {
        match self {
            Self::Behavior => "behavior",
            Self::Content => "content",
        }
    }
}

/// Identity of a logical chat session: one per user x kind (x course).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: String,
    pub kind: AssistantKind,
    pub course_id: Option<String>,
}

impl SessionKey {
    /// Builds a key, enforcing that only `course` sessions carry a course id.
    pub fn new(
        user_id: impl Into<String>,
        kind: AssistantKind,
        course_id: Option<String>,
    ) -> Result<Self, ScholarError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(ScholarError::Validation("user id must not be empty".into()));
        }
        let course_id = course_id.filter(|c| !c.trim().is_empty());
        match (kind.is_course(), &course_id) {
            (true, None) => Err(ScholarError::Validation(
                "course sessions require a course id".into(),
            )),
            (false, Some(course)) => Err(ScholarError::Validation(format!(
                "assistant kind `{kind}` does not take a course id (got `{course}`)"
            ))),
            _ => Ok(Self {
                user_id,
                kind,
                course_id,
            }),
        }
    }
}

/// A stored chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub assistant_kind: AssistantKind,
    pub course_id: Option<String>,
    /// Engine-side assistant bound to this session (course sessions, or the
    /// shared per-kind assistant recorded for reference).
    pub engine_assistant_id: Option<String>,
    /// Engine-side conversation thread.
    pub engine_thread_id: Option<String>,
    /// Course knowledge version the assistant's file set was bound at.
    pub knowledge_version: Option<i64>,
    pub message_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ChatSession {
    /// A fresh, handle-less session for the given key.
    pub fn new(id: String, key: &SessionKey) -> Self {
        let now = now_timestamp();
        Self {
            id,
            user_id: key.user_id.clone(),
            assistant_kind: key.kind,
            course_id: key.course_id.clone(),
            engine_assistant_id: None,
            engine_thread_id: None,
            knowledge_version: None,
            message_count: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey {
            user_id: self.user_id.clone(),
            kind: self.assistant_kind,
            course_id: self.course_id.clone(),
        }
    }
}

/// A single transcript entry. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub source: Option<MessageSource>,
    pub created_at: String,
}

/// A course whose files ground the `course` assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub is_active: bool,
    /// Bumped on every file add, remove, or reclassification.
    pub knowledge_version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A PDF uploaded to a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseFile {
    pub id: String,
    pub course_id: String,
    /// Name shown to users and passed to the engine on registration.
    pub file_name: String,
    /// Object-store path of the raw bytes.
    pub storage_path: String,
    pub file_size: i64,
    pub classification: FileClassification,
    /// Hex SHA-256 of the raw bytes.
    pub content_sha256: String,
    /// Engine file handle; set once on first ingestion and never re-derived.
    pub engine_file_id: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: String,
}

/// Parameters for creating an engine-side assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantSpec {
    pub name: String,
    pub instructions: String,
    /// Engine file handles, in presentation order.
    pub file_ids: Vec<String>,
}

/// A prior transcript message replayed into a freshly created thread.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedMessage {
    pub role: MessageRole,
    pub content: String,
}

/// The assistant's answer to one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    /// Engine-side message id, when the engine reports one.
    pub engine_message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_kind_names_round_trip() {
        for kind in AssistantKind::all() {
            let parsed = AssistantKind::parse(&kind.to_string()).unwrap();
            assert_eq!(parsed, kind);
        }
        assert_eq!(AssistantKind::TherapyGpt.to_string(), "therapyGPT");
        assert_eq!(
            serde_json::to_string(&AssistantKind::AcademicReferences).unwrap(),
            "\"academicReferences\""
        );
    }

    #[test]
    fn unknown_assistant_kind_is_validation_error() {
        let err = AssistantKind::parse("chemistry").unwrap_err();
        assert!(matches!(err, ScholarError::Validation(_)));
    }

    #[test]
    fn env_suffixes() {
        assert_eq!(AssistantKind::TypeX.env_suffix(), "TYPEX");
        assert_eq!(
            AssistantKind::AcademicReferences.env_suffix(),
            "ACADEMIC_REFERENCES"
        );
        assert_eq!(AssistantKind::TherapyGpt.env_suffix(), "THERAPY_GPT");
        assert_eq!(AssistantKind::WhatsTrendy.env_suffix(), "WHATS_TRENDY");
    }

    #[test]
    fn classification_defaults_to_content() {
        assert_eq!(FileClassification::default(), FileClassification::Content);
        assert_eq!(
            FileClassification::parse("behavior").unwrap(),
            FileClassification::Behavior
        );
        assert!(FileClassification::parse("syllabus").is_err());
        assert_eq!(FileClassification::Behavior.folder(), "behavior");
    }

    #[test]
    fn session_key_enforces_course_pairing() {
        assert!(SessionKey::new("u1", AssistantKind::Course, None).is_err());
        assert!(SessionKey::new("u1", AssistantKind::TypeX, Some("c1".into())).is_err());
        assert!(SessionKey::new("", AssistantKind::TypeX, None).is_err());

        let key = SessionKey::new("u1", AssistantKind::Course, Some("c1".into())).unwrap();
        assert_eq!(key.course_id.as_deref(), Some("c1"));

        // Blank course ids count as absent.
        let key = SessionKey::new("u1", AssistantKind::TypeX, Some("  ".into())).unwrap();
        assert!(key.course_id.is_none());
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now_timestamp();
        assert!(a < b);
        assert!(a.ends_with('Z'));
    }
}
