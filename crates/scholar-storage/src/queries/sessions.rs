// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session CRUD operations.

use rusqlite::{OptionalExtension, params};
use scholar_core::{ChatSession, ScholarError, SessionKey, now_timestamp};

use crate::database::{Database, map_tr_err, text_enum};

const SESSION_COLUMNS: &str = "id, user_id, assistant_kind, course_id, engine_assistant_id,
     engine_thread_id, knowledge_version, message_count, created_at, updated_at";

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatSession> {
    Ok(ChatSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        assistant_kind: text_enum(row, 2)?,
        course_id: row.get(3)?,
        engine_assistant_id: row.get(4)?,
        engine_thread_id: row.get(5)?,
        knowledge_version: row.get(6)?,
        message_count: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn select_by_key(
    conn: &rusqlite::Connection,
    user_id: &str,
    kind: &str,
    course_id: Option<&str>,
) -> rusqlite::Result<Option<ChatSession>> {
    conn.query_row(
        &format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
             WHERE user_id = ?1 AND assistant_kind = ?2 AND COALESCE(course_id, '') = COALESCE(?3, '')"
        ),
        params![user_id, kind, course_id],
        session_from_row,
    )
    .optional()
}

/// Find the session for a (user, kind, course) key.
pub async fn find_session(
    db: &Database,
    key: &SessionKey,
) -> Result<Option<ChatSession>, ScholarError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| {
            select_by_key(
                conn,
                &key.user_id,
                &key.kind.to_string(),
                key.course_id.as_deref(),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a session, or return the existing row if the key is already taken.
pub async fn create_session(
    db: &Database,
    session: &ChatSession,
) -> Result<ChatSession, ScholarError> {
    let session = session.clone();
    let stored = db
        .connection()
        .call(move |conn| {
            let kind = session.assistant_kind.to_string();
            conn.execute(
                "INSERT INTO chat_sessions (id, user_id, assistant_kind, course_id, engine_assistant_id,
                     engine_thread_id, knowledge_version, message_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT DO NOTHING",
                params![
                    session.id,
                    session.user_id,
                    kind,
                    session.course_id,
                    session.engine_assistant_id,
                    session.engine_thread_id,
                    session.knowledge_version,
                    session.message_count,
                    session.created_at,
                    session.updated_at,
                ],
            )?;
            select_by_key(conn, &session.user_id, &kind, session.course_id.as_deref())
        })
        .await
        .map_err(map_tr_err)?;
    stored.ok_or_else(|| ScholarError::Internal("session vanished after insert".into()))
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<ChatSession>, ScholarError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = ?1"),
                params![id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List a user's sessions, most recently updated first.
pub async fn list_sessions(
    db: &Database,
    user_id: &str,
) -> Result<Vec<ChatSession>, ScholarError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM chat_sessions
                 WHERE user_id = ?1 ORDER BY updated_at DESC, created_at DESC"
            ))?;
            let rows = stmt.query_map(params![user_id], session_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Record the engine thread for a session.
pub async fn set_session_thread(
    db: &Database,
    id: &str,
    thread_id: &str,
) -> Result<(), ScholarError> {
    let session_id = id.to_string();
    let thread_id = thread_id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE chat_sessions SET engine_thread_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![thread_id, now_timestamp(), session_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    expect_one(updated, "session", id.to_string())
}

/// Record the engine assistant and the knowledge version it was bound at.
pub async fn set_session_assistant(
    db: &Database,
    id: &str,
    assistant_id: &str,
    knowledge_version: Option<i64>,
) -> Result<(), ScholarError> {
    let session_id = id.to_string();
    let assistant_id = assistant_id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE chat_sessions
                 SET engine_assistant_id = ?1, knowledge_version = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![assistant_id, knowledge_version, now_timestamp(), session_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    expect_one(updated, "session", id.to_string())
}

/// Delete a session; messages cascade. Returns false when no row matched.
pub async fn delete_session(db: &Database, id: &str) -> Result<bool, ScholarError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute("DELETE FROM chat_sessions WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

fn expect_one(updated: usize, entity: &'static str, id: String) -> Result<(), ScholarError> {
    if updated == 0 {
        Err(ScholarError::NotFound { entity, id })
    } else {
        Ok(())
    }
}
