// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript operations.

use rusqlite::params;
use scholar_core::{Message, MessageSource, ScholarError};

use crate::database::{Database, map_tr_err, text_enum};

/// Append a message and bump the owning session's `message_count` and
/// `updated_at` in a single transaction.
pub async fn append_message(db: &Database, msg: &Message) -> Result<(), ScholarError> {
    let msg = msg.clone();
    let session_id = msg.session_id.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE chat_sessions
                 SET message_count = message_count + 1, updated_at = ?1
                 WHERE id = ?2",
                params![msg.created_at, msg.session_id],
            )?;
            if updated == 0 {
                return Ok(0);
            }
            tx.execute(
                "INSERT INTO messages (id, session_id, role, content, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.id,
                    msg.session_id,
                    msg.role.to_string(),
                    msg.content,
                    msg.source.map(|s| s.to_string()),
                    msg.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(ScholarError::NotFound {
            entity: "session",
            id: session_id,
        });
    }
    Ok(())
}

/// Messages for a session in chronological order (insertion order breaks ties).
///
/// With `limit`, only the most recent `limit` messages are returned, still oldest first.
pub async fn get_messages_for_session(
    db: &Database,
    session_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, ScholarError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, role, content, source, created_at FROM (
                     SELECT id, session_id, role, content, source, created_at, rowid AS seq
                     FROM messages WHERE session_id = ?1
                     ORDER BY created_at DESC, seq DESC LIMIT ?2
                 ) ORDER BY created_at ASC, seq ASC",
            )?;
            let rows = stmt.query_map(params![session_id, limit.unwrap_or(-1)], |row| {
                let source: Option<String> = row.get(4)?;
                let source = match source {
                    Some(raw) => Some(raw.parse::<MessageSource>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            4,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?),
                    None => None,
                };
                Ok(Message {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    role: text_enum(row, 2)?,
                    content: row.get(3)?,
                    source,
                    created_at: row.get(5)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
