// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine assistants shared by all sessions of a non-course kind.

use rusqlite::{OptionalExtension, params};
use scholar_core::{AssistantKind, ScholarError, now_timestamp};

use crate::database::{Database, map_tr_err};

pub async fn get_shared_assistant(
    db: &Database,
    kind: AssistantKind,
) -> Result<Option<String>, ScholarError> {
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT engine_assistant_id FROM shared_assistants WHERE assistant_kind = ?1",
                params![kind],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Record the assistant for `kind` unless one exists; returns the stored id.
pub async fn put_shared_assistant(
    db: &Database,
    kind: AssistantKind,
    assistant_id: &str,
) -> Result<String, ScholarError> {
    let kind = kind.to_string();
    let assistant_id = assistant_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO shared_assistants (assistant_kind, engine_assistant_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![kind, assistant_id, now_timestamp()],
            )?;
            conn.query_row(
                "SELECT engine_assistant_id FROM shared_assistants WHERE assistant_kind = ?1",
                params![kind],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
