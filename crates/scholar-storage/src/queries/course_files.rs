// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Course file rows. Every change to a course's file set bumps the course's
//! knowledge version in the same transaction.

use rusqlite::{OptionalExtension, params};
use scholar_core::{CourseFile, FileClassification, ScholarError, now_timestamp};

use crate::database::{Database, map_tr_err, text_enum};
use crate::queries::courses::bump_version;

const FILE_COLUMNS: &str = "id, course_id, file_name, storage_path, file_size, classification,
     content_sha256, engine_file_id, uploaded_by, uploaded_at";

fn file_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CourseFile> {
    Ok(CourseFile {
        id: row.get(0)?,
        course_id: row.get(1)?,
        file_name: row.get(2)?,
        storage_path: row.get(3)?,
        file_size: row.get(4)?,
        classification: text_enum(row, 5)?,
        content_sha256: row.get(6)?,
        engine_file_id: row.get(7)?,
        uploaded_by: row.get(8)?,
        uploaded_at: row.get(9)?,
    })
}

fn course_of(tx: &rusqlite::Transaction<'_>, file_id: &str) -> rusqlite::Result<Option<String>> {
    tx.query_row(
        "SELECT course_id FROM course_files WHERE id = ?1",
        params![file_id],
        |row| row.get(0),
    )
    .optional()
}

/// Insert a file row; returns the course's new knowledge version.
pub async fn insert_course_file(db: &Database, file: &CourseFile) -> Result<i64, ScholarError> {
    let file = file.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO course_files (id, course_id, file_name, storage_path, file_size,
                     classification, content_sha256, engine_file_id, uploaded_by, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    file.id,
                    file.course_id,
                    file.file_name,
                    file.storage_path,
                    file.file_size,
                    file.classification.to_string(),
                    file.content_sha256,
                    file.engine_file_id,
                    file.uploaded_by,
                    file.uploaded_at,
                ],
            )?;
            let version = bump_version(&tx, &file.course_id, &now_timestamp())?;
            tx.commit()?;
            Ok(version)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a file row by ID.
pub async fn get_course_file(db: &Database, id: &str) -> Result<Option<CourseFile>, ScholarError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {FILE_COLUMNS} FROM course_files WHERE id = ?1"),
                params![id],
                file_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// A course's files in upload order.
pub async fn list_course_files(
    db: &Database,
    course_id: &str,
) -> Result<Vec<CourseFile>, ScholarError> {
    let course_id = course_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FILE_COLUMNS} FROM course_files
                 WHERE course_id = ?1 ORDER BY uploaded_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![course_id], file_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a file row; returns the new version, or `None` if the row was absent.
pub async fn delete_course_file(db: &Database, id: &str) -> Result<Option<i64>, ScholarError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let Some(course_id) = course_of(&tx, &id)? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM course_files WHERE id = ?1", params![id])?;
            let version = bump_version(&tx, &course_id, &now_timestamp())?;
            tx.commit()?;
            Ok(Some(version))
        })
        .await
        .map_err(map_tr_err)
}

/// Change a file's classification and storage path; returns the new version.
pub async fn reclassify_course_file(
    db: &Database,
    id: &str,
    classification: FileClassification,
    storage_path: &str,
) -> Result<i64, ScholarError> {
    let file_id = id.to_string();
    let storage_path = storage_path.to_string();
    let version = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let Some(course_id) = course_of(&tx, &file_id)? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE course_files SET classification = ?1, storage_path = ?2 WHERE id = ?3",
                params![classification.to_string(), storage_path, file_id],
            )?;
            let version = bump_version(&tx, &course_id, &now_timestamp())?;
            tx.commit()?;
            Ok(Some(version))
        })
        .await
        .map_err(map_tr_err)?;
    version.ok_or_else(|| ScholarError::NotFound {
        entity: "course file",
        id: id.to_string(),
    })
}

/// Compare-and-set the engine handle: only written while still unset.
///
/// Returns the handle stored afterwards, which is the caller's on a win and
/// the earlier writer's otherwise.
pub async fn set_course_file_handle(
    db: &Database,
    id: &str,
    handle: &str,
) -> Result<String, ScholarError> {
    let file_id = id.to_string();
    let handle = handle.to_string();
    let stored: Option<Option<String>> = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE course_files SET engine_file_id = ?1
                 WHERE id = ?2 AND engine_file_id IS NULL",
                params![handle, file_id],
            )?;
            conn.query_row(
                "SELECT engine_file_id FROM course_files WHERE id = ?1",
                params![file_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    stored.flatten().ok_or_else(|| ScholarError::NotFound {
        entity: "course file",
        id: id.to_string(),
    })
}

/// The earliest recorded engine handle for identical bytes.
pub async fn find_handle_by_hash(db: &Database, sha256: &str) -> Result<Option<String>, ScholarError> {
    let sha256 = sha256.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT engine_file_id FROM course_files
                 WHERE content_sha256 = ?1 AND engine_file_id IS NOT NULL
                 ORDER BY uploaded_at ASC LIMIT 1",
                params![sha256],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
