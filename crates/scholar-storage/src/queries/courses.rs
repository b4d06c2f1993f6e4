// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Course CRUD and knowledge version reads.

use rusqlite::{OptionalExtension, params};
use scholar_core::{Course, ScholarError};

use crate::database::{Database, map_tr_err};

const COURSE_COLUMNS: &str = "id, code, name, description, created_by, is_active,
     knowledge_version, created_at, updated_at";

fn course_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_by: row.get(4)?,
        is_active: row.get(5)?,
        knowledge_version: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Create a new course.
pub async fn create_course(db: &Database, course: &Course) -> Result<(), ScholarError> {
    let course = course.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO courses (id, code, name, description, created_by, is_active,
                     knowledge_version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    course.id,
                    course.code,
                    course.name,
                    course.description,
                    course.created_by,
                    course.is_active,
                    course.knowledge_version,
                    course.created_at,
                    course.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a course by ID.
pub async fn get_course(db: &Database, id: &str) -> Result<Option<Course>, ScholarError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"),
                params![id],
                course_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Get a course by its unique code.
pub async fn get_course_by_code(db: &Database, code: &str) -> Result<Option<Course>, ScholarError> {
    let code = code.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE code = ?1"),
                params![code],
                course_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All courses ordered by code.
pub async fn list_courses(db: &Database) -> Result<Vec<Course>, ScholarError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY code"))?;
            let rows = stmt.query_map([], course_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// The persisted knowledge version, or `None` if the course does not exist.
pub async fn knowledge_version(db: &Database, course_id: &str) -> Result<Option<i64>, ScholarError> {
    let course_id = course_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT knowledge_version FROM courses WHERE id = ?1",
                params![course_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Bump a course's knowledge version inside an open transaction.
pub(crate) fn bump_version(
    tx: &rusqlite::Transaction<'_>,
    course_id: &str,
    now: &str,
) -> rusqlite::Result<i64> {
    tx.query_row(
        "UPDATE courses SET knowledge_version = knowledge_version + 1, updated_at = ?1
         WHERE id = ?2 RETURNING knowledge_version",
        params![now, course_id],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{make_course, setup_db};

    #[tokio::test]
    async fn create_and_lookup_by_id_and_code() {
        let (db, _dir) = setup_db().await;
        let mut course = make_course("cs101");
        course.description = Some("Intro to CS".to_string());
        create_course(&db, &course).await.unwrap();

        let by_id = get_course(&db, "cs101").await.unwrap().unwrap();
        assert_eq!(by_id, course);
        let by_code = get_course_by_code(&db, "CS101").await.unwrap().unwrap();
        assert_eq!(by_code.id, "cs101");
        assert!(get_course(&db, "math200").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let (db, _dir) = setup_db().await;
        create_course(&db, &make_course("cs101")).await.unwrap();
        let mut clash = make_course("other");
        clash.code = "CS101".to_string();
        assert!(create_course(&db, &clash).await.is_err());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn version_starts_at_zero_and_unknown_is_none() {
        let (db, _dir) = setup_db().await;
        create_course(&db, &make_course("cs101")).await.unwrap();
        assert_eq!(knowledge_version(&db, "cs101").await.unwrap(), Some(0));
        assert_eq!(knowledge_version(&db, "nope").await.unwrap(), None);
        assert_eq!(list_courses(&db).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }
}
