// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for the Scholar assistant platform.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`, plus a filesystem
//! object store for raw course file bytes.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod objects;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use objects::{FsObjectStore, course_object_path, sanitize_file_name};
