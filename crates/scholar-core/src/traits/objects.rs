// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Object store trait for raw course file bytes.

use async_trait::async_trait;

use crate::error::ScholarError;
use crate::traits::adapter::PluginAdapter;

/// Path-addressed blob storage.
///
/// Paths are `/`-separated and relative (`courses/{course_id}/content/notes.pdf`).
#[async_trait]
pub trait ObjectStore: PluginAdapter {
    /// Writes `bytes` at a new `path`. An existing object is never replaced;
    /// the write fails with [`ScholarError::AlreadyExists`].
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), ScholarError>;

    /// Reads the object at `path`. Missing objects are [`ScholarError::NotFound`].
    async fn get(&self, path: &str) -> Result<Vec<u8>, ScholarError>;

    /// Deletes the object at `path`. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<(), ScholarError>;

    /// Moves an object. Renaming onto the same path is a no-op; renaming onto
    /// another existing object fails with [`ScholarError::AlreadyExists`].
    async fn rename(&self, from: &str, to: &str) -> Result<(), ScholarError>;
}
