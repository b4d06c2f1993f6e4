// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge Store Index: the classified file set of each course.
//!
//! Entries are cached per course and tagged with the course's persisted
//! knowledge version. Every read checks that version (one row) and reloads
//! the entry when it moved, so changes made by other writers are observed.
//! File mutations go through the index so the object store, the file rows,
//! and the version stay in step.

use std::sync::Arc;

use dashmap::DashMap;
use scholar_core::{
    CourseFile, FileClassification, ObjectStore, ScholarError, StorageAdapter, now_timestamp,
};
use scholar_storage::{course_object_path, sanitize_file_name};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Object name qualified by the file id, for when the plain name is taken.
fn prefixed_name(file_id: &str, object_name: &str) -> String {
    let prefix = file_id.get(..8).unwrap_or(file_id);
    format!("{prefix}_{object_name}")
}

/// A course's files split by classification, each group in upload order.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeIndexEntry {
    pub course_id: String,
    pub behavior: Vec<CourseFile>,
    pub content: Vec<CourseFile>,
    pub version: i64,
}

impl KnowledgeIndexEntry {
    fn from_files(course_id: &str, files: Vec<CourseFile>, version: i64) -> Self {
        let (behavior, content): (Vec<_>, Vec<_>) = files
            .into_iter()
            .partition(|f| f.classification == FileClassification::Behavior);
        Self {
            course_id: course_id.to_string(),
            behavior,
            content,
            version,
        }
    }

    /// Behavior files, then content files.
    pub fn files(&self) -> impl Iterator<Item = &CourseFile> {
        self.behavior.iter().chain(self.content.iter())
    }

    pub fn len(&self) -> usize {
        self.behavior.len() + self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An upload to add to a course.
#[derive(Debug, Clone)]
pub struct NewCourseFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub classification: FileClassification,
    pub uploaded_by: String,
}

/// Hex SHA-256 of file bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Cached, version-checked view of every course's file set.
pub struct KnowledgeIndex {
    storage: Arc<dyn StorageAdapter>,
    objects: Arc<dyn ObjectStore>,
    cache: DashMap<String, Arc<KnowledgeIndexEntry>>,
}

impl KnowledgeIndex {
    pub fn new(storage: Arc<dyn StorageAdapter>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            storage,
            objects,
            cache: DashMap::new(),
        }
    }

    /// The latest committed file set of a course.
    pub async fn get_index(&self, course_id: &str) -> Result<Arc<KnowledgeIndexEntry>, ScholarError> {
        let version = self
            .storage
            .knowledge_version(course_id)
            .await?
            .ok_or_else(|| ScholarError::NotFound {
                entity: "course",
                id: course_id.to_string(),
            })?;

        if let Some(cached) = self.cache.get(course_id)
            && cached.version == version
        {
            return Ok(cached.clone());
        }

        // Files are read after the version, so the set is never older than its tag.
        let files = self.storage.list_course_files(course_id).await?;
        let entry = Arc::new(KnowledgeIndexEntry::from_files(course_id, files, version));
        debug!(
            course_id,
            version,
            behavior = entry.behavior.len(),
            content = entry.content.len(),
            "knowledge index loaded"
        );
        self.cache.insert(course_id.to_string(), entry.clone());
        Ok(entry)
    }

    /// Drops the cached entry for a course.
    pub fn invalidate(&self, course_id: &str) {
        self.cache.remove(course_id);
    }

    /// Patches a freshly recorded engine handle into the cached entry.
    /// The version is unchanged: the file set itself did not move.
    pub fn record_handle(&self, course_id: &str, file_id: &str, handle: &str) {
        if let Some(mut entry) = self.cache.get_mut(course_id) {
            let patched = Arc::make_mut(entry.value_mut());
            for file in patched.behavior.iter_mut().chain(patched.content.iter_mut()) {
                if file.id == file_id && file.engine_file_id.is_none() {
                    file.engine_file_id = Some(handle.to_string());
                }
            }
        }
    }

    /// Stores the bytes and inserts the file row, bumping the course's version.
    pub async fn add_file(
        &self,
        course_id: &str,
        upload: NewCourseFile,
    ) -> Result<CourseFile, ScholarError> {
        if upload.file_name.trim().is_empty() {
            return Err(ScholarError::Validation("file name must not be empty".into()));
        }
        if upload.bytes.is_empty() {
            return Err(ScholarError::Validation(format!(
                "file `{}` is empty",
                upload.file_name
            )));
        }
        let existing = self.get_index(course_id).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let object_name = sanitize_file_name(&upload.file_name);
        let fallback = course_object_path(
            course_id,
            upload.classification,
            &prefixed_name(&id, &object_name),
        );
        let mut storage_path = course_object_path(course_id, upload.classification, &object_name);
        if existing.files().any(|f| f.storage_path == storage_path) {
            storage_path = fallback.clone();
        }

        let file_size = upload.bytes.len() as i64;
        let content_sha256 = content_hash(&upload.bytes);
        if storage_path == fallback {
            self.objects.put(&storage_path, upload.bytes).await?;
        } else {
            match self.objects.put(&storage_path, upload.bytes.clone()).await {
                Ok(()) => {}
                Err(ScholarError::AlreadyExists { .. }) => {
                    debug!(course_id, path = %storage_path, "object path taken, using id prefix");
                    storage_path = fallback;
                    self.objects.put(&storage_path, upload.bytes).await?;
                }
                Err(e) => return Err(e),
            }
        }

        let file = CourseFile {
            id,
            course_id: course_id.to_string(),
            file_name: upload.file_name,
            storage_path,
            file_size,
            classification: upload.classification,
            content_sha256,
            engine_file_id: None,
            uploaded_by: upload.uploaded_by,
            uploaded_at: now_timestamp(),
        };

        let version = match self.storage.insert_course_file(&file).await {
            Ok(version) => version,
            Err(e) => {
                if let Err(cleanup) = self.objects.delete(&file.storage_path).await {
                    warn!(path = %file.storage_path, error = %cleanup, "orphaned object after failed insert");
                }
                return Err(e);
            }
        };
        self.invalidate(course_id);

        info!(
            course_id,
            file_id = %file.id,
            classification = %file.classification,
            version,
            "course file added"
        );
        Ok(file)
    }

    /// Deletes the file row, then its object. Returns the removed row.
    pub async fn remove_file(&self, file_id: &str) -> Result<CourseFile, ScholarError> {
        let file = self.require_file(file_id).await?;
        let version = self
            .storage
            .delete_course_file(file_id)
            .await?
            .ok_or_else(|| ScholarError::NotFound {
                entity: "course file",
                id: file_id.to_string(),
            })?;
        self.invalidate(&file.course_id);

        if let Err(e) = self.objects.delete(&file.storage_path).await {
            warn!(path = %file.storage_path, error = %e, "failed to delete object for removed file");
        }

        info!(course_id = %file.course_id, file_id, version, "course file removed");
        Ok(file)
    }

    /// Moves a file to the other classification.
    ///
    /// The object moves to the matching folder and the version is bumped.
    /// Reclassifying to the current classification changes nothing.
    pub async fn reclassify_file(
        &self,
        file_id: &str,
        classification: &str,
    ) -> Result<CourseFile, ScholarError> {
        let classification = FileClassification::parse(classification)?;
        let mut file = self.require_file(file_id).await?;
        if file.classification == classification {
            return Ok(file);
        }

        let object_name = file
            .storage_path
            .rsplit('/')
            .next()
            .unwrap_or(&file.storage_path)
            .to_string();
        let fallback = course_object_path(
            &file.course_id,
            classification,
            &prefixed_name(&file.id, &object_name),
        );
        let mut new_path = course_object_path(&file.course_id, classification, &object_name);
        let entry = self.get_index(&file.course_id).await?;
        if entry.files().any(|f| f.storage_path == new_path) {
            new_path = fallback.clone();
        }

        match self.objects.rename(&file.storage_path, &new_path).await {
            Ok(()) => {}
            Err(ScholarError::AlreadyExists { .. }) if new_path != fallback => {
                debug!(file_id, path = %new_path, "object path taken, using id prefix");
                new_path = fallback;
                self.objects.rename(&file.storage_path, &new_path).await?;
            }
            Err(e) => return Err(e),
        }
        let version = match self
            .storage
            .reclassify_course_file(file_id, classification, &new_path)
            .await
        {
            Ok(version) => version,
            Err(e) => {
                if let Err(undo) = self.objects.rename(&new_path, &file.storage_path).await {
                    warn!(file_id, error = %undo, "failed to move object back after reclassify error");
                }
                return Err(e);
            }
        };
        self.invalidate(&file.course_id);

        info!(
            course_id = %file.course_id,
            file_id,
            from = %file.classification,
            to = %classification,
            version,
            "course file reclassified"
        );
        file.classification = classification;
        file.storage_path = new_path;
        Ok(file)
    }

    async fn require_file(&self, file_id: &str) -> Result<CourseFile, ScholarError> {
        self.storage
            .get_course_file(file_id)
            .await?
            .ok_or_else(|| ScholarError::NotFound {
                entity: "course file",
                id: file_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_test_utils::TestHarness;

    fn upload(name: &str, class: FileClassification) -> NewCourseFile {
        NewCourseFile {
            file_name: name.to_string(),
            bytes: format!("%PDF {name}").into_bytes(),
            classification: class,
            uploaded_by: "admin-1".to_string(),
        }
    }

    fn index_for(harness: &TestHarness) -> KnowledgeIndex {
        KnowledgeIndex::new(harness.storage.clone(), harness.objects.clone())
    }

    #[tokio::test]
    async fn add_file_classifies_and_bumps_version() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let index = index_for(&harness);

        assert_eq!(index.get_index(&course.id).await.unwrap().version, 0);

        let b1 = index
            .add_file(&course.id, upload("Rules.pdf", FileClassification::Behavior))
            .await
            .unwrap();
        let c1 = index
            .add_file(&course.id, upload("Week 1 notes.pdf", FileClassification::Content))
            .await
            .unwrap();

        assert_eq!(
            b1.storage_path,
            format!("courses/{}/behavior/Rules.pdf", course.id)
        );
        assert_eq!(
            c1.storage_path,
            format!("courses/{}/content/Week_1_notes.pdf", course.id)
        );
        assert_eq!(c1.content_sha256, content_hash(b"%PDF Week 1 notes.pdf"));
        assert!(harness.objects.contains(&c1.storage_path).await);

        let entry = index.get_index(&course.id).await.unwrap();
        assert_eq!(entry.version, 2);
        assert_eq!(entry.behavior, vec![b1]);
        assert_eq!(entry.content, vec![c1]);
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let harness = TestHarness::new().await.unwrap();
        let index = index_for(&harness);
        let err = index.get_index("missing").await.unwrap_err();
        assert!(matches!(err, ScholarError::NotFound { entity: "course", .. }));
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let index = index_for(&harness);
        let mut empty = upload("a.pdf", FileClassification::Content);
        empty.bytes.clear();
        let err = index.add_file(&course.id, empty).await.unwrap_err();
        assert!(matches!(err, ScholarError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_names_get_distinct_objects() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let index = index_for(&harness);

        let first = index
            .add_file(&course.id, upload("notes.pdf", FileClassification::Content))
            .await
            .unwrap();
        let second = index
            .add_file(&course.id, upload("notes.pdf", FileClassification::Content))
            .await
            .unwrap();
        assert_ne!(first.storage_path, second.storage_path);
        assert_eq!(harness.objects.paths().await.len(), 2);
    }

    #[tokio::test]
    async fn remove_file_deletes_row_and_object() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let index = index_for(&harness);
        let file = index
            .add_file(&course.id, upload("a.pdf", FileClassification::Content))
            .await
            .unwrap();

        index.remove_file(&file.id).await.unwrap();

        let entry = index.get_index(&course.id).await.unwrap();
        assert!(entry.is_empty());
        assert_eq!(entry.version, 2);
        assert!(!harness.objects.contains(&file.storage_path).await);

        let err = index.remove_file(&file.id).await.unwrap_err();
        assert!(matches!(err, ScholarError::NotFound { .. }));
    }

    #[tokio::test]
    async fn reclassify_moves_object_and_bumps_version() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let index = index_for(&harness);
        let file = index
            .add_file(&course.id, upload("syllabus.pdf", FileClassification::Content))
            .await
            .unwrap();

        let moved = index.reclassify_file(&file.id, "behavior").await.unwrap();
        assert_eq!(moved.classification, FileClassification::Behavior);
        assert_eq!(
            moved.storage_path,
            format!("courses/{}/behavior/syllabus.pdf", course.id)
        );
        assert!(harness.objects.contains(&moved.storage_path).await);
        assert!(!harness.objects.contains(&file.storage_path).await);

        let entry = index.get_index(&course.id).await.unwrap();
        assert_eq!(entry.version, 2);
        assert_eq!(entry.behavior.len(), 1);
        assert!(entry.content.is_empty());

        // Same classification: no move, no bump.
        index.reclassify_file(&file.id, "behavior").await.unwrap();
        assert_eq!(index.get_index(&course.id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn reclassify_onto_taken_name_keeps_both_objects() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let index = index_for(&harness);
        let mut behavior = upload("notes.pdf", FileClassification::Behavior);
        behavior.bytes = b"BEHAVIOR".to_vec();
        let mut content = upload("notes.pdf", FileClassification::Content);
        content.bytes = b"CONTENT".to_vec();
        let b = index.add_file(&course.id, behavior).await.unwrap();
        let c = index.add_file(&course.id, content).await.unwrap();

        let moved = index.reclassify_file(&b.id, "content").await.unwrap();
        assert_ne!(moved.storage_path, c.storage_path);
        assert_eq!(
            moved.storage_path,
            format!("courses/{}/content/{}_notes.pdf", course.id, &b.id[..8])
        );
        assert_eq!(harness.objects.get(&c.storage_path).await.unwrap(), b"CONTENT");
        assert_eq!(
            harness.objects.get(&moved.storage_path).await.unwrap(),
            b"BEHAVIOR"
        );

        // Removing one file leaves the other's object alone.
        index.remove_file(&moved.id).await.unwrap();
        assert_eq!(harness.objects.get(&c.storage_path).await.unwrap(), b"CONTENT");
    }

    #[tokio::test]
    async fn concurrent_same_name_uploads_never_share_an_object() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let index = Arc::new(index_for(&harness));

        let uploads = (0..6).map(|i| {
            let index = index.clone();
            let course_id = course.id.clone();
            tokio::spawn(async move {
                let mut file = upload("notes.pdf", FileClassification::Content);
                file.bytes = format!("version {i}").into_bytes();
                index.add_file(&course_id, file).await.unwrap()
            })
        });
        let mut files = Vec::new();
        for task in uploads {
            files.push(task.await.unwrap());
        }

        let mut paths: Vec<_> = files.iter().map(|f| f.storage_path.clone()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 6);
        for file in &files {
            let bytes = harness.objects.get(&file.storage_path).await.unwrap();
            assert_eq!(content_hash(&bytes), file.content_sha256);
        }
    }

    #[tokio::test]
    async fn malformed_classification_is_validation_error() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let index = index_for(&harness);
        let file = index
            .add_file(&course.id, upload("a.pdf", FileClassification::Content))
            .await
            .unwrap();
        let err = index.reclassify_file(&file.id, "homework").await.unwrap_err();
        assert!(matches!(err, ScholarError::Validation(_)));
    }

    #[tokio::test]
    async fn changes_by_another_writer_are_observed() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let reader = index_for(&harness);
        let writer = index_for(&harness);

        assert!(reader.get_index(&course.id).await.unwrap().is_empty());
        writer
            .add_file(&course.id, upload("a.pdf", FileClassification::Content))
            .await
            .unwrap();

        let entry = reader.get_index(&course.id).await.unwrap();
        assert_eq!(entry.len(), 1);
        assert_eq!(entry.version, 1);
    }

    #[tokio::test]
    async fn record_handle_patches_cache_without_bumping() {
        let harness = TestHarness::new().await.unwrap();
        let course = harness.create_course("CS101", "Intro").await.unwrap();
        let index = index_for(&harness);
        let file = index
            .add_file(&course.id, upload("a.pdf", FileClassification::Content))
            .await
            .unwrap();
        index.get_index(&course.id).await.unwrap();

        index.record_handle(&course.id, &file.id, "file-9");
        let entry = index.get_index(&course.id).await.unwrap();
        assert_eq!(entry.content[0].engine_file_id.as_deref(), Some("file-9"));
        assert_eq!(entry.version, 1);
    }
}
