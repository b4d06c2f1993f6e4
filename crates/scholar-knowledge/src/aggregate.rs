// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Course Knowledge Aggregator: the ordered engine handles for a course.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;
use scholar_core::{CourseFile, ScholarError};
use tracing::debug;

use crate::index::KnowledgeIndex;
use crate::ingest::IngestionPipeline;

/// Engine handles for a course's files, tagged with the index version they reflect.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedKnowledge {
    pub course_id: String,
    /// Behavior files first, then content files, each by upload time.
    /// Files sharing bytes share a handle, which appears once.
    pub handles: Vec<String>,
    pub version: i64,
}

pub struct KnowledgeAggregator {
    index: Arc<KnowledgeIndex>,
    ingestion: Arc<IngestionPipeline>,
}

impl KnowledgeAggregator {
    pub fn new(index: Arc<KnowledgeIndex>, ingestion: Arc<IngestionPipeline>) -> Self {
        Self { index, ingestion }
    }

    /// Resolves every file of the course to an engine handle, ingesting
    /// files that have none yet.
    pub async fn resolve(&self, course_id: &str) -> Result<ResolvedKnowledge, ScholarError> {
        let entry = self.index.get_index(course_id).await?;

        // One file per distinct content first, so duplicates reuse its handle.
        let mut hashes = HashSet::new();
        let (leaders, followers): (Vec<&CourseFile>, Vec<&CourseFile>) = entry
            .files()
            .partition(|file| hashes.insert(file.content_sha256.as_str()));

        let mut by_file = HashMap::new();
        for group in [leaders, followers] {
            let handles =
                try_join_all(group.iter().map(|file| self.ingestion.ensure_ingested(file))).await?;
            by_file.extend(group.iter().map(|&f| f.id.as_str()).zip(handles));
        }

        let mut seen = HashSet::new();
        let handles: Vec<String> = entry
            .files()
            .filter_map(|file| by_file.get(file.id.as_str()).cloned())
            .filter(|h| seen.insert(h.clone()))
            .collect();

        debug!(
            course_id,
            version = entry.version,
            behavior = entry.behavior.len(),
            content = entry.content.len(),
            handles = handles.len(),
            "course knowledge resolved"
        );
        Ok(ResolvedKnowledge {
            course_id: course_id.to_string(),
            handles,
            version: entry.version,
        })
    }
}
