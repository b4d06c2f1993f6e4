// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Course knowledge for the Scholar assistant platform.
//!
//! Three layers, leaf first:
//!
//! - [`KnowledgeIndex`] - per-course classified file sets with a persisted version
//! - [`IngestionPipeline`] - registers each file with the engine exactly once
//! - [`KnowledgeAggregator`] - ordered engine handles for a course

pub mod aggregate;
pub mod index;
pub mod ingest;

use std::sync::Arc;

use scholar_config::model::IngestionConfig;
use scholar_core::{ObjectStore, ReasoningEngine, StorageAdapter};

pub use aggregate::{KnowledgeAggregator, ResolvedKnowledge};
pub use index::{KnowledgeIndex, KnowledgeIndexEntry, NewCourseFile};
pub use ingest::IngestionPipeline;

/// The knowledge layers wired together over shared adapters.
#[derive(Clone)]
pub struct CourseKnowledge {
    pub index: Arc<KnowledgeIndex>,
    pub ingestion: Arc<IngestionPipeline>,
    pub aggregator: Arc<KnowledgeAggregator>,
}

impl CourseKnowledge {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        objects: Arc<dyn ObjectStore>,
        engine: Arc<dyn ReasoningEngine>,
        config: &IngestionConfig,
    ) -> Self {
        let index = Arc::new(KnowledgeIndex::new(storage.clone(), objects.clone()));
        let ingestion = Arc::new(IngestionPipeline::new(
            storage,
            objects,
            engine,
            index.clone(),
            config.clone(),
        ));
        let aggregator = Arc::new(KnowledgeAggregator::new(index.clone(), ingestion.clone()));
        Self {
            index,
            ingestion,
            aggregator,
        }
    }
}
