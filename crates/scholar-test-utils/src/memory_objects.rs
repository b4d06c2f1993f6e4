// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory object store for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use scholar_core::traits::{ObjectStore, PluginAdapter};
use scholar_core::types::{AdapterType, HealthStatus};
use scholar_core::ScholarError;

/// Object store backed by a map, counting reads so tests can assert
/// that already-ingested files are never fetched again.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    gets: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored paths in lexical order.
    pub async fn paths(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    /// Number of `get` calls served so far.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MemoryObjectStore {
    fn name(&self) -> &str {
        "memory-objects"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ObjectStore
    }

    async fn health_check(&self) -> Result<HealthStatus, ScholarError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ScholarError> {
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), ScholarError> {
        let mut objects = self.objects.write().await;
        if objects.contains_key(path) {
            return Err(already_exists(path));
        }
        objects.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, ScholarError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| ScholarError::NotFound {
                entity: "object",
                id: path.to_string(),
            })
    }

    async fn delete(&self, path: &str) -> Result<(), ScholarError> {
        self.objects.write().await.remove(path);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), ScholarError> {
        if from == to {
            return Ok(());
        }
        let mut objects = self.objects.write().await;
        if objects.contains_key(to) {
            return Err(already_exists(to));
        }
        let bytes = objects.remove(from).ok_or_else(|| ScholarError::NotFound {
            entity: "object",
            id: from.to_string(),
        })?;
        objects.insert(to.to_string(), bytes);
        Ok(())
    }
}

fn already_exists(path: &str) -> ScholarError {
    ScholarError::AlreadyExists {
        entity: "object",
        id: path.to_string(),
    }
}
