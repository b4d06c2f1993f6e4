// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem-backed object store and the object path conventions for course files.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scholar_core::{
    AdapterType, FileClassification, HealthStatus, ObjectStore, PluginAdapter, ScholarError,
};
use tokio::io::AsyncWriteExt;
use tracing::debug;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-.]").unwrap());
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

/// Reduce an uploaded file name to a safe object-store key segment.
///
/// Characters outside `[A-Za-z0-9_.-]` become `_`, runs of `_` collapse, and
/// leading/trailing `_` are dropped from the stem. The extension is kept.
/// An empty stem becomes `file`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = match base.rfind('.') {
        Some(idx) if idx > 0 => (&base[..idx], Some(&base[idx + 1..])),
        _ => (base, None),
    };

    let clean = |part: &str| {
        let replaced = UNSAFE_CHARS.replace_all(part, "_");
        UNDERSCORE_RUNS
            .replace_all(&replaced, "_")
            .trim_matches('_')
            .to_string()
    };

    let mut stem = clean(stem);
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        stem = "file".to_string();
    }
    match ext.map(clean).filter(|e| !e.is_empty()) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

/// Object path for a course file: `courses/{course_id}/{behavior|content}/{sanitized}`.
pub fn course_object_path(
    course_id: &str,
    classification: FileClassification,
    sanitized_name: &str,
) -> String {
    format!(
        "courses/{course_id}/{}/{sanitized_name}",
        classification.folder()
    )
}

/// Object store rooted at a local directory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an object path under the root, rejecting absolute paths and `..`.
    fn resolve(&self, path: &str) -> Result<PathBuf, ScholarError> {
        let rel = Path::new(path);
        if path.is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ScholarError::Validation(format!(
                "invalid object path `{path}`"
            )));
        }
        Ok(self.root.join(rel))
    }
}

fn io_err(e: std::io::Error) -> ScholarError {
    ScholarError::Storage {
        source: Box::new(e),
    }
}

fn exists_err(e: std::io::Error, path: &str) -> ScholarError {
    if e.kind() == std::io::ErrorKind::AlreadyExists {
        ScholarError::AlreadyExists {
            entity: "object",
            id: path.to_string(),
        }
    } else {
        io_err(e)
    }
}

#[async_trait]
impl PluginAdapter for FsObjectStore {
    fn name(&self) -> &str {
        "fs-objects"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ObjectStore
    }

    async fn health_check(&self) -> Result<HealthStatus, ScholarError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HealthStatus::Degraded(
                format!("{} does not exist yet", self.root.display()),
            )),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), ScholarError> {
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), ScholarError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| exists_err(e, path))?;
        file.write_all(&bytes).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        debug!(path, bytes = bytes.len(), "object written");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, ScholarError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScholarError::NotFound {
                entity: "object",
                id: path.to_string(),
            }),
            Err(e) => Err(io_err(e)),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), ScholarError> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(e)),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), ScholarError> {
        if from == to {
            return Ok(());
        }
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        // A hard link fails on an existing destination, unlike rename(2).
        match tokio::fs::hard_link(&src, &dst).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScholarError::NotFound {
                    entity: "object",
                    id: from.to_string(),
                });
            }
            Err(e) => return Err(exists_err(e, to)),
        }
        tokio::fs::remove_file(&src).await.map_err(io_err)

    }
}
