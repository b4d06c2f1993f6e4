// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external collaborators of the core.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod engine;
pub mod objects;
pub mod storage;

pub use adapter::PluginAdapter;
pub use engine::ReasoningEngine;
pub use objects::ObjectStore;
pub use storage::StorageAdapter;
