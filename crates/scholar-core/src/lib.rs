// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Scholar assistant platform.
//!
//! This crate provides the domain types, the error taxonomy, and the adapter
//! traits for the relational store, object store, and reasoning engine that
//! the knowledge and agent crates are written against.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ScholarError;
pub use types::{
    AdapterType, AssistantKind, AssistantSpec, ChatSession, Course, CourseFile,
    FileClassification, HealthStatus, Message, MessageRole, MessageSource, SeedMessage,
    SessionKey, TurnReply, now_timestamp,
};

pub use traits::{ObjectStore, PluginAdapter, ReasoningEngine, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::ObjectStore,
            AdapterType::Engine,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        assert_eq!(HealthStatus::Healthy, HealthStatus::Healthy);
        assert_ne!(HealthStatus::Degraded("slow".into()), HealthStatus::Healthy);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_object_store<T: ObjectStore>() {}
        fn _assert_reasoning_engine<T: ReasoningEngine>() {}
    }

    #[test]
    fn traits_are_object_safe() {
        fn _dyn_storage(_: &dyn StorageAdapter) {}
        fn _dyn_objects(_: &dyn ObjectStore) {}
        fn _dyn_engine(_: &dyn ReasoningEngine) {}
    }
}
