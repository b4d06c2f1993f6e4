// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Scholar integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockEngine`] - Reasoning engine with call counters, scripted failures, and latency
//! - [`MemoryObjectStore`] - In-memory object store
//! - [`TestHarness`] - Temp SQLite storage wired to the mocks with prompts configured

pub mod harness;
pub mod memory_objects;
pub mod mock_engine;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_objects::MemoryObjectStore;
pub use mock_engine::{EngineOp, MockEngine, ScriptedFailure};
