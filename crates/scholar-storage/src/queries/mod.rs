// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod course_files;
pub mod courses;
pub mod messages;
pub mod sessions;
pub mod shared_assistants;
