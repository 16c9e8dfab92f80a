// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

//! In-memory implementations of the storage interfaces for tests.

mod engine;
mod evaluator;
pub mod fixture;
mod logging;
mod reader;
mod store;
mod tablet;
mod writer;

pub use engine::MemoryStorageEngine;
pub use evaluator::ClosureEvaluator;
pub use logging::init_tracing;
pub use reader::MemoryRowsetReader;
pub use store::{RowsetStore, StoredRowset};
pub use tablet::MemoryTablet;
pub use writer::MemoryRowsetWriter;
