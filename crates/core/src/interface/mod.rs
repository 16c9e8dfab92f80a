// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Narrow interfaces of the storage layer consumed by the schema change engine.

mod engine;
mod evaluator;
mod rowset;
mod tablet;

pub use engine::StorageEngine;
pub use evaluator::ExprEvaluator;
pub use rowset::{RowsetReader, RowsetWriter};
pub use tablet::{Tablet, TabletState};
