// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod block;
pub mod common;
pub mod delete;
pub mod error;
pub mod expr;
pub mod interface;
pub mod pending;
pub mod rowset;
pub mod schema;
pub mod value;

pub use block::{Block, Column, ColumnData};
pub use common::{ColumnId, RowsetId, TabletId, Version};
pub use delete::{DeleteBitmap, DeleteHandler, DeletePredicate};
pub use error::{Error, Result};
pub use expr::Expr;
pub use pending::{PendingRowsetGuard, PendingRowsetSet};
pub use rowset::{ReaderContext, RowsetMeta, RowsetWriterContext, SegmentsOverlap, WriteType};
pub use schema::{AggregationKind, ColumnDef, KeysType, TabletSchema};
pub use value::{OrderedF32, OrderedF64, Type, Value, format_date, parse_date};
