// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use crate::{
	common::{RowsetId, TabletId, Version},
	delete::DeletePredicate,
	schema::TabletSchema,
};

/// Whether the segments of a rowset may contain interleaving keys.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum SegmentsOverlap {
	#[default]
	Unknown,
	Overlapping,
	NonOverlapping,
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum WriteType {
	#[default]
	Load,
	SchemaChange,
}

/// Immutable description of a committed rowset.
#[derive(Clone, Debug, PartialEq)]
pub struct RowsetMeta {
	pub rowset_id: RowsetId,
	pub tablet_id: TabletId,
	pub version: Version,
	pub num_rows: u64,
	pub segments_overlap: SegmentsOverlap,
	pub newest_write_timestamp: i64,
	pub delete_predicate: Option<DeletePredicate>,
}

impl RowsetMeta {
	pub fn is_empty(&self) -> bool {
		self.num_rows == 0
	}
}

#[derive(Clone, Debug)]
pub struct RowsetWriterContext {
	pub rowset_id: RowsetId,
	pub tablet_id: TabletId,
	pub version: Version,
	pub schema: Arc<TabletSchema>,
	pub segments_overlap: SegmentsOverlap,
	pub newest_write_timestamp: i64,
	pub delete_predicate: Option<DeletePredicate>,
	pub write_type: WriteType,
}

impl RowsetWriterContext {
	pub fn new(tablet_id: TabletId, version: Version, schema: Arc<TabletSchema>) -> Self {
		Self {
			rowset_id: RowsetId::new(),
			tablet_id,
			version,
			schema,
			segments_overlap: SegmentsOverlap::default(),
			newest_write_timestamp: 0,
			delete_predicate: None,
			write_type: WriteType::default(),
		}
	}
}

#[derive(Clone, Debug)]
pub struct ReaderContext {
	/// Schema the rowset is read with.
	pub schema: Arc<TabletSchema>,
	/// Delete conditions the reader applies before handing out blocks.
	pub delete_predicates: Vec<DeletePredicate>,
	pub batch_size: usize,
}

impl ReaderContext {
	pub const DEFAULT_BATCH_SIZE: usize = 4096;

	pub fn new(schema: Arc<TabletSchema>) -> Self {
		Self {
			schema,
			delete_predicates: Vec::new(),
			batch_size: Self::DEFAULT_BATCH_SIZE,
		}
	}
}
