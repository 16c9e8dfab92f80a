// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use strata_core::{
	Block, PendingRowsetGuard, ReaderContext, RowsetMeta, RowsetWriterContext, SegmentsOverlap, TabletSchema,
	Version, WriteType,
	interface::{RowsetReader, RowsetWriter, StorageEngine, Tablet},
};
use tracing::{debug, instrument, warn};

use super::{
	ProcessStats,
	merger::{merge_blocks, merge_rowsets},
};
use crate::{
	changer::BlockChanger,
	config::SchemaChangeConfig,
	error::{Result, SchemaChangeError},
};

/// Bytes held by buffered blocks.
#[derive(Debug, Default)]
struct MemTracker {
	consumption: usize,
	peak: usize,
}

impl MemTracker {
	fn consume(&mut self, bytes: usize) {
		self.consumption += bytes;
		self.peak = self.peak.max(self.consumption);
	}

	fn release_all(&mut self) {
		self.consumption = 0;
	}

	fn consumption(&self) -> usize {
		self.consumption
	}
}

/// Converts into sorted intermediate rowsets bounded by a memory budget, then
/// merges them into the destination.
pub struct SchemaChangeWithSorting<'a> {
	pub(super) changer: &'a BlockChanger,
	pub(super) stats: ProcessStats,
	engine: &'a dyn StorageEngine,
	memory_limitation: usize,
	hold_block_bytes: usize,
	block_rows: usize,
	next_temp_version: u64,
	src_rowsets: Vec<RowsetMeta>,
	pending_rs_guards: Vec<PendingRowsetGuard>,
	mem_tracker: MemTracker,
}

impl<'a> SchemaChangeWithSorting<'a> {
	pub fn new(changer: &'a BlockChanger, engine: &'a dyn StorageEngine, config: &SchemaChangeConfig) -> Self {
		Self {
			changer,
			stats: ProcessStats::default(),
			engine,
			memory_limitation: config.memory_limitation_per_thread_bytes,
			hold_block_bytes: config.hold_block_bytes(),
			block_rows: config.block_rows,
			next_temp_version: 0,
			src_rowsets: Vec::new(),
			pending_rs_guards: Vec::new(),
			mem_tracker: MemTracker::default(),
		}
	}

	#[instrument(name = "schema_change::sorting::inner_process", level = "debug", skip_all, fields(limit = self.memory_limitation))]
	pub(super) fn inner_process(
		&mut self,
		reader: &mut dyn RowsetReader,
		writer: &mut dyn RowsetWriter,
		new_tablet: &dyn Tablet,
		new_schema: &Arc<TabletSchema>,
	) -> Result<()> {
		let source = reader.rowset().clone();
		self.src_rowsets.clear();
		self.pending_rs_guards.clear();
		self.mem_tracker.release_all();

		let mut blocks: Vec<Block> = Vec::new();
		while let Some(ref_block) = reader.next_block()? {
			let changed = self.changer.change_block(&ref_block)?;
			self.stats.filtered_rows += changed.filtered_rows;
			let new_block = changed.block;
			if new_block.is_empty() {
				continue;
			}

			let block_bytes = new_block.allocated_bytes();
			if self.mem_tracker.consumption() + block_bytes > self.hold_block_bytes {
				self.create_rowset(&mut blocks, &source, new_tablet, new_schema)?;

				if self.mem_tracker.consumption() + block_bytes > self.memory_limitation {
					warn!(
						limit = self.memory_limitation,
						block_bytes,
						consumption = self.mem_tracker.consumption(),
						"memory limitation is too small for schema change"
					);
					return Err(SchemaChangeError::MemoryLimitExceeded {
						limit: self.memory_limitation,
						block_bytes,
						consumption: self.mem_tracker.consumption(),
					});
				}
			}

			self.mem_tracker.consume(block_bytes);
			blocks.push(new_block);
		}

		self.create_rowset(&mut blocks, &source, new_tablet, new_schema)?;

		if self.src_rowsets.is_empty() {
			writer.flush()?;
		} else {
			self.external_sorting(writer, new_tablet, new_schema)?;
		}
		Ok(())
	}

	/// Spills the buffered blocks into one sorted intermediate rowset.
	fn create_rowset(
		&mut self,
		blocks: &mut Vec<Block>,
		source: &RowsetMeta,
		new_tablet: &dyn Tablet,
		new_schema: &Arc<TabletSchema>,
	) -> Result<()> {
		if blocks.is_empty() {
			return Ok(());
		}

		let version = Version::new(self.next_temp_version, self.next_temp_version + 1);
		let rowset = self.internal_sorting(blocks, version, source.newest_write_timestamp, new_tablet, new_schema)?;
		debug!(rowset = %rowset.rowset_id, rows = rowset.num_rows, version = %version, "spilled intermediate rowset");

		self.src_rowsets.push(rowset);
		self.next_temp_version += 2;
		self.mem_tracker.release_all();
		blocks.clear();
		Ok(())
	}

	fn internal_sorting(
		&mut self,
		blocks: &[Block],
		version: Version,
		newest_write_timestamp: i64,
		new_tablet: &dyn Tablet,
		new_schema: &Arc<TabletSchema>,
	) -> Result<RowsetMeta> {
		let mut context = RowsetWriterContext::new(new_tablet.tablet_id(), version, Arc::clone(new_schema));
		context.segments_overlap = SegmentsOverlap::NonOverlapping;
		context.newest_write_timestamp = newest_write_timestamp;
		context.write_type = WriteType::SchemaChange;

		let mut rowset_writer = new_tablet.create_rowset_writer(context.clone())?;
		// never added to the tablet, pinned until merged
		self.pending_rs_guards.push(self.engine.add_pending_rowset(&context));

		self.stats.merged_rows += merge_blocks(new_schema, blocks, rowset_writer.as_mut(), self.block_rows)?;
		rowset_writer.flush()?;
		self.stats.writer_filtered_rows += rowset_writer.num_rows_filtered();
		Ok(rowset_writer.build()?)
	}

	fn external_sorting(
		&mut self,
		writer: &mut dyn RowsetWriter,
		new_tablet: &dyn Tablet,
		new_schema: &Arc<TabletSchema>,
	) -> Result<()> {
		let mut readers = Vec::with_capacity(self.src_rowsets.len());
		for rowset in &self.src_rowsets {
			let mut context = ReaderContext::new(Arc::clone(new_schema));
			context.batch_size = self.block_rows;
			readers.push(new_tablet.create_rowset_reader(rowset, context)?);
		}

		let merged = merge_rowsets(new_schema, readers, writer, self.block_rows)?;
		self.stats.merged_rows += merged.merged_rows;
		self.stats.filtered_rows += merged.filtered_rows;
		writer.flush()?;

		debug!(
			runs = self.src_rowsets.len(),
			merged_rows = merged.merged_rows,
			peak_bytes = self.mem_tracker.peak,
			"merged intermediate rowsets"
		);
		self.src_rowsets.clear();
		self.pending_rs_guards.clear();
		Ok(())
	}
}
