// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{io, mem};

use strata_core::{Block, Error, Result, RowsetMeta, RowsetWriterContext, interface::RowsetWriter};
use tracing::trace;

use crate::store::{RowsetStore, StoredRowset};

/// Buffers blocks and publishes them to the store on build. Rows with a null
/// key are refused and counted as filtered.
pub struct MemoryRowsetWriter {
	context: RowsetWriterContext,
	store: RowsetStore,
	blocks: Vec<Block>,
	num_rows: u64,
	num_rows_filtered: u64,
	fail_writes: bool,
	built: bool,
}

impl MemoryRowsetWriter {
	pub fn new(context: RowsetWriterContext, store: RowsetStore, fail_writes: bool) -> Self {
		Self {
			context,
			store,
			blocks: Vec::new(),
			num_rows: 0,
			num_rows_filtered: 0,
			fail_writes,
			built: false,
		}
	}

	fn check_open(&self) -> Result<()> {
		if self.built {
			return Err(Error::WriterClosed(self.context.rowset_id));
		}
		Ok(())
	}
}

impl RowsetWriter for MemoryRowsetWriter {
	fn context(&self) -> &RowsetWriterContext {
		&self.context
	}

	fn add_block(&mut self, block: &Block) -> Result<()> {
		self.check_open()?;
		if self.fail_writes {
			return Err(io::Error::other(format!("injected write failure at version {}", self.context.version)).into());
		}

		let num_key_columns = self.context.schema.num_key_columns();
		let keep: Vec<bool> = (0..block.row_count())
			.map(|row| block.columns.iter().take(num_key_columns).all(|column| !column.data.get(row).is_null()))
			.collect();
		let kept = keep.iter().filter(|keep| **keep).count();
		self.num_rows_filtered += (block.row_count() - kept) as u64;
		self.num_rows += kept as u64;

		if kept == block.row_count() {
			self.blocks.push(block.clone());
		} else if kept > 0 {
			self.blocks.push(block.filter(&keep));
		}
		Ok(())
	}

	fn flush(&mut self) -> Result<()> {
		self.check_open()
	}

	fn add_rowset_for_linked_schema_change(&mut self, rowset: &RowsetMeta) -> Result<()> {
		self.check_open()?;
		let stored = self.store.get(rowset.rowset_id).ok_or(Error::RowsetNotFound(rowset.rowset_id))?;
		self.blocks.extend(stored.blocks.iter().cloned());
		self.num_rows += rowset.num_rows;
		Ok(())
	}

	fn num_rows(&self) -> u64 {
		self.num_rows
	}

	fn num_rows_filtered(&self) -> u64 {
		self.num_rows_filtered
	}

	fn build(&mut self) -> Result<RowsetMeta> {
		self.check_open()?;
		self.built = true;

		let meta = RowsetMeta {
			rowset_id: self.context.rowset_id,
			tablet_id: self.context.tablet_id,
			version: self.context.version,
			num_rows: self.num_rows,
			segments_overlap: self.context.segments_overlap,
			newest_write_timestamp: self.context.newest_write_timestamp,
			delete_predicate: self.context.delete_predicate.clone(),
		};
		self.store.insert(StoredRowset {
			meta: meta.clone(),
			blocks: mem::take(&mut self.blocks),
		});
		trace!(rowset = %meta.rowset_id, rows = meta.num_rows, version = %meta.version, "built rowset");
		Ok(meta)
	}
}
