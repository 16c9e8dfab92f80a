// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use strata_core::{
	Block, ReaderContext, Result, RowsetMeta,
	interface::{ExprEvaluator, RowsetReader},
};

use crate::store::StoredRowset;

/// Reads a stored rowset in batches. Rows matching a delete predicate of the
/// context are dropped and counted as filtered.
pub struct MemoryRowsetReader {
	meta: RowsetMeta,
	stored: Arc<StoredRowset>,
	context: ReaderContext,
	evaluator: Arc<dyn ExprEvaluator>,
	block: usize,
	offset: usize,
	filtered_rows: u64,
}

impl MemoryRowsetReader {
	pub fn new(
		meta: RowsetMeta,
		stored: Arc<StoredRowset>,
		context: ReaderContext,
		evaluator: Arc<dyn ExprEvaluator>,
	) -> Self {
		Self {
			meta,
			stored,
			context,
			evaluator,
			block: 0,
			offset: 0,
			filtered_rows: 0,
		}
	}

	fn next_batch(&mut self) -> Option<Block> {
		loop {
			let block = self.stored.blocks.get(self.block)?;
			let rows = block.row_count();
			if self.offset >= rows {
				self.block += 1;
				self.offset = 0;
				continue;
			}

			let end = rows.min(self.offset + self.context.batch_size.max(1));
			let batch = if self.offset == 0 && end == rows {
				block.clone()
			} else {
				block.take(&(self.offset..end).collect::<Vec<_>>())
			};
			self.offset = end;
			return Some(batch);
		}
	}

	/// Adopted rowsets keep the column names they were written with.
	fn rename_columns(&self, block: &mut Block) {
		let schema = &self.context.schema;
		if block.column_count() != schema.num_columns() {
			return;
		}
		for (column, def) in block.columns.iter_mut().zip(schema.columns()) {
			if column.name != def.name {
				column.name = def.name.clone();
			}
		}
	}

	fn apply_delete_predicates(&mut self, block: Block) -> Result<Block> {
		if self.context.delete_predicates.is_empty() {
			return Ok(block);
		}

		let mut keep = vec![true; block.row_count()];
		for predicate in &self.context.delete_predicates {
			let matched = self.evaluator.filter(&predicate.expr, &block)?;
			for (keep, matched) in keep.iter_mut().zip(matched) {
				if matched {
					*keep = false;
				}
			}
		}

		let kept = keep.iter().filter(|keep| **keep).count();
		self.filtered_rows += (block.row_count() - kept) as u64;
		if kept == block.row_count() {
			Ok(block)
		} else {
			Ok(block.filter(&keep))
		}
	}
}

impl RowsetReader for MemoryRowsetReader {
	fn rowset(&self) -> &RowsetMeta {
		&self.meta
	}

	fn next_block(&mut self) -> Result<Option<Block>> {
		let Some(mut block) = self.next_batch() else {
			return Ok(None);
		};
		self.rename_columns(&mut block);
		self.apply_delete_predicates(block).map(Some)
	}

	fn filtered_rows(&self) -> u64 {
		self.filtered_rows
	}
}
