// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_core::{
	TabletSchema,
	interface::{RowsetReader, RowsetWriter},
};
use tracing::trace;

use super::ProcessStats;
use crate::{changer::BlockChanger, error::Result};

/// Converts block by block, preserving the source row order.
pub struct SchemaChangeDirectly<'a> {
	pub(super) changer: &'a BlockChanger,
	pub(super) stats: ProcessStats,
}

impl<'a> SchemaChangeDirectly<'a> {
	pub fn new(changer: &'a BlockChanger) -> Self {
		Self {
			changer,
			stats: ProcessStats::default(),
		}
	}

	pub(super) fn inner_process(
		&mut self,
		reader: &mut dyn RowsetReader,
		writer: &mut dyn RowsetWriter,
		base_schema: &TabletSchema,
	) -> Result<()> {
		while let Some(ref_block) = reader.next_block()? {
			if ref_block.column_count() != base_schema.num_columns() {
				return Err(strata_core::Error::InvalidSchema(format!(
					"block has {} columns, base schema has {}",
					ref_block.column_count(),
					base_schema.num_columns()
				))
				.into());
			}

			let changed = self.changer.change_block(&ref_block)?;
			self.stats.filtered_rows += changed.filtered_rows;
			if !changed.block.is_empty() {
				writer.add_block(&changed.block)?;
			}
			trace!(rows = changed.block.row_count(), "wrote block");
		}

		writer.flush()?;
		Ok(())
	}
}
