// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc};

use strata_core::{DeleteBitmap, ReaderContext, RowsetId, Value};
use tracing::{info, instrument};

use super::SchemaChangeJob;
use crate::error::{Result, SchemaChangeError};

impl SchemaChangeJob {
	/// Rebuilds the delete bitmap of a merge-on-write new tablet. For every
	/// key only the row of the newest version stays visible.
	#[instrument(name = "schema_change::job::calc_delete_bitmap", level = "debug", skip(self))]
	pub(super) fn calc_delete_bitmap_for_mow_table(&self, alter_version: u64) -> Result<()> {
		let tablet_id = self.new_tablet.tablet_id();
		let bitmap = self.compute_delete_bitmap().map_err(|err| SchemaChangeError::DeleteBitmapRecomputeFailed {
			tablet: tablet_id,
			reason: err.to_string(),
		})?;

		let deleted = bitmap.cardinality();
		self.new_tablet.replace_delete_bitmap(bitmap).map_err(|err| {
			SchemaChangeError::DeleteBitmapRecomputeFailed {
				tablet: tablet_id,
				reason: err.to_string(),
			}
		})?;

		info!(tablet = %tablet_id, alter_version, deleted, "recomputed delete bitmap");
		Ok(())
	}

	fn compute_delete_bitmap(&self) -> Result<DeleteBitmap> {
		let num_key_columns = self.new_tablet_schema.num_key_columns();
		let mut rowsets = self.new_tablet.rowsets();
		rowsets.sort_by_key(|r| r.version);

		let mut latest: HashMap<Vec<Value>, (RowsetId, u32)> = HashMap::new();
		let mut bitmap = DeleteBitmap::new();
		for rowset in &rowsets {
			let mut reader =
				self.new_tablet.create_rowset_reader(rowset, ReaderContext::new(Arc::clone(&self.new_tablet_schema)))?;

			let mut row_id: u32 = 0;
			while let Some(block) = reader.next_block()? {
				for row in 0..block.row_count() {
					let key = block.row_prefix(row, num_key_columns);
					if let Some((rowset_id, previous)) = latest.insert(key, (rowset.rowset_id, row_id)) {
						bitmap.mark(rowset_id, previous, rowset.version.end);
					}
					row_id += 1;
				}
			}
		}
		Ok(bitmap)
	}
}
