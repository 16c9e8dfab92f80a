// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_core::{
	DeleteBitmap, KeysType,
	interface::{RowsetReader, RowsetWriter, Tablet},
};
use tracing::{debug, instrument, warn};

use crate::error::Result;

/// Adopts the physical data of the source rowset without reading it.
#[derive(Debug, Default)]
pub struct LinkedSchemaChange;

impl LinkedSchemaChange {
	#[instrument(name = "schema_change::linked::process", level = "debug", skip_all)]
	pub fn process(
		&self,
		reader: &mut dyn RowsetReader,
		writer: &mut dyn RowsetWriter,
		new_tablet: &dyn Tablet,
		base_tablet: &dyn Tablet,
	) -> Result<()> {
		let rowset = reader.rowset().clone();
		if let Err(err) = writer.add_rowset_for_linked_schema_change(&rowset) {
			warn!(
				rowset = %rowset.rowset_id,
				base_tablet = %base_tablet.tablet_id(),
				new_tablet = %new_tablet.tablet_id(),
				error = %err,
				"fail to convert rowset"
			);
			return Err(err.into());
		}

		// superseded rows stay superseded under the new rowset id
		if new_tablet.keys_type() == KeysType::Unique && new_tablet.enable_unique_key_merge_on_write() {
			let origin = base_tablet.delete_bitmap().subset(rowset.rowset_id);
			if !origin.is_empty() {
				let new_rowset = writer.rowset_id();
				let mut bitmap = DeleteBitmap::new();
				for (row, version) in &origin {
					bitmap.mark(new_rowset, *row, *version);
				}
				new_tablet.merge_delete_bitmap(&bitmap)?;
				debug!(rows = origin.len(), rowset = %new_rowset, "copied delete bitmap");
			}
		}

		Ok(())
	}
}
