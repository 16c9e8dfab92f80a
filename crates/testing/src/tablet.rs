// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use strata_core::{
	Block, DeleteBitmap, DeletePredicate, Error, Expr, ReaderContext, Result, RowsetId, RowsetMeta,
	RowsetWriterContext, SegmentsOverlap, TabletId, TabletSchema, Value, Version,
	interface::{ExprEvaluator, RowsetReader, RowsetWriter, Tablet, TabletState},
};
use tracing::debug;

use crate::{reader::MemoryRowsetReader, store::RowsetStore, writer::MemoryRowsetWriter};

pub struct MemoryTablet {
	tablet_id: TabletId,
	schema: Arc<TabletSchema>,
	merge_on_write: bool,
	state: RwLock<TabletState>,
	rowsets: RwLock<Vec<RowsetMeta>>,
	delete_bitmap: RwLock<DeleteBitmap>,
	failing_version: RwLock<Option<Version>>,
	store: RowsetStore,
	evaluator: Arc<dyn ExprEvaluator>,
}

impl MemoryTablet {
	pub fn new(
		tablet_id: TabletId,
		schema: Arc<TabletSchema>,
		state: TabletState,
		merge_on_write: bool,
		store: RowsetStore,
		evaluator: Arc<dyn ExprEvaluator>,
	) -> Self {
		Self {
			tablet_id,
			schema,
			merge_on_write,
			state: RwLock::new(state),
			rowsets: RwLock::new(Vec::new()),
			delete_bitmap: RwLock::new(DeleteBitmap::new()),
			failing_version: RwLock::new(None),
			store,
			evaluator,
		}
	}

	/// Loads `rows` as a new visible rowset at `version`.
	pub fn commit_rows(&self, version: Version, rows: Vec<Vec<Value>>) -> Result<RowsetMeta> {
		let mut block = self.schema.create_block();
		for row in rows {
			block.push_row(row)?;
		}
		self.commit_blocks(version, vec![block])
	}

	pub fn commit_blocks(&self, version: Version, blocks: Vec<Block>) -> Result<RowsetMeta> {
		let mut context = RowsetWriterContext::new(self.tablet_id, version, Arc::clone(&self.schema));
		context.segments_overlap = SegmentsOverlap::Overlapping;
		let mut writer = self.create_rowset_writer(context)?;
		for block in &blocks {
			writer.add_block(block)?;
		}
		writer.flush()?;
		let rowset = writer.build()?;
		self.add_rowset(rowset.clone())?;

		if self.merge_on_write {
			let bitmap = self.compute_delete_bitmap()?;
			*self.delete_bitmap.write() = bitmap;
		}
		Ok(rowset)
	}

	/// Commits a delete condition as an empty rowset at `version`.
	pub fn commit_delete(&self, version: u64, expr: Expr) -> Result<RowsetMeta> {
		let predicate = DeletePredicate {
			version,
			expr,
		};
		let mut context = RowsetWriterContext::new(self.tablet_id, Version::single(version), Arc::clone(&self.schema));
		context.delete_predicate = Some(predicate);
		let mut writer = self.create_rowset_writer(context)?;
		let rowset = writer.build()?;
		self.add_rowset(rowset.clone())?;
		Ok(rowset)
	}

	/// Writers created for `version` fail on the first block.
	pub fn fail_writes_at(&self, version: Option<Version>) {
		*self.failing_version.write() = version;
	}

	pub fn visible_versions(&self) -> Vec<Version> {
		let mut versions: Vec<_> = self.rowsets.read().iter().map(|r| r.version).collect();
		versions.sort();
		versions
	}

	pub fn rowset_by_version(&self, version: Version) -> Option<RowsetMeta> {
		self.rowsets.read().iter().find(|r| r.version == version).cloned()
	}

	/// Rows of one rowset in storage order, ignoring deletes.
	pub fn rowset_rows(&self, rowset: &RowsetMeta) -> Result<Vec<Vec<Value>>> {
		let mut reader = self.create_rowset_reader(rowset, ReaderContext::new(Arc::clone(&self.schema)))?;
		let mut rows = Vec::new();
		while let Some(block) = reader.next_block()? {
			rows.extend((0..block.row_count()).map(|row| block.row(row)));
		}
		Ok(rows)
	}

	/// Visible rows in version order, with delete predicates and the delete
	/// bitmap applied.
	pub fn visible_rows(&self) -> Result<Vec<Vec<Value>>> {
		let mut rowsets = self.rowsets();
		rowsets.sort_by_key(|r| r.version);
		let predicates = self.delete_predicates();
		let bitmap = self.delete_bitmap();

		let mut rows = Vec::new();
		for rowset in &rowsets {
			if self.merge_on_write {
				for (row_id, row) in self.rowset_rows(rowset)?.into_iter().enumerate() {
					if !bitmap.contains(rowset.rowset_id, row_id as u32) {
						rows.push(row);
					}
				}
				continue;
			}

			let mut context = ReaderContext::new(Arc::clone(&self.schema));
			context.delete_predicates =
				predicates.iter().filter(|p| p.version > rowset.version.end).cloned().collect();
			let mut reader = self.create_rowset_reader(rowset, context)?;
			while let Some(block) = reader.next_block()? {
				rows.extend((0..block.row_count()).map(|row| block.row(row)));
			}
		}
		Ok(rows)
	}

	fn compute_delete_bitmap(&self) -> Result<DeleteBitmap> {
		let mut rowsets = self.rowsets();
		rowsets.sort_by_key(|r| r.version);
		let num_key_columns = self.schema.num_key_columns();

		let mut latest: HashMap<Vec<Value>, (RowsetId, u32)> = HashMap::new();
		let mut bitmap = DeleteBitmap::new();
		for rowset in &rowsets {
			for (row_id, row) in self.rowset_rows(rowset)?.into_iter().enumerate() {
				let key = row[..num_key_columns].to_vec();
				if let Some((previous_rowset, previous_row)) = latest.insert(key, (rowset.rowset_id, row_id as u32)) {
					bitmap.mark(previous_rowset, previous_row, rowset.version.end);
				}
			}
		}
		Ok(bitmap)
	}
}

impl Tablet for MemoryTablet {
	fn tablet_id(&self) -> TabletId {
		self.tablet_id
	}

	fn schema(&self) -> Arc<TabletSchema> {
		Arc::clone(&self.schema)
	}

	fn enable_unique_key_merge_on_write(&self) -> bool {
		self.merge_on_write
	}

	fn tablet_state(&self) -> TabletState {
		*self.state.read()
	}

	fn set_tablet_state(&self, state: TabletState) -> Result<()> {
		let mut current = self.state.write();
		if *current == TabletState::Shutdown && state != TabletState::Shutdown {
			return Err(Error::Internal(format!("tablet {} is shut down", self.tablet_id)));
		}
		debug!(tablet = %self.tablet_id, from = ?*current, to = ?state, "tablet state");
		*current = state;
		Ok(())
	}

	fn rowsets(&self) -> Vec<RowsetMeta> {
		self.rowsets.read().clone()
	}

	fn delete_predicates(&self) -> Vec<DeletePredicate> {
		let mut rowsets = self.rowsets();
		rowsets.sort_by_key(|r| r.version);
		rowsets.into_iter().filter_map(|r| r.delete_predicate).collect()
	}

	fn create_rowset_reader(&self, rowset: &RowsetMeta, context: ReaderContext) -> Result<Box<dyn RowsetReader>> {
		let stored = self.store.get(rowset.rowset_id).ok_or(Error::RowsetNotFound(rowset.rowset_id))?;
		Ok(Box::new(MemoryRowsetReader::new(rowset.clone(), stored, context, Arc::clone(&self.evaluator))))
	}

	fn create_rowset_writer(&self, context: RowsetWriterContext) -> Result<Box<dyn RowsetWriter>> {
		let fail_writes = *self.failing_version.read() == Some(context.version);
		Ok(Box::new(MemoryRowsetWriter::new(context, self.store.clone(), fail_writes)))
	}

	fn add_rowset(&self, rowset: RowsetMeta) -> Result<()> {
		if !self.store.contains(rowset.rowset_id) {
			return Err(Error::RowsetNotFound(rowset.rowset_id));
		}

		let mut rowsets = self.rowsets.write();
		if let Some(existing) = rowsets.iter().find(|r| r.version.overlaps(&rowset.version)) {
			return Err(Error::Internal(format!(
				"version {} of tablet {} overlaps visible version {}",
				rowset.version, self.tablet_id, existing.version
			)));
		}
		rowsets.push(rowset);
		Ok(())
	}

	fn delete_bitmap(&self) -> DeleteBitmap {
		self.delete_bitmap.read().clone()
	}

	fn merge_delete_bitmap(&self, bitmap: &DeleteBitmap) -> Result<()> {
		self.delete_bitmap.write().merge(bitmap);
		Ok(())
	}

	fn replace_delete_bitmap(&self, bitmap: DeleteBitmap) -> Result<()> {
		*self.delete_bitmap.write() = bitmap;
		Ok(())
	}
}
