// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use parking_lot::RwLock;
use strata_core::{
	Error, PendingRowsetSet, Result, TabletId, TabletSchema,
	interface::{ExprEvaluator, StorageEngine, Tablet, TabletState},
};
use tracing::debug;

use crate::{store::RowsetStore, tablet::MemoryTablet};

pub struct MemoryStorageEngine {
	tablets: RwLock<HashMap<TabletId, Arc<MemoryTablet>>>,
	store: RowsetStore,
	pending: PendingRowsetSet,
	evaluator: Arc<dyn ExprEvaluator>,
}

impl MemoryStorageEngine {
	pub fn new(evaluator: Arc<dyn ExprEvaluator>) -> Arc<Self> {
		Arc::new(Self {
			tablets: RwLock::new(HashMap::new()),
			store: RowsetStore::new(),
			pending: PendingRowsetSet::new(),
			evaluator,
		})
	}

	pub fn create_tablet(
		&self,
		tablet_id: TabletId,
		schema: Arc<TabletSchema>,
		state: TabletState,
		merge_on_write: bool,
	) -> Arc<MemoryTablet> {
		let tablet = Arc::new(MemoryTablet::new(
			tablet_id,
			schema,
			state,
			merge_on_write,
			self.store.clone(),
			Arc::clone(&self.evaluator),
		));
		self.tablets.write().insert(tablet_id, Arc::clone(&tablet));
		tablet
	}

	pub fn tablet(&self, tablet_id: TabletId) -> Option<Arc<MemoryTablet>> {
		self.tablets.read().get(&tablet_id).cloned()
	}

	pub fn store(&self) -> &RowsetStore {
		&self.store
	}

	/// Drops stored rowsets that are neither visible in a tablet nor pending.
	pub fn sweep_unused_rowsets(&self) -> usize {
		let visible: HashSet<_> = self
			.tablets
			.read()
			.values()
			.flat_map(|tablet| tablet.rowsets())
			.map(|rowset| rowset.rowset_id)
			.collect();

		let mut removed = 0;
		for rowset_id in self.store.ids() {
			if !visible.contains(&rowset_id) && !self.pending.contains(rowset_id) && self.store.remove(rowset_id) {
				removed += 1;
			}
		}
		debug!(removed, "swept unused rowsets");
		removed
	}
}

impl StorageEngine for MemoryStorageEngine {
	fn get_tablet(&self, tablet_id: TabletId) -> Result<Arc<dyn Tablet>> {
		let tablet = self.tablet(tablet_id).ok_or(Error::TabletNotFound(tablet_id))?;
		Ok(tablet)
	}

	fn pending_rowsets(&self) -> &PendingRowsetSet {
		&self.pending
	}
}
