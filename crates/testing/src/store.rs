// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use crossbeam_skiplist::SkipMap;
use strata_core::{Block, RowsetId, RowsetMeta};

/// Data of a built rowset.
#[derive(Debug)]
pub struct StoredRowset {
	pub meta: RowsetMeta,
	pub blocks: Vec<Block>,
}

/// Built rowsets by id, shared by every tablet of an engine.
#[derive(Clone, Default)]
pub struct RowsetStore {
	rowsets: Arc<SkipMap<RowsetId, Arc<StoredRowset>>>,
}

impl RowsetStore {
	pub fn new() -> Self {
		Self {
			rowsets: Arc::new(SkipMap::new()),
		}
	}

	pub fn insert(&self, rowset: StoredRowset) {
		self.rowsets.insert(rowset.meta.rowset_id, Arc::new(rowset));
	}

	pub fn get(&self, rowset_id: RowsetId) -> Option<Arc<StoredRowset>> {
		self.rowsets.get(&rowset_id).map(|entry| Arc::clone(entry.value()))
	}

	pub fn contains(&self, rowset_id: RowsetId) -> bool {
		self.rowsets.contains_key(&rowset_id)
	}

	pub fn remove(&self, rowset_id: RowsetId) -> bool {
		self.rowsets.remove(&rowset_id).is_some()
	}

	pub fn ids(&self) -> Vec<RowsetId> {
		self.rowsets.iter().map(|entry| *entry.key()).collect()
	}

	pub fn len(&self) -> usize {
		self.rowsets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rowsets.is_empty()
	}
}
