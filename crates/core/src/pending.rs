// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tracing::trace;

use crate::common::RowsetId;

/// Rowsets that are written but not yet referenced by any tablet. Background
/// cleanup must leave every member alone.
#[derive(Clone, Debug, Default)]
pub struct PendingRowsetSet {
	inner: Arc<Mutex<HashMap<RowsetId, usize>>>,
}

impl PendingRowsetSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Pins `rowset` until the returned guard is dropped.
	pub fn add(&self, rowset: RowsetId) -> PendingRowsetGuard {
		*self.inner.lock().entry(rowset).or_insert(0) += 1;
		trace!(%rowset, "pending rowset pinned");
		PendingRowsetGuard {
			set: self.clone(),
			rowset,
		}
	}

	pub fn contains(&self, rowset: RowsetId) -> bool {
		self.inner.lock().contains_key(&rowset)
	}

	pub fn len(&self) -> usize {
		self.inner.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn release(&self, rowset: RowsetId) {
		let mut inner = self.inner.lock();
		if let Some(count) = inner.get_mut(&rowset) {
			*count -= 1;
			if *count == 0 {
				inner.remove(&rowset);
				trace!(%rowset, "pending rowset released");
			}
		}
	}
}

#[must_use = "the rowset is unpinned as soon as the guard is dropped"]
#[derive(Debug)]
pub struct PendingRowsetGuard {
	set: PendingRowsetSet,
	rowset: RowsetId,
}

impl PendingRowsetGuard {
	pub fn rowset_id(&self) -> RowsetId {
		self.rowset
	}
}

impl Drop for PendingRowsetGuard {
	fn drop(&mut self) {
		self.set.release(self.rowset);
	}
}
