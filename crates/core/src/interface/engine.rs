// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use crate::{
	Result,
	common::TabletId,
	interface::Tablet,
	pending::{PendingRowsetGuard, PendingRowsetSet},
	rowset::RowsetWriterContext,
};

pub trait StorageEngine: Send + Sync {
	fn get_tablet(&self, tablet_id: TabletId) -> Result<Arc<dyn Tablet>>;

	fn pending_rowsets(&self) -> &PendingRowsetSet;

	/// Pins the rowset about to be written with `context` against cleanup.
	fn add_pending_rowset(&self, context: &RowsetWriterContext) -> PendingRowsetGuard {
		self.pending_rowsets().add(context.rowset_id)
	}
}
