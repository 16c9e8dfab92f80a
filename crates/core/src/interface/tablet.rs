// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use crate::{
	Result,
	common::{TabletId, Version},
	delete::{DeleteBitmap, DeletePredicate},
	interface::{RowsetReader, RowsetWriter},
	rowset::{ReaderContext, RowsetMeta, RowsetWriterContext},
	schema::{KeysType, TabletSchema},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TabletState {
	/// Created by an alteration and still being filled.
	NotReady,
	Running,
	Shutdown,
}

pub trait Tablet: Send + Sync {
	fn tablet_id(&self) -> TabletId;

	fn schema(&self) -> Arc<TabletSchema>;

	fn keys_type(&self) -> KeysType {
		self.schema().keys_type()
	}

	fn enable_unique_key_merge_on_write(&self) -> bool;

	fn tablet_state(&self) -> TabletState;

	fn set_tablet_state(&self, state: TabletState) -> Result<()>;

	/// Every visible rowset, in no particular order.
	fn rowsets(&self) -> Vec<RowsetMeta>;

	fn max_version(&self) -> Option<Version> {
		self.rowsets().into_iter().map(|r| r.version).max_by_key(|v| v.end)
	}

	fn delete_predicates(&self) -> Vec<DeletePredicate>;

	/// Opens a reader over `rowset`. The rowset must be visible in this tablet
	/// or pending for it.
	fn create_rowset_reader(&self, rowset: &RowsetMeta, context: ReaderContext) -> Result<Box<dyn RowsetReader>>;

	fn create_rowset_writer(&self, context: RowsetWriterContext) -> Result<Box<dyn RowsetWriter>>;

	/// Makes a built rowset visible.
	fn add_rowset(&self, rowset: RowsetMeta) -> Result<()>;

	fn delete_bitmap(&self) -> DeleteBitmap;

	fn merge_delete_bitmap(&self, bitmap: &DeleteBitmap) -> Result<()>;

	fn replace_delete_bitmap(&self, bitmap: DeleteBitmap) -> Result<()>;
}
