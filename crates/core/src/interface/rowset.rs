// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::{
	Result,
	block::Block,
	common::{RowsetId, Version},
	rowset::{RowsetMeta, RowsetWriterContext},
};

/// Sequential block producer over one rowset.
pub trait RowsetReader: Send {
	fn rowset(&self) -> &RowsetMeta;

	/// Next block of rows, `None` once the rowset is exhausted.
	fn next_block(&mut self) -> Result<Option<Block>>;

	/// Rows dropped by reader-level delete conditions so far.
	fn filtered_rows(&self) -> u64;

	fn version(&self) -> Version {
		self.rowset().version
	}
}

/// Block consumer producing one rowset.
pub trait RowsetWriter: Send {
	fn context(&self) -> &RowsetWriterContext;

	fn add_block(&mut self, block: &Block) -> Result<()>;

	fn flush(&mut self) -> Result<()>;

	/// Adopts the files of an existing rowset instead of rewriting its rows.
	fn add_rowset_for_linked_schema_change(&mut self, rowset: &RowsetMeta) -> Result<()>;

	fn num_rows(&self) -> u64;

	/// Rows rejected while writing.
	fn num_rows_filtered(&self) -> u64;

	/// Finalizes the rowset. The writer accepts no further blocks afterwards.
	fn build(&mut self) -> Result<RowsetMeta>;

	fn rowset_id(&self) -> RowsetId {
		self.context().rowset_id
	}

	fn version(&self) -> Version {
		self.context().version
	}
}
