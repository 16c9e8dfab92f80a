// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Conversion strategies applied to a single rowset.

mod direct;
mod linked;
mod merger;
mod sorting;

use std::{
	fmt::{Display, Formatter},
	ops::AddAssign,
	sync::Arc,
};

pub use direct::SchemaChangeDirectly;
pub use linked::LinkedSchemaChange;
pub use sorting::SchemaChangeWithSorting;
use strata_core::{
	TabletSchema,
	interface::{RowsetReader, RowsetWriter, StorageEngine, Tablet},
};
use tracing::{info, instrument, warn};

use crate::{
	changer::BlockChanger,
	config::SchemaChangeConfig,
	error::{Result, SchemaChangeError},
};

/// Row accounting of one conversion. Without a where predicate every source
/// row is written, filtered or merged exactly once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowCounts {
	pub source_rows: u64,
	/// Rows the reader hid, e.g. by delete predicates.
	pub source_filtered_rows: u64,
	pub written_rows: u64,
	/// Rows the writer refused.
	pub writer_filtered_rows: u64,
	/// Rows collapsed into another row with the same key.
	pub merged_rows: u64,
	/// Rows dropped by the where predicate.
	pub filtered_rows: u64,
}

impl RowCounts {
	pub fn is_conserved(&self) -> bool {
		self.source_rows.checked_sub(self.source_filtered_rows)
			== Some(self.written_rows + self.writer_filtered_rows + self.merged_rows + self.filtered_rows)
	}
}

impl AddAssign for RowCounts {
	fn add_assign(&mut self, rhs: Self) {
		self.source_rows += rhs.source_rows;
		self.source_filtered_rows += rhs.source_filtered_rows;
		self.written_rows += rhs.written_rows;
		self.writer_filtered_rows += rhs.writer_filtered_rows;
		self.merged_rows += rhs.merged_rows;
		self.filtered_rows += rhs.filtered_rows;
	}
}

impl Display for RowCounts {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"source_rows={}, source_filtered_rows={}, written_rows={}, writer_filtered_rows={}, merged_rows={}, filtered_rows={}",
			self.source_rows,
			self.source_filtered_rows,
			self.written_rows,
			self.writer_filtered_rows,
			self.merged_rows,
			self.filtered_rows
		)
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ProcessStats {
	pub(crate) filtered_rows: u64,
	pub(crate) merged_rows: u64,
	/// Rows refused while writing intermediate rowsets.
	pub(crate) writer_filtered_rows: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcedureKind {
	Linked,
	Directly,
	Sorting,
}

impl ProcedureKind {
	pub fn select(sc_sorting: bool, sc_directly: bool) -> Self {
		if sc_sorting {
			ProcedureKind::Sorting
		} else if sc_directly {
			ProcedureKind::Directly
		} else {
			ProcedureKind::Linked
		}
	}
}

impl Display for ProcedureKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ProcedureKind::Linked => f.write_str("linked"),
			ProcedureKind::Directly => f.write_str("directly"),
			ProcedureKind::Sorting => f.write_str("sorting"),
		}
	}
}

pub enum SchemaChangeProcedure<'a> {
	Linked(LinkedSchemaChange),
	Directly(SchemaChangeDirectly<'a>),
	Sorting(SchemaChangeWithSorting<'a>),
}

impl<'a> SchemaChangeProcedure<'a> {
	/// Sorting wins over direct, direct wins over linked.
	pub fn new(
		changer: &'a BlockChanger,
		sc_sorting: bool,
		sc_directly: bool,
		engine: &'a dyn StorageEngine,
		config: &SchemaChangeConfig,
	) -> Self {
		match ProcedureKind::select(sc_sorting, sc_directly) {
			ProcedureKind::Sorting => {
				SchemaChangeProcedure::Sorting(SchemaChangeWithSorting::new(changer, engine, config))
			}
			ProcedureKind::Directly => SchemaChangeProcedure::Directly(SchemaChangeDirectly::new(changer)),
			ProcedureKind::Linked => SchemaChangeProcedure::Linked(LinkedSchemaChange),
		}
	}

	pub fn kind(&self) -> ProcedureKind {
		match self {
			SchemaChangeProcedure::Linked(_) => ProcedureKind::Linked,
			SchemaChangeProcedure::Directly(_) => ProcedureKind::Directly,
			SchemaChangeProcedure::Sorting(_) => ProcedureKind::Sorting,
		}
	}

	#[instrument(
		name = "schema_change::procedure::process",
		level = "debug",
		skip_all,
		fields(kind = %self.kind(), rowset = %reader.rowset().rowset_id, version = %reader.version())
	)]
	pub fn process(
		&mut self,
		reader: &mut dyn RowsetReader,
		writer: &mut dyn RowsetWriter,
		new_tablet: &dyn Tablet,
		base_tablet: &dyn Tablet,
		base_schema: &Arc<TabletSchema>,
		new_schema: &Arc<TabletSchema>,
	) -> Result<()> {
		let has_where = match self {
			SchemaChangeProcedure::Linked(linked) => {
				return linked.process(reader, writer, new_tablet, base_tablet);
			}
			SchemaChangeProcedure::Directly(directly) => directly.changer.has_where(),
			SchemaChangeProcedure::Sorting(sorting) => sorting.changer.has_where(),
		};

		if reader.rowset().is_empty() {
			writer.flush()?;
			return Ok(());
		}

		match self {
			SchemaChangeProcedure::Linked(_) => {}
			SchemaChangeProcedure::Directly(directly) => {
				directly.stats = ProcessStats::default();
				directly.inner_process(reader, writer, base_schema)?;
			}
			SchemaChangeProcedure::Sorting(sorting) => {
				sorting.stats = ProcessStats::default();
				sorting.inner_process(reader, writer, new_tablet, new_schema)?;
			}
		}

		let counts = self.row_counts(reader, writer);
		if !has_where && !counts.is_conserved() {
			warn!(
				source_rows = counts.source_rows,
				source_filtered_rows = counts.source_filtered_rows,
				written_rows = counts.written_rows,
				writer_filtered_rows = counts.writer_filtered_rows,
				merged_rows = counts.merged_rows,
				filtered_rows = counts.filtered_rows,
				"schema change check row nums failed"
			);
			return Err(SchemaChangeError::RowCountMismatch(counts));
		}

		info!(
			source_rows = counts.source_rows,
			written_rows = counts.written_rows,
			merged_rows = counts.merged_rows,
			filtered_rows = counts.filtered_rows,
			"rowset converted"
		);
		Ok(())
	}

	pub fn filtered_rows(&self) -> u64 {
		match self {
			SchemaChangeProcedure::Linked(_) => 0,
			SchemaChangeProcedure::Directly(directly) => directly.stats.filtered_rows,
			SchemaChangeProcedure::Sorting(sorting) => sorting.stats.filtered_rows,
		}
	}

	pub fn merged_rows(&self) -> u64 {
		match self {
			SchemaChangeProcedure::Linked(_) => 0,
			SchemaChangeProcedure::Directly(directly) => directly.stats.merged_rows,
			SchemaChangeProcedure::Sorting(sorting) => sorting.stats.merged_rows,
		}
	}

	fn intermediate_writer_filtered_rows(&self) -> u64 {
		match self {
			SchemaChangeProcedure::Sorting(sorting) => sorting.stats.writer_filtered_rows,
			_ => 0,
		}
	}

	pub fn row_counts(&self, reader: &dyn RowsetReader, writer: &dyn RowsetWriter) -> RowCounts {
		RowCounts {
			source_rows: reader.rowset().num_rows,
			source_filtered_rows: reader.filtered_rows(),
			written_rows: writer.num_rows(),
			writer_filtered_rows: writer.num_rows_filtered() + self.intermediate_writer_filtered_rows(),
			merged_rows: self.merged_rows(),
			filtered_rows: self.filtered_rows(),
		}
	}
}
