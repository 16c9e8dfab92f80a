// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod data;

pub use data::ColumnData;

use crate::{
	Error, Result,
	value::{Type, Value},
};

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
	pub name: String,
	pub ty: Type,
	pub data: ColumnData,
}

impl Column {
	pub fn new(name: impl Into<String>, ty: Type, data: ColumnData) -> Self {
		Self {
			name: name.into(),
			ty,
			data,
		}
	}

	pub fn empty(name: impl Into<String>, ty: Type) -> Self {
		Self::new(name, ty, ColumnData::empty(ty))
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
}

/// In-memory columnar unit of rows exchanged between reader, changer and writer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
	pub columns: Vec<Column>,
}

impl Block {
	pub fn new(columns: Vec<Column>) -> Self {
		let n = columns.first().map_or(0, |c| c.len());
		assert!(columns.iter().all(|c| c.len() == n), "all columns of a block must have the same length");
		Self {
			columns,
		}
	}

	pub fn row_count(&self) -> usize {
		self.columns.first().map_or(0, |c| c.len())
	}

	pub fn column_count(&self) -> usize {
		self.columns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.row_count() == 0
	}

	pub fn column(&self, index: usize) -> Option<&Column> {
		self.columns.get(index)
	}

	pub fn column_by_name(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|c| c.name == name)
	}

	pub fn row(&self, index: usize) -> Vec<Value> {
		self.columns.iter().map(|c| c.data.get(index)).collect()
	}

	/// Values of the leading `n` columns of a row.
	pub fn row_prefix(&self, index: usize, n: usize) -> Vec<Value> {
		self.columns.iter().take(n).map(|c| c.data.get(index)).collect()
	}

	pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
		if row.len() != self.columns.len() {
			return Err(Error::Internal(format!(
				"row has {} values but block has {} columns",
				row.len(),
				self.columns.len()
			)));
		}
		for (column, value) in self.columns.iter_mut().zip(row) {
			column.data.push(value)?;
		}
		Ok(())
	}

	/// An empty block with the same column layout.
	pub fn clone_empty(&self) -> Block {
		Block {
			columns: self.columns.iter().map(|c| Column::empty(c.name.clone(), c.ty)).collect(),
		}
	}

	pub fn filter(&self, mask: &[bool]) -> Block {
		Block {
			columns: self
				.columns
				.iter()
				.map(|c| Column::new(c.name.clone(), c.ty, c.data.filter(mask)))
				.collect(),
		}
	}

	pub fn take(&self, indices: &[usize]) -> Block {
		Block {
			columns: self
				.columns
				.iter()
				.map(|c| Column::new(c.name.clone(), c.ty, c.data.take(indices)))
				.collect(),
		}
	}

	pub fn append(&mut self, other: &Block) -> Result<()> {
		if self.columns.len() != other.columns.len() {
			return Err(Error::Internal(format!(
				"cannot append block of {} columns to block of {} columns",
				other.columns.len(),
				self.columns.len()
			)));
		}
		for (left, right) in self.columns.iter_mut().zip(&other.columns) {
			left.data.extend(&right.data)?;
		}
		Ok(())
	}

	pub fn allocated_bytes(&self) -> usize {
		self.columns.iter().map(|c| c.data.allocated_bytes()).sum()
	}
}
