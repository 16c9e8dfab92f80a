// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_core::{ColumnDef, Expr, Value};

use crate::cast::Cast;

/// Where the values of a new column come from.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnSource {
	/// Copied from a base column, converted by `cast`.
	Reference {
		ref_column_idx: usize,
		cast: Cast,
	},
	/// Computed by a materialized view expression. `ref_column_idx` names the
	/// origin column whose nulls the result must preserve.
	Derived {
		expr: Expr,
		ref_column_idx: Option<usize>,
	},
	/// Filled with a constant for every row.
	Default(Value),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnMapping {
	pub new_column: ColumnDef,
	pub source: ColumnSource,
}

impl ColumnMapping {
	pub fn new(new_column: ColumnDef, source: ColumnSource) -> Self {
		Self {
			new_column,
			source,
		}
	}

	/// The base column this one is read from, if any.
	pub fn reference(&self) -> Option<usize> {
		match &self.source {
			ColumnSource::Reference {
				ref_column_idx,
				..
			} => Some(*ref_column_idx),
			ColumnSource::Derived {
				ref_column_idx,
				..
			} => *ref_column_idx,
			ColumnSource::Default(_) => None,
		}
	}

	pub fn has_reference(&self) -> bool {
		self.reference().is_some()
	}
}

/// One mapping per column of the new schema, in new schema order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaMapping {
	columns: Vec<ColumnMapping>,
}

impl SchemaMapping {
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			columns: Vec::with_capacity(capacity),
		}
	}

	pub fn push(&mut self, mapping: ColumnMapping) {
		self.columns.push(mapping);
	}

	pub fn get(&self, index: usize) -> Option<&ColumnMapping> {
		self.columns.get(index)
	}

	pub fn len(&self) -> usize {
		self.columns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.columns.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &ColumnMapping> {
		self.columns.iter()
	}
}
