// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::{BTreeMap, btree_map::Entry};

use crate::{
	common::{RowsetId, Version},
	expr::Expr,
};

/// A delete condition committed at `version`. It hides matching rows of every
/// rowset whose versions precede it.
#[derive(Clone, Debug, PartialEq)]
pub struct DeletePredicate {
	pub version: u64,
	pub expr: Expr,
}

/// Delete conditions of a tablet up to a version.
#[derive(Clone, Debug, Default)]
pub struct DeleteHandler {
	predicates: Vec<DeletePredicate>,
}

impl DeleteHandler {
	pub fn init(predicates: impl IntoIterator<Item = DeletePredicate>, up_to_version: u64) -> Self {
		let mut predicates: Vec<_> = predicates.into_iter().filter(|p| p.version <= up_to_version).collect();
		predicates.sort_by_key(|p| p.version);
		Self {
			predicates,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.predicates.is_empty()
	}

	pub fn predicates(&self) -> &[DeletePredicate] {
		&self.predicates
	}

	/// Predicates that apply to rows of a rowset covering `version`.
	pub fn applicable_to(&self, version: Version) -> Vec<DeletePredicate> {
		self.predicates.iter().filter(|p| p.version > version.end).cloned().collect()
	}
}

/// Rows of a merge-on-write tablet that a newer row with the same key superseded.
/// Each entry remembers the version that hid it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteBitmap {
	rows: BTreeMap<RowsetId, BTreeMap<u32, u64>>,
}

impl DeleteBitmap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Marks a row as deleted at `version`. The earliest version wins on repeat.
	pub fn mark(&mut self, rowset: RowsetId, row: u32, version: u64) {
		match self.rows.entry(rowset).or_default().entry(row) {
			Entry::Vacant(entry) => {
				entry.insert(version);
			}
			Entry::Occupied(mut entry) => {
				if version < *entry.get() {
					entry.insert(version);
				}
			}
		}
	}

	pub fn contains(&self, rowset: RowsetId, row: u32) -> bool {
		self.rows.get(&rowset).is_some_and(|rows| rows.contains_key(&row))
	}

	/// Entries of one rowset as `(row, version)` pairs.
	pub fn subset(&self, rowset: RowsetId) -> Vec<(u32, u64)> {
		self.rows.get(&rowset).map(|rows| rows.iter().map(|(r, v)| (*r, *v)).collect()).unwrap_or_default()
	}

	pub fn remove_rowset(&mut self, rowset: RowsetId) {
		self.rows.remove(&rowset);
	}

	pub fn merge(&mut self, other: &DeleteBitmap) {
		for (rowset, rows) in &other.rows {
			for (row, version) in rows {
				self.mark(*rowset, *row, *version);
			}
		}
	}

	pub fn cardinality(&self) -> usize {
		self.rows.values().map(|rows| rows.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.cardinality() == 0
	}
}
