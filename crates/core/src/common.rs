// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	fmt,
	fmt::{Display, Formatter},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
pub struct TabletId(pub u64);

impl Display for TabletId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.0, f)
	}
}

/// Stable identity of a column across schema versions. Renames and
/// reorders keep the id, a type modification through a shadow column does not.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

impl Display for ColumnId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.0, f)
	}
}

#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
pub struct RowsetId(pub Uuid);

impl RowsetId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for RowsetId {
	fn default() -> Self {
		Self::new()
	}
}

impl Display for RowsetId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.0, f)
	}
}

/// Inclusive range `[start, end]` of committed versions covered by one rowset.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
	pub start: u64,
	pub end: u64,
}

impl Version {
	pub const fn new(start: u64, end: u64) -> Self {
		Self {
			start,
			end,
		}
	}

	pub const fn single(version: u64) -> Self {
		Self::new(version, version)
	}

	pub fn contains(&self, other: &Version) -> bool {
		self.start <= other.start && other.end <= self.end
	}

	pub fn overlaps(&self, other: &Version) -> bool {
		self.start <= other.end && other.start <= self.end
	}

	/// True when `next` starts right after this range ends.
	pub fn is_followed_by(&self, next: &Version) -> bool {
		self.end.checked_add(1) == Some(next.start)
	}
}

impl Display for Version {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "[{}-{}]", self.start, self.end)
	}
}
