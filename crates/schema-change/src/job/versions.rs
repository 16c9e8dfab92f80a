// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{cmp::Reverse, collections::HashSet};

use strata_core::{RowsetMeta, Version};

/// Chains rowsets from `range.start` to `range.end`, preferring the widest
/// rowset at every step and backing off when it leads nowhere.
pub(crate) fn capture_consistent_rowsets(rowsets: &[RowsetMeta], range: Version) -> Result<Vec<RowsetMeta>, String> {
	let mut search = PathSearch {
		rowsets,
		range,
		dead_ends: HashSet::new(),
		missing: range.start,
	};
	let mut path = Vec::new();
	if search.extend(range.start, &mut path) {
		Ok(path)
	} else {
		Err(format!("version {} is missing from path {range}", search.missing))
	}
}

struct PathSearch<'r> {
	rowsets: &'r [RowsetMeta],
	range: Version,
	/// Start versions known not to reach `range.end`.
	dead_ends: HashSet<u64>,
	/// Furthest start version without any rowset.
	missing: u64,
}

impl PathSearch<'_> {
	fn extend(&mut self, next: u64, path: &mut Vec<RowsetMeta>) -> bool {
		if next > self.range.end {
			return true;
		}
		if self.dead_ends.contains(&next) {
			return false;
		}

		let mut candidates: Vec<&RowsetMeta> = self
			.rowsets
			.iter()
			.filter(|r| r.version.start == next && r.version.end <= self.range.end)
			.collect();
		if candidates.is_empty() {
			self.missing = self.missing.max(next);
		}
		candidates.sort_by_key(|r| Reverse(r.version.end));

		for candidate in candidates {
			path.push(candidate.clone());
			if self.extend(candidate.version.end + 1, path) {
				return true;
			}
			path.pop();
		}
		self.dead_ends.insert(next);
		false
	}
}

/// End of the longest chain of rowsets starting at version 0.
pub(crate) fn max_continuous_version(rowsets: &[RowsetMeta]) -> Option<u64> {
	let mut ordered: Vec<&RowsetMeta> = rowsets.iter().collect();
	ordered.sort_by_key(|r| r.version.start);

	let mut reachable = HashSet::from([0]);
	let mut reached = None;
	for rowset in ordered {
		if reachable.contains(&rowset.version.start) {
			reachable.insert(rowset.version.end + 1);
			reached = reached.max(Some(rowset.version.end));
		}
	}
	reached
}
