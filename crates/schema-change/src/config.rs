// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::Deserialize;

/// Tuning knobs of the schema change engine.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchemaChangeConfig {
	/// Memory one sorting schema change may hold in buffered blocks.
	pub memory_limitation_per_thread_bytes: usize,
	/// Fraction of the budget at which buffered blocks are spilled into an
	/// intermediate rowset. The rest is left to the merge and the writers.
	pub hold_block_memory_rate: f64,
	/// Rows per block emitted by the sorting merges.
	pub block_rows: usize,
	/// Root functions admitted in materialized view expressions.
	pub supported_mv_functions: Vec<String>,
	pub min_exec_version: i32,
	pub max_exec_version: i32,
}

impl Default for SchemaChangeConfig {
	fn default() -> Self {
		Self {
			memory_limitation_per_thread_bytes: 2 * 1024 * 1024 * 1024,
			hold_block_memory_rate: 0.66,
			block_rows: 4096,
			supported_mv_functions: [
				"to_bitmap",
				"to_bitmap_with_check",
				"hll_hash",
				"bitmap_hash",
				"bitmap_hash64",
				"count_field",
				"to_quantile_state",
			]
			.into_iter()
			.map(String::from)
			.collect(),
			min_exec_version: 0,
			max_exec_version: 7,
		}
	}
}

impl SchemaChangeConfig {
	pub fn hold_block_bytes(&self) -> usize {
		(self.memory_limitation_per_thread_bytes as f64 * self.hold_block_memory_rate) as usize
	}

	pub fn is_supported_function(&self, name: &str) -> bool {
		self.supported_mv_functions.iter().any(|f| f.eq_ignore_ascii_case(name))
	}

	/// `-1` leaves the version unset.
	pub fn accepts_exec_version(&self, version: i32) -> bool {
		version == -1 || (self.min_exec_version..=self.max_exec_version).contains(&version)
	}
}
