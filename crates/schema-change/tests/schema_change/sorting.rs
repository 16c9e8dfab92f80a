// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use rand::seq::SliceRandom;
use strata_core::{
	AggregationKind, ColumnDef, KeysType, TabletSchema, Type, Value, Version,
	interface::{StorageEngine, Tablet, TabletState},
};
use strata_schema_change::{ProcedureKind, SchemaChangeConfig, SchemaChangeError};
use strata_testing::fixture::schema;

use crate::harness;

fn pair_schemas() -> (Arc<TabletSchema>, Arc<TabletSchema>) {
	let base = schema(
		KeysType::Duplicate,
		vec![ColumnDef::key(1, "a", Type::Int4), ColumnDef::key(2, "b", Type::Int4), ColumnDef::value(3, "v", Type::Int8)],
	);
	let new = schema(
		KeysType::Duplicate,
		vec![ColumnDef::key(2, "b", Type::Int4), ColumnDef::key(1, "a", Type::Int4), ColumnDef::value(3, "v", Type::Int8)],
	);
	(base, new)
}

fn shuffled_rows(count: i32) -> Vec<Vec<Value>> {
	let mut rows: Vec<_> =
		(0..count).map(|a| vec![Value::Int4(a), Value::Int4(a % 17), Value::Int8(a as i64 * 10)]).collect();
	rows.shuffle(&mut rand::rng());
	rows
}

fn assert_sorted_by_prefix(rows: &[Vec<Value>], prefix: usize) {
	for pair in rows.windows(2) {
		assert!(pair[0][..prefix] <= pair[1][..prefix], "{:?} after {:?}", pair[1], pair[0]);
	}
}

#[test]
fn test_key_reorder_sorts_rows() {
	let h = harness();
	let (base_schema, new_schema) = pair_schemas();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), shuffled_rows(300)).unwrap();
	base.commit_rows(Version::single(2), shuffled_rows(40)).unwrap();

	let request = h.request(&base_schema, &new_schema, 2);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().procedure, Some(ProcedureKind::Sorting));
	assert_eq!(new.tablet_state(), TabletState::Running);
	for rowset in new.rowsets() {
		let rows = new.rowset_rows(&rowset).unwrap();
		assert_eq!(rows.len() as u64, rowset.num_rows);
		assert_sorted_by_prefix(&rows, 2);
	}
	assert_eq!(new.visible_rows().unwrap().len(), 340);
}

#[test]
fn test_fewer_unique_keys_collapse_duplicates() {
	let h = harness();
	let base_schema = schema(
		KeysType::Unique,
		vec![ColumnDef::key(1, "id", Type::Int4), ColumnDef::key(2, "seq", Type::Int4), ColumnDef::value(3, "v", Type::Int8)],
	);
	let new_schema = schema(
		KeysType::Unique,
		vec![ColumnDef::key(1, "id", Type::Int4), ColumnDef::value(2, "seq", Type::Int4), ColumnDef::value(3, "v", Type::Int8)],
	);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(
		Version::new(0, 1),
		vec![
			vec![Value::Int4(2), Value::Int4(0), Value::Int8(20)],
			vec![Value::Int4(1), Value::Int4(0), Value::Int8(10)],
			vec![Value::Int4(1), Value::Int4(1), Value::Int8(11)],
		],
	)
	.unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().procedure, Some(ProcedureKind::Sorting));
	assert_eq!(job.stats().rows.merged_rows, 1);
	assert!(job.stats().rows.is_conserved());
	assert_eq!(
		new.visible_rows().unwrap(),
		vec![
			vec![Value::Int4(1), Value::Int4(1), Value::Int8(11)],
			vec![Value::Int4(2), Value::Int4(0), Value::Int8(20)],
		]
	);
}

#[test]
fn test_spills_into_runs_under_small_budget() {
	let mut h = harness();
	h.config = SchemaChangeConfig {
		memory_limitation_per_thread_bytes: 16 * 1024,
		hold_block_memory_rate: 0.25,
		block_rows: 64,
		..SchemaChangeConfig::default()
	};
	let (base_schema, new_schema) = pair_schemas();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), shuffled_rows(2000)).unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	let rows = new.visible_rows().unwrap();
	assert_eq!(rows.len(), 2000);
	assert_sorted_by_prefix(&rows, 2);
	assert_eq!(job.stats().rows.written_rows, 2000);

	// intermediate runs stay in the store until swept but are no longer pinned
	let runs = h.hidden_rowsets();
	assert!(runs > 1, "expected several runs, got {runs}");
	assert!(h.engine.pending_rowsets().is_empty());
	assert_eq!(h.engine.sweep_unused_rowsets(), runs);
	assert_eq!(h.hidden_rowsets(), 0);
	assert_eq!(new.visible_rows().unwrap(), rows);
}

#[test]
fn test_block_larger_than_budget() {
	let mut h = harness();
	h.config = SchemaChangeConfig {
		memory_limitation_per_thread_bytes: 64,
		..SchemaChangeConfig::default()
	};
	let (base_schema, new_schema) = pair_schemas();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), shuffled_rows(100)).unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let err = h.job(&request).process_alter_tablet(&request).unwrap_err();

	assert!(
		matches!(err, SchemaChangeError::MemoryLimitExceeded { limit, block_bytes, .. } if limit == 64 && block_bytes > 64),
		"{err}"
	);
	assert_eq!(new.tablet_state(), TabletState::NotReady);
	assert!(new.rowsets().is_empty());
	assert!(h.engine.pending_rowsets().is_empty());
}

#[test]
fn test_reordered_unique_key_over_versions() {
	let h = harness();
	let base_schema =
		schema(KeysType::Unique, vec![ColumnDef::key(1, "id", Type::Int4), ColumnDef::key(2, "name", Type::Utf8)]);
	let new_schema =
		schema(KeysType::Unique, vec![ColumnDef::key(2, "name", Type::Utf8), ColumnDef::key(1, "id", Type::Int4)]);
	let base = h.base_tablet(&base_schema, true);
	let new = h.new_tablet(&new_schema, true);

	let pair = |id: i32, name: &str| vec![Value::Int4(id), Value::utf8(name)];
	let mut first: Vec<_> = (0..60).map(|id| pair(id, ["x", "y", "z"][id as usize % 3])).collect();
	first.push(pair(7, "y"));
	first.shuffle(&mut rand::rng());
	base.commit_rows(Version::new(0, 1), first).unwrap();
	base.commit_rows(Version::single(2), vec![pair(1, "y"), pair(2, "z")]).unwrap();

	let request = h.request(&base_schema, &new_schema, 2);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().procedure, Some(ProcedureKind::Sorting));
	assert_eq!(job.stats().rows.merged_rows, 1);
	for rowset in new.rowsets() {
		assert_sorted_by_prefix(&new.rowset_rows(&rowset).unwrap(), 2);
	}

	let mut visible = new.visible_rows().unwrap();
	assert_eq!(visible.len(), 60);
	visible.sort();
	visible.dedup();
	assert_eq!(visible.len(), 60);
	assert_eq!(new.delete_bitmap().cardinality(), 2);
}

#[test]
fn test_string_key_cast_to_integer_resorts() {
	let h = harness();
	let base_schema =
		schema(KeysType::Duplicate, vec![ColumnDef::key(1, "code", Type::Utf8), ColumnDef::value(2, "v", Type::Int8)]);
	let new_schema =
		schema(KeysType::Duplicate, vec![ColumnDef::key(1, "code", Type::Int4), ColumnDef::value(2, "v", Type::Int8)]);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(
		Version::new(0, 1),
		vec![
			vec![Value::utf8("10"), Value::Int8(1)],
			vec![Value::utf8("2"), Value::Int8(2)],
			vec![Value::utf8("9"), Value::Int8(3)],
		],
	)
	.unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().procedure, Some(ProcedureKind::Sorting));
	assert_eq!(
		new.visible_rows().unwrap(),
		vec![
			vec![Value::Int4(2), Value::Int8(2)],
			vec![Value::Int4(9), Value::Int8(3)],
			vec![Value::Int4(10), Value::Int8(1)],
		]
	);
}

#[test]
fn test_unique_keys_equal_after_cast_collapse() {
	let h = harness();
	let base_schema =
		schema(KeysType::Unique, vec![ColumnDef::key(1, "code", Type::Utf8), ColumnDef::value(2, "v", Type::Int8)]);
	let new_schema =
		schema(KeysType::Unique, vec![ColumnDef::key(1, "code", Type::Int4), ColumnDef::value(2, "v", Type::Int8)]);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(
		Version::new(0, 1),
		vec![vec![Value::utf8("07"), Value::Int8(1)], vec![Value::utf8("7"), Value::Int8(2)]],
	)
	.unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().procedure, Some(ProcedureKind::Sorting));
	assert_eq!(job.stats().rows.merged_rows, 1);
	assert!(job.stats().rows.is_conserved());
	assert_eq!(new.visible_rows().unwrap(), vec![vec![Value::Int4(7), Value::Int8(2)]]);
}

#[test]
fn test_aggregate_merges_across_spilled_runs() {
	let mut h = harness();
	h.config = SchemaChangeConfig {
		memory_limitation_per_thread_bytes: 16 * 1024,
		hold_block_memory_rate: 0.25,
		block_rows: 64,
		..SchemaChangeConfig::default()
	};
	let base_schema = schema(
		KeysType::Aggregate,
		vec![
			ColumnDef::key(1, "a", Type::Int4),
			ColumnDef::key(2, "b", Type::Int4),
			ColumnDef::value(3, "total", Type::Int8).with_aggregation(AggregationKind::Sum),
			ColumnDef::value(4, "high", Type::Int8).with_aggregation(AggregationKind::Max),
		],
	);
	let new_schema = schema(
		KeysType::Aggregate,
		vec![
			ColumnDef::key(1, "a", Type::Int4),
			ColumnDef::value(3, "total", Type::Int8).with_aggregation(AggregationKind::Sum),
			ColumnDef::value(4, "high", Type::Int8).with_aggregation(AggregationKind::Max),
		],
	);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);

	let mut rows: Vec<_> = (0..2000)
		.map(|i: i32| vec![Value::Int4(i % 7), Value::Int4(i), Value::Int8(i as i64), Value::Int8(i as i64)])
		.collect();
	rows.shuffle(&mut rand::rng());
	base.commit_rows(Version::new(0, 1), rows).unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().procedure, Some(ProcedureKind::Sorting));
	assert_eq!(job.stats().rows.merged_rows, 1993);
	assert!(job.stats().rows.is_conserved());
	let runs = h.hidden_rowsets();
	assert!(runs > 1, "expected several runs, got {runs}");

	let expected: Vec<_> = (0..7)
		.map(|a: i32| {
			let members = (0..2000i64).filter(|i| i % 7 == a as i64);
			let total: i64 = members.clone().sum();
			let high = members.max().unwrap();
			vec![Value::Int4(a), Value::Int8(total), Value::Int8(high)]
		})
		.collect();
	assert_eq!(new.visible_rows().unwrap(), expected);
}
