// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_core::{
	ColumnDef, Expr, KeysType, Type, Value, Version,
	interface::{StorageEngine, Tablet, TabletState},
};
use strata_schema_change::{JobState, ProcedureKind, SHADOW_COLUMN_PREFIX, SchemaChangeError};
use strata_testing::fixture::{id_name_rows, schema};

use crate::harness;

fn id_name_schema() -> std::sync::Arc<strata_core::TabletSchema> {
	schema(KeysType::Duplicate, vec![ColumnDef::key(1, "id", Type::Int4), ColumnDef::value(2, "name", Type::Utf8)])
}

#[test]
fn test_add_column_with_default() {
	let h = harness();
	let base_schema = id_name_schema();
	let new_schema = schema(
		KeysType::Duplicate,
		vec![
			ColumnDef::key(1, "id", Type::Int4),
			ColumnDef::value(2, "name", Type::Utf8),
			ColumnDef::value(3, "score", Type::Int8).nullable(false).with_default("0"),
		],
	);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..600)).unwrap();
	base.commit_rows(Version::single(2), id_name_rows(600..1000)).unwrap();

	let request = h.request(&base_schema, &new_schema, 2);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.state(), JobState::Done);
	assert_eq!(job.stats().procedure, Some(ProcedureKind::Directly));
	assert_eq!(job.stats().converted_versions, vec![Version::new(0, 1), Version::single(2)]);
	assert_eq!(job.stats().real_alter_version(), Some(2));
	assert_eq!(job.stats().rows.source_rows, 1000);
	assert_eq!(job.stats().rows.written_rows, 1000);
	assert!(job.stats().rows.is_conserved());

	assert_eq!(new.tablet_state(), TabletState::Running);
	let rows = new.visible_rows().unwrap();
	assert_eq!(rows.len(), 1000);
	for (id, row) in rows.iter().enumerate() {
		assert_eq!(row, &vec![Value::Int4(id as i32), Value::utf8(format!("name-{id}")), Value::Int8(0)]);
	}

	assert!(h.registry.is_empty());
	assert!(h.engine.pending_rowsets().is_empty());
}

#[test]
fn test_rename_is_linked() {
	let h = harness();
	let base_schema = id_name_schema();
	let new_schema =
		schema(KeysType::Duplicate, vec![ColumnDef::key(1, "id", Type::Int4), ColumnDef::value(2, "label", Type::Utf8)]);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 3), id_name_rows(0..50)).unwrap();

	let request = h.request(&base_schema, &new_schema, 3);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().procedure, Some(ProcedureKind::Linked));
	assert_eq!(new.visible_rows().unwrap(), id_name_rows(0..50));
	assert_eq!(new.visible_versions(), vec![Version::new(0, 3)]);
}

#[test]
fn test_shadow_column_widens_type() {
	let h = harness();
	let base_schema = id_name_schema();
	let shadow = format!("{SHADOW_COLUMN_PREFIX}id");
	let new_schema =
		schema(KeysType::Duplicate, vec![ColumnDef::key(10, shadow, Type::Int8), ColumnDef::value(2, "name", Type::Utf8)]);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..10)).unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().procedure, Some(ProcedureKind::Directly));
	let rows = new.visible_rows().unwrap();
	assert_eq!(rows[3], vec![Value::Int8(3), Value::utf8("name-3")]);
}

#[test]
fn test_where_predicate_filters_rows() {
	let h = harness();
	h.evaluator.register_column_filter("id % 2 = 0", "id", |value| matches!(value, Value::Int4(id) if id % 2 == 0));
	let base_schema = id_name_schema();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&base_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..100)).unwrap();

	let request = h.request(&base_schema, &base_schema, 1).with_where(Expr::new("id % 2 = 0"));
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().rows.filtered_rows, 50);
	assert_eq!(job.stats().rows.written_rows, 50);
	let rows = new.visible_rows().unwrap();
	assert_eq!(rows.len(), 50);
	assert!(rows.iter().all(|row| matches!(row[0], Value::Int4(id) if id % 2 == 0)));
}

#[test]
fn test_delete_predicates_applied() {
	let h = harness();
	h.evaluator.register_column_filter("id < 10", "id", |value| matches!(value, Value::Int4(id) if *id < 10));
	let base_schema = id_name_schema();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&base_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..100)).unwrap();
	base.commit_delete(2, Expr::new("id < 10")).unwrap();
	base.commit_rows(Version::single(3), id_name_rows(0..5)).unwrap();

	let request = h.request(&base_schema, &base_schema, 3);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().procedure, Some(ProcedureKind::Directly));
	assert_eq!(job.stats().rows.source_filtered_rows, 10);
	assert!(job.stats().rows.is_conserved());

	// rows loaded after the delete stay visible
	let mut expected = id_name_rows(10..100);
	expected.extend(id_name_rows(0..5));
	assert_eq!(new.visible_rows().unwrap(), expected);
	assert_eq!(new.delete_predicates().len(), 1);
}

#[test]
fn test_versions_already_in_new_tablet_are_skipped() {
	let h = harness();
	let base_schema = id_name_schema();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&base_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..10)).unwrap();
	base.commit_rows(Version::single(2), id_name_rows(10..20)).unwrap();
	// double written by the load path
	new.commit_rows(Version::single(2), id_name_rows(10..20)).unwrap();

	let request = h.request(&base_schema, &base_schema, 1);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(job.stats().converted_versions, vec![Version::new(0, 1)]);
	assert_eq!(job.stats().skipped_versions, vec![Version::single(2)]);
	assert_eq!(job.stats().real_alter_version(), Some(2));
	assert_eq!(new.visible_rows().unwrap(), id_name_rows(0..20));
}

#[test]
fn test_materialized_view_column() {
	use strata_schema_change::{AlterTabletType, MaterializedViewParam};

	let h = harness();
	h.evaluator.register_column_map("to_bitmap(id)", "id", |value| match value {
		Value::Int4(id) => Value::Int8(1i64 << (id % 63)),
		_ => Value::Null,
	});
	let base_schema = id_name_schema();
	let new_schema = schema(
		KeysType::Duplicate,
		vec![ColumnDef::key(1, "id", Type::Int4), ColumnDef::value(20, "mv_bitmap", Type::Int8)],
	);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..4)).unwrap();

	let request = h.request(&base_schema, &new_schema, 1).with_type(AlterTabletType::Rollup).with_materialized_view(
		MaterializedViewParam {
			column_name: "mv_bitmap".to_string(),
			origin_column_name: Some("id".to_string()),
			expr: Expr::call("to_bitmap", "to_bitmap(id)"),
		},
	);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();

	assert_eq!(
		new.visible_rows().unwrap(),
		(0..4).map(|id| vec![Value::Int4(id), Value::Int8(1 << id)]).collect::<Vec<_>>()
	);
}

#[test]
fn test_unsupported_materialized_function() {
	use strata_schema_change::MaterializedViewParam;

	let h = harness();
	let base_schema = id_name_schema();
	let new_schema =
		schema(KeysType::Duplicate, vec![ColumnDef::key(1, "id", Type::Int4), ColumnDef::value(20, "mv", Type::Int8)]);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..4)).unwrap();

	let request = h.request(&base_schema, &new_schema, 1).with_materialized_view(MaterializedViewParam {
		column_name: "mv".to_string(),
		origin_column_name: Some("id".to_string()),
		expr: Expr::call("md5", "md5(id)"),
	});
	let mut job = h.job(&request);
	let err = job.process_alter_tablet(&request).unwrap_err();

	assert_eq!(err.code(), "SC_009");
	assert_eq!(job.state(), JobState::Failed);
	assert_eq!(new.tablet_state(), TabletState::NotReady);
}

#[test]
fn test_new_tablet_must_be_not_ready() {
	let h = harness();
	let base_schema = id_name_schema();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&base_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..4)).unwrap();
	new.set_tablet_state(TabletState::Running).unwrap();

	let request = h.request(&base_schema, &base_schema, 1);
	let err = h.job(&request).process_alter_tablet(&request).unwrap_err();
	assert_eq!(err.code(), "SC_009");
	assert!(new.rowsets().is_empty());
}

#[test]
fn test_rerun_starts_with_fresh_stats() {
	let h = harness();
	let base_schema = id_name_schema();
	let new_schema = schema(
		KeysType::Duplicate,
		vec![
			ColumnDef::key(1, "id", Type::Int4),
			ColumnDef::value(2, "name", Type::Utf8),
			ColumnDef::value(3, "score", Type::Int8).nullable(false).with_default("0"),
		],
	);
	let base = h.base_tablet(&base_schema, false);
	h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..50)).unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let mut job = h.job(&request);
	job.process_alter_tablet(&request).unwrap();
	assert_eq!(job.stats().procedure, Some(ProcedureKind::Directly));
	assert_eq!(job.stats().rows.source_rows, 50);
	assert_eq!(job.stats().converted_versions, vec![Version::new(0, 1)]);

	// the new tablet is Running now, so a second pass is refused
	let err = job.process_alter_tablet(&request).unwrap_err();
	assert!(matches!(err, SchemaChangeError::InvalidRequest(_)), "{err}");
	assert_eq!(job.state(), JobState::Failed);
	assert_eq!(job.stats().procedure, None);
	assert!(job.stats().converted_versions.is_empty());
	assert_eq!(job.stats().rows, Default::default());
}
