// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use strata_core::{
	ColumnDef, KeysType, TabletSchema, Type, Value, Version,
	interface::{StorageEngine, Tablet, TabletState},
};
use strata_schema_change::{JobState, SchemaChangeError};
use strata_testing::fixture::{id_name_rows, schema};

use crate::{BASE, NEW, harness};

fn id_name_schema() -> Arc<TabletSchema> {
	schema(KeysType::Duplicate, vec![ColumnDef::key(1, "id", Type::Int4), ColumnDef::value(2, "name", Type::Utf8)])
}

#[test]
fn test_missing_version_is_a_gap() {
	let h = harness();
	let base_schema = id_name_schema();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&base_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..10)).unwrap();
	base.commit_rows(Version::single(3), id_name_rows(10..20)).unwrap();

	let request = h.request(&base_schema, &base_schema, 3);
	let mut job = h.job(&request);
	let err = job.process_alter_tablet(&request).unwrap_err();

	assert!(matches!(err, SchemaChangeError::VersionGap { tablet, .. } if tablet == BASE), "{err}");
	assert_eq!(job.state(), JobState::Failed);
	assert_eq!(new.tablet_state(), TabletState::NotReady);
	assert!(new.rowsets().is_empty());
	assert!(h.registry.is_empty());
}

#[test]
fn test_alter_version_beyond_base() {
	let h = harness();
	let base_schema = id_name_schema();
	let base = h.base_tablet(&base_schema, false);
	h.new_tablet(&base_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..10)).unwrap();

	let request = h.request(&base_schema, &base_schema, 5);
	let err = h.job(&request).process_alter_tablet(&request).unwrap_err();
	assert_eq!(err.code(), "SC_005");
}

#[test]
fn test_overlapping_version_in_new_tablet() {
	let h = harness();
	let base_schema = id_name_schema();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&base_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..10)).unwrap();
	base.commit_rows(Version::new(2, 3), id_name_rows(10..20)).unwrap();
	new.commit_rows(Version::single(3), id_name_rows(15..20)).unwrap();

	let request = h.request(&base_schema, &base_schema, 3);
	let err = h.job(&request).process_alter_tablet(&request).unwrap_err();
	assert!(matches!(err, SchemaChangeError::VersionGap { tablet, .. } if tablet == NEW), "{err}");
}

#[test]
fn test_invalid_cast_leaves_no_output() {
	let h = harness();
	let base_schema = id_name_schema();
	let new_schema =
		schema(KeysType::Duplicate, vec![ColumnDef::key(1, "id", Type::Int4), ColumnDef::value(2, "name", Type::Int4)]);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	let mut rows: Vec<Vec<Value>> = (0..10).map(|id| vec![Value::Int4(id), Value::utf8(id.to_string())]).collect();
	rows.push(vec![Value::Int4(10), Value::utf8("ten")]);
	base.commit_rows(Version::new(0, 1), rows).unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let mut job = h.job(&request);
	let err = job.process_alter_tablet(&request).unwrap_err();

	match err {
		SchemaChangeError::CastInvalid {
			column,
			from,
			to,
			reason,
		} => {
			assert_eq!(column, "name");
			assert_eq!(from, Type::Utf8);
			assert_eq!(to, Type::Int4);
			assert!(reason.contains("ten"), "{reason}");
		}
		other => panic!("unexpected error {other}"),
	}
	assert_eq!(new.tablet_state(), TabletState::NotReady);
	assert!(new.rowsets().is_empty());
	assert!(h.engine.pending_rowsets().is_empty());
	assert!(h.registry.is_empty());
}

#[test]
fn test_missing_default_for_required_column() {
	let h = harness();
	let base_schema = id_name_schema();
	let new_schema = schema(
		KeysType::Duplicate,
		vec![
			ColumnDef::key(1, "id", Type::Int4),
			ColumnDef::value(2, "name", Type::Utf8),
			ColumnDef::value(3, "score", Type::Int8).nullable(false),
		],
	);
	let base = h.base_tablet(&base_schema, false);
	h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..3)).unwrap();

	let request = h.request(&base_schema, &new_schema, 1);
	let err = h.job(&request).process_alter_tablet(&request).unwrap_err();
	assert!(matches!(err, SchemaChangeError::UnsupportedMapping { ref column, .. } if column == "score"), "{err}");
}

#[test]
fn test_tablet_already_converting() {
	let h = harness();
	let base_schema = id_name_schema();
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&base_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..10)).unwrap();

	let request = h.request(&base_schema, &base_schema, 1);
	let held = h.registry.register(&[BASE]).unwrap();

	let mut job = h.job(&request);
	assert!(job.tablet_in_converting(BASE));
	let err = job.process_alter_tablet(&request).unwrap_err();
	assert!(matches!(err, SchemaChangeError::ConcurrentAlteration(tablet) if tablet == BASE));
	// the conflicting job registers nothing
	assert!(!h.registry.contains(NEW));
	assert!(new.rowsets().is_empty());

	drop(held);
	let mut retry = h.job(&request);
	retry.process_alter_tablet(&request).unwrap();
	assert_eq!(new.tablet_state(), TabletState::Running);
}

#[test]
fn test_concurrent_jobs_on_same_base() {
	use std::{
		sync::{
			Barrier,
			atomic::{AtomicBool, Ordering},
		},
		thread,
	};

	let h = harness();
	let base_schema = id_name_schema();
	let base = h.base_tablet(&base_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..2000)).unwrap();

	let jobs: Vec<_> = (0..2u64)
		.map(|i| {
			let new_id = strata_core::TabletId(100 + i);
			h.engine.create_tablet(new_id, Arc::clone(&base_schema), TabletState::NotReady, false);
			strata_schema_change::AlterTabletRequest::new(
				BASE,
				new_id,
				Arc::clone(&base_schema),
				Arc::clone(&base_schema),
				1,
			)
		})
		.collect();

	// the first job parks inside its where filter until the second has tried
	let entered = Arc::new(Barrier::new(2));
	let release = Arc::new(Barrier::new(2));
	let parked = Arc::new(AtomicBool::new(false));
	let held_during_conversion = Arc::new(AtomicBool::new(false));
	{
		let (entered, release, parked, held) =
			(Arc::clone(&entered), Arc::clone(&release), Arc::clone(&parked), Arc::clone(&held_during_conversion));
		let registry = Arc::clone(&h.registry);
		h.evaluator.register_filter("park", move |block| {
			if !parked.swap(true, Ordering::SeqCst) {
				held.store(
					registry.contains(BASE) && registry.contains(strata_core::TabletId(100)),
					Ordering::SeqCst,
				);
				entered.wait();
				release.wait();
			}
			Ok(vec![true; block.row_count()])
		});
	}

	let first_request = jobs[0].clone().with_where(strata_core::Expr::new("park"));
	let mut first = h.job(&first_request);
	let handle = thread::spawn(move || first.process_alter_tablet(&first_request));

	entered.wait();
	let mut second = h.job(&jobs[1]);
	assert!(second.tablet_in_converting(BASE));
	let second_result = second.process_alter_tablet(&jobs[1]);
	release.wait();
	let first_result = handle.join().unwrap();

	assert!(held_during_conversion.load(Ordering::SeqCst));
	assert!(first_result.is_ok(), "{first_result:?}");
	assert!(matches!(second_result, Err(SchemaChangeError::ConcurrentAlteration(_))), "{second_result:?}");
	assert_eq!(second.state(), JobState::Failed);
	assert!(!second.tablet_in_converting(BASE));
	assert!(h.registry.is_empty());

	let converted = h.engine.tablet(strata_core::TabletId(100)).unwrap();
	assert_eq!(converted.tablet_state(), TabletState::Running);
	assert_eq!(converted.visible_rows().unwrap().len(), 2000);
	let rejected = h.engine.tablet(strata_core::TabletId(101)).unwrap();
	assert_eq!(rejected.tablet_state(), TabletState::NotReady);
	assert!(rejected.rowsets().is_empty());
}

#[test]
fn test_write_failure_releases_registration() {
	let h = harness();
	let base_schema = id_name_schema();
	let new_schema = schema(
		KeysType::Duplicate,
		vec![
			ColumnDef::key(1, "id", Type::Int4),
			ColumnDef::value(2, "name", Type::Utf8),
			ColumnDef::value(3, "flag", Type::Boolean),
		],
	);
	let base = h.base_tablet(&base_schema, false);
	let new = h.new_tablet(&new_schema, false);
	base.commit_rows(Version::new(0, 1), id_name_rows(0..10)).unwrap();
	base.commit_rows(Version::single(2), id_name_rows(10..20)).unwrap();
	new.fail_writes_at(Some(Version::single(2)));

	let request = h.request(&base_schema, &new_schema, 2);
	let mut job = h.job(&request);
	let err = job.process_alter_tablet(&request).unwrap_err();

	assert!(err.is_retryable(), "{err}");
	assert_eq!(err.code(), "SC_010");
	assert_eq!(job.state(), JobState::Failed);
	assert_eq!(new.tablet_state(), TabletState::NotReady);
	assert!(h.registry.is_empty());
	assert!(h.engine.pending_rowsets().is_empty());

	// the first version was published before the failure; the caller drops the tablet
	assert_eq!(new.visible_versions(), vec![Version::new(0, 1)]);
}
