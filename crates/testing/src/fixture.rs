// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Builders for schemas, blocks and rows used across tests.

use std::sync::Arc;

use strata_core::{Block, ColumnDef, KeysType, TabletSchema, Value};

/// Panics on an invalid schema; meant for test setup only.
pub fn schema(keys_type: KeysType, columns: Vec<ColumnDef>) -> Arc<TabletSchema> {
	Arc::new(TabletSchema::new(keys_type, columns).unwrap())
}

pub fn block_of(schema: &TabletSchema, rows: Vec<Vec<Value>>) -> Block {
	let mut block = schema.create_block();
	for row in rows {
		block.push_row(row).unwrap();
	}
	block
}

/// `(id, name)` rows with ids `range` and names `name-<id>`.
pub fn id_name_rows(range: std::ops::Range<i32>) -> Vec<Vec<Value>> {
	range.map(|id| vec![Value::Int4(id), Value::utf8(format!("name-{id}"))]).collect()
}

pub fn int4(v: i32) -> Value {
	Value::Int4(v)
}

pub fn int8(v: i64) -> Value {
	Value::Int8(v)
}

pub fn utf8(v: &str) -> Value {
	Value::utf8(v)
}
