// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashSet;

use crate::{
	Error, Result,
	block::{Block, Column},
	common::ColumnId,
	value::Type,
};

/// Data model of a tablet, deciding how rows with equal keys are combined.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum KeysType {
	/// Every row is kept, keys only define the sort order.
	#[default]
	Duplicate,
	/// Upsert semantics: the newest row per key wins.
	Unique,
	/// Value columns are aggregated per key.
	Aggregate,
}

impl KeysType {
	pub fn merges_duplicates(&self) -> bool {
		!matches!(self, KeysType::Duplicate)
	}
}

/// How an aggregate-model value column combines rows with the same key.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum AggregationKind {
	#[default]
	None,
	Sum,
	Min,
	Max,
	Replace,
	ReplaceIfNotNull,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
	pub id: ColumnId,
	pub name: String,
	pub ty: Type,
	pub is_key: bool,
	pub nullable: bool,
	/// Literal used to fill the column for rows written before it existed.
	pub default_value: Option<String>,
	pub aggregation: AggregationKind,
}

impl ColumnDef {
	pub fn key(id: u32, name: impl Into<String>, ty: Type) -> Self {
		Self {
			id: ColumnId(id),
			name: name.into(),
			ty,
			is_key: true,
			nullable: false,
			default_value: None,
			aggregation: AggregationKind::None,
		}
	}

	pub fn value(id: u32, name: impl Into<String>, ty: Type) -> Self {
		Self {
			is_key: false,
			nullable: true,
			..Self::key(id, name, ty)
		}
	}

	pub fn nullable(mut self, nullable: bool) -> Self {
		self.nullable = nullable;
		self
	}

	pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
		self.default_value = Some(default_value.into());
		self
	}

	pub fn with_aggregation(mut self, aggregation: AggregationKind) -> Self {
		self.aggregation = aggregation;
		self
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct TabletSchema {
	keys_type: KeysType,
	columns: Vec<ColumnDef>,
	num_key_columns: usize,
	schema_version: u32,
}

impl TabletSchema {
	/// Key columns must form a prefix of the column list; ids and names must be unique.
	pub fn new(keys_type: KeysType, columns: Vec<ColumnDef>) -> Result<Self> {
		let num_key_columns = columns.iter().take_while(|c| c.is_key).count();
		if columns.iter().skip(num_key_columns).any(|c| c.is_key) {
			return Err(Error::InvalidSchema("key columns must precede value columns".to_string()));
		}
		if num_key_columns == 0 && !columns.is_empty() {
			return Err(Error::InvalidSchema("schema has no key column".to_string()));
		}

		let mut ids = HashSet::new();
		let mut names = HashSet::new();
		for column in &columns {
			if !ids.insert(column.id) {
				return Err(Error::InvalidSchema(format!("duplicate column id {}", column.id)));
			}
			if !names.insert(column.name.as_str()) {
				return Err(Error::InvalidSchema(format!("duplicate column name '{}'", column.name)));
			}
		}

		Ok(Self {
			keys_type,
			columns,
			num_key_columns,
			schema_version: 0,
		})
	}

	pub fn with_version(mut self, schema_version: u32) -> Self {
		self.schema_version = schema_version;
		self
	}

	pub fn keys_type(&self) -> KeysType {
		self.keys_type
	}

	pub fn schema_version(&self) -> u32 {
		self.schema_version
	}

	pub fn columns(&self) -> &[ColumnDef] {
		&self.columns
	}

	pub fn column(&self, index: usize) -> Option<&ColumnDef> {
		self.columns.get(index)
	}

	pub fn num_columns(&self) -> usize {
		self.columns.len()
	}

	pub fn num_key_columns(&self) -> usize {
		self.num_key_columns
	}

	pub fn field_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|c| c.name == name)
	}

	pub fn field_index_by_id(&self, id: ColumnId) -> Option<usize> {
		self.columns.iter().position(|c| c.id == id)
	}

	pub fn create_block(&self) -> Block {
		Block {
			columns: self.columns.iter().map(|c| Column::empty(c.name.clone(), c.ty)).collect(),
		}
	}
}
