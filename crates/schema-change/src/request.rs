// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use strata_core::{Expr, TabletId, TabletSchema};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AlterTabletType {
	#[default]
	SchemaChange,
	/// Builds a materialized view (rollup) tablet from the base tablet.
	Rollup,
	/// Moves data without changing the schema.
	Migration,
}

/// Derivation of one materialized view column.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterializedViewParam {
	pub column_name: String,
	pub origin_column_name: Option<String>,
	pub expr: Expr,
}

#[derive(Clone, Debug)]
pub struct AlterTabletRequest {
	pub base_tablet_id: TabletId,
	pub new_tablet_id: TabletId,
	pub base_schema: Arc<TabletSchema>,
	pub new_schema: Arc<TabletSchema>,
	/// Versions up to this one must be converted by the job. Later versions
	/// are written to both tablets by the load path.
	pub alter_version: u64,
	pub alter_tablet_type: AlterTabletType,
	pub where_expr: Option<Expr>,
	pub materialized_view_params: Vec<MaterializedViewParam>,
	pub be_exec_version: i32,
}

impl AlterTabletRequest {
	pub fn new(
		base_tablet_id: TabletId,
		new_tablet_id: TabletId,
		base_schema: Arc<TabletSchema>,
		new_schema: Arc<TabletSchema>,
		alter_version: u64,
	) -> Self {
		Self {
			base_tablet_id,
			new_tablet_id,
			base_schema,
			new_schema,
			alter_version,
			alter_tablet_type: AlterTabletType::SchemaChange,
			where_expr: None,
			materialized_view_params: Vec::new(),
			be_exec_version: -1,
		}
	}

	pub fn with_type(mut self, alter_tablet_type: AlterTabletType) -> Self {
		self.alter_tablet_type = alter_tablet_type;
		self
	}

	pub fn with_where(mut self, where_expr: Expr) -> Self {
		self.where_expr = Some(where_expr);
		self
	}

	pub fn with_materialized_view(mut self, param: MaterializedViewParam) -> Self {
		self.materialized_view_params.push(param);
		self
	}

	pub fn with_exec_version(mut self, be_exec_version: i32) -> Self {
		self.be_exec_version = be_exec_version;
		self
	}
}
