// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc};

use strata_core::{ColumnDef, DeleteHandler, Expr, KeysType, TabletSchema, Value, interface::ExprEvaluator};
use tracing::{debug, instrument};

use super::SchemaChangeJob;
use crate::{
	cast::{Cast, parse_literal},
	changer::BlockChanger,
	error::{Result, SchemaChangeError},
	mapping::{ColumnMapping, ColumnSource, SchemaMapping},
	procedure::ProcedureKind,
	request::{AlterTabletType, MaterializedViewParam},
};

/// Name prefix of a column that replaces an existing column during alteration.
pub const SHADOW_COLUMN_PREFIX: &str = "__shadow_";

/// Inputs of [`SchemaChangeJob::parse_request`] taken from the request and the
/// tablets.
pub struct SchemaChangeParams<'a> {
	pub alter_tablet_type: AlterTabletType,
	pub enable_unique_key_merge_on_write: bool,
	pub delete_handler: &'a DeleteHandler,
	/// Keyed by new column name.
	pub materialized_params_map: HashMap<String, MaterializedViewParam>,
	pub be_exec_version: i32,
	pub where_expr: Option<Expr>,
	pub supported_mv_functions: &'a [String],
}

pub struct ParsedRequest {
	pub changer: BlockChanger,
	pub sc_sorting: bool,
	pub sc_directly: bool,
}

impl ParsedRequest {
	pub fn kind(&self) -> ProcedureKind {
		ProcedureKind::select(self.sc_sorting, self.sc_directly)
	}
}

impl SchemaChangeJob {
	/// Builds the column mapping of `new_schema` over `base_schema` and picks
	/// the conversion strategy.
	#[instrument(name = "schema_change::job::parse_request", level = "debug", skip_all)]
	pub fn parse_request(
		params: &SchemaChangeParams<'_>,
		base_schema: &TabletSchema,
		new_schema: &Arc<TabletSchema>,
		evaluator: Arc<dyn ExprEvaluator>,
	) -> Result<ParsedRequest> {
		let mut schema_mapping = SchemaMapping::with_capacity(new_schema.num_columns());
		for new_column in new_schema.columns() {
			let source = Self::column_source(params, base_schema, new_column)?;
			schema_mapping.push(ColumnMapping::new(new_column.clone(), source));
		}

		let sc_sorting = Self::needs_sorting(&schema_mapping, base_schema, new_schema);
		let sc_directly = !sc_sorting && Self::needs_directly(params, &schema_mapping, base_schema, new_schema);

		let mut changer = BlockChanger::new(Arc::clone(new_schema), schema_mapping, evaluator);
		changer.set_type(params.alter_tablet_type);
		changer.set_where_expr(params.where_expr.clone());
		changer.set_compatible_version(params.be_exec_version);

		let parsed = ParsedRequest {
			changer,
			sc_sorting,
			sc_directly,
		};
		debug!(kind = %parsed.kind(), "parsed alter request");
		Ok(parsed)
	}

	fn column_source(
		params: &SchemaChangeParams<'_>,
		base_schema: &TabletSchema,
		new_column: &ColumnDef,
	) -> Result<ColumnSource> {
		if let Some(param) = params.materialized_params_map.get(&new_column.name) {
			if let Some(function) = param.expr.root_function() {
				if !params.supported_mv_functions.iter().any(|f| f.eq_ignore_ascii_case(function)) {
					return Err(SchemaChangeError::InvalidRequest(format!(
						"function {function} of materialized column '{}' is not supported",
						new_column.name
					)));
				}
			}

			let ref_column_idx = match &param.origin_column_name {
				Some(origin) => Some(base_schema.field_index(origin).ok_or_else(|| {
					SchemaChangeError::UnsupportedMapping {
						column: new_column.name.clone(),
						reason: format!("origin column '{origin}' does not exist"),
					}
				})?),
				None => None,
			};
			return Ok(ColumnSource::Derived {
				expr: param.expr.clone(),
				ref_column_idx,
			});
		}

		let ref_column_idx = base_schema.field_index_by_id(new_column.id).or_else(|| {
			new_column.name.strip_prefix(SHADOW_COLUMN_PREFIX).and_then(|origin| base_schema.field_index(origin))
		});

		if let Some(ref_column_idx) = ref_column_idx {
			let from = base_schema.columns()[ref_column_idx].ty;
			let cast = Cast::new(from, new_column.ty);
			cast.check_legal(params.alter_tablet_type).map_err(|reason| SchemaChangeError::CastInvalid {
				column: new_column.name.clone(),
				from,
				to: new_column.ty,
				reason: reason.to_string(),
			})?;
			return Ok(ColumnSource::Reference {
				ref_column_idx,
				cast,
			});
		}

		if params.alter_tablet_type == AlterTabletType::Rollup {
			return Err(SchemaChangeError::UnsupportedMapping {
				column: new_column.name.clone(),
				reason: "rollup column does not exist in base tablet".to_string(),
			});
		}

		Self::init_column_mapping(new_column).map(ColumnSource::Default)
	}

	/// The value a column added by the alteration takes for existing rows.
	pub(crate) fn init_column_mapping(new_column: &ColumnDef) -> Result<Value> {
		match &new_column.default_value {
			Some(text) if new_column.nullable && text.eq_ignore_ascii_case("null") => Ok(Value::Null),
			Some(text) => parse_literal(text, new_column.ty).map_err(|reason| SchemaChangeError::CastInvalid {
				column: new_column.name.clone(),
				from: strata_core::Type::Utf8,
				to: new_column.ty,
				reason: format!("default value: {reason}"),
			}),
			None if new_column.nullable => Ok(Value::Null),
			None => Err(SchemaChangeError::UnsupportedMapping {
				column: new_column.name.clone(),
				reason: "column is not nullable and has no default value".to_string(),
			}),
		}
	}

	fn needs_sorting(mapping: &SchemaMapping, base_schema: &TabletSchema, new_schema: &TabletSchema) -> bool {
		// key columns must reference base keys in the same relative order
		let mut num_default_value = 0;
		for (idx, column_mapping) in mapping.iter().take(new_schema.num_key_columns()).enumerate() {
			if let ColumnSource::Reference {
				cast,
				..
			} = &column_mapping.source
			{
				if !cast.preserves_order() {
					return true;
				}
			}

			match column_mapping.reference() {
				None => num_default_value += 1,
				Some(ref_column_idx) if ref_column_idx != idx - num_default_value => return true,
				Some(_) => {}
			}
		}

		if base_schema.keys_type() != new_schema.keys_type() {
			return true;
		}

		new_schema.keys_type() != KeysType::Duplicate && new_schema.num_key_columns() < base_schema.num_key_columns()
	}

	fn needs_directly(
		params: &SchemaChangeParams<'_>,
		mapping: &SchemaMapping,
		base_schema: &TabletSchema,
		new_schema: &TabletSchema,
	) -> bool {
		if params.where_expr.is_some() || !params.delete_handler.is_empty() {
			return true;
		}

		if base_schema.num_columns() != new_schema.num_columns() {
			return true;
		}

		mapping.iter().enumerate().any(|(idx, column_mapping)| match &column_mapping.source {
			ColumnSource::Derived {
				..
			}
			| ColumnSource::Default(_) => true,
			ColumnSource::Reference {
				ref_column_idx,
				cast,
			} => {
				*ref_column_idx != idx
					|| !cast.is_identity()
					|| base_schema.columns()[*ref_column_idx].nullable != column_mapping.new_column.nullable
			}
		})
	}
}
