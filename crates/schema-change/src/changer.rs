// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{borrow::Cow, sync::Arc};

use strata_core::{
	Block, Column, ColumnData, Expr, TabletSchema, Value, interface::ExprEvaluator,
};
use tracing::{instrument, trace};

use crate::{
	error::{Result, SchemaChangeError},
	mapping::{ColumnMapping, ColumnSource, SchemaMapping},
	request::AlterTabletType,
};

/// Result of converting one base block.
#[derive(Debug)]
pub struct ChangedBlock {
	pub block: Block,
	/// Rows dropped by the where predicate.
	pub filtered_rows: u64,
}

/// Converts blocks of the base schema into blocks of the new schema.
pub struct BlockChanger {
	new_schema: Arc<TabletSchema>,
	schema_mapping: SchemaMapping,
	evaluator: Arc<dyn ExprEvaluator>,
	where_expr: Option<Expr>,
	alter_type: AlterTabletType,
	compatible_version: i32,
}

impl BlockChanger {
	pub fn new(
		new_schema: Arc<TabletSchema>,
		schema_mapping: SchemaMapping,
		evaluator: Arc<dyn ExprEvaluator>,
	) -> Self {
		Self {
			new_schema,
			schema_mapping,
			evaluator,
			where_expr: None,
			alter_type: AlterTabletType::SchemaChange,
			compatible_version: -1,
		}
	}

	pub fn schema_mapping(&self) -> &SchemaMapping {
		&self.schema_mapping
	}

	pub fn set_where_expr(&mut self, where_expr: Option<Expr>) {
		self.where_expr = where_expr;
	}

	pub fn set_type(&mut self, alter_type: AlterTabletType) {
		self.alter_type = alter_type;
	}

	pub fn set_compatible_version(&mut self, version: i32) {
		self.compatible_version = version;
	}

	pub fn has_where(&self) -> bool {
		self.where_expr.is_some()
	}

	pub fn alter_type(&self) -> AlterTabletType {
		self.alter_type
	}

	pub fn compatible_version(&self) -> i32 {
		self.compatible_version
	}

	pub fn new_schema(&self) -> &Arc<TabletSchema> {
		&self.new_schema
	}

	/// Converts `ref_block`. Either every column converts or no block is
	/// produced.
	#[instrument(name = "schema_change::changer::change_block", level = "trace", skip_all, fields(rows = ref_block.row_count()))]
	pub fn change_block(&self, ref_block: &Block) -> Result<ChangedBlock> {
		let source_rows = ref_block.row_count();
		let ref_block = self.apply_where(ref_block)?;
		let row_count = ref_block.row_count();
		let filtered_rows = (source_rows - row_count) as u64;

		// casts and expressions fail before any default is materialized
		let mut converted: Vec<Option<ColumnData>> = Vec::with_capacity(self.schema_mapping.len());
		for mapping in self.schema_mapping.iter() {
			converted.push(self.convert_column(mapping, &ref_block, row_count)?);
		}

		let mut columns = Vec::with_capacity(converted.len());
		for (mapping, data) in self.schema_mapping.iter().zip(converted) {
			let new_column = &mapping.new_column;
			let data = match (data, &mapping.source) {
				(Some(data), _) => data,
				(None, ColumnSource::Default(value)) => ColumnData::repeat(new_column.ty, value, row_count)?,
				(None, _) => {
					return Err(strata_core::Error::Internal(format!(
						"column '{}' produced no data",
						new_column.name
					))
					.into());
				}
			};
			columns.push(Column::new(new_column.name.clone(), new_column.ty, data));
		}

		trace!(rows = row_count, filtered_rows, "changed block");
		Ok(ChangedBlock {
			block: Block::new(columns),
			filtered_rows,
		})
	}

	fn apply_where<'b>(&self, ref_block: &'b Block) -> Result<Cow<'b, Block>> {
		let Some(where_expr) = &self.where_expr else {
			return Ok(Cow::Borrowed(ref_block));
		};

		let mask = self.evaluator.filter(where_expr, ref_block)?;
		if mask.len() != ref_block.row_count() {
			return Err(strata_core::Error::Expression {
				expr: where_expr.to_string(),
				reason: format!("filter returned {} entries for {} rows", mask.len(), ref_block.row_count()),
			}
			.into());
		}

		if mask.iter().all(|keep| *keep) {
			Ok(Cow::Borrowed(ref_block))
		} else {
			Ok(Cow::Owned(ref_block.filter(&mask)))
		}
	}

	/// Converts a referenced or derived column. Defaults yield `None`.
	fn convert_column(&self, mapping: &ColumnMapping, ref_block: &Block, row_count: usize) -> Result<Option<ColumnData>> {
		let new_column = &mapping.new_column;
		let data = match &mapping.source {
			ColumnSource::Default(_) => return Ok(None),
			ColumnSource::Reference {
				ref_column_idx,
				cast,
			} => {
				let ref_column = self.ref_column(ref_block, *ref_column_idx)?;
				cast.apply(&ref_column.data).map_err(|failure| SchemaChangeError::CastInvalid {
					column: new_column.name.clone(),
					from: cast.from,
					to: cast.to,
					reason: format!("row {} value {}: {}", failure.row, failure.value, failure.reason),
				})?
			}
			ColumnSource::Derived {
				expr,
				ref_column_idx,
			} => {
				let data = self.evaluator.evaluate(expr, ref_block, new_column.ty)?;
				if data.len() != row_count {
					return Err(strata_core::Error::Expression {
						expr: expr.to_string(),
						reason: format!("returned {} values for {} rows", data.len(), row_count),
					}
					.into());
				}
				if let Some(ref_column_idx) = ref_column_idx {
					let ref_column = self.ref_column(ref_block, *ref_column_idx)?;
					Self::check_nulls_preserved(mapping, ref_column, &data)?;
				}
				data
			}
		};

		if !new_column.nullable && data.null_count() > 0 {
			let from = match &mapping.source {
				ColumnSource::Reference {
					cast,
					..
				} => cast.from,
				_ => new_column.ty,
			};
			return Err(SchemaChangeError::CastInvalid {
				column: new_column.name.clone(),
				from,
				to: new_column.ty,
				reason: format!("{} null values in non-nullable column", data.null_count()),
			});
		}

		Ok(Some(data))
	}

	fn ref_column<'b>(&self, ref_block: &'b Block, index: usize) -> Result<&'b Column> {
		ref_block.column(index).ok_or_else(|| {
			strata_core::Error::Internal(format!(
				"referenced column {index} missing from block of {} columns",
				ref_block.column_count()
			))
			.into()
		})
	}

	/// A derived value may only be null where its origin value is null.
	fn check_nulls_preserved(mapping: &ColumnMapping, ref_column: &Column, data: &ColumnData) -> Result<()> {
		for (row, (origin, derived)) in ref_column.data.iter().zip(data.iter()).enumerate() {
			if !origin.is_null() && derived == Value::Null {
				return Err(SchemaChangeError::CastInvalid {
					column: mapping.new_column.name.clone(),
					from: ref_column.ty,
					to: mapping.new_column.ty,
					reason: format!("row {row} value {origin} became null"),
				});
			}
		}
		Ok(())
	}
}
