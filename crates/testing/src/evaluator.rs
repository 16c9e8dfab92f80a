// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use strata_core::{Block, ColumnData, Error, Expr, Result, Type, Value, interface::ExprEvaluator};

type EvalFn = Arc<dyn Fn(&Block, Type) -> Result<ColumnData> + Send + Sync>;
type FilterFn = Arc<dyn Fn(&Block) -> Result<Vec<bool>> + Send + Sync>;

/// Evaluates expressions by looking up closures registered for their source
/// text.
#[derive(Clone, Default)]
pub struct ClosureEvaluator {
	exprs: Arc<RwLock<HashMap<String, EvalFn>>>,
	filters: Arc<RwLock<HashMap<String, FilterFn>>>,
}

impl ClosureEvaluator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_expr(
		&self,
		source: impl Into<String>,
		eval: impl Fn(&Block, Type) -> Result<ColumnData> + Send + Sync + 'static,
	) {
		self.exprs.write().insert(source.into(), Arc::new(eval));
	}

	pub fn register_filter(
		&self,
		source: impl Into<String>,
		filter: impl Fn(&Block) -> Result<Vec<bool>> + Send + Sync + 'static,
	) {
		self.filters.write().insert(source.into(), Arc::new(filter));
	}

	/// Selects rows whose value in `column` satisfies `predicate`.
	pub fn register_column_filter(
		&self,
		source: impl Into<String>,
		column: impl Into<String>,
		predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
	) {
		let column = column.into();
		self.register_filter(source, move |block| {
			let data = &block
				.column_by_name(&column)
				.ok_or_else(|| Error::Internal(format!("column '{column}' not in block")))?
				.data;
			Ok(data.iter().map(|value| predicate(&value)).collect())
		});
	}

	/// Maps every value of `column` through `map`.
	pub fn register_column_map(
		&self,
		source: impl Into<String>,
		column: impl Into<String>,
		map: impl Fn(&Value) -> Value + Send + Sync + 'static,
	) {
		let column = column.into();
		self.register_expr(source, move |block, result_type| {
			let data = &block
				.column_by_name(&column)
				.ok_or_else(|| Error::Internal(format!("column '{column}' not in block")))?
				.data;
			ColumnData::from_values(result_type, data.iter().map(|value| map(&value)))
		});
	}
}

impl ExprEvaluator for ClosureEvaluator {
	fn evaluate(&self, expr: &Expr, block: &Block, result_type: Type) -> Result<ColumnData> {
		let eval = self.exprs.read().get(expr.source()).cloned().ok_or_else(|| Error::Expression {
			expr: expr.to_string(),
			reason: "no evaluator registered".to_string(),
		})?;
		eval(block, result_type)
	}

	fn filter(&self, expr: &Expr, block: &Block) -> Result<Vec<bool>> {
		let filter = self.filters.read().get(expr.source()).cloned().ok_or_else(|| Error::Expression {
			expr: expr.to_string(),
			reason: "no filter registered".to_string(),
		})?;
		filter(block)
	}
}
