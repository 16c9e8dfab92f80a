// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::{
	Result,
	block::{Block, ColumnData},
	expr::Expr,
	value::Type,
};

/// Runs filter and derivation expressions against a block.
pub trait ExprEvaluator: Send + Sync {
	/// Produces one value of `result_type` per row of `block`.
	fn evaluate(&self, expr: &Expr, block: &Block, result_type: Type) -> Result<ColumnData>;

	/// One entry per row of `block`, `true` keeps the row.
	fn filter(&self, expr: &Expr, block: &Block) -> Result<Vec<bool>>;
}
