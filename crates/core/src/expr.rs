// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

/// Opaque expression handed to an [`ExprEvaluator`](crate::interface::ExprEvaluator).
///
/// Only the root function name is inspected here, everything else belongs
/// to the evaluator.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Expr {
	source: String,
	root_function: Option<String>,
}

impl Expr {
	pub fn new(source: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			root_function: None,
		}
	}

	pub fn call(function: impl Into<String>, source: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			root_function: Some(function.into()),
		}
	}

	pub fn source(&self) -> &str {
		&self.source
	}

	pub fn root_function(&self) -> Option<&str> {
		self.root_function.as_deref()
	}
}

impl Display for Expr {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.source)
	}
}
