// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::common::{RowsetId, TabletId};

/// Failures reported by the storage collaborators (tablets, rowset readers and
/// writers, the expression evaluator).
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("tablet {0} not found")]
	TabletNotFound(TabletId),

	#[error("rowset {0} not found")]
	RowsetNotFound(RowsetId),

	#[error("column of type {expected} cannot hold value {found}")]
	TypeMismatch {
		expected: &'static str,
		found: String,
	},

	#[error("invalid schema: {0}")]
	InvalidSchema(String),

	#[error("failed to evaluate expression `{expr}`: {reason}")]
	Expression {
		expr: String,
		reason: String,
	},

	#[error("rowset writer {0} is already built")]
	WriterClosed(RowsetId),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	#[error("internal error: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
