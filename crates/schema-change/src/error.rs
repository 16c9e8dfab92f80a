// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_core::{TabletId, Type};

use crate::procedure::RowCounts;

#[derive(Debug, thiserror::Error)]
pub enum SchemaChangeError {
	#[error("cannot cast column '{column}' from {from} to {to}: {reason}")]
	CastInvalid {
		column: String,
		from: Type,
		to: Type,
		reason: String,
	},

	#[error("no source for new column '{column}': {reason}")]
	UnsupportedMapping {
		column: String,
		reason: String,
	},

	#[error("schema change check row nums failed: {0}")]
	RowCountMismatch(RowCounts),

	#[error("tablet {0} is already under alteration")]
	ConcurrentAlteration(TabletId),

	#[error("versions of tablet {tablet} are not consistent: {reason}")]
	VersionGap {
		tablet: TabletId,
		reason: String,
	},

	#[error("alter result validation failed: {0}")]
	ValidationFailed(String),

	#[error("failed to recompute delete bitmap of tablet {tablet}: {reason}")]
	DeleteBitmapRecomputeFailed {
		tablet: TabletId,
		reason: String,
	},

	#[error(
		"memory limitation is too small for schema change: limit={limit}, block_bytes={block_bytes}, consumption={consumption}"
	)]
	MemoryLimitExceeded {
		limit: usize,
		block_bytes: usize,
		consumption: usize,
	},

	#[error("invalid alter request: {0}")]
	InvalidRequest(String),

	#[error(transparent)]
	Storage(#[from] strata_core::Error),
}

impl SchemaChangeError {
	pub fn code(&self) -> &'static str {
		match self {
			SchemaChangeError::CastInvalid {
				..
			} => "SC_001",
			SchemaChangeError::UnsupportedMapping {
				..
			} => "SC_002",
			SchemaChangeError::RowCountMismatch(_) => "SC_003",
			SchemaChangeError::ConcurrentAlteration(_) => "SC_004",
			SchemaChangeError::VersionGap {
				..
			} => "SC_005",
			SchemaChangeError::ValidationFailed(_) => "SC_006",
			SchemaChangeError::DeleteBitmapRecomputeFailed {
				..
			} => "SC_007",
			SchemaChangeError::MemoryLimitExceeded {
				..
			} => "SC_008",
			SchemaChangeError::InvalidRequest(_) => "SC_009",
			SchemaChangeError::Storage(strata_core::Error::Io(_)) => "SC_010",
			SchemaChangeError::Storage(_) => "SC_011",
		}
	}

	/// Only transient storage I/O may succeed on a fresh attempt.
	pub fn is_retryable(&self) -> bool {
		matches!(self, SchemaChangeError::Storage(strata_core::Error::Io(_)))
	}
}

pub type Result<T> = std::result::Result<T, SchemaChangeError>;
