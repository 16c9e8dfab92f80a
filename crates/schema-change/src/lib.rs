// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

//! Online schema change of columnar tablets: converts the rowsets of a base
//! tablet into a new tablet with a changed schema while loads continue.

mod cast;
mod changer;
mod config;
mod error;
mod job;
mod mapping;
mod procedure;
mod registry;
mod request;

pub use cast::{Cast, CastFailure, parse_literal};
pub use changer::{BlockChanger, ChangedBlock};
pub use config::SchemaChangeConfig;
pub use error::{Result, SchemaChangeError};
pub use job::{JobState, JobStats, ParsedRequest, SHADOW_COLUMN_PREFIX, SchemaChangeJob, SchemaChangeParams};
pub use mapping::{ColumnMapping, ColumnSource, SchemaMapping};
pub use procedure::{
	LinkedSchemaChange, ProcedureKind, RowCounts, SchemaChangeDirectly, SchemaChangeProcedure, SchemaChangeWithSorting,
};
pub use registry::{ConversionRegistry, ConvertingGuard};
pub use request::{AlterTabletRequest, AlterTabletType, MaterializedViewParam};
