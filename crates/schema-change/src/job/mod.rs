// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod delete_bitmap;
mod parse;
mod versions;

use std::sync::Arc;

pub use parse::{ParsedRequest, SHADOW_COLUMN_PREFIX, SchemaChangeParams};
use strata_core::{
	DeleteHandler, KeysType, ReaderContext, RowsetMeta, RowsetWriterContext, SegmentsOverlap, TabletId,
	TabletSchema, Version, WriteType,
	interface::{ExprEvaluator, StorageEngine, Tablet, TabletState},
};
use tracing::{debug, error, info, instrument, warn};
use versions::{capture_consistent_rowsets, max_continuous_version};

use crate::{
	config::SchemaChangeConfig,
	error::{Result, SchemaChangeError},
	procedure::{ProcedureKind, RowCounts, SchemaChangeProcedure},
	registry::ConversionRegistry,
	request::AlterTabletRequest,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobState {
	Created,
	Registered,
	VersionsDiscovered,
	Converting,
	Validated,
	DeleteBitmapRecomputed,
	Done,
	Failed,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobStats {
	pub procedure: Option<ProcedureKind>,
	pub converted_versions: Vec<Version>,
	/// Versions the new tablet already held.
	pub skipped_versions: Vec<Version>,
	pub rows: RowCounts,
}

impl JobStats {
	/// Highest version brought into the new tablet by this job.
	pub fn real_alter_version(&self) -> Option<u64> {
		self.converted_versions.iter().chain(&self.skipped_versions).map(|v| v.end).max()
	}
}

/// Converts the historical rowsets of a base tablet into a new tablet.
pub struct SchemaChangeJob {
	engine: Arc<dyn StorageEngine>,
	evaluator: Arc<dyn ExprEvaluator>,
	registry: Arc<ConversionRegistry>,
	config: SchemaChangeConfig,
	base_tablet: Arc<dyn Tablet>,
	new_tablet: Arc<dyn Tablet>,
	base_tablet_schema: Arc<TabletSchema>,
	new_tablet_schema: Arc<TabletSchema>,
	job_id: String,
	state: JobState,
	stats: JobStats,
}

impl SchemaChangeJob {
	pub fn new(
		engine: Arc<dyn StorageEngine>,
		evaluator: Arc<dyn ExprEvaluator>,
		request: &AlterTabletRequest,
		job_id: impl Into<String>,
	) -> Result<Self> {
		let base_tablet = engine.get_tablet(request.base_tablet_id)?;
		let new_tablet = engine.get_tablet(request.new_tablet_id)?;
		Ok(Self {
			engine,
			evaluator,
			registry: ConversionRegistry::global(),
			config: SchemaChangeConfig::default(),
			base_tablet,
			new_tablet,
			base_tablet_schema: Arc::clone(&request.base_schema),
			new_tablet_schema: Arc::clone(&request.new_schema),
			job_id: job_id.into(),
			state: JobState::Created,
			stats: JobStats::default(),
		})
	}

	pub fn with_config(mut self, config: SchemaChangeConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_registry(mut self, registry: Arc<ConversionRegistry>) -> Self {
		self.registry = registry;
		self
	}

	pub fn job_id(&self) -> &str {
		&self.job_id
	}

	pub fn state(&self) -> JobState {
		self.state
	}

	pub fn stats(&self) -> &JobStats {
		&self.stats
	}

	pub fn tablet_in_converting(&self, tablet_id: TabletId) -> bool {
		self.registry.contains(tablet_id)
	}

	/// Runs the whole alteration. The new tablet turns `Running` only on
	/// success. Any failure leaves it `NotReady` for the caller to drop.
	#[instrument(
		name = "schema_change::job::process_alter_tablet",
		level = "info",
		skip_all,
		fields(
			job_id = %self.job_id,
			base_tablet = %request.base_tablet_id,
			new_tablet = %request.new_tablet_id,
			alter_version = request.alter_version
		)
	)]
	pub fn process_alter_tablet(&mut self, request: &AlterTabletRequest) -> Result<()> {
		let result = self.run(request);
		match &result {
			Ok(()) => {
				self.transition(JobState::Done);
				info!(
					procedure = ?self.stats.procedure,
					converted = self.stats.converted_versions.len(),
					skipped = self.stats.skipped_versions.len(),
					rows = %self.stats.rows,
					"schema change finished"
				);
			}
			Err(err) => {
				error!(code = err.code(), error = %err, "schema change failed");
				self.transition(JobState::Failed);
			}
		}
		result
	}

	fn run(&mut self, request: &AlterTabletRequest) -> Result<()> {
		self.stats = JobStats::default();
		self.validate_request(request)?;
		let _converting = self.registry.register(&[request.base_tablet_id, request.new_tablet_id])?;
		self.transition(JobState::Registered);
		self.do_process_alter_tablet(request)
	}

	fn transition(&mut self, next: JobState) {
		debug!(job_id = %self.job_id, from = ?self.state, to = ?next, "schema change job transition");
		self.state = next;
	}

	fn validate_request(&self, request: &AlterTabletRequest) -> Result<()> {
		if request.base_tablet_id == request.new_tablet_id {
			return Err(SchemaChangeError::InvalidRequest(format!(
				"base and new tablet are both {}",
				request.base_tablet_id
			)));
		}

		if request.base_tablet_id != self.base_tablet.tablet_id() || request.new_tablet_id != self.new_tablet.tablet_id()
		{
			return Err(SchemaChangeError::InvalidRequest(format!(
				"request for {} -> {} does not match job tablets {} -> {}",
				request.base_tablet_id,
				request.new_tablet_id,
				self.base_tablet.tablet_id(),
				self.new_tablet.tablet_id()
			)));
		}

		if !self.config.accepts_exec_version(request.be_exec_version) {
			return Err(SchemaChangeError::InvalidRequest(format!(
				"exec version {} is outside [{}, {}]",
				request.be_exec_version, self.config.min_exec_version, self.config.max_exec_version
			)));
		}

		for param in &request.materialized_view_params {
			if request.new_schema.field_index(&param.column_name).is_none() {
				return Err(SchemaChangeError::InvalidRequest(format!(
					"materialized column '{}' is not part of the new schema",
					param.column_name
				)));
			}
		}
		Ok(())
	}

	fn do_process_alter_tablet(&mut self, request: &AlterTabletRequest) -> Result<()> {
		let new_state = self.new_tablet.tablet_state();
		if new_state != TabletState::NotReady {
			return Err(SchemaChangeError::InvalidRequest(format!(
				"new tablet {} is {new_state:?}, expected NotReady",
				self.new_tablet.tablet_id()
			)));
		}

		let (rowsets, end_version) = self.get_versions_to_be_changed(request.alter_version)?;
		self.transition(JobState::VersionsDiscovered);

		let delete_handler = DeleteHandler::init(self.base_tablet.delete_predicates(), end_version);
		let params = SchemaChangeParams {
			alter_tablet_type: request.alter_tablet_type,
			enable_unique_key_merge_on_write: self.new_tablet.enable_unique_key_merge_on_write(),
			delete_handler: &delete_handler,
			materialized_params_map: request
				.materialized_view_params
				.iter()
				.map(|param| (param.column_name.clone(), param.clone()))
				.collect(),
			be_exec_version: request.be_exec_version,
			where_expr: request.where_expr.clone(),
			supported_mv_functions: &self.config.supported_mv_functions,
		};
		let parsed = Self::parse_request(
			&params,
			&self.base_tablet_schema,
			&self.new_tablet_schema,
			Arc::clone(&self.evaluator),
		)?;
		self.stats.procedure = Some(parsed.kind());

		self.transition(JobState::Converting);
		self.convert_historical_rowsets(&rowsets, &parsed, &delete_handler)?;

		self.validate_alter_result(request, end_version, parsed.changer.has_where())?;
		self.transition(JobState::Validated);

		if self.new_tablet.keys_type() == KeysType::Unique && self.new_tablet.enable_unique_key_merge_on_write() {
			self.calc_delete_bitmap_for_mow_table(request.alter_version)?;
			self.transition(JobState::DeleteBitmapRecomputed);
		}

		self.new_tablet.set_tablet_state(TabletState::Running)?;
		Ok(())
	}

	/// Rowsets of the base tablet on a consistent path from version 0 to its
	/// latest version, minus those the new tablet already holds.
	fn get_versions_to_be_changed(&mut self, alter_version: u64) -> Result<(Vec<RowsetMeta>, u64)> {
		let base_tablet_id = self.base_tablet.tablet_id();
		let base_rowsets = self.base_tablet.rowsets();
		let Some(max_version) = self.base_tablet.max_version().map(|v| v.end) else {
			return Err(SchemaChangeError::VersionGap {
				tablet: base_tablet_id,
				reason: "base tablet has no versions".to_string(),
			});
		};

		if alter_version > max_version {
			return Err(SchemaChangeError::VersionGap {
				tablet: base_tablet_id,
				reason: format!("alter version {alter_version} is beyond max version {max_version}"),
			});
		}

		let path = capture_consistent_rowsets(&base_rowsets, Version::new(0, max_version)).map_err(|reason| {
			SchemaChangeError::VersionGap {
				tablet: base_tablet_id,
				reason,
			}
		})?;

		let existing = self.new_tablet.rowsets();
		let mut to_convert = Vec::with_capacity(path.len());
		for rowset in path {
			if existing.iter().any(|e| e.version == rowset.version) {
				self.stats.skipped_versions.push(rowset.version);
				continue;
			}

			if let Some(conflict) = existing.iter().find(|e| e.version.overlaps(&rowset.version)) {
				return Err(SchemaChangeError::VersionGap {
					tablet: self.new_tablet.tablet_id(),
					reason: format!("version {} overlaps converted version {}", rowset.version, conflict.version),
				});
			}
			to_convert.push(rowset);
		}

		info!(
			max_version,
			to_convert = to_convert.len(),
			skipped = self.stats.skipped_versions.len(),
			"found versions to be changed"
		);
		Ok((to_convert, max_version))
	}

	fn convert_historical_rowsets(
		&mut self,
		rowsets: &[RowsetMeta],
		parsed: &ParsedRequest,
		delete_handler: &DeleteHandler,
	) -> Result<()> {
		for rowset in rowsets {
			let mut reader_context = ReaderContext::new(Arc::clone(&self.base_tablet_schema));
			reader_context.delete_predicates = delete_handler.applicable_to(rowset.version);
			reader_context.batch_size = self.config.block_rows;
			let mut reader = self.base_tablet.create_rowset_reader(rowset, reader_context)?;

			let mut writer_context =
				RowsetWriterContext::new(self.new_tablet.tablet_id(), rowset.version, Arc::clone(&self.new_tablet_schema));
			writer_context.segments_overlap = if parsed.sc_sorting {
				SegmentsOverlap::NonOverlapping
			} else {
				rowset.segments_overlap
			};
			writer_context.newest_write_timestamp = rowset.newest_write_timestamp;
			writer_context.delete_predicate = rowset.delete_predicate.clone();
			writer_context.write_type = WriteType::SchemaChange;
			let mut writer = self.new_tablet.create_rowset_writer(writer_context.clone())?;
			// pinned until the rowset is visible in the new tablet
			let _pending_guard = self.engine.add_pending_rowset(&writer_context);

			let mut procedure = SchemaChangeProcedure::new(
				&parsed.changer,
				parsed.sc_sorting,
				parsed.sc_directly,
				self.engine.as_ref(),
				&self.config,
			);
			if let Err(err) = procedure.process(
				reader.as_mut(),
				writer.as_mut(),
				self.new_tablet.as_ref(),
				self.base_tablet.as_ref(),
				&self.base_tablet_schema,
				&self.new_tablet_schema,
			) {
				warn!(version = %rowset.version, rowset = %rowset.rowset_id, error = %err, "failed to process the version");
				return Err(err);
			}
			let counts = procedure.row_counts(reader.as_ref(), writer.as_ref());

			let new_rowset = writer.build()?;
			self.new_tablet.add_rowset(new_rowset.clone())?;

			self.stats.rows += counts;
			self.stats.converted_versions.push(rowset.version);
			info!(
				version = %rowset.version,
				source_rowset = %rowset.rowset_id,
				new_rowset = %new_rowset.rowset_id,
				rows = new_rowset.num_rows,
				"converted historical rowset"
			);
		}
		Ok(())
	}

	fn validate_alter_result(&self, request: &AlterTabletRequest, end_version: u64, has_where: bool) -> Result<()> {
		if let Some(real) = self.stats.real_alter_version().filter(|real| *real != end_version) {
			return Err(SchemaChangeError::ValidationFailed(format!(
				"last converted version {real} differs from expected version {end_version}"
			)));
		}

		let new_rowsets = self.new_tablet.rowsets();
		let max_continuous = max_continuous_version(&new_rowsets).ok_or_else(|| {
			SchemaChangeError::ValidationFailed(format!(
				"new tablet {} has no version path from 0",
				self.new_tablet.tablet_id()
			))
		})?;
		if max_continuous < end_version.max(request.alter_version) {
			return Err(SchemaChangeError::ValidationFailed(format!(
				"new tablet max continuous version {max_continuous} is behind version {end_version}"
			)));
		}

		if !has_where && !self.stats.rows.is_conserved() {
			return Err(SchemaChangeError::ValidationFailed(format!("rows are not conserved: {}", self.stats.rows)));
		}
		Ok(())
	}
}
