// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! End to end schema changes over the in-memory storage engine.

mod failures;
mod job;
mod sorting;

use std::sync::Arc;

use strata_core::{
	TabletId, TabletSchema,
	interface::{ExprEvaluator, StorageEngine, TabletState},
};
use strata_schema_change::{AlterTabletRequest, ConversionRegistry, SchemaChangeConfig, SchemaChangeJob};
use strata_testing::{ClosureEvaluator, MemoryStorageEngine, MemoryTablet, init_tracing};

pub const BASE: TabletId = TabletId(1);
pub const NEW: TabletId = TabletId(2);

pub struct Harness {
	pub engine: Arc<MemoryStorageEngine>,
	pub evaluator: ClosureEvaluator,
	pub registry: Arc<ConversionRegistry>,
	pub config: SchemaChangeConfig,
}

pub fn harness() -> Harness {
	init_tracing();
	let evaluator = ClosureEvaluator::new();
	let shared: Arc<dyn ExprEvaluator> = Arc::new(evaluator.clone());
	Harness {
		engine: MemoryStorageEngine::new(shared),
		evaluator,
		registry: Arc::new(ConversionRegistry::new()),
		config: SchemaChangeConfig::default(),
	}
}

impl Harness {
	pub fn base_tablet(&self, schema: &Arc<TabletSchema>, merge_on_write: bool) -> Arc<MemoryTablet> {
		self.engine.create_tablet(BASE, Arc::clone(schema), TabletState::Running, merge_on_write)
	}

	pub fn new_tablet(&self, schema: &Arc<TabletSchema>, merge_on_write: bool) -> Arc<MemoryTablet> {
		self.engine.create_tablet(NEW, Arc::clone(schema), TabletState::NotReady, merge_on_write)
	}

	pub fn request(&self, base: &Arc<TabletSchema>, new: &Arc<TabletSchema>, alter_version: u64) -> AlterTabletRequest {
		AlterTabletRequest::new(BASE, NEW, Arc::clone(base), Arc::clone(new), alter_version)
	}

	pub fn job(&self, request: &AlterTabletRequest) -> SchemaChangeJob {
		let engine: Arc<dyn StorageEngine> = self.engine.clone();
		let evaluator: Arc<dyn ExprEvaluator> = Arc::new(self.evaluator.clone());
		SchemaChangeJob::new(engine, evaluator, request, "test-job")
			.unwrap()
			.with_config(self.config.clone())
			.with_registry(Arc::clone(&self.registry))
	}

	/// Rowsets in the store that no tablet shows, i.e. intermediate runs.
	pub fn hidden_rowsets(&self) -> usize {
		let visible = [BASE, NEW]
			.iter()
			.filter_map(|id| self.engine.tablet(*id))
			.map(|tablet| strata_core::interface::Tablet::rowsets(tablet.as_ref()).len())
			.sum::<usize>();
		self.engine.store().len() - visible
	}
}
