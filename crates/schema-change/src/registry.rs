// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashSet, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use strata_core::TabletId;
use tracing::{debug, warn};

use crate::error::{Result, SchemaChangeError};

static GLOBAL: Lazy<Arc<ConversionRegistry>> = Lazy::new(|| Arc::new(ConversionRegistry::new()));

/// Tablets with an alteration in flight.
#[derive(Debug, Default)]
pub struct ConversionRegistry {
	tablets: RwLock<HashSet<TabletId>>,
}

impl ConversionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// The registry shared by every job of the process.
	pub fn global() -> Arc<Self> {
		Arc::clone(&GLOBAL)
	}

	/// Registers all `tablets` or none of them. The entries are removed when
	/// the guard drops.
	pub fn register(self: &Arc<Self>, tablets: &[TabletId]) -> Result<ConvertingGuard> {
		let mut registered = self.tablets.write();
		if let Some(busy) = tablets.iter().find(|tablet| registered.contains(*tablet)) {
			warn!(tablet = %busy, "tablet is already under alteration");
			return Err(SchemaChangeError::ConcurrentAlteration(*busy));
		}

		registered.extend(tablets.iter().copied());
		debug!(?tablets, "registered converting tablets");
		Ok(ConvertingGuard {
			registry: Arc::clone(self),
			tablets: tablets.to_vec(),
		})
	}

	pub fn contains(&self, tablet: TabletId) -> bool {
		self.tablets.read().contains(&tablet)
	}

	pub fn len(&self) -> usize {
		self.tablets.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.tablets.read().is_empty()
	}

	fn unregister(&self, tablets: &[TabletId]) {
		let mut registered = self.tablets.write();
		for tablet in tablets {
			registered.remove(tablet);
		}
		debug!(?tablets, "unregistered converting tablets");
	}
}

#[must_use]
#[derive(Debug)]
pub struct ConvertingGuard {
	registry: Arc<ConversionRegistry>,
	tablets: Vec<TabletId>,
}

impl ConvertingGuard {
	pub fn tablets(&self) -> &[TabletId] {
		&self.tablets
	}
}

impl Drop for ConvertingGuard {
	fn drop(&mut self) {
		self.registry.unregister(&self.tablets);
	}
}
