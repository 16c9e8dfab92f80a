// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	cmp::Ordering,
	fmt,
	fmt::{Display, Formatter},
	hash::{Hash, Hasher},
	ops::Deref,
};

macro_rules! ordered_float {
	($name:ident, $float:ty) => {
		/// Totally ordered float. Negative zero is folded into zero so that
		/// equality, ordering and hashing agree; NaN sorts after every number.
		#[repr(transparent)]
		#[derive(Debug, Copy, Clone, Default)]
		pub struct $name($float);

		impl $name {
			pub fn value(&self) -> $float {
				self.0
			}
		}

		impl From<$float> for $name {
			fn from(f: $float) -> Self {
				let normalized = if f == 0.0 {
					0.0
				} else {
					f
				};
				Self(normalized)
			}
		}

		impl From<$name> for $float {
			fn from(v: $name) -> Self {
				v.0
			}
		}

		impl Deref for $name {
			type Target = $float;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}

		impl Display for $name {
			fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
				Display::fmt(&self.0, f)
			}
		}

		impl PartialEq for $name {
			fn eq(&self, other: &Self) -> bool {
				self.0.to_bits() == other.0.to_bits()
			}
		}

		impl Eq for $name {}

		impl PartialOrd for $name {
			fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
				Some(self.cmp(other))
			}
		}

		impl Ord for $name {
			fn cmp(&self, other: &Self) -> Ordering {
				self.0.total_cmp(&other.0)
			}
		}

		impl Hash for $name {
			fn hash<H: Hasher>(&self, state: &mut H) {
				self.0.to_bits().hash(state);
			}
		}
	};
}

ordered_float!(OrderedF32, f32);
ordered_float!(OrderedF64, f64);
