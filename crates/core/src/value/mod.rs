// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod date;
mod ordered_float;
mod r#type;

use std::fmt::{Display, Formatter};

pub use date::{format_date, parse_date};
pub use ordered_float::{OrderedF32, OrderedF64};
pub use r#type::Type;

/// A single cell. Variants order before their payload, so `Null` sorts first.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
	Null,
	Boolean(bool),
	Int1(i8),
	Int2(i16),
	Int4(i32),
	Int8(i64),
	Int16(i128),
	Float4(OrderedF32),
	Float8(OrderedF64),
	Utf8(String),
	Date(i32),
}

impl Value {
	pub fn float4(v: f32) -> Self {
		Value::Float4(v.into())
	}

	pub fn float8(v: f64) -> Self {
		Value::Float8(v.into())
	}

	pub fn utf8(v: impl Into<String>) -> Self {
		Value::Utf8(v.into())
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Integer payload widened to i128, booleans count as 0 and 1.
	pub fn as_i128(&self) -> Option<i128> {
		match self {
			Value::Boolean(v) => Some(*v as i128),
			Value::Int1(v) => Some(*v as i128),
			Value::Int2(v) => Some(*v as i128),
			Value::Int4(v) => Some(*v as i128),
			Value::Int8(v) => Some(*v as i128),
			Value::Int16(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Float4(v) => Some(v.value() as f64),
			Value::Float8(v) => Some(v.value()),
			_ => self.as_i128().map(|v| v as f64),
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Utf8(v) => Some(v.as_str()),
			_ => None,
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Null => f.write_str("null"),
			Value::Boolean(v) => Display::fmt(v, f),
			Value::Int1(v) => Display::fmt(v, f),
			Value::Int2(v) => Display::fmt(v, f),
			Value::Int4(v) => Display::fmt(v, f),
			Value::Int8(v) => Display::fmt(v, f),
			Value::Int16(v) => Display::fmt(v, f),
			Value::Float4(v) => Display::fmt(v, f),
			Value::Float8(v) => Display::fmt(v, f),
			Value::Utf8(v) => Display::fmt(v, f),
			Value::Date(v) => f.write_str(&format_date(*v)),
		}
	}
}
