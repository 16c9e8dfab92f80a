// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Logical column types of a tablet schema.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
	/// A boolean: true or false.
	Boolean,
	/// A 1-byte signed integer
	Int1,
	/// A 2-byte signed integer
	Int2,
	/// A 4-byte signed integer
	Int4,
	/// An 8-byte signed integer
	Int8,
	/// A 16-byte signed integer
	Int16,
	/// A 4-byte floating point
	Float4,
	/// An 8-byte floating point
	Float8,
	/// A UTF-8 string of at most the given number of bytes.
	Varchar(u32),
	/// An unbounded UTF-8 string.
	Utf8,
	/// Days since 1970-01-01.
	Date,
}

impl Type {
	pub fn is_integer(&self) -> bool {
		matches!(self, Type::Int1 | Type::Int2 | Type::Int4 | Type::Int8 | Type::Int16)
	}

	pub fn is_floating_point(&self) -> bool {
		matches!(self, Type::Float4 | Type::Float8)
	}

	pub fn is_number(&self) -> bool {
		self.is_integer() || self.is_floating_point()
	}

	pub fn is_string(&self) -> bool {
		matches!(self, Type::Varchar(_) | Type::Utf8)
	}

	/// Position on the integer widening ladder. Boolean is the narrowest rung.
	pub fn integer_rank(&self) -> Option<u8> {
		match self {
			Type::Boolean => Some(0),
			Type::Int1 => Some(1),
			Type::Int2 => Some(2),
			Type::Int4 => Some(3),
			Type::Int8 => Some(4),
			Type::Int16 => Some(5),
			_ => None,
		}
	}

	/// Maximum byte length accepted by a string type.
	pub fn max_len(&self) -> Option<usize> {
		match self {
			Type::Varchar(len) => Some(*len as usize),
			_ => None,
		}
	}
}

impl Display for Type {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Type::Boolean => f.write_str("BOOLEAN"),
			Type::Int1 => f.write_str("INT1"),
			Type::Int2 => f.write_str("INT2"),
			Type::Int4 => f.write_str("INT4"),
			Type::Int8 => f.write_str("INT8"),
			Type::Int16 => f.write_str("INT16"),
			Type::Float4 => f.write_str("FLOAT4"),
			Type::Float8 => f.write_str("FLOAT8"),
			Type::Varchar(len) => write!(f, "VARCHAR({len})"),
			Type::Utf8 => f.write_str("UTF8"),
			Type::Date => f.write_str("DATE"),
		}
	}
}
