// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::{
	Error, Result,
	value::{Type, Value},
};

/// Typed storage of one column. `None` is a null cell.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
	Boolean(Vec<Option<bool>>),
	Int1(Vec<Option<i8>>),
	Int2(Vec<Option<i16>>),
	Int4(Vec<Option<i32>>),
	Int8(Vec<Option<i64>>),
	Int16(Vec<Option<i128>>),
	Float4(Vec<Option<f32>>),
	Float8(Vec<Option<f64>>),
	Utf8(Vec<Option<String>>),
	Date(Vec<Option<i32>>),
}

macro_rules! with_container {
	($data:expr, $v:ident => $body:expr) => {
		match $data {
			ColumnData::Boolean($v) => $body,
			ColumnData::Int1($v) => $body,
			ColumnData::Int2($v) => $body,
			ColumnData::Int4($v) => $body,
			ColumnData::Int8($v) => $body,
			ColumnData::Int16($v) => $body,
			ColumnData::Float4($v) => $body,
			ColumnData::Float8($v) => $body,
			ColumnData::Utf8($v) => $body,
			ColumnData::Date($v) => $body,
		}
	};
}

macro_rules! map_container {
	($data:expr, $v:ident => $body:expr) => {
		match $data {
			ColumnData::Boolean($v) => ColumnData::Boolean($body),
			ColumnData::Int1($v) => ColumnData::Int1($body),
			ColumnData::Int2($v) => ColumnData::Int2($body),
			ColumnData::Int4($v) => ColumnData::Int4($body),
			ColumnData::Int8($v) => ColumnData::Int8($body),
			ColumnData::Int16($v) => ColumnData::Int16($body),
			ColumnData::Float4($v) => ColumnData::Float4($body),
			ColumnData::Float8($v) => ColumnData::Float8($body),
			ColumnData::Utf8($v) => ColumnData::Utf8($body),
			ColumnData::Date($v) => ColumnData::Date($body),
		}
	};
}

impl ColumnData {
	pub fn with_capacity(ty: Type, capacity: usize) -> Self {
		match ty {
			Type::Boolean => ColumnData::Boolean(Vec::with_capacity(capacity)),
			Type::Int1 => ColumnData::Int1(Vec::with_capacity(capacity)),
			Type::Int2 => ColumnData::Int2(Vec::with_capacity(capacity)),
			Type::Int4 => ColumnData::Int4(Vec::with_capacity(capacity)),
			Type::Int8 => ColumnData::Int8(Vec::with_capacity(capacity)),
			Type::Int16 => ColumnData::Int16(Vec::with_capacity(capacity)),
			Type::Float4 => ColumnData::Float4(Vec::with_capacity(capacity)),
			Type::Float8 => ColumnData::Float8(Vec::with_capacity(capacity)),
			Type::Varchar(_) | Type::Utf8 => ColumnData::Utf8(Vec::with_capacity(capacity)),
			Type::Date => ColumnData::Date(Vec::with_capacity(capacity)),
		}
	}

	pub fn empty(ty: Type) -> Self {
		Self::with_capacity(ty, 0)
	}

	pub fn from_values(ty: Type, values: impl IntoIterator<Item = Value>) -> Result<Self> {
		let values = values.into_iter();
		let mut result = Self::with_capacity(ty, values.size_hint().0);
		for value in values {
			result.push(value)?;
		}
		Ok(result)
	}

	/// A column of `len` copies of `value`.
	pub fn repeat(ty: Type, value: &Value, len: usize) -> Result<Self> {
		Self::from_values(ty, std::iter::repeat_n(value.clone(), len))
	}

	pub fn kind(&self) -> &'static str {
		match self {
			ColumnData::Boolean(_) => "BOOLEAN",
			ColumnData::Int1(_) => "INT1",
			ColumnData::Int2(_) => "INT2",
			ColumnData::Int4(_) => "INT4",
			ColumnData::Int8(_) => "INT8",
			ColumnData::Int16(_) => "INT16",
			ColumnData::Float4(_) => "FLOAT4",
			ColumnData::Float8(_) => "FLOAT8",
			ColumnData::Utf8(_) => "UTF8",
			ColumnData::Date(_) => "DATE",
		}
	}

	pub fn len(&self) -> usize {
		with_container!(self, v => v.len())
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn null_count(&self) -> usize {
		with_container!(self, v => v.iter().filter(|x| x.is_none()).count())
	}

	pub fn get(&self, row: usize) -> Value {
		match self {
			ColumnData::Boolean(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Boolean),
			ColumnData::Int1(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Int1),
			ColumnData::Int2(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Int2),
			ColumnData::Int4(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Int4),
			ColumnData::Int8(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Int8),
			ColumnData::Int16(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Int16),
			ColumnData::Float4(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::float4),
			ColumnData::Float8(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::float8),
			ColumnData::Utf8(v) => v.get(row).cloned().flatten().map_or(Value::Null, Value::Utf8),
			ColumnData::Date(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Date),
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
		(0..self.len()).map(|row| self.get(row))
	}

	pub fn push(&mut self, value: Value) -> Result<()> {
		match (self, value) {
			(ColumnData::Boolean(v), Value::Boolean(x)) => v.push(Some(x)),
			(ColumnData::Int1(v), Value::Int1(x)) => v.push(Some(x)),
			(ColumnData::Int2(v), Value::Int2(x)) => v.push(Some(x)),
			(ColumnData::Int4(v), Value::Int4(x)) => v.push(Some(x)),
			(ColumnData::Int8(v), Value::Int8(x)) => v.push(Some(x)),
			(ColumnData::Int16(v), Value::Int16(x)) => v.push(Some(x)),
			(ColumnData::Float4(v), Value::Float4(x)) => v.push(Some(x.value())),
			(ColumnData::Float8(v), Value::Float8(x)) => v.push(Some(x.value())),
			(ColumnData::Utf8(v), Value::Utf8(x)) => v.push(Some(x)),
			(ColumnData::Date(v), Value::Date(x)) => v.push(Some(x)),
			(data, Value::Null) => data.push_null(),
			(data, value) => {
				return Err(Error::TypeMismatch {
					expected: data.kind(),
					found: format!("{value:?}"),
				});
			}
		}
		Ok(())
	}

	pub fn push_null(&mut self) {
		with_container!(self, v => v.push(None))
	}

	/// Keeps the rows whose mask entry is true.
	pub fn filter(&self, mask: &[bool]) -> ColumnData {
		debug_assert_eq!(mask.len(), self.len());
		map_container!(self, v => v.iter().zip(mask).filter(|(_, keep)| **keep).map(|(x, _)| x.clone()).collect())
	}

	/// Gathers the given rows in the given order.
	pub fn take(&self, indices: &[usize]) -> ColumnData {
		map_container!(self, v => indices.iter().map(|&i| v[i].clone()).collect())
	}

	pub fn extend(&mut self, other: &ColumnData) -> Result<()> {
		match (self, other) {
			(ColumnData::Boolean(l), ColumnData::Boolean(r)) => l.extend_from_slice(r),
			(ColumnData::Int1(l), ColumnData::Int1(r)) => l.extend_from_slice(r),
			(ColumnData::Int2(l), ColumnData::Int2(r)) => l.extend_from_slice(r),
			(ColumnData::Int4(l), ColumnData::Int4(r)) => l.extend_from_slice(r),
			(ColumnData::Int8(l), ColumnData::Int8(r)) => l.extend_from_slice(r),
			(ColumnData::Int16(l), ColumnData::Int16(r)) => l.extend_from_slice(r),
			(ColumnData::Float4(l), ColumnData::Float4(r)) => l.extend_from_slice(r),
			(ColumnData::Float8(l), ColumnData::Float8(r)) => l.extend_from_slice(r),
			(ColumnData::Utf8(l), ColumnData::Utf8(r)) => l.extend_from_slice(r),
			(ColumnData::Date(l), ColumnData::Date(r)) => l.extend_from_slice(r),
			(l, r) => {
				return Err(Error::TypeMismatch {
					expected: l.kind(),
					found: r.kind().to_string(),
				});
			}
		}
		Ok(())
	}

	/// Approximate heap footprint, used for memory budgeting.
	pub fn allocated_bytes(&self) -> usize {
		match self {
			ColumnData::Utf8(v) => {
				v.capacity() * size_of::<Option<String>>()
					+ v.iter().flatten().map(|s| s.capacity()).sum::<usize>()
			}
			ColumnData::Boolean(v) => v.capacity() * size_of::<Option<bool>>(),
			ColumnData::Int1(v) => v.capacity() * size_of::<Option<i8>>(),
			ColumnData::Int2(v) => v.capacity() * size_of::<Option<i16>>(),
			ColumnData::Int4(v) => v.capacity() * size_of::<Option<i32>>(),
			ColumnData::Int8(v) => v.capacity() * size_of::<Option<i64>>(),
			ColumnData::Int16(v) => v.capacity() * size_of::<Option<i128>>(),
			ColumnData::Float4(v) => v.capacity() * size_of::<Option<f32>>(),
			ColumnData::Float8(v) => v.capacity() * size_of::<Option<f64>>(),
			ColumnData::Date(v) => v.capacity() * size_of::<Option<i32>>(),
		}
	}
}
