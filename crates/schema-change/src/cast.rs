// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_core::{ColumnData, Type, Value, format_date, parse_date};

use crate::request::AlterTabletType;

/// Conversion of a referenced base column into the type of its new column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cast {
	pub from: Type,
	pub to: Type,
}

/// First value a cast rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct CastFailure {
	pub row: usize,
	pub value: Value,
	pub reason: String,
}

impl Cast {
	pub fn new(from: Type, to: Type) -> Self {
		Self {
			from,
			to,
		}
	}

	pub fn is_identity(&self) -> bool {
		self.from == self.to
	}

	/// Conversions that succeed for every value of the source type.
	pub fn is_widening(&self) -> bool {
		let (from, to) = (self.from, self.to);
		if from == to {
			return true;
		}

		if let (Some(from_rank), Some(to_rank)) = (from.integer_rank(), to.integer_rank()) {
			return from_rank < to_rank;
		}

		match (from, to) {
			(Type::Boolean | Type::Int1 | Type::Int2, Type::Float4) => true,
			(Type::Boolean | Type::Int1 | Type::Int2 | Type::Int4, Type::Float8) => true,
			(Type::Float4, Type::Float8) => true,
			(Type::Varchar(from_len), Type::Varchar(to_len)) => from_len <= to_len,
			(Type::Varchar(_), Type::Utf8) => true,
			_ => false,
		}
	}

	/// Whether `a < b` on source values implies the same order after the
	/// conversion. Exact widenings keep order; value checked conversions such
	/// as string to number reorder ("10" < "9" but 10 > 9).
	pub fn preserves_order(&self) -> bool {
		self.is_widening()
	}

	/// Conversions whose success depends on each value.
	fn is_value_checked(&self) -> bool {
		let (from, to) = (self.from, self.to);

		if from.integer_rank().is_some() && to.is_integer() {
			return true;
		}

		if to.is_string() {
			return from.is_number() || from == Type::Boolean || from == Type::Date || from.is_string();
		}
		from.is_string() && (to.is_number() || to == Type::Date)
	}

	/// Whether `kind` admits this conversion at all. Value level failures are
	/// only detected by [`Cast::apply`].
	pub fn check_legal(&self, kind: AlterTabletType) -> Result<(), &'static str> {
		if self.is_identity() {
			return Ok(());
		}

		match kind {
			AlterTabletType::Migration => Err("migration does not change column types"),
			_ if self.is_widening() => Ok(()),
			AlterTabletType::Rollup => Err("rollup only admits widening conversions"),
			AlterTabletType::SchemaChange if self.is_value_checked() => Ok(()),
			AlterTabletType::SchemaChange => Err("conversion is not supported"),
		}
	}

	/// Converts a whole column. Stops at the first value that does not fit.
	pub fn apply(&self, data: &ColumnData) -> Result<ColumnData, CastFailure> {
		if self.is_identity() {
			return Ok(data.clone());
		}

		let mut result = ColumnData::with_capacity(self.to, data.len());
		for (row, value) in data.iter().enumerate() {
			let converted = match self.convert_value(&value) {
				Ok(converted) => converted,
				Err(reason) => {
					return Err(CastFailure {
						row,
						value,
						reason,
					});
				}
			};
			if let Err(err) = result.push(converted) {
				return Err(CastFailure {
					row,
					value,
					reason: err.to_string(),
				});
			}
		}
		Ok(result)
	}

	/// Converts one value. Null stays null.
	pub fn convert_value(&self, value: &Value) -> Result<Value, String> {
		if value.is_null() {
			return Ok(Value::Null);
		}

		match self.to {
			Type::Boolean => match value {
				Value::Boolean(_) => Ok(value.clone()),
				Value::Utf8(text) => parse_bool(text),
				_ => Err(format!("{value} is not a boolean")),
			},
			Type::Int1 | Type::Int2 | Type::Int4 | Type::Int8 | Type::Int16 => {
				let integer = match value {
					Value::Utf8(text) => {
						text.trim().parse::<i128>().map_err(|_| format!("'{text}' is not an integer"))?
					}
					other => other.as_i128().ok_or_else(|| format!("{other} is not an integer"))?,
				};
				fit_integer(integer, self.to).ok_or_else(|| format!("{integer} is out of range of {}", self.to))
			}
			Type::Float4 => match value {
				Value::Utf8(text) => text
					.trim()
					.parse::<f32>()
					.map(Value::float4)
					.map_err(|_| format!("'{text}' is not a number")),
				Value::Float4(_) => Ok(value.clone()),
				Value::Float8(_) => Err(format!("{value} would lose precision")),
				other => other
					.as_f64()
					.map(|v| Value::float4(v as f32))
					.ok_or_else(|| format!("{other} is not a number")),
			},
			Type::Float8 => match value {
				Value::Utf8(text) => text
					.trim()
					.parse::<f64>()
					.map(Value::float8)
					.map_err(|_| format!("'{text}' is not a number")),
				other => other.as_f64().map(Value::float8).ok_or_else(|| format!("{other} is not a number")),
			},
			Type::Varchar(_) | Type::Utf8 => {
				let text = match value {
					Value::Utf8(text) => text.clone(),
					Value::Date(days) => format_date(*days),
					other => other.to_string(),
				};
				match self.to.max_len() {
					Some(max) if text.len() > max => {
						Err(format!("'{text}' is longer than {max} bytes"))
					}
					_ => Ok(Value::Utf8(text)),
				}
			}
			Type::Date => match value {
				Value::Date(_) => Ok(value.clone()),
				Value::Utf8(text) => {
					parse_date(text).map(Value::Date).ok_or_else(|| format!("'{text}' is not a date"))
				}
				other => Err(format!("{other} is not a date")),
			},
		}
	}
}

fn parse_bool(text: &str) -> Result<Value, String> {
	match text.trim().to_ascii_lowercase().as_str() {
		"true" | "1" => Ok(Value::Boolean(true)),
		"false" | "0" => Ok(Value::Boolean(false)),
		_ => Err(format!("'{text}' is not a boolean")),
	}
}

fn fit_integer(value: i128, ty: Type) -> Option<Value> {
	match ty {
		Type::Int1 => i8::try_from(value).ok().map(Value::Int1),
		Type::Int2 => i16::try_from(value).ok().map(Value::Int2),
		Type::Int4 => i32::try_from(value).ok().map(Value::Int4),
		Type::Int8 => i64::try_from(value).ok().map(Value::Int8),
		Type::Int16 => Some(Value::Int16(value)),
		_ => None,
	}
}

/// Parses the textual default of a column into a value of `ty`.
pub fn parse_literal(text: &str, ty: Type) -> Result<Value, String> {
	Cast::new(Type::Utf8, ty).convert_value(&Value::utf8(text))
}
