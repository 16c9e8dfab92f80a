// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	cmp::{Ordering, Reverse},
	collections::BinaryHeap,
	mem,
};

use strata_core::{
	AggregationKind, Block, KeysType, TabletSchema, Value,
	interface::{RowsetReader, RowsetWriter},
};

use crate::error::Result;

/// Combines rows that share a key according to the table model.
pub(crate) struct RowMerger {
	keys_type: KeysType,
	num_key_columns: usize,
	aggregations: Vec<AggregationKind>,
}

impl RowMerger {
	pub(crate) fn new(schema: &TabletSchema) -> Self {
		Self {
			keys_type: schema.keys_type(),
			num_key_columns: schema.num_key_columns(),
			aggregations: schema.columns().iter().map(|c| c.aggregation).collect(),
		}
	}

	pub(crate) fn merges_duplicates(&self) -> bool {
		self.keys_type.merges_duplicates()
	}

	pub(crate) fn key<'r>(&self, row: &'r [Value]) -> &'r [Value] {
		&row[..self.num_key_columns.min(row.len())]
	}

	/// Folds `newer` into `acc`. Both rows share a key and `newer` arrived later.
	pub(crate) fn combine(&self, acc: &mut [Value], newer: Vec<Value>) {
		let value_columns = newer.into_iter().enumerate().skip(self.num_key_columns);
		match self.keys_type {
			KeysType::Duplicate => {}
			KeysType::Unique => {
				for (idx, value) in value_columns {
					acc[idx] = value;
				}
			}
			KeysType::Aggregate => {
				for (idx, value) in value_columns {
					let kind = self.aggregations.get(idx).copied().unwrap_or(AggregationKind::Replace);
					acc[idx] = aggregate(kind, mem::replace(&mut acc[idx], Value::Null), value);
				}
			}
		}
	}
}

fn aggregate(kind: AggregationKind, acc: Value, newer: Value) -> Value {
	match (kind, acc, newer) {
		(AggregationKind::None | AggregationKind::Replace, _, newer) => newer,
		(AggregationKind::ReplaceIfNotNull, acc, Value::Null) => acc,
		(AggregationKind::ReplaceIfNotNull, _, newer) => newer,
		(_, Value::Null, newer) => newer,
		(_, acc, Value::Null) => acc,
		(AggregationKind::Min, acc, newer) => acc.min(newer),
		(AggregationKind::Max, acc, newer) => acc.max(newer),
		(AggregationKind::Sum, acc, newer) => sum(acc, newer),
	}
}

fn sum(acc: Value, newer: Value) -> Value {
	match (acc, newer) {
		(Value::Int1(l), Value::Int1(r)) => Value::Int1(l.saturating_add(r)),
		(Value::Int2(l), Value::Int2(r)) => Value::Int2(l.saturating_add(r)),
		(Value::Int4(l), Value::Int4(r)) => Value::Int4(l.saturating_add(r)),
		(Value::Int8(l), Value::Int8(r)) => Value::Int8(l.saturating_add(r)),
		(Value::Int16(l), Value::Int16(r)) => Value::Int16(l.saturating_add(r)),
		(Value::Float4(l), Value::Float4(r)) => Value::float4(l.value() + r.value()),
		(Value::Float8(l), Value::Float8(r)) => Value::float8(l.value() + r.value()),
		(_, newer) => newer,
	}
}

/// Accumulates rows into blocks of `block_rows` and hands them to the writer.
struct BlockSink<'w> {
	writer: &'w mut dyn RowsetWriter,
	current: Block,
	block_rows: usize,
}

impl<'w> BlockSink<'w> {
	fn new(schema: &TabletSchema, writer: &'w mut dyn RowsetWriter, block_rows: usize) -> Self {
		Self {
			writer,
			current: schema.create_block(),
			block_rows: block_rows.max(1),
		}
	}

	fn push(&mut self, row: Vec<Value>) -> Result<()> {
		self.current.push_row(row)?;
		if self.current.row_count() >= self.block_rows {
			self.flush_block()?;
		}
		Ok(())
	}

	fn flush_block(&mut self) -> Result<()> {
		if self.current.is_empty() {
			return Ok(());
		}
		let empty = self.current.clone_empty();
		let block = mem::replace(&mut self.current, empty);
		self.writer.add_block(&block)?;
		Ok(())
	}
}

/// Consumes rows in key order and writes them, collapsing equal keys when the
/// table model merges duplicates.
struct Collapser<'m, 'w> {
	merger: &'m RowMerger,
	sink: BlockSink<'w>,
	pending: Option<Vec<Value>>,
	merged_rows: u64,
}

impl<'m, 'w> Collapser<'m, 'w> {
	fn new(merger: &'m RowMerger, sink: BlockSink<'w>) -> Self {
		Self {
			merger,
			sink,
			pending: None,
			merged_rows: 0,
		}
	}

	fn push(&mut self, row: Vec<Value>) -> Result<()> {
		if self.merger.merges_duplicates() {
			if let Some(acc) = self.pending.as_mut() {
				if self.merger.key(acc) == self.merger.key(&row) {
					self.merger.combine(acc, row);
					self.merged_rows += 1;
					return Ok(());
				}
			}
		}

		if let Some(previous) = self.pending.replace(row) {
			self.sink.push(previous)?;
		}
		Ok(())
	}

	fn finish(mut self) -> Result<u64> {
		if let Some(previous) = self.pending.take() {
			self.sink.push(previous)?;
		}
		self.sink.flush_block()?;
		Ok(self.merged_rows)
	}
}

/// Sorts buffered blocks by key and writes them. Rows with equal keys keep
/// their arrival order. Returns the number of rows merged away.
pub(crate) fn merge_blocks(
	schema: &TabletSchema,
	blocks: &[Block],
	writer: &mut dyn RowsetWriter,
	block_rows: usize,
) -> Result<u64> {
	let merger = RowMerger::new(schema);
	let mut combined = schema.create_block();
	for block in blocks {
		combined.append(block)?;
	}

	let num_key_columns = schema.num_key_columns();
	let mut indices: Vec<usize> = (0..combined.row_count()).collect();
	indices.sort_by(|&left, &right| compare_keys(&combined, num_key_columns, left, right));
	let sorted = combined.take(&indices);
	drop(combined);

	let mut collapser = Collapser::new(&merger, BlockSink::new(schema, writer, block_rows));
	for row in 0..sorted.row_count() {
		collapser.push(sorted.row(row))?;
	}
	collapser.finish()
}

fn compare_keys(block: &Block, num_key_columns: usize, left: usize, right: usize) -> Ordering {
	block.columns
		.iter()
		.take(num_key_columns)
		.map(|column| column.data.get(left).cmp(&column.data.get(right)))
		.find(|ordering| ordering.is_ne())
		.unwrap_or(Ordering::Equal)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergeStats {
	pub(crate) merged_rows: u64,
	pub(crate) filtered_rows: u64,
}

struct RunCursor {
	reader: Box<dyn RowsetReader>,
	block: Block,
	row: usize,
}

impl RunCursor {
	fn new(reader: Box<dyn RowsetReader>) -> Self {
		Self {
			reader,
			block: Block::default(),
			row: 0,
		}
	}

	fn next_block(&mut self) -> Result<bool> {
		while let Some(block) = self.reader.next_block()? {
			if !block.is_empty() {
				self.block = block;
				self.row = 0;
				return Ok(true);
			}
		}
		Ok(false)
	}

	fn row(&self) -> Vec<Value> {
		self.block.row(self.row)
	}

	fn advance(&mut self) -> Result<bool> {
		self.row += 1;
		if self.row < self.block.row_count() {
			return Ok(true);
		}
		self.next_block()
	}
}

/// Heap entry of one run. Equal keys pop in run order, older runs first.
#[derive(PartialEq, Eq)]
struct HeapEntry {
	key: Vec<Value>,
	run: usize,
}

impl Ord for HeapEntry {
	fn cmp(&self, other: &Self) -> Ordering {
		self.key.cmp(&other.key).then(self.run.cmp(&other.run))
	}
}

impl PartialOrd for HeapEntry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// K-way merge of sorted runs into `writer`. Later runs hold newer rows.
pub(crate) fn merge_rowsets(
	schema: &TabletSchema,
	readers: Vec<Box<dyn RowsetReader>>,
	writer: &mut dyn RowsetWriter,
	block_rows: usize,
) -> Result<MergeStats> {
	let merger = RowMerger::new(schema);
	let mut stats = MergeStats::default();
	let mut cursors: Vec<Option<RunCursor>> = Vec::with_capacity(readers.len());
	let mut heap = BinaryHeap::with_capacity(readers.len());

	for (run, reader) in readers.into_iter().enumerate() {
		let mut cursor = RunCursor::new(reader);
		if cursor.next_block()? {
			heap.push(Reverse(HeapEntry {
				key: merger.key(&cursor.row()).to_vec(),
				run,
			}));
			cursors.push(Some(cursor));
		} else {
			stats.filtered_rows += cursor.reader.filtered_rows();
			cursors.push(None);
		}
	}

	let mut collapser = Collapser::new(&merger, BlockSink::new(schema, writer, block_rows));
	while let Some(Reverse(entry)) = heap.pop() {
		let Some(cursor) = cursors[entry.run].as_mut() else {
			return Err(strata_core::Error::Internal(format!("run {} exhausted while queued", entry.run)).into());
		};

		let row = cursor.row();
		if cursor.advance()? {
			heap.push(Reverse(HeapEntry {
				key: merger.key(&cursor.row()).to_vec(),
				run: entry.run,
			}));
		} else if let Some(finished) = cursors[entry.run].take() {
			stats.filtered_rows += finished.reader.filtered_rows();
		}

		collapser.push(row)?;
	}

	stats.merged_rows = collapser.finish()?;
	Ok(stats)
}
