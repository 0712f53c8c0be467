//! Sweep tables stored as Parquet.

use super::SweepRow;
use anyhow::{Context, Result, anyhow};
use arrow_array::{Array, ArrayRef, Float64Array, RecordBatch, UInt64Array};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

const INDEX: &str = "index";
const TILE_ROWS: &str = "tile_rows";
const TILE_COLS: &str = "tile_cols";
const WHOLE_ARRAY: &str = "whole_array_s";
const SINGLE_TILE: &str = "single_tile_s";
const FILE_SIZE: &str = "file_size";

fn schema() -> Schema {
    Schema::new(vec![
        Field::new(INDEX, DataType::UInt64, false),
        Field::new(TILE_ROWS, DataType::UInt64, false),
        Field::new(TILE_COLS, DataType::UInt64, false),
        Field::new(WHOLE_ARRAY, DataType::Float64, false),
        Field::new(SINGLE_TILE, DataType::Float64, false),
        Field::new(FILE_SIZE, DataType::UInt64, false),
    ])
}

fn to_batch(rows: &[SweepRow]) -> Result<RecordBatch> {
    let u64s = |f: fn(&SweepRow) -> u64| -> ArrayRef { Arc::new(UInt64Array::from_iter_values(rows.iter().map(f))) };
    let f64s = |f: fn(&SweepRow) -> f64| -> ArrayRef { Arc::new(Float64Array::from_iter_values(rows.iter().map(f))) };
    let columns = vec![
        u64s(|r| r.index),
        u64s(|r| r.tile_rows),
        u64s(|r| r.tile_cols),
        f64s(|r| r.whole_array_s),
        f64s(|r| r.single_tile_s),
        u64s(|r| r.file_size),
    ];
    RecordBatch::try_new(Arc::new(schema()), columns).context("build sweep record batch")
}

/// Write `rows` to `path` through a temporary file in the same directory.
pub fn write(path: &Path, rows: &[SweepRow]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).with_context(|| format!("create temp file in {}", dir.display()))?;
    let batch = to_batch(rows)?;
    let mut writer = ArrowWriter::try_new(tmp.as_file_mut(), batch.schema(), None).context("open parquet writer")?;
    writer.write(&batch).context("write sweep rows")?;
    writer.close().context("finish parquet file")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("move sweep cache into {}", path.display()))?;
    Ok(())
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    let array = batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("sweep cache has no '{}' column", name))?;
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("sweep cache column '{}' has type {}", name, array.data_type()))
}

pub fn read(path: &Path) -> Result<Vec<SweepRow>> {
    let file = File::open(path).with_context(|| format!("open sweep cache {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("read parquet metadata of {}", path.display()))?
        .build()
        .context("build parquet reader")?;
    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.with_context(|| format!("read record batch from {}", path.display()))?;
        let index = column::<UInt64Array>(&batch, INDEX)?;
        let tile_rows = column::<UInt64Array>(&batch, TILE_ROWS)?;
        let tile_cols = column::<UInt64Array>(&batch, TILE_COLS)?;
        let whole = column::<Float64Array>(&batch, WHOLE_ARRAY)?;
        let single = column::<Float64Array>(&batch, SINGLE_TILE)?;
        let file_size = column::<UInt64Array>(&batch, FILE_SIZE)?;
        for i in 0..batch.num_rows() {
            rows.push(SweepRow {
                index: index.value(i),
                tile_rows: tile_rows.value(i),
                tile_cols: tile_cols.value(i),
                whole_array_s: whole.value(i),
                single_tile_s: single.value(i),
                file_size: file_size.value(i),
            });
        }
    }
    Ok(rows)
}
