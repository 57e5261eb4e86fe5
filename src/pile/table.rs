//! Parquet-backed tabular sink and source for pile tables.

use crate::utils::{Error, Result};
use arrow::{
    array::Array,
    datatypes::SchemaRef,
    record_batch::RecordBatch,
};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
};
use std::{
    fs::File,
    path::{Path, PathBuf},
};

/// Rows buffered in memory before a record batch is flushed.
pub const BATCH_ROWS: usize = 64 * 1024;

/// A row type with a fixed columnar schema.
pub trait TableRow: Sized {
    fn schema() -> SchemaRef;
    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

pub fn column<'b, T: Array + 'static>(batch: &'b RecordBatch, name: &str) -> Result<&'b T> {
    let array = batch
        .column_by_name(name)
        .ok_or_else(|| format!("Missing column '{}'", name))?;
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::from(format!(
            "Column '{}' has unexpected type {}",
            name,
            array.data_type()
        ))
    })
}

/// Append-only, ZSTD-compressed Parquet writer.
pub struct TableWriter<R: TableRow> {
    writer: ArrowWriter<File>,
    buffer: Vec<R>,
    path: PathBuf,
    rows_written: usize,
}

impl<R: TableRow> TableWriter<R> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            .build();
        let writer = ArrowWriter::try_new(file, R::schema(), Some(props))?;
        Ok(Self {
            writer,
            buffer: Vec::with_capacity(BATCH_ROWS),
            path: path.to_path_buf(),
            rows_written: 0,
        })
    }

    pub fn push(&mut self, row: R) -> Result<()> {
        self.buffer.push(row);
        if self.buffer.len() >= BATCH_ROWS {
            self.flush()?;
        }
        Ok(())
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = R>) -> Result<()> {
        for row in rows {
            self.push(row)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = R::to_batch(&self.buffer)?;
        self.writer.write(&batch)?;
        self.rows_written += self.buffer.len();
        self.buffer.clear();
        Ok(())
    }

    /// Flushes buffered rows and closes the file, returning the number of rows written.
    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        self.writer
            .close()
            .map_err(|e| format!("Failed to finalize {}: {}", self.path.display(), e))?;
        log::trace!("Wrote {} rows to {}", self.rows_written, self.path.display());
        Ok(self.rows_written)
    }
}

/// Streams a table batch by batch.
pub fn for_each_batch<R: TableRow>(
    path: &Path,
    mut f: impl FnMut(Vec<R>) -> Result<()>,
) -> Result<()> {
    let file =
        File::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?
        .build()?;
    for batch in reader {
        let batch = batch.map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        f(R::from_batch(&batch)?)?;
    }
    Ok(())
}

pub fn read_table<R: TableRow>(path: &Path) -> Result<Vec<R>> {
    let mut rows = Vec::new();
    for_each_batch(path, |batch: Vec<R>| {
        rows.extend(batch);
        Ok(())
    })?;
    Ok(rows)
}

pub fn write_table<R: TableRow>(path: &Path, rows: impl IntoIterator<Item = R>) -> Result<usize> {
    let mut writer = TableWriter::create(path)?;
    writer.extend(rows)?;
    writer.finish()
}
