//! Columnar snapshot writer.
//!
//! Each flushed batch may be captured as one immutable parquet file named
//! by the flush's wall-clock timestamp.

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::LiquidationEvent;

/// Writes flushed liquidation batches as parquet snapshot files.
#[derive(Debug, Clone)]
pub struct ParquetSnapshotWriter {
    dir: PathBuf,
}

impl ParquetSnapshotWriter {
    /// Creates the writer, ensuring the snapshot directory exists.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {dir:?}"))?;
        Ok(Self { dir })
    }

    /// Writes one batch to `liq_<YYYYMMDD_HHMMSS>.parquet` and returns the
    /// file path. Empty batches produce no file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or writing fails.
    pub fn write_batch(
        &self,
        events: &[LiquidationEvent],
        flushed_at: DateTime<Utc>,
    ) -> Result<Option<PathBuf>> {
        if events.is_empty() {
            return Ok(None);
        }

        let schema = Arc::new(Schema::new(vec![
            Field::new(
                "ts",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
            Field::new("symbol", DataType::Utf8, false),
            Field::new("side", DataType::Utf8, false),
            Field::new("price", DataType::Float64, false),
            Field::new("qty", DataType::Float64, false),
            Field::new("qty_usd", DataType::Float64, false),
        ]));

        let ts_array =
            TimestampMillisecondArray::from(events.iter().map(|e| e.ts).collect::<Vec<_>>());
        let symbol_array =
            StringArray::from(events.iter().map(|e| e.symbol.clone()).collect::<Vec<_>>());
        let side_array =
            StringArray::from(events.iter().map(|e| e.side.clone()).collect::<Vec<_>>());
        let price_array = Float64Array::from(events.iter().map(|e| e.price).collect::<Vec<_>>());
        let qty_array = Float64Array::from(events.iter().map(|e| e.qty).collect::<Vec<_>>());
        let qty_usd_array =
            Float64Array::from(events.iter().map(LiquidationEvent::qty_usd).collect::<Vec<_>>());

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(ts_array) as ArrayRef,
                Arc::new(symbol_array) as ArrayRef,
                Arc::new(side_array) as ArrayRef,
                Arc::new(price_array) as ArrayRef,
                Arc::new(qty_array) as ArrayRef,
                Arc::new(qty_usd_array) as ArrayRef,
            ],
        )?;

        let name = format!("liq_{}.parquet", flushed_at.format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(name);

        let file = File::create(&path)
            .with_context(|| format!("Failed to create snapshot file {path:?}"))?;
        let props = WriterProperties::builder()
            .set_compression(parquet::basic::Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

        writer.write(&batch)?;
        writer.close()?;

        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(symbol: &str, ts: i64) -> LiquidationEvent {
        LiquidationEvent {
            symbol: symbol.to_string(),
            side: "SELL".to_string(),
            price: 50000.0,
            qty: 0.25,
            ts,
            raw: "{}".to_string(),
        }
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ParquetSnapshotWriter::new(dir.path()).unwrap();

        let path = writer.write_batch(&[], Utc::now()).unwrap();

        assert!(path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_snapshot_file_named_by_flush_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ParquetSnapshotWriter::new(dir.path()).unwrap();

        let flushed_at = Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap();
        let events = vec![event("BTCUSDT", 1_700_000_000_000)];
        let path = writer.write_batch(&events, flushed_at).unwrap().unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "liq_20250314_150926.parquet"
        );
        assert!(path.exists());
        // Parquet magic bytes at the start of the file
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"PAR1");
    }

    #[test]
    fn test_one_file_per_flush() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ParquetSnapshotWriter::new(dir.path()).unwrap();

        let events = vec![event("BTCUSDT", 1_700_000_000_000), event("ETHUSDT", 1_700_000_001_000)];
        let t1 = Utc.with_ymd_and_hms(2025, 3, 14, 15, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 3, 14, 15, 0, 5).unwrap();

        writer.write_batch(&events, t1).unwrap();
        writer.write_batch(&events, t2).unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let writer = ParquetSnapshotWriter::new(&nested).unwrap();
        let path = writer
            .write_batch(&[event("BTCUSDT", 1)], Utc::now())
            .unwrap();

        assert!(path.unwrap().starts_with(&nested));
    }
}
