//! Buffered liquidation writer.
//!
//! Accumulates normalized events in memory and flushes them to the durable
//! store and the parquet snapshot sink when either the size or the time
//! threshold is reached. One exclusive lock guards the pending batch and
//! the last-flush instant; the lock is held until both sinks complete, so
//! at most one flush is in flight and batches keep submission order.

use chrono::Utc;
use crypto_pipeline_data::{LiquidationEvent, LiquidationRepository, ParquetSnapshotWriter};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct LiquidationWriter {
    repo: LiquidationRepository,
    snapshots: Option<ParquetSnapshotWriter>,
    flush_size: usize,
    flush_interval: Duration,
    state: Mutex<WriterState>,
}

struct WriterState {
    pending: Vec<LiquidationEvent>,
    last_flush: Instant,
}

impl LiquidationWriter {
    /// Creates a writer over a liquidation repository and an optional
    /// snapshot sink.
    #[must_use]
    pub fn new(
        repo: LiquidationRepository,
        snapshots: Option<ParquetSnapshotWriter>,
        flush_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            repo,
            snapshots,
            flush_size,
            flush_interval,
            state: Mutex::new(WriterState {
                pending: Vec::new(),
                last_flush: Instant::now(),
            }),
        }
    }

    /// Appends an event to the pending batch, then flushes inline if the
    /// batch reached `flush_size` or `flush_interval` elapsed since the
    /// last flush. A burst of events pays the flush cost inside `submit`
    /// rather than growing the buffer unbounded.
    pub async fn submit(&self, event: LiquidationEvent) {
        let mut state = self.state.lock().await;
        state.pending.push(event);

        if state.pending.len() >= self.flush_size
            || state.last_flush.elapsed() >= self.flush_interval
        {
            self.flush_locked(&mut state).await;
        }
    }

    /// Forces a flush of whatever is pending. Used on shutdown.
    pub async fn flush(&self) {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await;
    }

    /// Returns the number of events currently buffered.
    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Drains the pending batch and feeds it to both sinks. Sink failures
    /// are independent: each is logged and the batch is dropped from that
    /// sink only. No retry; at-most-once delivery is the accepted gap here.
    async fn flush_locked(&self, state: &mut WriterState) {
        if state.pending.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut state.pending);
        state.last_flush = Instant::now();

        if let Err(e) = self.repo.persist_batch(&batch).await {
            tracing::error!("Persist failed, dropping batch of {}: {:#}", batch.len(), e);
        }

        if let Some(snapshots) = &self.snapshots {
            if let Err(e) = snapshots.write_batch(&batch, Utc::now()) {
                tracing::error!("Snapshot write failed: {:#}", e);
            }
        }

        tracing::info!("Flushed {} records", batch.len());
    }
}
