//! Event ingestion sink.
//!
//! The pipeline hands parsed events to an `EventSink` through a per-blob
//! `EventBatch` accumulator. One sink instance (and its underlying network
//! session) is shared by every blob task in a run.

pub mod log_analytics;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SinkError;

pub use log_analytics::LogAnalyticsSink;

/// Destination for parsed events.
///
/// Delivery is at-least-once; batching, auth, and retry live behind this
/// seam.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Send one batch of events, returning how many were accepted.
    async fn send_batch(&self, events: &[Value]) -> Result<usize, SinkError>;
}

/// Per-blob batch accumulator bound to a shared sink.
///
/// Auto-flushes when the pending batch reaches `max_batch_size`; the final
/// partial batch goes out on the explicit `flush` at stream end.
pub struct EventBatch<'a> {
    sink: &'a dyn EventSink,
    pending: Vec<Value>,
    max_batch_size: usize,
    events_sent: usize,
}

impl<'a> EventBatch<'a> {
    pub fn new(sink: &'a dyn EventSink, max_batch_size: usize) -> Self {
        Self {
            sink,
            pending: Vec::new(),
            max_batch_size: max_batch_size.max(1),
            events_sent: 0,
        }
    }

    /// Queue one event, flushing if the batch is full.
    ///
    /// Ownership of the event transfers here; events within one blob are
    /// delivered in push order.
    pub async fn push(&mut self, event: Value) -> Result<(), SinkError> {
        self.pending.push(event);
        if self.pending.len() >= self.max_batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Send any pending events.
    pub async fn flush(&mut self) -> Result<(), SinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let sent = self.sink.send_batch(&self.pending).await?;
        self.events_sent += sent;
        self.pending.clear();
        Ok(())
    }

    /// Events successfully handed to the sink so far.
    pub fn events_sent(&self) -> usize {
        self.events_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;

    /// Records every batch it receives.
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<Value>>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn send_batch(&self, events: &[Value]) -> Result<usize, SinkError> {
            self.batches.lock().unwrap().push(events.to_vec());
            Ok(events.len())
        }
    }

    #[tokio::test]
    async fn auto_flush_at_batch_size() {
        let sink = RecordingSink::default();
        let mut batch = EventBatch::new(&sink, 2);

        batch.push(json!({"n": 1})).await.unwrap();
        assert!(sink.batches.lock().unwrap().is_empty());

        batch.push(json!({"n": 2})).await.unwrap();
        assert_eq!(sink.batches.lock().unwrap().len(), 1);
        assert_eq!(batch.events_sent(), 2);
    }

    #[tokio::test]
    async fn final_flush_sends_partial_batch() {
        let sink = RecordingSink::default();
        let mut batch = EventBatch::new(&sink, 100);

        batch.push(json!({"n": 1})).await.unwrap();
        batch.push(json!({"n": 2})).await.unwrap();
        batch.push(json!({"n": 3})).await.unwrap();
        batch.flush().await.unwrap();

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
        drop(batches);
        assert_eq!(batch.events_sent(), 3);
    }

    #[tokio::test]
    async fn flush_on_empty_batch_is_a_no_op() {
        let sink = RecordingSink::default();
        let mut batch = EventBatch::new(&sink, 10);
        batch.flush().await.unwrap();
        assert!(sink.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_preserve_push_order() {
        let sink = RecordingSink::default();
        let mut batch = EventBatch::new(&sink, 2);
        for n in 0..5 {
            batch.push(json!({"n": n})).await.unwrap();
        }
        batch.flush().await.unwrap();

        let batches = sink.batches.lock().unwrap();
        let flat: Vec<i64> = batches
            .iter()
            .flatten()
            .map(|v| v["n"].as_i64().unwrap())
            .collect();
        assert_eq!(flat, vec![0, 1, 2, 3, 4]);
    }
}
