//! Run orchestration: blob admission, per-blob processing, and totals.
//!
//! One invocation is one run. The coordinator lists eligible blobs and
//! admits each as a spawned task behind a counting gate (`Semaphore`) that
//! caps in-flight blobs. Admitted tasks accumulate into fixed-size pages
//! that are awaited together, bounding the number of outstanding task
//! handles. Before each admission the soft-deadline guard is consulted; once
//! it trips, the current page is drained to completion and no further blobs
//! are admitted — in-flight work is never cancelled.
//!
//! Within a blob, events reach the sink in line order. Completion order
//! across a page is unordered.

mod counters;
mod deadline;

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use counters::RunCounters;
pub use deadline::DeadlineState;

use crate::archive::ArchiveTransaction;
use crate::config::Config;
use crate::error::SinkError;
use crate::sink::{EventBatch, EventSink};
use crate::source::{eligible_blobs, EventParser, LineAssembler, LineOutcome};
use crate::storage::ContainerProviderRef;

/// Blobs between periodic progress log lines.
const PROGRESS_INTERVAL: u64 = 100;

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub blobs: u64,
    pub events: u64,
}

/// Shared state handed to every spawned blob task.
struct TaskContext {
    source: ContainerProviderRef,
    sink: Arc<dyn EventSink>,
    archiver: ArchiveTransaction,
    gate: Semaphore,
    counters: RunCounters,
    line_separator: String,
    max_batch_size: usize,
    max_chunk_size: usize,
}

/// Orchestrates one end-to-end run.
pub struct RunCoordinator {
    config: Config,
    ctx: Arc<TaskContext>,
}

impl RunCoordinator {
    /// Build a coordinator over the given containers and sink.
    ///
    /// The sink (and its network session) is shared by every blob task for
    /// the lifetime of the run.
    pub fn new(
        config: Config,
        source: ContainerProviderRef,
        archive: ContainerProviderRef,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let ctx = Arc::new(TaskContext {
            archiver: ArchiveTransaction::new(source.clone(), archive),
            gate: Semaphore::new(config.max_concurrent_blobs),
            counters: RunCounters::default(),
            line_separator: config.line_separator.clone(),
            max_batch_size: config.max_batch_size,
            max_chunk_size: config.max_chunk_size(),
            source,
            sink,
        });
        Self { config, ctx }
    }

    /// Execute one run to completion.
    ///
    /// Never propagates an error: every failure is handled (and logged) as
    /// close to its origin as possible, and the invocation host schedules
    /// the next run regardless.
    pub async fn run(&self) -> RunSummary {
        self.run_with_deadline(DeadlineState::start(self.config.soft_deadline()))
            .await
    }

    /// Execute one run against an externally constructed deadline guard.
    pub async fn run_with_deadline(&self, deadline: DeadlineState) -> RunSummary {
        info!(
            max_concurrent_blobs = self.config.max_concurrent_blobs,
            page_size = self.config.page_size(),
            max_batch_size = self.config.max_batch_size,
            "Starting run"
        );

        let page_size = self.config.page_size();
        let mut page: Vec<JoinHandle<()>> = Vec::new();

        {
            let mut listing = eligible_blobs(&self.ctx.source);
            while let Some(blob) = listing.next().await {
                if deadline.exceeded() {
                    info!("Soft deadline exceeded; no further blobs admitted");
                    break;
                }
                page.push(tokio::spawn(process_blob(self.ctx.clone(), blob)));
                if page.len() >= page_size {
                    drain_page(&mut page).await;
                }
            }
        }
        drain_page(&mut page).await;

        let summary = RunSummary {
            blobs: self.ctx.counters.blobs(),
            events: self.ctx.counters.events(),
        };
        info!(
            blobs = summary.blobs,
            events = summary.events,
            "Run finished"
        );
        summary
    }
}

/// Await every task in the current page.
async fn drain_page(page: &mut Vec<JoinHandle<()>>) {
    for handle in page.drain(..) {
        if let Err(e) = handle.await {
            error!(error = %e, "Blob task panicked");
        }
    }
}

/// Process a single blob end to end.
///
/// Stream the download through line assembly and JSON parsing into the sink
/// batch, flush, archive, delete (gated on archival), then record totals.
/// Any failure aborts only this blob; it stays in the source container and
/// is retried on the next run.
async fn process_blob(ctx: Arc<TaskContext>, blob: String) {
    let _permit = match ctx.gate.acquire().await {
        Ok(permit) => permit,
        // The gate lives as long as the context and is never closed.
        Err(_) => return,
    };

    info!(blob = %blob, "Start processing blob");

    let mut assembler = match LineAssembler::new(&ctx.line_separator) {
        Ok(assembler) => assembler,
        Err(e) => {
            error!(blob = %blob, error = %e, "Failed to set up line assembler");
            return;
        }
    };
    let mut parser = EventParser::new(blob.as_str());
    let mut batch = EventBatch::new(ctx.sink.as_ref(), ctx.max_batch_size);

    let stream = match ctx.source.get_stream(&blob, ctx.max_chunk_size).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(blob = %blob, error = %e, "Failed to start download; skipping blob");
            return;
        }
    };
    tokio::pin!(stream);

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                error!(blob = %blob, error = %e, "Download failed mid-stream; aborting blob");
                return;
            }
        };
        // Chunks are decoded independently; invalid sequences are replaced.
        let text = String::from_utf8_lossy(&chunk);
        for line in assembler.feed(&text) {
            if let Err(e) = handle_line(&mut parser, &mut batch, &line).await {
                error!(blob = %blob, error = %e, "Sink send failed; aborting blob");
                return;
            }
        }
    }

    if let Some(line) = assembler.finish() {
        if let Err(e) = handle_line(&mut parser, &mut batch, &line).await {
            error!(blob = %blob, error = %e, "Sink send failed; aborting blob");
            return;
        }
    }

    if let Err(e) = batch.flush().await {
        error!(blob = %blob, error = %e, "Sink flush failed; aborting blob");
        return;
    }

    let archived = ctx.archiver.archive(&blob).await;
    ctx.archiver.delete_if_archived(&blob, archived).await;

    let events_sent = batch.events_sent();
    let total_blobs = ctx.counters.record_blob(events_sent);
    info!(blob = %blob, events = events_sent, "Finished processing blob");
    if total_blobs % PROGRESS_INTERVAL == 0 {
        info!(
            blobs = total_blobs,
            events = ctx.counters.events(),
            "Progress"
        );
    }
}

/// Route one logical line: push events, log and continue past skips.
async fn handle_line(
    parser: &mut EventParser,
    batch: &mut EventBatch<'_>,
    line: &str,
) -> Result<(), SinkError> {
    match parser.parse(line) {
        LineOutcome::Event(event) => batch.push(event).await,
        LineOutcome::Skipped(skip) => {
            warn!(
                blob = %skip.blob,
                ordinal = skip.ordinal,
                error = %skip.error,
                "Skipping malformed JSON line"
            );
            Ok(())
        }
        LineOutcome::Empty => Ok(()),
    }
}
