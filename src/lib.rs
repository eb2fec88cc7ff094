//! drift: a scheduled log shipper for append-only blob logs.
//!
//! Each run drains eligible `.log` blobs from a source container, streams
//! their content line by line into JSON events for Azure Log Analytics,
//! then archives every processed blob as a single-entry zip and deletes it
//! from the source. Admission is bounded by a concurrency gate and a soft
//! wall-clock deadline so a run always ends before the invocation host's
//! hard timeout.

pub mod archive;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod storage;

// Re-export main types
pub use config::Config;
pub use pipeline::{DeadlineState, RunCoordinator, RunSummary};
pub use sink::{EventSink, LogAnalyticsSink};
pub use storage::{ContainerProvider, ContainerProviderRef};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for the binary.
///
/// Uses `RUST_LOG` for filtering, defaulting to `info` level.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(env_filter)
        .init();
}
