//! Environment-sourced configuration for the drift log shipper.
//!
//! The invocation host supplies application settings as environment
//! variables; there is no config file and no CLI surface. Credentials for
//! the storage account itself are picked up by the `object_store` Azure
//! builder from its own well-known variables.

use std::env;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use snafu::prelude::*;

use crate::error::{ConfigError, InvalidIntSnafu, InvalidSeparatorSnafu};

/// Bytes in a megabyte.
pub const MB: usize = 1024 * 1024;

/// Log type label reported to the ingestion sink.
pub const LOG_TYPE: &str = "Fastly";

/// Suffix a blob name must carry to be eligible for processing.
pub const LOG_SUFFIX: &str = ".log";

/// Marker substring used for container-ownership verification blobs.
/// Blobs carrying it are never processed.
pub const OWNERSHIP_MARKER: &str = "ownership-challenge";

/// Maximum execution window granted by the invocation host, in minutes.
const MAX_EXEC_TIME_MINUTES: u64 = 50;

/// Fraction of the execution window after which no new blob is admitted.
const SOFT_DEADLINE_FRACTION: f64 = 0.85;

/// Page size multiplier applied to the concurrency ceiling.
const PAGE_SIZE_MULTIPLIER: usize = 20;

/// Default separator pattern: every Unicode line-break and vertical
/// whitespace character, collapsed greedily.
pub const DEFAULT_LINE_SEPARATOR: &str =
    r"[\n\r\x0b\x0c\x1c\x1d\x1e\x{85}\x{2028}\x{2029}]+";

/// Expected host shape of a Log Analytics data collector endpoint.
static LOG_ANALYTICS_URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://([\w\-]+)\.ods\.opinsights\.azure\.([a-zA-Z\.]+)$")
        .expect("invalid URI pattern")
});

/// Runtime configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage account hosting both containers.
    pub storage_account: String,
    /// Source container holding append-only log blobs.
    pub container: String,
    /// Container receiving zip archives of processed blobs.
    pub archive_container: String,
    /// Log Analytics workspace id.
    pub workspace_id: String,
    /// Base64-encoded workspace shared key.
    pub shared_key: String,
    /// Data collector endpoint, derived from the workspace id unless overridden.
    pub log_analytics_uri: String,
    /// Line separator regex applied to blob content.
    pub line_separator: String,
    /// Concurrency ceiling for in-flight blob tasks.
    pub max_concurrent_blobs: usize,
    /// Auto-flush threshold of the sink batch accumulator.
    pub max_batch_size: usize,
    /// Upper bound on a single download chunk, in megabytes.
    pub max_chunk_size_mb: usize,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Missing required variables, unparsable or zero integers, an invalid separator
    /// regex, or a malformed Log Analytics URI all fail the run up front.
    pub fn from_env() -> Result<Self, ConfigError> {
        let workspace_id = required("WORKSPACE_ID")?;

        let log_analytics_uri = match optional("LOG_ANALYTICS_URI") {
            Some(uri) => {
                ensure!(
                    LOG_ANALYTICS_URI_PATTERN.is_match(&uri),
                    crate::error::InvalidLogAnalyticsUriSnafu { uri }
                );
                uri
            }
            None => format!("https://{workspace_id}.ods.opinsights.azure.com"),
        };

        let line_separator =
            optional("LINE_SEPARATOR").unwrap_or_else(|| DEFAULT_LINE_SEPARATOR.to_string());
        Regex::new(&line_separator).context(InvalidSeparatorSnafu {
            pattern: line_separator.clone(),
        })?;

        Ok(Self {
            storage_account: required("AZURE_STORAGE_ACCOUNT")?,
            container: required("CONTAINER_NAME")?,
            archive_container: required("ARCHIVE_CONTAINER_NAME")?,
            shared_key: required("SHARED_KEY")?,
            workspace_id,
            log_analytics_uri,
            line_separator,
            max_concurrent_blobs: int_or("MAX_CONCURRENT_PROCESSING_BLOBS", 10)?,
            max_batch_size: int_or("MAX_BATCH_SIZE", 2000)?,
            max_chunk_size_mb: int_or("MAX_CHUNK_SIZE_MB", 1)?,
        })
    }

    /// Number of admitted tasks awaited together as one page.
    ///
    /// A multiple of the concurrency ceiling so the gate keeps `ceiling`
    /// tasks running while the page amortizes the await overhead.
    pub fn page_size(&self) -> usize {
        self.max_concurrent_blobs * PAGE_SIZE_MULTIPLIER
    }

    /// In-process time budget after which no new blob is admitted.
    pub fn soft_deadline(&self) -> Duration {
        Duration::from_secs_f64(MAX_EXEC_TIME_MINUTES as f64 * 60.0 * SOFT_DEADLINE_FRACTION)
    }

    /// Upper bound on a single download chunk, in bytes.
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size_mb * MB
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    optional(name).context(crate::error::MissingVarSnafu { name })
}

/// Read an env var, treating unset and blank as absent.
fn optional(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

/// Parse a positive integer option. The concurrency ceiling, batch size,
/// and chunk bound are all used as divisors or capacity, so zero would
/// panic or stall the run.
fn int_or(name: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match optional(name) {
        Some(raw) => raw
            .parse()
            .context(InvalidIntSnafu { name, value: raw.clone() })?,
        None => default,
    };
    ensure!(value >= 1, crate::error::ZeroIntSnafu { name });
    Ok(value)
}
