//! Error types for the drift log shipper.

use snafu::prelude::*;

/// Errors that can occur while loading configuration from the environment.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[snafu(display("Required environment variable '{name}' is not set"))]
    MissingVar { name: String },

    /// An environment variable could not be parsed as an integer.
    #[snafu(display("Environment variable '{name}' has invalid value '{value}': {source}"))]
    InvalidInt {
        name: String,
        value: String,
        source: std::num::ParseIntError,
    },

    /// An integer option that must be at least one was set to zero.
    #[snafu(display("Environment variable '{name}' must be at least 1"))]
    ZeroInt { name: String },

    /// The configured line separator is not a valid regex.
    #[snafu(display("Invalid line separator pattern '{pattern}': {source}"))]
    InvalidSeparator {
        pattern: String,
        source: regex::Error,
    },

    /// The Log Analytics URI does not match the expected host shape.
    #[snafu(display("Invalid Log Analytics URI: {uri}"))]
    InvalidLogAnalyticsUri { uri: String },
}

/// Errors that can occur during blob storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Underlying object store operation failed.
    #[snafu(display("Object store error: {source}"))]
    ObjectStore { source: object_store::Error },

    /// Failed to construct the Azure storage client.
    #[snafu(display("Failed to configure Azure storage: {source}"))]
    AzureConfig { source: object_store::Error },

    /// Failed to construct the local storage client.
    #[snafu(display("Failed to configure local storage: {source}"))]
    LocalConfig { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

/// Errors that can occur while archiving a blob.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ArchiveError {
    /// Failed to download the blob content for archival.
    #[snafu(display("Failed to download '{blob}' for archival: {source}"))]
    Download { blob: String, source: StorageError },

    /// Failed to build the in-memory zip archive.
    #[snafu(display("Failed to build zip archive for '{blob}': {source}"))]
    Zip {
        blob: String,
        source: zip::result::ZipError,
    },

    /// Failed to upload the archive to the archive container.
    #[snafu(display("Failed to upload archive '{archive}': {source}"))]
    Upload {
        archive: String,
        source: StorageError,
    },
}

/// Errors that can occur while sending events to the ingestion sink.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Failed to serialize the event batch body.
    #[snafu(display("Failed to serialize event batch: {source}"))]
    Serialize { source: serde_json::Error },

    /// The shared key is not valid base64.
    #[snafu(display("Shared key is not valid base64: {source}"))]
    InvalidSharedKey { source: base64::DecodeError },

    /// HTTP transport failure talking to the sink.
    #[snafu(display("Sink request failed: {source}"))]
    Request { source: reqwest::Error },

    /// The sink rejected the batch after all retry attempts.
    #[snafu(display("Sink rejected batch with status {status} after {attempts} attempts"))]
    Rejected { status: u16, attempts: usize },
}
