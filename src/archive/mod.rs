//! Archive-then-delete safety transaction.
//!
//! Before a processed blob is removed from the source container, its raw
//! content is packaged into a single-entry zip and uploaded to the archive
//! container. Deletion is gated on the upload succeeding, so a blob is never
//! lost between processing and archival: on any failure it stays listable
//! and is retried on the next run.
//!
//! The archive holds the original bytes, not the re-serialized events, so
//! replay and audit are byte-exact. Content is re-downloaded in full here,
//! separately from the streaming extraction pass.

use std::io::{Cursor, Write};

use bytes::Bytes;
use snafu::prelude::*;
use tracing::{error, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ArchiveError, DownloadSnafu, UploadSnafu, ZipSnafu};
use crate::storage::ContainerProviderRef;

/// Archives processed blobs and gates their deletion on archival success.
pub struct ArchiveTransaction {
    source: ContainerProviderRef,
    archive: ContainerProviderRef,
}

impl ArchiveTransaction {
    pub fn new(source: ContainerProviderRef, archive: ContainerProviderRef) -> Self {
        Self { source, archive }
    }

    /// Download the blob, zip it in memory, and upload `<basename>.zip` to
    /// the archive container (overwriting any prior archive of that name).
    ///
    /// Returns whether archival succeeded. Failures are logged here; the
    /// caller only needs the flag to gate deletion.
    pub async fn archive(&self, blob: &str) -> bool {
        info!(blob = %blob, "Archiving blob");
        match self.try_archive(blob).await {
            Ok(archive_name) => {
                info!(blob = %blob, archive = %archive_name, "Blob archived");
                true
            }
            Err(e) => {
                error!(blob = %blob, error = %e, "Failed to archive blob");
                false
            }
        }
    }

    /// Delete the source blob iff its archive upload succeeded.
    ///
    /// A deletion failure is logged but not propagated: the blob remains
    /// listable and the next run retries it end to end.
    pub async fn delete_if_archived(&self, blob: &str, archived: bool) {
        if !archived {
            error!(blob = %blob, "Archiving failed; skipping deletion");
            return;
        }
        info!(blob = %blob, "Deleting blob");
        if let Err(e) = self.source.delete(blob).await {
            error!(blob = %blob, error = %e, "Failed to delete blob");
        }
    }

    async fn try_archive(&self, blob: &str) -> Result<String, ArchiveError> {
        let content = self
            .source
            .get(blob)
            .await
            .context(DownloadSnafu { blob })?;

        let entry_name = base_name(blob);
        let archive_name = format!("{entry_name}.zip");
        let zipped = build_zip(entry_name, &content).context(ZipSnafu { blob })?;

        self.archive
            .put(&archive_name, Bytes::from(zipped))
            .await
            .context(UploadSnafu {
                archive: archive_name.clone(),
            })?;

        Ok(archive_name)
    }
}

/// Final path segment of a blob name.
fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Build a single-entry deflate zip holding `content` under `entry_name`.
fn build_zip(entry_name: &str, content: &[u8]) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(entry_name, options)?;
    writer
        .write_all(content)
        .map_err(zip::result::ZipError::Io)?;
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
