//! Blob container access.
//!
//! Thin wrapper over `object_store` exposing the operations the pipeline
//! needs: lazy name listing, streaming and whole-object download, upload
//! with overwrite semantics, and deletion. Backed by Azure Blob Storage in
//! production and by the local filesystem in tests.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use object_store::azure::MicrosoftAzureBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload, RetryConfig};
use snafu::prelude::*;

use crate::error::{AzureConfigSnafu, LocalConfigSnafu, ObjectStoreSnafu, StorageError};

/// A reference-counted container provider.
pub type ContainerProviderRef = Arc<ContainerProvider>;

/// Access to a single blob container.
#[derive(Clone)]
pub struct ContainerProvider {
    object_store: Arc<dyn ObjectStore>,
    canonical_url: String,
}

impl std::fmt::Debug for ContainerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContainerProvider<{}>", self.canonical_url)
    }
}

impl ContainerProvider {
    /// Create a provider for an Azure blob container.
    ///
    /// Credentials are resolved by the builder from the environment.
    pub fn for_azure(account: &str, container: &str) -> Result<Self, StorageError> {
        let store = MicrosoftAzureBuilder::from_env()
            .with_account(account)
            .with_container_name(container)
            .with_retry(RetryConfig::default())
            .build()
            .context(AzureConfigSnafu)?;

        Ok(Self {
            object_store: Arc::new(store),
            canonical_url: format!("https://{account}.blob.core.windows.net/{container}"),
        })
    }

    /// Create a provider rooted at a local directory. Used by tests.
    pub fn for_local(root: &std::path::Path) -> Result<Self, StorageError> {
        let store = LocalFileSystem::new_with_prefix(root).context(LocalConfigSnafu)?;
        Ok(Self {
            object_store: Arc::new(store),
            canonical_url: format!("file://{}", root.display()),
        })
    }

    /// Lazily list blob names in the container.
    ///
    /// The stream is finite and non-restartable; a fresh call produces a
    /// fresh listing.
    pub fn list_names(&self) -> BoxStream<'_, Result<String, StorageError>> {
        self.object_store
            .list(None)
            .map(|meta| match meta {
                Ok(meta) => Ok(meta.location.to_string()),
                Err(source) => Err(StorageError::ObjectStore { source }),
            })
            .boxed()
    }

    /// Download a blob as a stream of byte chunks.
    ///
    /// Chunk boundaries carry no alignment with the blob's logical lines.
    /// Chunks larger than `max_chunk_size` are split before being yielded so
    /// per-chunk memory stays bounded.
    pub async fn get_stream(
        &self,
        name: &str,
        max_chunk_size: usize,
    ) -> Result<impl Stream<Item = Result<Bytes, StorageError>> + Send, StorageError> {
        let result = self
            .object_store
            .get(&Path::from(name))
            .await
            .context(ObjectStoreSnafu)?;

        let stream = result
            .into_stream()
            .map(move |chunk| {
                let pieces: Vec<Result<Bytes, StorageError>> = match chunk {
                    Ok(bytes) => split_chunk(bytes, max_chunk_size)
                        .into_iter()
                        .map(Ok)
                        .collect(),
                    Err(source) => vec![Err(StorageError::ObjectStore { source })],
                };
                futures::stream::iter(pieces)
            })
            .flatten();

        Ok(stream)
    }

    /// Download the full contents of a blob.
    pub async fn get(&self, name: &str) -> Result<Bytes, StorageError> {
        self.object_store
            .get(&Path::from(name))
            .await
            .context(ObjectStoreSnafu)?
            .bytes()
            .await
            .context(ObjectStoreSnafu)
    }

    /// Upload a blob, overwriting any existing blob of the same name.
    pub async fn put(&self, name: &str, bytes: Bytes) -> Result<(), StorageError> {
        self.object_store
            .put(&Path::from(name), PutPayload::from(bytes))
            .await
            .context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Delete a blob.
    pub async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.object_store
            .delete(&Path::from(name))
            .await
            .context(ObjectStoreSnafu)?;
        Ok(())
    }
}

/// Split a chunk into pieces no larger than `max_size`.
fn split_chunk(bytes: Bytes, max_size: usize) -> Vec<Bytes> {
    if bytes.len() <= max_size {
        return vec![bytes];
    }
    let mut pieces = Vec::with_capacity(bytes.len().div_ceil(max_size));
    let mut rest = bytes;
    while rest.len() > max_size {
        pieces.push(rest.split_to(max_size));
    }
    pieces.push(rest);
    pieces
}
