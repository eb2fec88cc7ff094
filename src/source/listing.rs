//! Eligible-blob listing.
//!
//! Filters the container listing down to processable log blobs. Ineligible
//! names are logged and never touched, so ownership-verification markers and
//! anything nested under a prefix survive every run.

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{error, info};

use crate::config::{LOG_SUFFIX, OWNERSHIP_MARKER};
use crate::storage::ContainerProvider;

/// Whether a blob name is eligible for processing.
///
/// A name qualifies iff it carries the log suffix, contains no path
/// separator, and does not contain the ownership-verification marker.
pub fn is_eligible(name: &str) -> bool {
    name.ends_with(LOG_SUFFIX) && !name.contains('/') && !name.contains(OWNERSHIP_MARKER)
}

/// Lazily list eligible blob names from the source container.
///
/// Skipped names are logged at info; listing errors are logged and end the
/// stream early (the affected blobs simply wait for the next run).
pub fn eligible_blobs(source: &ContainerProvider) -> BoxStream<'_, String> {
    source
        .list_names()
        .filter_map(|entry| async move {
            match entry {
                Ok(name) if is_eligible(&name) => Some(name),
                Ok(name) => {
                    info!(blob = %name, "Skipped ineligible blob");
                    None
                }
                Err(e) => {
                    error!(error = %e, "Blob listing failed");
                    None
                }
            }
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::TempDir;

    #[test]
    fn accepts_plain_log_names() {
        assert!(is_eligible("edge-2026-08-31.log"));
        assert!(is_eligible("a.log"));
    }

    #[test]
    fn rejects_wrong_suffix() {
        assert!(!is_eligible("edge-2026-08-31.log.gz"));
        assert!(!is_eligible("edge-2026-08-31.txt"));
        assert!(!is_eligible("log"));
    }

    #[test]
    fn rejects_path_separators() {
        assert!(!is_eligible("nested/edge.log"));
        assert!(!is_eligible("a/b/c.log"));
    }

    #[test]
    fn rejects_ownership_marker() {
        assert!(!is_eligible("fastly-ownership-challenge-abc.log"));
        assert!(!is_eligible("ownership-challenge.log"));
    }

    #[test]
    fn filter_is_exact() {
        // Eligible iff suffix present, no '/', no marker.
        let cases = [
            ("good.log", true),
            ("good.log.bak", false),
            ("dir/good.log", false),
            ("xownership-challengey.log", false),
            ("ownership-challenge", false),
        ];
        for (name, expected) in cases {
            assert_eq!(is_eligible(name), expected, "{name}");
        }
    }

    #[tokio::test]
    async fn listing_skips_ineligible_blobs() {
        let dir = TempDir::new().unwrap();
        let provider = ContainerProvider::for_local(dir.path()).unwrap();
        for name in [
            "a.log",
            "b.log",
            "notes.txt",
            "nested/c.log",
            "ownership-challenge-xyz.log",
        ] {
            provider.put(name, Bytes::from_static(b"{}")).await.unwrap();
        }

        let mut names: Vec<String> = eligible_blobs(&provider).collect().await;
        names.sort();
        assert_eq!(names, vec!["a.log", "b.log"]);
    }
}
