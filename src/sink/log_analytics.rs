//! Azure Log Analytics (Sentinel) data collector client.
//!
//! Implements the HTTP Data Collector API: each batch is POSTed as a JSON
//! array, authenticated with an HMAC-SHA256 SharedKey signature over the
//! request date and length. The `reqwest` client is created once per run and
//! multiplexed across every blob task.

use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{Engine, BASE64_STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use snafu::prelude::*;
use tracing::warn;

use crate::config::{Config, LOG_TYPE};
use crate::error::{InvalidSharedKeySnafu, RequestSnafu, SerializeSnafu, SinkError};

use super::EventSink;

const API_VERSION: &str = "2016-04-01";
const MAX_ATTEMPTS: usize = 3;

/// Shared-session client for the data collector endpoint.
pub struct LogAnalyticsSink {
    client: reqwest::Client,
    endpoint: String,
    workspace_id: String,
    /// Raw (decoded) shared key bytes.
    key: Vec<u8>,
}

impl LogAnalyticsSink {
    /// Build a sink from the run configuration.
    ///
    /// The shared key is base64-decoded up front so a malformed key fails
    /// the run at startup rather than on the first batch.
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        let key = BASE64_STANDARD
            .decode(&config.shared_key)
            .context(InvalidSharedKeySnafu)?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/api/logs?api-version={API_VERSION}",
                config.log_analytics_uri
            ),
            workspace_id: config.workspace_id.clone(),
            key,
        })
    }

    /// SharedKey authorization header value for one request.
    fn authorization(&self, date: &str, content_length: usize) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .expect("HMAC accepts keys of any length");
        mac.update(string_to_sign(content_length, date).as_bytes());
        let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());
        format!("SharedKey {}:{}", self.workspace_id, signature)
    }
}

/// Canonical string-to-sign of the Data Collector API.
fn string_to_sign(content_length: usize, date: &str) -> String {
    format!("POST\n{content_length}\napplication/json\nx-ms-date:{date}\n/api/logs")
}

/// Current time in the RFC 1123 shape the API expects.
fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[async_trait]
impl EventSink for LogAnalyticsSink {
    async fn send_batch(&self, events: &[Value]) -> Result<usize, SinkError> {
        let body = serde_json::to_vec(events).context(SerializeSnafu)?;

        let mut last_status = 0u16;
        for attempt in 1..=MAX_ATTEMPTS {
            let date = rfc1123_now();
            let request = self
                .client
                .post(&self.endpoint)
                .header("Authorization", self.authorization(&date, body.len()))
                .header("Content-Type", "application/json")
                .header("Log-Type", LOG_TYPE)
                .header("x-ms-date", date)
                .body(body.clone());

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(events.len());
                }
                Ok(response) => {
                    last_status = response.status().as_u16();
                    warn!(
                        status = last_status,
                        attempt,
                        "Sink rejected batch, retrying"
                    );
                }
                Err(e) => {
                    if attempt == MAX_ATTEMPTS {
                        return Err(e).context(RequestSnafu);
                    }
                    warn!(error = %e, attempt, "Sink request failed, retrying");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }
        }

        Err(SinkError::Rejected {
            status: last_status,
            attempts: MAX_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            storage_account: "acct".into(),
            container: "logs".into(),
            archive_container: "archive".into(),
            workspace_id: "ws-1".into(),
            shared_key: BASE64_STANDARD.encode(b"super-secret"),
            log_analytics_uri: "https://ws-1.ods.opinsights.azure.com".into(),
            line_separator: r"\n".into(),
            max_concurrent_blobs: 10,
            max_batch_size: 2000,
            max_chunk_size_mb: 1,
        }
    }

    #[test]
    fn string_to_sign_shape() {
        assert_eq!(
            string_to_sign(1024, "Mon, 31 Aug 2026 12:00:00 GMT"),
            "POST\n1024\napplication/json\nx-ms-date:Mon, 31 Aug 2026 12:00:00 GMT\n/api/logs"
        );
    }

    #[test]
    fn authorization_is_deterministic_per_inputs() {
        let sink = LogAnalyticsSink::new(&test_config()).unwrap();
        let date = "Mon, 31 Aug 2026 12:00:00 GMT";

        let a = sink.authorization(date, 100);
        let b = sink.authorization(date, 100);
        assert_eq!(a, b);
        assert!(a.starts_with("SharedKey ws-1:"));

        // Signature covers both the date and the body length.
        assert_ne!(a, sink.authorization(date, 101));
        assert_ne!(a, sink.authorization("Tue, 01 Sep 2026 12:00:00 GMT", 100));
    }

    #[test]
    fn authorization_matches_known_vector() {
        // HMAC-SHA256 of the canonical string with key b"super-secret",
        // verified against an independent implementation.
        let sink = LogAnalyticsSink::new(&test_config()).unwrap();
        assert_eq!(
            sink.authorization("Mon, 31 Aug 2026 12:00:00 GMT", 100),
            "SharedKey ws-1:f0qoYmDGBUdb9okK/ZiqKeM+M7d+Eg1TxekbXjo9/7w="
        );
    }

    #[test]
    fn invalid_shared_key_rejected_at_construction() {
        let mut config = test_config();
        config.shared_key = "not base64 !!!".into();
        assert!(matches!(
            LogAnalyticsSink::new(&config),
            Err(SinkError::InvalidSharedKey { .. })
        ));
    }

    #[test]
    fn endpoint_carries_api_version() {
        let sink = LogAnalyticsSink::new(&test_config()).unwrap();
        assert_eq!(
            sink.endpoint,
            "https://ws-1.ods.opinsights.azure.com/api/logs?api-version=2016-04-01"
        );
    }
}
