//! Storage tier holding rendered catalog documents

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::Error;

/// Keyed document store the catalog imports from
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorageTier: Send + Sync {
    /// Create or replace the document stored under the `parent_child` publish `key`
    async fn upsert(&self, key: &str, body: &[u8]) -> Result<(), Error>;
}

#[derive(Serialize)]
struct UpsertEnvelope {
    body: String,
}

/// HTTP storage tier client
#[derive(Clone)]
pub struct HttpStorageTier {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStorageTier {
    /// Create a client for the storage tier at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("failed to create storage HTTP client: {e}")))?;
        Ok(Self::with_http(http, base_url))
    }

    /// Create a client sharing an existing HTTP client
    pub fn with_http(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL documents are served from
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl StorageTier for HttpStorageTier {
    async fn upsert(&self, key: &str, body: &[u8]) -> Result<(), Error> {
        let url = format!("{}/upsert", self.base_url);
        debug!(%key, bytes = body.len(), "storage upsert");

        let response = self
            .http
            .post(&url)
            .query(&[("key", key)])
            .json(&UpsertEnvelope {
                body: STANDARD.encode(body),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::unexpected_status(url, status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_base64() {
        let json = serde_json::to_string(&UpsertEnvelope {
            body: STANDARD.encode(b"kind: Component\n"),
        })
        .unwrap();
        assert_eq!(json, r#"{"body":"a2luZDogQ29tcG9uZW50Cg=="}"#);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let tier = HttpStorageTier::new("http://bridge:9090/", Duration::from_secs(1)).unwrap();
        assert_eq!(tier.base_url(), "http://bridge:9090");
    }
}
