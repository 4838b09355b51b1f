//! Catalog location import

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::Error;

/// Location type for GitHub-hosted targets
pub const LOCATION_TYPE_URL: &str = "url";

/// Location type for targets served by the storage tier
pub const LOCATION_TYPE_BRIDGE: &str = "rhdh-rhoai-bridge";

/// Location the catalog registered for an import
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CatalogLocation {
    /// Location id
    pub id: String,
    /// Imported target
    pub target: String,
}

/// Registers storage-tier URIs with the catalog
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    /// Import `target`; the returned location is `None` when the response
    /// could not be understood
    async fn import(&self, target: &str) -> Result<Option<CatalogLocation>, Error>;
}

#[derive(Serialize)]
struct LocationRequest<'a> {
    target: &'a str,
    #[serde(rename = "type")]
    type_: &'static str,
}

/// Location type the catalog should use for `target`
pub fn location_type(target: &str) -> &'static str {
    if target.contains("github") {
        LOCATION_TYPE_URL
    } else {
        LOCATION_TYPE_BRIDGE
    }
}

/// Extract the location from an import response
///
/// The catalog answers either `{"location": {"id", "target"}}` or a flat
/// `{"id", "target"}` object.
pub fn parse_location_response(body: &serde_json::Value) -> Option<CatalogLocation> {
    let location = body.get("location").unwrap_or(body);
    serde_json::from_value(location.clone()).ok()
}

/// HTTP catalog client
#[derive(Clone)]
pub struct HttpCatalogImporter {
    http: reqwest::Client,
    locations_url: String,
    token: Option<String>,
}

impl HttpCatalogImporter {
    /// Create a client for the catalog at `base_url`
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("failed to create catalog HTTP client: {e}")))?;
        Ok(Self::with_http(http, base_url, token))
    }

    /// Create a client sharing an existing HTTP client
    pub fn with_http(http: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            locations_url: format!("{}/api/catalog/locations", base_url.trim_end_matches('/')),
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

#[async_trait]
impl CatalogImporter for HttpCatalogImporter {
    async fn import(&self, target: &str) -> Result<Option<CatalogLocation>, Error> {
        let type_ = location_type(target);
        debug!(%target, %type_, "catalog import");

        let mut request = self
            .http
            .post(&self.locations_url)
            .json(&LocationRequest { target, type_ });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::unexpected_status(&self.locations_url, status.as_u16()));
        }

        let body = response.bytes().await?;
        let location = serde_json::from_slice::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| parse_location_response(&v));
        if location.is_none() {
            warn!(%target, "catalog import response carried no location");
        }
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::github("https://github.com/org/repo/blob/main/catalog-info.yaml", "url")]
    #[case::bridge("http://bridge:9090/mnist/v1/catalog-info.yaml", "rhdh-rhoai-bridge")]
    fn picks_location_type(#[case] target: &str, #[case] expected: &str) {
        assert_eq!(location_type(target), expected);
    }

    #[test]
    fn parses_nested_location() {
        let body = json!({"location": {"id": "abc", "target": "http://x", "type": "url"}, "entities": []});
        assert_eq!(
            parse_location_response(&body),
            Some(CatalogLocation {
                id: "abc".to_string(),
                target: "http://x".to_string()
            })
        );
    }

    #[test]
    fn parses_flat_location() {
        let body = json!({"id": "abc", "target": "http://x"});
        assert_eq!(parse_location_response(&body).unwrap().id, "abc");
    }

    #[test]
    fn unexpected_shape_is_none() {
        assert!(parse_location_response(&json!({"entities": []})).is_none());
        assert!(parse_location_response(&json!([1, 2])).is_none());
    }
}
