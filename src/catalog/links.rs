//! Entity links derived from deployment endpoints and artifact URIs

use serde::{Deserialize, Serialize};

use crate::crd::InferenceService;
use crate::registry::ModelArtifact;

const LINK_TYPE_WEBSITE: &str = "website";
const LINK_ICON_WEB_ASSET: &str = "WebAsset";

/// A catalog entity link
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Link {
    /// Target URL
    pub url: String,
    /// Display title
    pub title: String,
    /// Icon name
    pub icon: String,
    /// Link type
    #[serde(rename = "type")]
    pub type_: String,
}

impl Link {
    fn website(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            icon: LINK_ICON_WEB_ASSET.to_string(),
            type_: LINK_TYPE_WEBSITE.to_string(),
        }
    }
}

/// Links for a deployment's public URL and each exposed component
pub fn deployment_links(isvc: &InferenceService) -> Vec<Link> {
    let mut links = Vec::new();
    let Some(status) = &isvc.status else {
        return links;
    };

    if let Some(url) = isvc.url() {
        links.push(Link::website(url, "API URL"));
    }

    for (component, endpoints) in &status.components {
        if let Some(url) = endpoints.url.as_deref().filter(|u| !u.is_empty()) {
            links.push(Link::website(
                format!("{}/docs", url.trim_end_matches('/')),
                format!("{component} FastAPI URL"),
            ));
            links.push(Link::website(url, format!("{component} model serving URL")));
        }
        if let Some(url) = endpoints.rest_url.as_deref().filter(|u| !u.is_empty()) {
            links.push(Link::website(
                url,
                format!("{component} REST model serving URL"),
            ));
        }
        if let Some(url) = endpoints.grpc_url.as_deref().filter(|u| !u.is_empty()) {
            links.push(Link::website(
                url,
                format!("{component} GRPC model serving URL"),
            ));
        }
    }

    links
}

/// Link to an artifact's storage URI, if it has one
pub fn artifact_links(artifact: Option<&ModelArtifact>) -> Vec<Link> {
    artifact
        .and_then(|a| {
            let uri = a.uri.as_deref().filter(|u| !u.is_empty())?;
            let title = a
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or("Model artifact");
            Some(Link::website(uri, title))
        })
        .into_iter()
        .collect()
}
