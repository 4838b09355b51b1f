//! Flat JSON form of a catalog entity
//!
//! One JSON array of typed records: the model records and, when the model is
//! actually served somewhere, the model server that exposes it. Each element
//! carries a `kind` discriminator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::ApiType;
use crate::Error;

/// Annotation key carrying a model's TechDocs URL
pub const TECHDOCS_ANNOTATION: &str = "TechDocs";

/// Flat catalog document; serializes as an array of [`FlatRecord`]
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(from = "Vec<FlatRecord>", into = "Vec<FlatRecord>")]
pub struct ModelCatalog {
    /// Model records
    pub models: Vec<FlatModel>,
    /// Serving endpoint, present only when reachable
    pub model_server: Option<ModelServer>,
}

/// One element of the flat array
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FlatRecord {
    /// A model record
    Model(FlatModel),
    /// The server exposing the models
    ModelServer(ModelServer),
}

impl From<ModelCatalog> for Vec<FlatRecord> {
    fn from(catalog: ModelCatalog) -> Self {
        catalog
            .models
            .into_iter()
            .map(FlatRecord::Model)
            .chain(catalog.model_server.map(FlatRecord::ModelServer))
            .collect()
    }
}

impl From<Vec<FlatRecord>> for ModelCatalog {
    fn from(records: Vec<FlatRecord>) -> Self {
        let mut catalog = Self::default();
        for record in records {
            match record {
                FlatRecord::Model(model) => catalog.models.push(model),
                FlatRecord::ModelServer(server) => catalog.model_server = Some(server),
            }
        }
        catalog
    }
}

impl ModelCatalog {
    /// Render as compact JSON
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::serialization(e.to_string()))
    }
}

/// A model record
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlatModel {
    /// Model name
    pub name: String,
    /// Description
    pub description: String,
    /// Owner
    pub owner: String,
    /// Lifecycle
    pub lifecycle: String,
    /// Tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Location of the model weights
    #[serde(
        default,
        rename = "artifactLocationURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub artifact_location_url: Option<String>,
    /// License
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Ethics statement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethics: Option<String>,
    /// How-to-use URL
    #[serde(
        default,
        rename = "howToUseURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub how_to_use_url: Option<String>,
    /// Support statement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support: Option<String>,
    /// Training notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<String>,
    /// Usage notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// The model server exposing a model
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelServer {
    /// Server name
    pub name: String,
    /// Description
    pub description: String,
    /// Owner
    pub owner: String,
    /// Lifecycle
    pub lifecycle: String,
    /// Tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Homepage
    #[serde(
        default,
        rename = "homepageURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub homepage_url: Option<String>,
    /// Usage notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Serving API
    #[serde(rename = "API")]
    pub api: FlatApi,
}

/// Serving API of a model server
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct FlatApi {
    /// Endpoint URL
    pub url: String,
    /// Transport type
    #[serde(rename = "type")]
    pub type_: ApiType,
    /// API definition
    pub spec: String,
    /// Tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}
