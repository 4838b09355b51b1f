//! Model registry wire types
//!
//! Records mirror the registry's REST representation. Every field that the
//! registry may omit is defaulted so a sparse record still decodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Custom properties attached to a registry record
pub type CustomProperties = BTreeMap<String, MetadataValue>;

/// Typed custom property value
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "metadataType")]
pub enum MetadataValue {
    /// String value
    MetadataStringValue {
        /// Value
        #[serde(default)]
        string_value: String,
    },
    /// Integer value (the registry encodes int64 as a string)
    MetadataIntValue {
        /// Value
        #[serde(default)]
        int_value: String,
    },
    /// Floating point value
    MetadataDoubleValue {
        /// Value
        #[serde(default)]
        double_value: f64,
    },
    /// Boolean value
    MetadataBoolValue {
        /// Value
        #[serde(default)]
        bool_value: bool,
    },
    /// Any metadata kind this crate does not interpret
    #[serde(other)]
    Other,
}

impl MetadataValue {
    /// String payload, when this is a string property
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::MetadataStringValue { string_value } => Some(string_value),
            _ => None,
        }
    }

    /// Convenience constructor for a string property
    pub fn string(value: impl Into<String>) -> Self {
        Self::MetadataStringValue {
            string_value: value.into(),
        }
    }
}

/// Archival state shared by registered models and model versions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordState {
    /// Active record
    #[default]
    Live,
    /// Archived record, excluded from normalization
    Archived,
    /// Unrecognized state
    #[serde(other)]
    Unknown,
}

/// Desired state of an inference record
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DesiredState {
    /// Model should be served
    Deployed,
    /// Model should not be served
    Undeployed,
    /// Unrecognized or missing state
    #[default]
    #[serde(other)]
    Unknown,
}

/// A registered model
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredModel {
    /// Registry id
    pub id: String,
    /// Human name
    pub name: String,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Archival state
    #[serde(default)]
    pub state: RecordState,
    /// Custom properties
    #[serde(default)]
    pub custom_properties: CustomProperties,
}

/// A version of a registered model
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    /// Registry id
    pub id: String,
    /// Version name
    pub name: String,
    /// Parent registered model id
    #[serde(default)]
    pub registered_model_id: String,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Archival state
    #[serde(default)]
    pub state: RecordState,
    /// Custom properties
    #[serde(default)]
    pub custom_properties: CustomProperties,
}

/// A model artifact
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelArtifact {
    /// Registry id; by registry convention equals the registered model id
    pub id: String,
    /// Artifact name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Location of the model weights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Model format name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_format_name: Option<String>,
    /// Model format version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_format_version: Option<String>,
    /// Custom properties
    #[serde(default)]
    pub custom_properties: CustomProperties,
}

/// The registry's record of a deployment
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRecord {
    /// Registry id
    pub id: String,
    /// Record name, usually `<deployment>/<uuid>`
    #[serde(default)]
    pub name: String,
    /// Deployed registered model
    #[serde(default)]
    pub registered_model_id: String,
    /// Deployed model version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version_id: Option<String>,
    /// Target serving environment
    #[serde(default)]
    pub serving_environment_id: String,
    /// Deployment name the record refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    /// Desired state
    #[serde(default)]
    pub desired_state: DesiredState,
}

impl InferenceRecord {
    /// True when the registry wants this model served
    pub fn is_deployed(&self) -> bool {
        self.desired_state == DesiredState::Deployed
    }
}

/// A deployment target; its name matches a Kubernetes namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServingEnvironment {
    /// Registry id
    pub id: String,
    /// Environment name
    pub name: String,
}

/// Registry collection envelope
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ItemList<T> {
    /// Items in the page
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_registered_model_with_properties() {
        let json = r#"{
            "id": "1",
            "name": "mnist",
            "owner": "kube:admin",
            "state": "LIVE",
            "customProperties": {
                "foo": {"metadataType": "MetadataStringValue", "string_value": "bar"},
                "size": {"metadataType": "MetadataIntValue", "int_value": "42"},
                "blob": {"metadataType": "MetadataStructValue", "struct_value": "e30="}
            }
        }"#;
        let rm: RegisteredModel = serde_json::from_str(json).unwrap();
        assert_eq!(rm.owner.as_deref(), Some("kube:admin"));
        assert_eq!(rm.custom_properties["foo"].as_str(), Some("bar"));
        assert_eq!(rm.custom_properties["size"].as_str(), None);
        assert_eq!(rm.custom_properties["blob"], MetadataValue::Other);
    }

    #[test]
    fn archived_and_unknown_states() {
        let mv: ModelVersion =
            serde_json::from_str(r#"{"id":"2","name":"v1","state":"ARCHIVED"}"#).unwrap();
        assert_eq!(mv.state, RecordState::Archived);

        let mv: ModelVersion =
            serde_json::from_str(r#"{"id":"2","name":"v1","state":"PENDING"}"#).unwrap();
        assert_eq!(mv.state, RecordState::Unknown);
    }

    #[test]
    fn inference_record_desired_state() {
        let json = r#"{
            "id": "4",
            "name": "mnist-v1/8c2c357f-bf82-4d2d-a254-43eca96fd31d",
            "desiredState": "DEPLOYED",
            "modelVersionId": "2",
            "registeredModelId": "1",
            "runtime": "mnist-v1",
            "servingEnvironmentId": "3"
        }"#;
        let ir: InferenceRecord = serde_json::from_str(json).unwrap();
        assert!(ir.is_deployed());
        assert_eq!(ir.runtime.as_deref(), Some("mnist-v1"));

        let ir: InferenceRecord = serde_json::from_str(r#"{"id":"5"}"#).unwrap();
        assert!(!ir.is_deployed());
    }

    #[test]
    fn missing_items_is_empty() {
        let list: ItemList<RegisteredModel> = serde_json::from_str(r#"{"size":0}"#).unwrap();
        assert!(list.items.is_empty());
    }
}
