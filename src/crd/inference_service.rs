//! KServe InferenceService resource
//!
//! Only the fields the normalizer reads are modelled. The CRD itself is owned
//! and installed by KServe; unknown fields are ignored on decode.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for an InferenceService
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "serving.kserve.io",
    version = "v1beta1",
    kind = "InferenceService",
    plural = "inferenceservices",
    shortname = "isvc",
    status = "InferenceServiceStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct InferenceServiceSpec {
    /// Predictor component (always present on a valid resource)
    #[serde(default)]
    pub predictor: PredictorSpec,

    /// Optional explainer component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explainer: Option<ExplainerSpec>,

    /// Optional transformer component (contents are not inspected)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<serde_json::Value>,
}

/// Predictor component
///
/// Exactly one framework field is expected to be set, or the generic `model`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictorSpec {
    /// scikit-learn predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sklearn: Option<FrameworkSpec>,
    /// XGBoost predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xgboost: Option<FrameworkSpec>,
    /// TensorFlow predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensorflow: Option<FrameworkSpec>,
    /// PyTorch predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pytorch: Option<FrameworkSpec>,
    /// Triton predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triton: Option<FrameworkSpec>,
    /// ONNX predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onnx: Option<FrameworkSpec>,
    /// Hugging Face predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub huggingface: Option<FrameworkSpec>,
    /// PMML predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmml: Option<FrameworkSpec>,
    /// LightGBM predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lightgbm: Option<FrameworkSpec>,
    /// PaddlePaddle predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paddle: Option<FrameworkSpec>,

    /// Generic model spec selecting a serving runtime by model format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSpec>,
}

/// Framework-specific predictor settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkSpec {
    /// Location of the model weights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,

    /// Runtime image version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
}

/// Generic predictor model spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    /// Model format used to pick a serving runtime
    pub model_format: ModelFormat,

    /// Explicit serving runtime name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    /// Location of the model weights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
}

/// Model format name and optional version
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ModelFormat {
    /// Format name (e.g. `onnx`)
    pub name: String,

    /// Format version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Explainer component
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ExplainerSpec {
    /// Adversarial Robustness Toolbox explainer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub art: Option<ArtExplainerSpec>,
}

/// ART explainer settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ArtExplainerSpec {
    /// Explainer algorithm (e.g. `SquareAttack`)
    #[serde(rename = "type")]
    pub type_: String,
}

/// Observed state of an InferenceService
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceServiceStatus {
    /// Externally reachable URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Per-component endpoints keyed by component name
    /// (`predictor`, `explainer`, `transformer`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, ComponentStatus>,
}

/// Endpoints of one InferenceService component
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ComponentStatus {
    /// Component URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// REST endpoint
    #[serde(default, rename = "restURL", skip_serializing_if = "Option::is_none")]
    pub rest_url: Option<String>,

    /// gRPC endpoint
    #[serde(default, rename = "grpcURL", skip_serializing_if = "Option::is_none")]
    pub grpc_url: Option<String>,
}

impl PredictorSpec {
    /// Framework fields in tag priority order
    pub fn frameworks(&self) -> [(&'static str, bool); 10] {
        [
            ("sklearn", self.sklearn.is_some()),
            ("xgboost", self.xgboost.is_some()),
            ("tensorflow", self.tensorflow.is_some()),
            ("pytorch", self.pytorch.is_some()),
            ("triton", self.triton.is_some()),
            ("onnx", self.onnx.is_some()),
            ("huggingface", self.huggingface.is_some()),
            ("pmml", self.pmml.is_some()),
            ("lightgbm", self.lightgbm.is_some()),
            ("paddle", self.paddle.is_some()),
        ]
    }
}

impl InferenceService {
    /// Externally reachable URL, if KServe has published one
    pub fn url(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.url.as_deref())
            .filter(|u| !u.is_empty())
    }
}
