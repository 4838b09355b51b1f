//! Custom resources watched by the normalizer

mod inference_service;

pub use inference_service::{
    ArtExplainerSpec, ComponentStatus, ExplainerSpec, FrameworkSpec, InferenceService,
    InferenceServiceSpec, InferenceServiceStatus, ModelFormat, ModelSpec, PredictorSpec,
};
