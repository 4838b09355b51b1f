//! Model normalizer - publishes served models and registry records to a developer catalog
//!
//! Watches KServe `InferenceService` resources, correlates each one with the
//! model registry, and publishes a catalog entity describing the model and
//! its serving endpoint. A background sweep publishes registry-only model
//! versions that no deployment event points at.
//!
//! # Flow
//!
//! ```text
//! event/sweep -> resolver -> catalog builder -> publisher -> storage tier
//!                                                         -> catalog import (once per key)
//! ```
//!
//! # Modules
//!
//! - [`crd`] - The watched `InferenceService` resource
//! - [`registry`] - Model registry client and record types
//! - [`resolver`] - Deployment to registry correlation
//! - [`catalog`] - Catalog entity construction (YAML triad or flat JSON)
//! - [`publish`] - Storage upsert, catalog import and the dedup ledger
//! - [`controller`] - Reconcile loop and background sweep
//! - [`config`] - Command-line and environment configuration
//! - [`telemetry`] - Logging and trace export
//! - [`sanitize`] - Catalog/Kubernetes-safe names
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod catalog;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod publish;
pub mod registry;
pub mod resolver;
pub mod sanitize;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
