//! Catalog entity construction
//!
//! Turns a deployment and/or its registry correlation into the document the
//! developer catalog ingests. Two output shapes are supported:
//!
//! - [`OutputFormat::CatalogInfoYaml`]: a Component / Resource / API triad
//!   rendered as three YAML documents
//! - [`OutputFormat::JsonArray`]: one flat JSON object with a model list and
//!   an optional model server
//!
//! Everything here is pure; no I/O happens during building.

mod builder;
pub mod entity;
pub mod flat;
pub mod links;
pub mod tags;

pub use builder::{BuildInput, EntityBuilder, EntityDefaults};
pub use entity::{ApiType, EntityTriad};
pub use flat::ModelCatalog;

use crate::Error;

/// Output shape of published entities
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Component / Resource / API YAML triad
    #[default]
    CatalogInfoYaml,
    /// Flat JSON model catalog
    JsonArray,
}

impl OutputFormat {
    /// File name used in the storage URI
    pub fn file_name(self) -> &'static str {
        match self {
            Self::CatalogInfoYaml => "catalog-info.yaml",
            Self::JsonArray => "model-catalog.json",
        }
    }
}

/// A built catalog entity in either output shape
#[derive(Clone, Debug, PartialEq)]
pub enum CatalogEntity {
    /// Three-document form
    Triad(Box<EntityTriad>),
    /// Flat JSON form
    Flat(ModelCatalog),
}

impl CatalogEntity {
    /// Serialize into the bytes handed to the storage tier
    pub fn render(&self) -> Result<String, Error> {
        match self {
            Self::Triad(triad) => triad.to_yaml(),
            Self::Flat(catalog) => catalog.to_json(),
        }
    }

    /// Format this entity renders as
    pub fn format(&self) -> OutputFormat {
        match self {
            Self::Triad(_) => OutputFormat::CatalogInfoYaml,
            Self::Flat(_) => OutputFormat::JsonArray,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn format_names_match_cli_values() {
        let yaml = OutputFormat::from_str("catalog-info-yaml", true).unwrap();
        let json = OutputFormat::from_str("json-array", true).unwrap();
        assert_eq!(yaml.file_name(), "catalog-info.yaml");
        assert_eq!(json.file_name(), "model-catalog.json");
    }

    #[test]
    fn flat_entity_renders_json() {
        let entity = CatalogEntity::Flat(ModelCatalog::default());
        assert_eq!(entity.format(), OutputFormat::JsonArray);
        let rendered: serde_json::Value =
            serde_json::from_str(&entity.render().unwrap()).unwrap();
        assert!(rendered.is_array());
    }
}
