//! Catalog entity documents (Component / Resource / API triad)

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::links::Link;
use crate::Error;

/// Entity schema version
pub const API_VERSION: &str = "backstage.io/v1alpha1";

/// Annotation pointing at the entity's TechDocs source
pub const TECHDOCS_REF_ANNOTATION: &str = "backstage.io/techdocs-ref";

/// Component spec type for model servers
pub const COMPONENT_TYPE: &str = "model-server";

/// Resource spec type for models
pub const RESOURCE_TYPE: &str = "ai-model";

/// Definition placeholder; the catalog rejects an empty one
pub const NO_DEFINITION: &str = "no-definition-yet";

/// API transport type
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    /// OpenAPI
    Openapi,
    /// AsyncAPI
    Asyncapi,
    /// GraphQL
    Graphql,
    /// tRPC
    Trpc,
    /// gRPC
    Grpc,
    /// Nothing recognizable
    #[default]
    Unknown,
}

impl ApiType {
    /// Infer the type from marker substrings in an API definition
    pub fn infer(definition: &str) -> Self {
        let definition = definition.to_lowercase();
        let markers = [
            ("openapi", Self::Openapi),
            ("asyncapi", Self::Asyncapi),
            ("graphql", Self::Graphql),
            ("trpc", Self::Trpc),
            ("proto", Self::Grpc),
        ];
        markers
            .into_iter()
            .find(|(marker, _)| definition.contains(marker))
            .map(|(_, t)| t)
            .unwrap_or(Self::Unknown)
    }

    /// Parse an explicitly declared type
    pub fn parse(declared: &str) -> Option<Self> {
        match declared.trim().to_ascii_lowercase().as_str() {
            "openapi" => Some(Self::Openapi),
            "asyncapi" => Some(Self::Asyncapi),
            "graphql" => Some(Self::Graphql),
            "trpc" => Some(Self::Trpc),
            "grpc" => Some(Self::Grpc),
            _ => None,
        }
    }

    /// Declared type if recognizable, otherwise inferred from the definition
    pub fn resolve(declared: Option<&str>, definition: &str) -> Self {
        declared
            .and_then(Self::parse)
            .unwrap_or_else(|| Self::infer(definition))
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Openapi => "openapi",
            Self::Asyncapi => "asyncapi",
            Self::Graphql => "graphql",
            Self::Trpc => "trpc",
            Self::Grpc => "grpc",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Entity metadata block
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct EntityMetadata {
    /// Entity name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Links
    #[serde(default)]
    pub links: Vec<Link>,
    /// Annotations
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Entity profile block
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Display name
    pub display_name: String,
}

/// Component spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Component type
    #[serde(rename = "type")]
    pub type_: String,
    /// Lifecycle
    pub lifecycle: String,
    /// Owner entity reference
    pub owner: String,
    /// Typed references this component depends on
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Profile
    pub profile: Profile,
}

/// Resource spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// Resource type
    #[serde(rename = "type")]
    pub type_: String,
    /// Lifecycle
    pub lifecycle: String,
    /// Owner entity reference
    pub owner: String,
    /// Typed references that depend on this resource
    #[serde(default)]
    pub dependency_of: Vec<String>,
    /// Profile
    pub profile: Profile,
}

/// API spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpec {
    /// Transport type
    #[serde(rename = "type")]
    pub type_: ApiType,
    /// Lifecycle
    pub lifecycle: String,
    /// Owner entity reference
    pub owner: String,
    /// API definition document
    pub definition: String,
    /// Typed references that depend on this API
    #[serde(default)]
    pub dependency_of: Vec<String>,
    /// Profile
    pub profile: Profile,
}

/// One catalog entity document
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entity<S> {
    /// Schema version
    pub api_version: String,
    /// Entity kind
    pub kind: String,
    /// Metadata
    pub metadata: EntityMetadata,
    /// Kind-specific spec
    pub spec: S,
}

impl<S> Entity<S> {
    /// Wrap metadata and spec into an entity of `kind`
    pub fn new(kind: &str, metadata: EntityMetadata, spec: S) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: kind.to_string(),
            metadata,
            spec,
        }
    }
}

/// Typed entity reference `kind:name`
pub fn entity_ref(kind: &str, name: &str) -> String {
    format!("{kind}:{name}")
}

/// The three-document form of a catalog entity
#[derive(Clone, Debug, PartialEq)]
pub struct EntityTriad {
    /// The model server
    pub component: Entity<ComponentSpec>,
    /// The model version
    pub resource: Entity<ResourceSpec>,
    /// The serving API
    pub api: Entity<ApiSpec>,
}

impl EntityTriad {
    /// Render as YAML documents separated by `---` lines
    pub fn to_yaml(&self) -> Result<String, Error> {
        let component = to_yaml(&self.component)?;
        let resource = to_yaml(&self.resource)?;
        let api = to_yaml(&self.api)?;
        Ok(format!("{component}---\n{resource}---\n{api}"))
    }
}

fn to_yaml<T: Serialize>(doc: &T) -> Result<String, Error> {
    let mut out = serde_yaml::to_string(doc).map_err(|e| Error::serialization(e.to_string()))?;
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::openapi(r#"{"openapi": "3.0.0"}"#, ApiType::Openapi)]
    #[case::asyncapi("asyncapi: 2.6.0", ApiType::Asyncapi)]
    #[case::graphql("type Query { graphql }", ApiType::Graphql)]
    #[case::trpc("trpc router", ApiType::Trpc)]
    #[case::grpc("syntax = \"proto3\";", ApiType::Grpc)]
    #[case::placeholder(NO_DEFINITION, ApiType::Unknown)]
    #[case::empty("", ApiType::Unknown)]
    #[case::mixed_case_graphql("schema { query: Query } # GraphQL SDL", ApiType::Graphql)]
    #[case::mixed_case_asyncapi("AsyncAPI: 2.6.0", ApiType::Asyncapi)]
    #[case::upper_openapi("OPENAPI: 3.1.0", ApiType::Openapi)]
    fn infers_api_type(#[case] definition: &str, #[case] expected: ApiType) {
        assert_eq!(ApiType::infer(definition), expected);
    }

    #[test]
    fn declared_type_wins_when_known() {
        assert_eq!(ApiType::resolve(Some("GraphQL"), "openapi"), ApiType::Graphql);
        assert_eq!(ApiType::resolve(Some("soap"), "openapi"), ApiType::Openapi);
        assert_eq!(ApiType::resolve(None, ""), ApiType::Unknown);
    }

    #[test]
    fn triad_renders_three_documents() {
        let meta = |name: &str| EntityMetadata {
            name: name.to_string(),
            ..Default::default()
        };
        let triad = EntityTriad {
            component: Entity::new("Component", meta("c"), ComponentSpec::default()),
            resource: Entity::new("Resource", meta("r"), ResourceSpec::default()),
            api: Entity::new("API", meta("a"), ApiSpec::default()),
        };
        let yaml = triad.to_yaml().unwrap();
        assert_eq!(yaml.lines().filter(|l| *l == "---").count(), 2);

        let kinds: Vec<String> = yaml
            .split("---\n")
            .map(|doc| {
                let v: serde_yaml::Value = serde_yaml::from_str(doc).unwrap();
                v["kind"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(kinds, vec!["Component", "Resource", "API"]);
        assert!(yaml.contains("type: unknown"));
        assert!(yaml.contains("apiVersion: backstage.io/v1alpha1"));
    }
}
