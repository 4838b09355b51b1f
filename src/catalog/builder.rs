//! Pure transform from deployment + registry correlation to a catalog entity

use std::collections::BTreeMap;

use kube::ResourceExt;

use super::entity::{
    entity_ref, ApiSpec, ApiType, ComponentSpec, Entity, EntityMetadata, EntityTriad, Profile,
    ResourceSpec, COMPONENT_TYPE, NO_DEFINITION, RESOURCE_TYPE, TECHDOCS_REF_ANNOTATION,
};
use super::flat::{FlatApi, FlatModel, ModelCatalog, ModelServer, TECHDOCS_ANNOTATION};
use super::links::{artifact_links, deployment_links, Link};
use super::tags::{deployment_tags, normalize_tags, property_tags, PropertyFields};
use super::{CatalogEntity, OutputFormat};
use crate::crd::InferenceService;
use crate::resolver::Correlation;
use crate::sanitize::sanitize;
use crate::Error;

/// Annotation prefix for registry-sourced structured fields
const REGISTRY_ANNOTATION_PREFIX: &str = "model-registry/";

/// Owner and lifecycle used when the registry supplies none
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDefaults {
    /// Default owner (user name, without the `user:` prefix)
    pub owner: String,
    /// Default lifecycle
    pub lifecycle: String,
}

impl Default for EntityDefaults {
    fn default() -> Self {
        Self {
            owner: "rhdh-rhoai-bridge".to_string(),
            lifecycle: "development".to_string(),
        }
    }
}

/// What to build an entity from; at least one side must be present
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildInput<'a> {
    /// Live deployment
    pub deployment: Option<&'a InferenceService>,
    /// Registry records for the same model
    pub correlation: Option<&'a Correlation>,
}

/// Builds catalog entities in the configured output format
#[derive(Clone, Debug, Default)]
pub struct EntityBuilder {
    format: OutputFormat,
    defaults: EntityDefaults,
}

/// Everything derived once and shared by both output forms
struct Facts {
    correlated: bool,
    component: String,
    resource: String,
    api: String,
    description: String,
    owner: String,
    lifecycle: String,
    fields: PropertyFields,
    deployment_tags: Vec<String>,
    model_tags: Vec<String>,
    version_tags: Vec<String>,
    artifact_tags: Vec<String>,
    deployment_links: Vec<Link>,
    artifact_links: Vec<Link>,
    server_name: Option<String>,
    server_url: Option<String>,
    artifact_uri: Option<String>,
}

impl EntityBuilder {
    /// Create a builder
    pub fn new(format: OutputFormat, defaults: EntityDefaults) -> Self {
        Self { format, defaults }
    }

    /// Output format this builder produces
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Build the entity for `input`
    ///
    /// Fails only when neither a deployment nor a correlation is given.
    pub fn build(&self, input: BuildInput<'_>) -> Result<CatalogEntity, Error> {
        let facts = self.facts(input)?;
        Ok(match self.format {
            OutputFormat::CatalogInfoYaml => CatalogEntity::Triad(Box::new(triad(&facts))),
            OutputFormat::JsonArray => CatalogEntity::Flat(flat(&facts)),
        })
    }

    fn facts(&self, input: BuildInput<'_>) -> Result<Facts, Error> {
        let deployment = input.deployment;
        let (deployment_tags, deployment_links, server_name, server_url) = match deployment {
            Some(isvc) => (
                deployment_tags(isvc),
                deployment_links(isvc),
                Some(sanitize(&isvc.name_any())),
                isvc.url().map(str::to_string),
            ),
            None => (Vec::new(), Vec::new(), None, None),
        };

        match (input.correlation, deployment) {
            (Some(c), _) => {
                let fields =
                    PropertyFields::collect(&[&c.version.custom_properties, &c.model.custom_properties]);
                let component = sanitize(&c.model.name);
                let resource = sanitize(&format!("{}-{}", component, sanitize(&c.version.name)));
                let description = c
                    .version
                    .description
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .or(c.model.description.as_deref())
                    .unwrap_or_default()
                    .to_string();
                let owner = fields
                    .owner
                    .as_deref()
                    .or(c.model.owner.as_deref())
                    .map(sanitize)
                    .filter(|o| !o.is_empty())
                    .unwrap_or_else(|| self.defaults.owner.clone());
                let lifecycle = fields
                    .lifecycle
                    .clone()
                    .unwrap_or_else(|| self.defaults.lifecycle.clone());

                Ok(Facts {
                    correlated: true,
                    api: component.clone(),
                    component,
                    resource,
                    description,
                    owner,
                    lifecycle,
                    deployment_tags,
                    model_tags: property_tags(&c.model.custom_properties),
                    version_tags: property_tags(&c.version.custom_properties),
                    artifact_tags: c
                        .artifact
                        .as_ref()
                        .map(|a| property_tags(&a.custom_properties))
                        .unwrap_or_default(),
                    deployment_links,
                    artifact_links: artifact_links(c.artifact.as_ref()),
                    server_name,
                    server_url,
                    artifact_uri: c.artifact.as_ref().and_then(|a| a.uri.clone()),
                    fields,
                })
            }
            (None, Some(isvc)) => {
                let namespace = isvc.namespace().unwrap_or_default();
                let name = isvc.name_any();
                let id = sanitize(&format!("{namespace}_{name}"));
                Ok(Facts {
                    correlated: false,
                    component: id.clone(),
                    resource: id.clone(),
                    api: id,
                    description: format!("KServe instance {namespace}:{name}"),
                    owner: self.defaults.owner.clone(),
                    lifecycle: self.defaults.lifecycle.clone(),
                    fields: PropertyFields::default(),
                    deployment_tags,
                    model_tags: Vec::new(),
                    version_tags: Vec::new(),
                    artifact_tags: Vec::new(),
                    deployment_links,
                    artifact_links: Vec::new(),
                    server_name,
                    server_url,
                    artifact_uri: None,
                })
            }
            (None, None) => Err(Error::validation(
                "entity requires a deployment or a registry correlation",
            )),
        }
    }
}

impl Facts {
    fn definition(&self) -> String {
        self.fields
            .api_spec
            .clone()
            .unwrap_or_else(|| NO_DEFINITION.to_string())
    }

    fn api_type(&self) -> ApiType {
        ApiType::resolve(self.fields.api_type.as_deref(), &self.definition())
    }

    fn owner_ref(&self) -> String {
        entity_ref("user", &self.owner)
    }
}

fn techdocs_annotations(reference: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(TECHDOCS_REF_ANNOTATION.to_string(), reference.to_string())])
}

fn triad(facts: &Facts) -> EntityTriad {
    let component = Entity::new(
        "Component",
        EntityMetadata {
            name: facts.component.clone(),
            description: facts.description.clone(),
            tags: normalize_tags(
                facts
                    .deployment_tags
                    .iter()
                    .chain(&facts.model_tags)
                    .chain(&facts.version_tags)
                    .cloned(),
            ),
            links: facts
                .deployment_links
                .iter()
                .chain(&facts.artifact_links)
                .cloned()
                .collect(),
            annotations: techdocs_annotations(facts.fields.techdocs.as_deref().unwrap_or("./")),
        },
        ComponentSpec {
            type_: COMPONENT_TYPE.to_string(),
            lifecycle: facts.lifecycle.clone(),
            owner: facts.owner_ref(),
            depends_on: vec![
                entity_ref("resource", &facts.resource),
                entity_ref("api", &facts.api),
            ],
            profile: Profile {
                display_name: format!("The {} model server", facts.component),
            },
        },
    );

    let mut resource_annotations = techdocs_annotations("resource/");
    if let Some(license) = &facts.fields.license {
        resource_annotations.insert(
            format!("{REGISTRY_ANNOTATION_PREFIX}license"),
            license.clone(),
        );
    }
    for (key, value) in &facts.fields.provenance {
        resource_annotations.insert(format!("{REGISTRY_ANNOTATION_PREFIX}{key}"), value.clone());
    }

    let resource = Entity::new(
        "Resource",
        EntityMetadata {
            name: facts.resource.clone(),
            description: facts.description.clone(),
            tags: normalize_tags(
                facts
                    .deployment_tags
                    .iter()
                    .chain(&facts.version_tags)
                    .chain(&facts.artifact_tags)
                    .cloned(),
            ),
            links: facts.artifact_links.clone(),
            annotations: resource_annotations,
        },
        ResourceSpec {
            type_: RESOURCE_TYPE.to_string(),
            lifecycle: facts.lifecycle.clone(),
            owner: facts.owner_ref(),
            dependency_of: vec![entity_ref("component", &facts.component)],
            profile: Profile {
                display_name: format!("The {} ai model", facts.resource),
            },
        },
    );

    let api = Entity::new(
        "API",
        EntityMetadata {
            name: facts.api.clone(),
            description: facts.description.clone(),
            tags: Vec::new(),
            links: facts.deployment_links.clone(),
            annotations: techdocs_annotations("api/"),
        },
        ApiSpec {
            type_: facts.api_type(),
            lifecycle: facts.lifecycle.clone(),
            owner: facts.owner_ref(),
            definition: facts.definition(),
            dependency_of: vec![entity_ref("component", &facts.component)],
            profile: Profile {
                display_name: format!("The {} openapi", facts.api),
            },
        },
    );

    EntityTriad {
        component,
        resource,
        api,
    }
}

fn flat(facts: &Facts) -> ModelCatalog {
    let fields = &facts.fields;
    let registry_tags = || {
        facts
            .model_tags
            .iter()
            .chain(&facts.version_tags)
            .chain(&facts.artifact_tags)
            .cloned()
    };

    // A bare deployment describes no model.
    let models = if !facts.correlated {
        Vec::new()
    } else {
        let mut annotations = BTreeMap::new();
        if let Some(url) = &fields.techdocs {
            annotations.insert(TECHDOCS_ANNOTATION.to_string(), url.clone());
        }
        vec![FlatModel {
            name: facts.resource.clone(),
            description: facts.description.clone(),
            owner: facts.owner.clone(),
            lifecycle: facts.lifecycle.clone(),
            tags: normalize_tags(registry_tags()),
            artifact_location_url: facts.artifact_uri.clone(),
            license: fields.license.clone(),
            ethics: fields.ethics.clone(),
            how_to_use_url: fields.how_to_use.clone(),
            support: fields.support.clone(),
            training: fields.training.clone(),
            usage: fields.usage.clone(),
            annotations,
        }]
    };

    let model_server = match (&facts.server_name, &facts.server_url) {
        (Some(name), Some(url)) => {
            let tags = normalize_tags(facts.deployment_tags.iter().cloned().chain(registry_tags()));
            Some(ModelServer {
                name: name.clone(),
                description: facts.description.clone(),
                owner: facts.owner.clone(),
                lifecycle: facts.lifecycle.clone(),
                tags: tags.clone(),
                homepage_url: fields.homepage_url.clone(),
                usage: fields.usage.clone(),
                api: FlatApi {
                    url: url.clone(),
                    type_: facts.api_type(),
                    spec: facts.definition(),
                    tags,
                },
            })
        }
        _ => None,
    };

    ModelCatalog {
        models,
        model_server,
    }
}
