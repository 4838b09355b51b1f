//! Tag derivation and structured custom-property fields
//!
//! Tags come from two places: the deployment's predictor discriminant and
//! registry custom properties. Registry keys with a structured meaning
//! (license, techdocs, provenance, ...) never become tags; they are returned
//! as [`PropertyFields`] instead.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::crd::InferenceService;
use crate::registry::CustomProperties;
use crate::sanitize::sanitize;

/// Maximum tag length accepted by the catalog
pub const MAX_TAG_LEN: usize = 63;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9:+#]+(-[a-z0-9:+#]+)*$").expect("tag pattern is valid"));

/// Property keys with a structured meaning
pub mod keys {
    /// License text or identifier
    pub const LICENSE: &str = "License";
    /// TechDocs repository URL
    pub const TECHDOCS: &str = "TechDocs";
    /// Entity owner override
    pub const OWNER: &str = "Owner";
    /// Entity lifecycle override
    pub const LIFECYCLE: &str = "Lifecycle";
    /// API definition document
    pub const API_SPEC: &str = "API Spec";
    /// Declared API transport type
    pub const API_TYPE: &str = "API Type";
    /// Ethics statement
    pub const ETHICS: &str = "Ethics";
    /// How-to-use URL
    pub const HOW_TO_USE: &str = "How to use";
    /// Support statement
    pub const SUPPORT: &str = "Support";
    /// Training notes
    pub const TRAINING: &str = "Training";
    /// Usage notes
    pub const USAGE: &str = "Usage";
    /// Model server homepage
    pub const HOMEPAGE_URL: &str = "Homepage URL";

    /// Keys the model catalog stamps on records it registers
    pub const CATALOG_PROVENANCE: [&str; 4] = [
        "Registered from",
        "Source model",
        "Source model version",
        "Provider",
    ];

    pub(crate) const STRUCTURED: [&str; 12] = [
        LICENSE,
        TECHDOCS,
        OWNER,
        LIFECYCLE,
        API_SPEC,
        API_TYPE,
        ETHICS,
        HOW_TO_USE,
        SUPPORT,
        TRAINING,
        USAGE,
        HOMEPAGE_URL,
    ];
}

/// True if `tag` is acceptable to the catalog
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.len() <= MAX_TAG_LEN && TAG_PATTERN.is_match(tag)
}

fn is_provenance_key(key: &str) -> bool {
    key.starts_with('_')
        || keys::CATALOG_PROVENANCE
            .iter()
            .any(|k| k.eq_ignore_ascii_case(key))
}

/// True if `key` is surfaced as a structured field rather than a tag
pub fn is_reserved_key(key: &str) -> bool {
    is_provenance_key(key) || keys::STRUCTURED.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Tags derived from the deployment's predictor
///
/// At most one framework tag (first present in priority order), then the
/// generic model format, then the explainer type.
pub fn deployment_tags(isvc: &InferenceService) -> Vec<String> {
    let predictor = &isvc.spec.predictor;
    let mut tags = Vec::new();

    if let Some((framework, _)) = predictor.frameworks().into_iter().find(|(_, set)| *set) {
        tags.push(framework.to_string());
    }

    if let Some(model) = &predictor.model {
        let format = &model.model_format;
        let tag = match &format.version {
            Some(version) if !version.is_empty() => format!("{}-{}", format.name, version),
            _ => format.name.clone(),
        };
        tags.push(tag.to_lowercase());
    }

    if let Some(art) = isvc.spec.explainer.as_ref().and_then(|e| e.art.as_ref()) {
        tags.push(art.type_.to_lowercase());
    }

    tags
}

/// Tags derived from registry custom properties
///
/// Each non-reserved property yields `key-value` for string values and `key`
/// otherwise. Values are lowercased; anything failing the allow-list or the
/// length cap is dropped.
pub fn property_tags(props: &CustomProperties) -> Vec<String> {
    props
        .iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .filter_map(|(key, value)| {
            let tag = match value.as_str().map(str::trim) {
                Some(v) if !v.is_empty() => format!("{}-{}", key, v.to_lowercase()),
                _ => key.clone(),
            };
            if is_valid_tag(&tag) {
                Some(tag)
            } else {
                tracing::debug!(key = %key, "custom property not usable as a tag");
                None
            }
        })
        .collect()
}

/// Merge tag sources into a sorted, deduplicated, validated list
pub fn normalize_tags<I, S>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    sources
        .into_iter()
        .map(Into::into)
        .filter(|t| is_valid_tag(t))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Structured values pulled from custom properties
///
/// When several property maps are given, the first one holding a key wins
/// (model version before registered model).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyFields {
    /// License
    pub license: Option<String>,
    /// TechDocs URL (http/https only)
    pub techdocs: Option<String>,
    /// Owner override
    pub owner: Option<String>,
    /// Lifecycle override
    pub lifecycle: Option<String>,
    /// API definition
    pub api_spec: Option<String>,
    /// Declared API type
    pub api_type: Option<String>,
    /// Ethics statement
    pub ethics: Option<String>,
    /// How-to-use URL
    pub how_to_use: Option<String>,
    /// Support statement
    pub support: Option<String>,
    /// Training notes
    pub training: Option<String>,
    /// Usage notes
    pub usage: Option<String>,
    /// Model server homepage
    pub homepage_url: Option<String>,
    /// Registry/catalog provenance, keyed by sanitized property name
    pub provenance: BTreeMap<String, String>,
}

impl PropertyFields {
    /// Collect structured fields from property maps in priority order
    pub fn collect(layers: &[&CustomProperties]) -> Self {
        let lookup = |key: &str| -> Option<String> {
            layers.iter().find_map(|props| {
                props
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .and_then(|(_, v)| v.as_str())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
        };

        let techdocs = lookup(keys::TECHDOCS).filter(|url| {
            let ok = url.starts_with("https://") || url.starts_with("http://");
            if !ok {
                tracing::warn!(%url, "ignoring TechDocs property without http(s) scheme");
            }
            ok
        });

        let mut provenance = BTreeMap::new();
        for props in layers.iter().rev() {
            for (key, value) in props.iter().filter(|(k, _)| is_provenance_key(k)) {
                let name = sanitize(key);
                if let (false, Some(v)) = (name.is_empty(), value.as_str()) {
                    provenance.insert(name, v.to_string());
                }
            }
        }

        Self {
            license: lookup(keys::LICENSE),
            techdocs,
            owner: lookup(keys::OWNER),
            lifecycle: lookup(keys::LIFECYCLE),
            api_spec: lookup(keys::API_SPEC),
            api_type: lookup(keys::API_TYPE),
            ethics: lookup(keys::ETHICS),
            how_to_use: lookup(keys::HOW_TO_USE),
            support: lookup(keys::SUPPORT),
            training: lookup(keys::TRAINING),
            usage: lookup(keys::USAGE),
            homepage_url: lookup(keys::HOMEPAGE_URL),
            provenance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        ArtExplainerSpec, ExplainerSpec, FrameworkSpec, InferenceServiceSpec, ModelFormat,
        ModelSpec, PredictorSpec,
    };
    use crate::registry::MetadataValue;

    fn props(pairs: &[(&str, &str)]) -> CustomProperties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), MetadataValue::string(*v)))
            .collect()
    }

    mod deployment {
        use super::*;

        fn isvc(predictor: PredictorSpec, explainer: Option<ExplainerSpec>) -> InferenceService {
            InferenceService::new(
                "bar",
                InferenceServiceSpec {
                    predictor,
                    explainer,
                    transformer: None,
                },
            )
        }

        #[test]
        fn first_framework_wins() {
            let svc = isvc(
                PredictorSpec {
                    pytorch: Some(FrameworkSpec::default()),
                    xgboost: Some(FrameworkSpec::default()),
                    ..Default::default()
                },
                None,
            );
            assert_eq!(deployment_tags(&svc), vec!["xgboost"]);
        }

        #[test]
        fn model_format_and_explainer_accumulate() {
            let svc = isvc(
                PredictorSpec {
                    model: Some(ModelSpec {
                        model_format: ModelFormat {
                            name: "ONNX".to_string(),
                            version: Some("1".to_string()),
                        },
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Some(ExplainerSpec {
                    art: Some(ArtExplainerSpec {
                        type_: "SquareAttack".to_string(),
                    }),
                }),
            );
            assert_eq!(deployment_tags(&svc), vec!["onnx-1", "squareattack"]);
        }

        #[test]
        fn bare_predictor_has_no_tags() {
            let svc = isvc(PredictorSpec::default(), None);
            assert!(deployment_tags(&svc).is_empty());
        }
    }

    mod properties {
        use super::*;

        #[test]
        fn string_values_become_key_value_tags() {
            let tags = property_tags(&props(&[("foo", "Bar"), ("team", "ml+ops")]));
            assert_eq!(tags, vec!["foo-bar", "team-ml+ops"]);
        }

        #[test]
        fn reserved_keys_are_not_tags() {
            let tags = property_tags(&props(&[
                ("license", "apache-2.0"),
                ("TechDocs", "https://example.com"),
                ("_lastModified", "2024"),
                ("provider", "ibm"),
                ("keep", "me"),
            ]));
            assert_eq!(tags, vec!["keep-me"]);
        }

        #[test]
        fn hostile_input_never_yields_invalid_tags() {
            let long = "x".repeat(80);
            let input = props(&[
                ("", ""),
                ("spaces here", "v"),
                ("UPPER", "v"),
                ("k", "has spaces"),
                ("k2", "   "),
                ("k3", &long),
                ("trailing-", "x"),
                ("ok", "Mixed-Case"),
            ]);
            let tags = property_tags(&input);
            for tag in &tags {
                assert!(is_valid_tag(tag), "emitted invalid tag {tag:?}");
                assert!(tag.len() <= MAX_TAG_LEN);
            }
            assert!(tags.contains(&"k2".to_string()));
            assert!(tags.contains(&"ok-mixed-case".to_string()));
        }

        #[test]
        fn non_string_values_tag_the_key() {
            let mut input = CustomProperties::new();
            input.insert(
                "gpu".to_string(),
                MetadataValue::MetadataBoolValue { bool_value: true },
            );
            assert_eq!(property_tags(&input), vec!["gpu"]);
        }
    }

    mod fields {
        use super::*;

        #[test]
        fn version_overrides_model() {
            let version = props(&[("License", "mit")]);
            let model = props(&[("License", "apache-2.0"), ("Owner", "alice")]);
            let fields = PropertyFields::collect(&[&version, &model]);
            assert_eq!(fields.license.as_deref(), Some("mit"));
            assert_eq!(fields.owner.as_deref(), Some("alice"));
        }

        #[test]
        fn techdocs_requires_http_scheme() {
            let good = props(&[("TechDocs", "https://github.com/org/docs")]);
            let bad = props(&[("TechDocs", "file:///etc/passwd")]);
            assert!(PropertyFields::collect(&[&good]).techdocs.is_some());
            assert!(PropertyFields::collect(&[&bad]).techdocs.is_none());
        }

        #[test]
        fn provenance_is_collected_under_sanitized_keys() {
            let version = props(&[
                ("_registeredFromCatalogModelName", "granite"),
                ("Source model", "granite-3.1"),
            ]);
            let fields = PropertyFields::collect(&[&version]);
            assert_eq!(
                fields.provenance.get("registeredFromCatalogModelName").map(String::as_str),
                Some("granite")
            );
            assert_eq!(
                fields.provenance.get("Sourcemodel").map(String::as_str),
                Some("granite-3.1")
            );
        }
    }

    #[test]
    fn normalize_sorts_dedups_and_filters() {
        let tags = normalize_tags(vec!["onnx", "foo-bar", "onnx", "Bad Tag", ""]);
        assert_eq!(tags, vec!["foo-bar", "onnx"]);
    }
}
