//! Publish pipeline
//!
//! Pushes rendered entities to the storage tier under their publish key and
//! registers each storage URI with the catalog exactly once per process
//! lifetime. The
//! [`DedupLedger`] is the only mutable state shared between reconciles and
//! the background sweep.

mod importer;
mod storage;

use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;
use tracing::{debug, info, instrument};

use crate::catalog::{CatalogEntity, OutputFormat};
use crate::resolver::Correlation;
use crate::sanitize::sanitize;
use crate::Error;

pub use importer::{
    location_type, parse_location_response, CatalogImporter, CatalogLocation,
    HttpCatalogImporter, LOCATION_TYPE_BRIDGE, LOCATION_TYPE_URL,
};
pub use storage::{HttpStorageTier, StorageTier};

#[cfg(test)]
pub use importer::MockCatalogImporter;
#[cfg(test)]
pub use storage::MockStorageTier;

/// Deterministic identity of a published entity
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PublishKey {
    parent: String,
    child: String,
}

impl PublishKey {
    /// Key for a registry model version
    pub fn for_model(model: &str, version: &str) -> Self {
        Self {
            parent: sanitize(model),
            child: sanitize(version),
        }
    }

    /// Key for a correlated deployment or sweep pair
    pub fn for_correlation(correlation: &Correlation) -> Self {
        Self::for_model(&correlation.model.name, &correlation.version.name)
    }

    /// Key for a deployment with no registry correlation
    pub fn for_deployment(namespace: &str, name: &str) -> Self {
        Self {
            parent: sanitize(namespace),
            child: sanitize(name),
        }
    }

    /// Storage-tier path of the rendered document
    pub fn storage_uri(&self, format: OutputFormat) -> String {
        format!("/{}/{}/{}", self.parent, self.child, format.file_name())
    }
}

impl fmt::Display for PublishKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.parent, self.child)
    }
}

/// Set of keys whose import has been claimed
#[derive(Debug, Default)]
pub struct DedupLedger {
    claimed: DashSet<String>,
}

impl DedupLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `key`; true only for the first caller
    pub fn try_claim(&self, key: &str) -> bool {
        self.claimed.insert(key.to_string())
    }

    /// True if `key` has been claimed
    pub fn contains(&self, key: &str) -> bool {
        self.claimed.contains(key)
    }

    /// Number of claimed keys
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// True if nothing has been claimed
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

/// What a publish did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Stored and imported for the first time
    Imported(Option<CatalogLocation>),
    /// Stored; the catalog already knows this key
    AlreadyImported,
}

/// Storage upsert plus at-most-once catalog import
pub struct Publisher {
    storage: Arc<dyn StorageTier>,
    importer: Arc<dyn CatalogImporter>,
    ledger: DedupLedger,
    storage_base_url: String,
}

impl Publisher {
    /// Create a publisher; `storage_base_url` is where the catalog fetches
    /// stored documents from
    pub fn new(
        storage: Arc<dyn StorageTier>,
        importer: Arc<dyn CatalogImporter>,
        storage_base_url: &str,
    ) -> Self {
        Self {
            storage,
            importer,
            ledger: DedupLedger::new(),
            storage_base_url: storage_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The dedup ledger
    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Store `entity` under `key` and import it if this is the first time
    ///
    /// A failed import leaves the key claimed; the stored document stays
    /// valid for whoever imports it later.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn publish(
        &self,
        key: &PublishKey,
        entity: &CatalogEntity,
    ) -> Result<PublishOutcome, Error> {
        let storage_key = key.to_string();
        let body = entity.render()?;
        self.storage.upsert(&storage_key, body.as_bytes()).await?;
        debug!("stored catalog document");

        if !self.ledger.try_claim(&storage_key) {
            return Ok(PublishOutcome::AlreadyImported);
        }

        let uri = key.storage_uri(entity.format());
        let target = format!("{}{}", self.storage_base_url, uri);
        let location = self.importer.import(&target).await?;
        info!(
            %target,
            location_id = location.as_ref().map(|l| l.id.as_str()).unwrap_or(""),
            "imported into catalog"
        );
        Ok(PublishOutcome::Imported(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;
    use crate::registry::{ModelVersion, RegisteredModel};
    use crate::resolver::MatchKind;
    use mockall::predicate::*;

    fn entity() -> CatalogEntity {
        CatalogEntity::Flat(ModelCatalog::default())
    }

    fn publisher(storage: MockStorageTier, importer: MockCatalogImporter) -> Publisher {
        Publisher::new(Arc::new(storage), Arc::new(importer), "http://bridge:9090/")
    }

    mod keys {
        use super::*;

        #[test]
        fn correlated_key_joins_sanitized_names() {
            let correlation = Correlation {
                model: RegisteredModel {
                    name: "mnist".to_string(),
                    ..Default::default()
                },
                version: ModelVersion {
                    name: "v1".to_string(),
                    ..Default::default()
                },
                artifact: None,
                record: None,
                kind: MatchKind::DirectGraph,
            };
            let key = PublishKey::for_correlation(&correlation);
            assert_eq!(key.to_string(), "mnist_v1");
            assert_eq!(
                key.storage_uri(OutputFormat::CatalogInfoYaml),
                "/mnist/v1/catalog-info.yaml"
            );
        }

        #[test]
        fn hostile_names_are_sanitized() {
            let key = PublishKey::for_model("My Model!", "1.0 (beta)");
            assert_eq!(key.to_string(), "MyModel_1.0beta");
            assert_eq!(
                key.storage_uri(OutputFormat::JsonArray),
                "/MyModel/1.0beta/model-catalog.json"
            );
        }

        #[test]
        fn deployment_key() {
            assert_eq!(PublishKey::for_deployment("foo", "bar").to_string(), "foo_bar");
        }
    }

    mod ledger {
        use super::*;

        #[test]
        fn claims_once() {
            let ledger = DedupLedger::new();
            assert!(ledger.try_claim("a"));
            assert!(!ledger.try_claim("a"));
            assert!(ledger.try_claim("b"));
            assert_eq!(ledger.len(), 2);
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn concurrent_claims_have_one_winner() {
            let ledger = Arc::new(DedupLedger::new());
            let handles: Vec<_> = (0..64)
                .map(|_| {
                    let ledger = ledger.clone();
                    tokio::spawn(async move { ledger.try_claim("mnist_v1") })
                })
                .collect();

            let mut winners = 0;
            for handle in handles {
                if handle.await.unwrap() {
                    winners += 1;
                }
            }
            assert_eq!(winners, 1);
        }
    }

    mod pipeline {
        use super::*;

        #[tokio::test]
        async fn second_publish_skips_import() {
            let mut storage = MockStorageTier::new();
            storage
                .expect_upsert()
                .with(eq("mnist_v1"), always())
                .times(2)
                .returning(|_, _| Ok(()));
            let mut importer = MockCatalogImporter::new();
            importer
                .expect_import()
                .with(eq("http://bridge:9090/mnist/v1/model-catalog.json"))
                .times(1)
                .returning(|target| {
                    Ok(Some(CatalogLocation {
                        id: "loc-1".to_string(),
                        target: target.to_string(),
                    }))
                });

            let publisher = publisher(storage, importer);
            let key = PublishKey::for_model("mnist", "v1");

            let first = publisher.publish(&key, &entity()).await.unwrap();
            assert!(matches!(first, PublishOutcome::Imported(Some(_))));
            let second = publisher.publish(&key, &entity()).await.unwrap();
            assert_eq!(second, PublishOutcome::AlreadyImported);
        }

        #[tokio::test]
        async fn storage_is_keyed_by_publish_key_not_uri() {
            let mut storage = MockStorageTier::new();
            storage
                .expect_upsert()
                .with(eq("MyModel_1.0beta"), always())
                .times(1)
                .returning(|_, _| Ok(()));
            let mut importer = MockCatalogImporter::new();
            importer
                .expect_import()
                .with(eq("http://bridge:9090/MyModel/1.0beta/model-catalog.json"))
                .times(1)
                .returning(|_| Ok(None));

            let publisher = publisher(storage, importer);
            let key = PublishKey::for_model("My Model!", "1.0 (beta)");
            let outcome = publisher.publish(&key, &entity()).await.unwrap();
            assert_eq!(outcome, PublishOutcome::Imported(None));
        }

        #[tokio::test]
        async fn storage_failure_stops_before_claiming() {
            let mut storage = MockStorageTier::new();
            storage
                .expect_upsert()
                .returning(|_, _| Err(Error::unexpected_status("http://bridge:9090/upsert", 500)));
            let mut importer = MockCatalogImporter::new();
            importer.expect_import().never();

            let publisher = publisher(storage, importer);
            let key = PublishKey::for_model("mnist", "v1");
            assert!(publisher.publish(&key, &entity()).await.is_err());
            assert!(publisher.ledger().is_empty());
        }

        #[tokio::test]
        async fn failed_import_keeps_claim() {
            let mut storage = MockStorageTier::new();
            storage.expect_upsert().times(2).returning(|_, _| Ok(()));
            let mut importer = MockCatalogImporter::new();
            importer
                .expect_import()
                .times(1)
                .returning(|_| Err(Error::http("connection refused")));

            let publisher = publisher(storage, importer);
            let key = PublishKey::for_model("mnist", "v1");
            assert!(publisher.publish(&key, &entity()).await.is_err());
            assert!(publisher.ledger().contains("mnist_v1"));

            let retry = publisher.publish(&key, &entity()).await.unwrap();
            assert_eq!(retry, PublishOutcome::AlreadyImported);
        }
    }
}
