use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};
use url::Url;

use crate::Logger;
use crate::check::{CheckReport, ItemKind};
use crate::csw::{CatalogRecord, RecordStream, StreamResult};
use crate::inconsistency::Inconsistency;
use crate::ows::{CapabilityCache, OwsProtocol};

/// Service records indexed by the datasets they operate on.
#[derive(Debug, Default)]
pub struct ServiceIndex {
    services: Vec<CatalogRecord>,
    by_dataset: HashMap<String, Vec<usize>>,
}

impl ServiceIndex {
    /// Builds the dataset to services mapping from the `operatesOn` links of every
    /// service record. A dataset may be operated on by several services.
    #[must_use]
    pub fn build(services: Vec<CatalogRecord>) -> Self {
        let mut by_dataset: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, service) in services.iter().enumerate() {
            for link in &service.operates_on {
                let entry = by_dataset.entry(link.uuidref.clone()).or_default();
                if !entry.contains(&idx) {
                    entry.push(idx);
                }
            }
        }
        Self {
            services,
            by_dataset,
        }
    }

    /// Service records operating on `dataset_id`, in catalog order.
    pub fn services_for(&self, dataset_id: &str) -> impl Iterator<Item = &CatalogRecord> {
        self.by_dataset
            .get(dataset_id)
            .into_iter()
            .flatten()
            .map(|idx| &self.services[*idx])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Checks that every dataset is operated on by a service whose coupled resources point
/// at layers that exist.
///
/// Unlike [`FlexibleChecker`](crate::check::FlexibleChecker), a dataset is reported
/// with the first failure of its services and nothing else.
#[derive(Debug)]
pub struct StrictChecker {
    cache: CapabilityCache,
    /// Hosts whose services are checked, every host when `None`.
    servers: Option<HashSet<String>>,
    logger: Logger,
}

impl StrictChecker {
    #[must_use]
    pub fn new(cache: CapabilityCache) -> Self {
        Self {
            cache,
            servers: None,
            logger: Logger::default(),
        }
    }

    /// Restricts the check to services hosted on these hostnames.
    #[must_use]
    pub fn with_servers<S: Into<String>>(mut self, servers: impl IntoIterator<Item = S>) -> Self {
        self.servers = Some(servers.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &CapabilityCache {
        &self.cache
    }

    fn is_allowed(&self, url: &str) -> bool {
        let Some(servers) = &self.servers else {
            return true;
        };
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|host| servers.contains(host)))
            .unwrap_or(false)
    }

    /// Checks the services operating on one dataset.
    ///
    /// Returns the first inconsistency found, tagged with the identifier of the service
    /// record it comes from. Every coupled resource of every service is checked, the
    /// capabilities documents being fetched once through the cache.
    pub async fn check_dataset(
        &mut self,
        dataset: &CatalogRecord,
        index: &ServiceIndex,
    ) -> Result<(), Inconsistency> {
        for service in index.services_for(&dataset.identifier) {
            let Some(endpoint) = &service.get_capabilities else {
                return Err(Inconsistency::NoGetCapabilitiesUrl {
                    service_id: service.identifier.clone(),
                    dataset_id: dataset.identifier.clone(),
                });
            };

            let protocol = endpoint.protocol.as_deref().and_then(OwsProtocol::parse);
            let Some(protocol) = protocol else {
                self.logger.in_scope(|| {
                    debug!(
                        "Skipping service {}: unsupported protocol {:?}",
                        service.identifier, endpoint.protocol
                    );
                });
                continue;
            };
            if !self.is_allowed(&endpoint.url) {
                self.logger.in_scope(|| {
                    debug!(
                        "Skipping service {}: {} is not a checked server",
                        service.identifier, endpoint.url
                    );
                });
                continue;
            }

            for resource in &service.coupled_resources {
                let (Some(_), Some(layer_name)) = (&resource.identifier, &resource.layer_name)
                else {
                    continue;
                };
                self.cache
                    .check_layer(&endpoint.url, layer_name, protocol.family)
                    .await
                    .map_err(|e| e.with_record_id(&service.identifier))?;
            }
        }
        Ok(())
    }

    /// Checks every dataset against the index, reporting at most one inconsistency each.
    pub async fn check_all(&mut self, datasets: &[CatalogRecord], index: &ServiceIndex) -> CheckReport {
        let mut report = CheckReport::new(ItemKind::Records);
        for dataset in datasets {
            report.items_processed += 1;
            if let Err(e) = self.check_dataset(dataset, index).await {
                self.logger.in_scope(|| warn!("{e}"));
                report.push(&dataset.identifier, e);
            }
        }
        report
    }

    /// Retrieves every service and dataset record, then checks the datasets.
    pub async fn check_catalog(
        &mut self,
        services: &mut RecordStream,
        datasets: &mut RecordStream,
    ) -> StreamResult<CheckReport> {
        if self.servers.is_none() {
            self.logger.in_scope(|| {
                warn!("No server list configured, the services of every host are checked");
            });
        }
        let index = ServiceIndex::build(services.collect_all().await?);
        let datasets = datasets.collect_all().await?;
        self.logger.in_scope(|| {
            info!(
                "Checking {} dataset record(s) against {} service record(s)",
                datasets.len(),
                index.len()
            );
        });
        Ok(self.check_all(&datasets, &index).await)
    }
}
