use itertools::Itertools as _;
use tracing::{info, warn};

use crate::Logger;
use crate::check::{CheckReport, ItemKind};
use crate::http::SharedHttpClient;
use crate::inconsistency::Inconsistency;
use crate::ows::{CapabilityCache, MetadataLink, OwsFamily, check_metadata_link};

/// Checks the layers published by one service against the catalog: every
/// workspace-qualified layer must link to a readable metadata record.
#[derive(Debug)]
pub struct OwsChecker {
    cache: CapabilityCache,
    http: SharedHttpClient,
    logger: Logger,
}

impl OwsChecker {
    #[must_use]
    pub fn new(http: SharedHttpClient) -> Self {
        Self {
            cache: CapabilityCache::new(http.clone()),
            http,
            logger: Logger::default(),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.cache = self.cache.with_logger(logger.clone());
        self.logger = logger;
        self
    }

    /// Checks the metadata links of every layer of the `family` service at `url`.
    ///
    /// Every layer whose name has a workspace prefix is counted as processed, including
    /// the ones advertising no metadata link. Unprefixed layers are neither checked nor
    /// counted. A capabilities document that cannot be fetched or parsed yields a single
    /// inconsistency.
    pub async fn check_service(&mut self, url: &str, family: OwsFamily) -> CheckReport {
        let mut report = CheckReport::new(ItemKind::Layers);
        let layers: Vec<(String, Vec<MetadataLink>)> = match self.cache.document(url, family).await {
            Ok(document) => document
                .layer_names()
                .filter(|name| name.contains(':'))
                .map(|name| (name.to_string(), document.metadata_links(name).to_vec()))
                .collect(),
            Err(e) => {
                self.logger
                    .in_scope(|| warn!("Unable to parse {family} capabilities of {url}: {e}"));
                report.push(
                    url,
                    Inconsistency::UnparseableCapabilities {
                        url: url.to_string(),
                        message: e.to_string(),
                    },
                );
                return report;
            }
        };

        for (layer_name, links) in layers {
            report.items_processed += 1;
            if links.is_empty() {
                report.push(
                    &layer_name,
                    Inconsistency::MetadataMissing {
                        layer_name: layer_name.clone(),
                    },
                );
                continue;
            }
            for link in links.iter().unique_by(|l| &l.url) {
                if let Err(e) = check_metadata_link(self.http.as_ref(), link).await {
                    report.push(&layer_name, e.with_layer_name(&layer_name));
                }
            }
        }

        self.logger.in_scope(|| {
            info!("Finished integrity check against {family} GetCapabilities of {url}");
        });
        report
    }
}
