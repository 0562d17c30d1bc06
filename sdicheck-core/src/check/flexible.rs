use tracing::{debug, info};

use crate::Logger;
use crate::check::{CheckReport, ItemKind};
use crate::csw::{CatalogRecord, RecordStream, StreamResult};
use crate::inconsistency::Inconsistency;
use crate::ows::{CapabilityCache, OwsFamily, OwsProtocol};

/// Checks that every dataset record references at least one existing WMS layer and
/// one existing WFS feature type, whatever the service records say.
#[derive(Debug)]
pub struct FlexibleChecker {
    cache: CapabilityCache,
    logger: Logger,
}

impl FlexibleChecker {
    #[must_use]
    pub fn new(cache: CapabilityCache) -> Self {
        Self {
            cache,
            logger: Logger::default(),
        }
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

    /// Checks every service reference of one dataset record.
    ///
    /// A failing reference never stops the others from being checked. References with
    /// an unclassifiable protocol are ignored.
    pub async fn check_record(&mut self, record: &CatalogRecord) -> Vec<Inconsistency> {
        let mut inconsistencies = Vec::new();
        let mut wms_seen = false;
        let mut wfs_seen = false;

        for reference in &record.service_references {
            let Some(protocol) = OwsProtocol::parse(&reference.protocol) else {
                self.logger.in_scope(|| {
                    debug!(
                        "Skipping {} reference of {} to {}",
                        reference.protocol, record.identifier, reference.url
                    );
                });
                continue;
            };
            match protocol.family {
                OwsFamily::Wms => wms_seen = true,
                OwsFamily::Wfs => wfs_seen = true,
            }
            let layer_name = reference.name.as_deref().unwrap_or_default();
            if let Err(e) = self
                .cache
                .check_layer(&reference.url, layer_name, protocol.family)
                .await
            {
                inconsistencies.push(e.with_record_id(&record.identifier));
            }
        }

        if !wms_seen {
            inconsistencies.push(Inconsistency::NoWmsReferenceDefined {
                record_id: record.identifier.clone(),
            });
        }
        if !wfs_seen {
            inconsistencies.push(Inconsistency::NoWfsReferenceDefined {
                record_id: record.identifier.clone(),
            });
        }
        inconsistencies
    }

    /// Checks a batch of records, in order.
    pub async fn check_records(&mut self, records: &[CatalogRecord], report: &mut CheckReport) {
        for record in records {
            let inconsistencies = self.check_record(record).await;
            report.items_processed += 1;
            report.extend(&record.identifier, inconsistencies);
        }
    }

    /// Checks every record the stream delivers, one page at a time.
    ///
    /// Only a fatal catalog error aborts the run.
    pub async fn check_stream(&mut self, stream: &mut RecordStream) -> StreamResult<CheckReport> {
        let mut report = CheckReport::new(ItemKind::Records);
        while let Some(page) = stream.next_page().await? {
            self.check_records(&page, &mut report).await;
            self.logger.in_scope(|| {
                info!(
                    "{} records checked, {} inconsistencies so far",
                    report.items_processed,
                    report.findings.len()
                );
            });
        }
        Ok(report)
    }
}
