use std::sync::Arc;

use sdicheck_core::Logger;
use sdicheck_core::check::{CheckReport, FlexibleChecker, OwsChecker, StrictChecker};
use sdicheck_core::csw::{CswClient, Filter, RecordStream, SharedCatalogClient};
use sdicheck_core::http::SharedHttpClient;
use sdicheck_core::ows::CapabilityCache;
use tracing::info;

use crate::args::Command;
use crate::config::Config;
use crate::{SdiCheckError, SdiCheckResult};

/// Runs one check with an already built HTTP client and returns its report.
///
/// Catalog failures that cannot be isolated are the only errors; everything the check
/// finds is part of the report.
pub async fn run_check(
    command: &Command,
    config: &Config,
    http: SharedHttpClient,
    logger: &Logger,
) -> SdiCheckResult<CheckReport> {
    let cache = CapabilityCache::new(http.clone()).with_logger(logger.clone());
    let harvested = config.include_harvested();
    match command {
        Command::Flexible => {
            let client = catalog_client(config, http, logger)?;
            info!("Checking the dataset records of {}", config.catalog_url()?);
            let mut stream = record_stream(client, Filter::datasets(harvested), config, logger);
            let mut checker = FlexibleChecker::new(cache).with_logger(logger.clone());
            Ok(checker.check_stream(&mut stream).await?)
        }
        Command::Strict => {
            let client = catalog_client(config, http, logger)?;
            info!(
                "Checking the coupled resources of the service records of {}",
                config.catalog_url()?
            );
            let mut services =
                record_stream(client.clone(), Filter::services(harvested), config, logger);
            let mut datasets = record_stream(client, Filter::datasets(harvested), config, logger);
            let mut checker = StrictChecker::new(cache).with_logger(logger.clone());
            if !config.servers.is_empty() {
                checker = checker.with_servers(config.servers.iter().cloned());
            }
            Ok(checker.check_catalog(&mut services, &mut datasets).await?)
        }
        Command::Ows(args) => {
            let (url, family) = args.target().ok_or(SdiCheckError::MissingServiceUrl)?;
            info!("Checking the {family} layers of {url}");
            let mut checker = OwsChecker::new(http).with_logger(logger.clone());
            Ok(checker.check_service(url, family).await)
        }
    }
}

fn catalog_client(
    config: &Config,
    http: SharedHttpClient,
    logger: &Logger,
) -> SdiCheckResult<SharedCatalogClient> {
    let client = CswClient::new(config.catalog_url()?, http)?.with_logger(logger.clone());
    Ok(Arc::new(client))
}

fn record_stream(
    client: SharedCatalogClient,
    filter: Filter,
    config: &Config,
    logger: &Logger,
) -> RecordStream {
    RecordStream::new(client, filter)
        .with_page_size(config.page_size())
        .with_logger(logger.clone())
}
