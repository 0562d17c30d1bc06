use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};
use url::Url;

use crate::Logger;
use crate::http::{HttpClient, HttpError, SharedHttpClient};
use crate::inconsistency::Inconsistency;
use crate::ows::{CapabilitiesDocument, CapabilitiesError, OwsFamily};

#[derive(thiserror::Error, Debug)]
pub enum CapabilityFetchError {
    #[error("Invalid service URL {1}: {0}")]
    InvalidUrl(#[source] url::ParseError, String),

    #[error(transparent)]
    HttpError(#[from] HttpError),

    #[error(transparent)]
    CapabilitiesError(#[from] CapabilitiesError),
}

impl CapabilityFetchError {
    /// Whether the server answered with a document of the wrong family.
    #[must_use]
    pub fn is_root_mismatch(&self) -> bool {
        matches!(
            self,
            Self::CapabilitiesError(CapabilitiesError::UnexpectedRoot { .. })
        )
    }

    fn into_inconsistency(self, url: &str, layer_name: &str, family: OwsFamily) -> Inconsistency {
        if self.is_root_mismatch() {
            Inconsistency::InvalidCapabilitiesUrl {
                url: url.to_string(),
                layer_name: layer_name.to_string(),
                is_wms: family.is_wms(),
                record_id: None,
            }
        } else {
            Inconsistency::OtherServiceError {
                url: url.to_string(),
                layer_name: layer_name.to_string(),
                record_id: None,
                source: Box::new(self),
            }
        }
    }
}

/// Builds the `GetCapabilities` request for a service URL, adding the `SERVICE`,
/// `REQUEST` and `VERSION` parameters only when the URL does not already carry them.
pub fn capabilities_request_url(url: &str, family: OwsFamily) -> Result<Url, url::ParseError> {
    let mut request = Url::parse(url)?;
    let present: HashSet<String> = request
        .query_pairs()
        .map(|(key, _)| key.to_ascii_uppercase())
        .collect();
    let missing: Vec<(&str, &str)> = [
        ("SERVICE", family.service_param()),
        ("REQUEST", "GetCapabilities"),
        ("VERSION", family.default_version()),
    ]
    .into_iter()
    .filter(|(key, _)| !present.contains(*key))
    .collect();
    if !missing.is_empty() {
        request.query_pairs_mut().extend_pairs(missing);
    }
    Ok(request)
}

/// Lazily fetched capabilities documents, keyed by service family and URL.
///
/// A document is fetched on the first reference to its `(family, url)` pair and then
/// reused for the lifetime of the cache; there is no expiry. Documents whose root
/// element does not match the requested family are never stored, so every later
/// reference to such a URL fetches it again.
#[derive(Debug)]
pub struct CapabilityCache {
    http: SharedHttpClient,
    documents: HashMap<(OwsFamily, String), CapabilitiesDocument>,
    logger: Logger,
}

impl CapabilityCache {
    #[must_use]
    pub fn new(http: SharedHttpClient) -> Self {
        Self {
            http,
            documents: HashMap::new(),
            logger: Logger::default(),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Number of cached documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[must_use]
    pub fn is_cached(&self, url: &str, family: OwsFamily) -> bool {
        self.documents.contains_key(&(family, url.to_string()))
    }

    /// Returns the capabilities document of `url` for `family`, fetching it on first use.
    pub async fn document(
        &mut self,
        url: &str,
        family: OwsFamily,
    ) -> Result<&CapabilitiesDocument, CapabilityFetchError> {
        match self.documents.entry((family, url.to_string())) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let document = fetch(self.http.as_ref(), &self.logger, url, family).await?;
                Ok(entry.insert(document))
            }
        }
    }

    /// Checks that `layer_name` is advertised by the `family` service at `url`.
    ///
    /// Failures are returned as inconsistencies without an owning record; callers
    /// attach it with [`Inconsistency::with_record_id`].
    pub async fn check_layer(
        &mut self,
        url: &str,
        layer_name: &str,
        family: OwsFamily,
    ) -> Result<(), Inconsistency> {
        let found = self
            .document(url, family)
            .await
            .map(|document| document.has_layer(layer_name));
        match found {
            Ok(true) => {
                self.logger
                    .in_scope(|| debug!("{family} layer {layer_name} found on {url}"));
                Ok(())
            }
            Ok(false) => Err(Inconsistency::LayerNotFound {
                url: url.to_string(),
                layer_name: layer_name.to_string(),
                record_id: None,
            }),
            Err(e) => {
                self.logger.in_scope(|| {
                    warn!("Unable to use {family} capabilities of {url}: {e}");
                });
                Err(e.into_inconsistency(url, layer_name, family))
            }
        }
    }
}

async fn fetch(
    http: &dyn HttpClient,
    logger: &Logger,
    url: &str,
    family: OwsFamily,
) -> Result<CapabilitiesDocument, CapabilityFetchError> {
    let request = capabilities_request_url(url, family)
        .map_err(|e| CapabilityFetchError::InvalidUrl(e, url.to_string()))?;
    logger.in_scope(|| info!("Fetching {family} capabilities from {request}"));
    let body = http.get(&request).await?;
    let document = CapabilitiesDocument::parse(&body, family)?;
    logger.in_scope(|| {
        info!(
            "{family} capabilities of {url} advertise {} layer(s)",
            document.len()
        );
    });
    Ok(document)
}
