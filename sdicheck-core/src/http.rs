//! HTTP transport shared by the catalog client and the capability cache.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use url::Url;

use crate::credentials::Credentials;

/// Default timeout applied to every HTTP call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub type HttpResult<T> = Result<T, HttpError>;

#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    #[error("Unable to build the HTTP client: {0}")]
    ClientBuildError(#[source] reqwest::Error),

    #[error("Request to {1} failed: {0}")]
    TransportError(#[source] reqwest::Error, String),

    #[error("Request to {1} returned HTTP {0}")]
    StatusError(u16, String),
}

impl HttpError {
    /// HTTP status code of the response, when one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::StatusError(status, _) => Some(*status),
            _ => None,
        }
    }
}

/// Minimal HTTP surface needed by the engine.
///
/// Every call is awaited to completion before the next one is issued; implementations
/// do not need to support concurrent use.
#[async_trait]
pub trait HttpClient: Send + Sync + Debug {
    /// Fetches `url` and returns the response body as text.
    async fn get(&self, url: &Url) -> HttpResult<String>;

    /// POSTs an XML document to `url` and returns the response body as text.
    async fn post_xml(&self, url: &Url, body: String) -> HttpResult<String>;
}

/// HTTP client shared between components.
pub type SharedHttpClient = Arc<dyn HttpClient>;

/// Transport settings threaded through every HTTP call.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub verify_tls: bool,
    pub credentials: Credentials,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verify_tls: true,
            credentials: Credentials::default(),
        }
    }
}

/// [`HttpClient`] backed by `reqwest`, with per-host Basic authentication.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
    client: Client,
    credentials: Credentials,
}

impl ReqwestHttpClient {
    pub fn new(config: HttpConfig) -> HttpResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .user_agent(concat!("sdicheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(HttpError::ClientBuildError)?;
        Ok(Self {
            client,
            credentials: config.credentials,
        })
    }

    fn authenticate(&self, url: &Url, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.for_url(url) {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        }
    }

    async fn send(url: &Url, request: RequestBuilder) -> HttpResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| HttpError::TransportError(e, url.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::StatusError(status.as_u16(), url.to_string()));
        }
        response
            .text()
            .await
            .map_err(|e| HttpError::TransportError(e, url.to_string()))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &Url) -> HttpResult<String> {
        let request = self.authenticate(url, self.client.get(url.clone()));
        Self::send(url, request).await
    }

    async fn post_xml(&self, url: &Url, body: String) -> HttpResult<String> {
        let request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/xml")
            .body(body);
        let request = self.authenticate(url, request);
        Self::send(url, request).await
    }
}
