use sdicheck_core::credentials::CredentialsError;
use sdicheck_core::csw::{CswError, StreamError};
use sdicheck_core::http::HttpError;

use crate::config::ConfigFileError;

/// A convenience [`Result`] for the `sdicheck` crate.
pub type SdiCheckResult<T> = Result<T, SdiCheckError>;

#[derive(thiserror::Error, Debug)]
pub enum SdiCheckError {
    #[error(
        "No catalog URL configured. Use --catalog or set 'catalog' in the configuration file"
    )]
    MissingCatalog,

    #[error("Give the service to check with either --wms or --wfs")]
    MissingServiceUrl,

    #[error("The page size must be at least 1")]
    InvalidPageSize,

    #[error(transparent)]
    ConfigFileError(#[from] ConfigFileError),

    #[error(transparent)]
    CredentialsError(#[from] CredentialsError),

    #[error("Unable to create the HTTP client: {0}")]
    HttpError(#[from] HttpError),

    #[error("Unable to use the catalog: {0}")]
    CswError(#[from] CswError),

    #[error("Unable to retrieve the catalog records: {0}")]
    StreamError(#[from] StreamError),

    #[error("Unable to serialize the report: {0}")]
    ReportError(#[from] serde_json::Error),
}
