use crate::http::HttpError;

pub type CswResult<T> = Result<T, CswError>;

#[derive(thiserror::Error, Debug)]
pub enum CswError {
    #[error("Invalid catalog URL {1}: {0}")]
    InvalidUrl(#[source] url::ParseError, String),

    #[error(transparent)]
    HttpError(#[from] HttpError),

    #[error("Catalog answered with an exception report: {0}")]
    ServiceException(String),

    /// The response or one of its records could not be understood.
    #[error("Unable to parse catalog response: {0}")]
    Malformed(String),
}

impl CswError {
    /// Whether the failure is about the content of a page rather than the transport.
    ///
    /// Only such failures are worth isolating one record at a time.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl From<roxmltree::Error> for CswError {
    fn from(e: roxmltree::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
