//! The closed set of divergences the checkers can report.

use std::error::Error;

/// A lower level error carried by an [`Inconsistency`] as its cause.
pub type BoxedError = Box<dyn Error + Send + Sync>;

#[allow(clippy::ref_option)]
fn or_unknown(id: &Option<String>) -> &str {
    id.as_deref().unwrap_or("<unknown>")
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn family_name(is_wms: &bool) -> &'static str {
    if *is_wms { "WMS" } else { "WFS" }
}

/// A single divergence between the catalog and the map/feature servers.
///
/// Every variant carries enough identifiers to be reported on its own; the `Display`
/// implementation is the human-readable rendering used in reports.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Inconsistency {
    /// The capabilities document of an OWS endpoint could not be parsed at all.
    #[error("The OWS GetCapabilities is unparseable at {url}: {message}")]
    UnparseableCapabilities { url: String, message: String },

    /// The capabilities document was parsed but does not advertise the layer.
    #[error(
        "Metadata {} references a layer {layer_name} on {url} that does not exist",
        or_unknown(.record_id)
    )]
    LayerNotFound {
        url: String,
        layer_name: String,
        record_id: Option<String>,
    },

    /// The root element of the document returned by `url` is not the one expected
    /// for the requested service family.
    #[error(
        "Metadata {} references layer {layer_name} on {url}, which is not a {} GetCapabilities URL",
        or_unknown(.record_id),
        family_name(.is_wms)
    )]
    InvalidCapabilitiesUrl {
        url: String,
        layer_name: String,
        is_wms: bool,
        record_id: Option<String>,
    },

    /// Any other failure while querying a service.
    #[error(
        "Metadata {} references layer {layer_name} on {url}, which could not be queried: {source}",
        or_unknown(.record_id)
    )]
    OtherServiceError {
        url: String,
        layer_name: String,
        record_id: Option<String>,
        #[source]
        source: BoxedError,
    },

    /// A dataset record lacks a usable WMS reference.
    #[error("Metadata {record_id} does not reference any WMS layer")]
    NoWmsReferenceDefined { record_id: String },

    /// A dataset record lacks a usable WFS reference.
    #[error("Metadata {record_id} does not reference any WFS feature type")]
    NoWfsReferenceDefined { record_id: String },

    /// A service record operating on a dataset does not advertise a GetCapabilities operation.
    #[error(
        "Service metadata {service_id} operates on {dataset_id} but defines no GetCapabilities URL"
    )]
    NoGetCapabilitiesUrl {
        service_id: String,
        dataset_id: String,
    },

    /// A layer published by a server has no link back to any catalog record.
    #[error("No metadata defined for layer {layer_name}")]
    MetadataMissing { layer_name: String },

    /// A metadata record linked from a layer could not be fetched or parsed.
    #[error(
        "Metadata {url} not found or invalid for layer {}: {message}",
        or_unknown(.layer_name)
    )]
    MetadataInvalid {
        url: String,
        message: String,
        layer_name: Option<String>,
    },
}

impl Inconsistency {
    /// Short, stable name of the variant, used by machine-readable reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnparseableCapabilities { .. } => "unparseable-capabilities",
            Self::LayerNotFound { .. } => "layer-not-found",
            Self::InvalidCapabilitiesUrl { .. } => "invalid-capabilities-url",
            Self::OtherServiceError { .. } => "other-service-error",
            Self::NoWmsReferenceDefined { .. } => "no-wms-reference",
            Self::NoWfsReferenceDefined { .. } => "no-wfs-reference",
            Self::NoGetCapabilitiesUrl { .. } => "no-getcapabilities-url",
            Self::MetadataMissing { .. } => "metadata-missing",
            Self::MetadataInvalid { .. } => "metadata-invalid",
        }
    }

    /// Attaches the identifier of the catalog record that owns the failing reference.
    ///
    /// Only variants raised by a service lookup carry an owning record; the others are
    /// returned unchanged.
    #[must_use]
    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        match &mut self {
            Self::LayerNotFound { record_id, .. }
            | Self::InvalidCapabilitiesUrl { record_id, .. }
            | Self::OtherServiceError { record_id, .. } => *record_id = Some(id.into()),
            _ => {}
        }
        self
    }

    /// Attaches the name of the layer whose metadata link failed.
    #[must_use]
    pub fn with_layer_name(mut self, name: impl Into<String>) -> Self {
        if let Self::MetadataInvalid { layer_name, .. } = &mut self {
            *layer_name = Some(name.into());
        }
        self
    }

    /// The identifier of the owning catalog record, if known.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Self::LayerNotFound { record_id, .. }
            | Self::InvalidCapabilitiesUrl { record_id, .. }
            | Self::OtherServiceError { record_id, .. } => record_id.as_deref(),
            Self::NoWmsReferenceDefined { record_id }
            | Self::NoWfsReferenceDefined { record_id } => Some(record_id),
            Self::NoGetCapabilitiesUrl { service_id, .. } => Some(service_id),
            Self::UnparseableCapabilities { .. }
            | Self::MetadataMissing { .. }
            | Self::MetadataInvalid { .. } => None,
        }
    }
}
