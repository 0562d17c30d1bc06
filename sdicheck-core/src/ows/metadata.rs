use roxmltree::Document;
use url::Url;

use crate::http::{HttpClient, HttpError};
use crate::inconsistency::Inconsistency;
use crate::ows::MetadataLink;

/// Format under which servers advertise ISO 19139 documents.
pub const XML_FORMAT: &str = "text/xml";

/// Root element every linked metadata document must have.
pub const METADATA_ROOT: &str = "MD_Metadata";

fn describe(format: Option<&str>) -> &str {
    format.unwrap_or("unspecified")
}

/// Fetches the document behind a layer's `MetadataURL` and checks it is a metadata record.
///
/// Only links advertised exactly as `text/xml` are parsed. Links with any other format,
/// or with none, only have to be reachable. Failures are returned as
/// [`Inconsistency::MetadataInvalid`] without a layer name.
pub async fn check_metadata_link(
    http: &dyn HttpClient,
    link: &MetadataLink,
) -> Result<(), Inconsistency> {
    let invalid = |message: String| Inconsistency::MetadataInvalid {
        url: link.url.clone(),
        message,
        layer_name: None,
    };
    let format = link.format.as_deref();

    let url = Url::parse(&link.url)
        .map_err(|e| invalid(format!("Invalid metadata URL: {e}")))?;
    let body = http.get(&url).await.map_err(|e| match e {
        HttpError::StatusError(status, _) => invalid(format!(
            "'{}' metadata not found (HTTP {status})",
            describe(format)
        )),
        e => invalid(format!(
            "Unable to retrieve the {} metadata: {e}",
            describe(format)
        )),
    })?;

    if format != Some(XML_FORMAT) {
        return Ok(());
    }
    let doc = Document::parse(&body).map_err(|e| {
        invalid(format!(
            "Unable to parse the {} metadata: {e}",
            describe(format)
        ))
    })?;
    let root = doc.root_element().tag_name().name();
    if root == METADATA_ROOT {
        Ok(())
    } else {
        Err(invalid(format!(
            "Unable to parse the {} metadata: unexpected root element {root}",
            describe(format)
        )))
    }
}
