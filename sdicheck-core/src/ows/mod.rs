//! Access to OGC web services: protocol tags, capabilities documents and their cache.

mod cache;
pub use cache::{CapabilityCache, CapabilityFetchError, capabilities_request_url};

mod capabilities;
pub use capabilities::{
    CapabilitiesDocument, CapabilitiesError, CapabilitiesResult, MetadataLink,
};

mod metadata;
pub use metadata::{METADATA_ROOT, XML_FORMAT, check_metadata_link};

mod protocol;
pub use protocol::{OwsFamily, OwsProtocol};
