//! Catalog Service for the Web: search requests, ISO 19139 records and the
//! fault-tolerant record stream.

mod client;
pub use client::{
    CSW_NS, CatalogClient, CswClient, ElementSet, OWS_NS, RecordQuery, RecordsPage,
    SharedCatalogClient, parse_identifiers_response, parse_records_response,
};

mod error;
pub use error::{CswError, CswResult};

mod filter;
pub use filter::{
    Filter, HARVESTED_PROPERTY, IDENTIFIER_PROPERTY, PropertySource, TYPE_PROPERTY, escape,
};

mod record;
pub use record::{
    CatalogRecord, CoupledResource, GMD_NS, GetCapabilitiesEndpoint, OperatesOn, RecordKind,
    SRV_NS, ServiceReference,
};

mod stream;
pub use stream::{DEFAULT_PAGE_SIZE, RecordStream, StreamError, StreamResult};
