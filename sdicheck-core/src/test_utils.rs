// This file is included from the integration tests as well, so it must only use
// `crate::csw`, `crate::http` and `crate::ows`, which are in scope in both places.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::MakeWriter;
use url::Url;

use crate::csw::{
    CatalogClient, CatalogRecord, CoupledResource, CswError, CswResult, GMD_NS,
    GetCapabilitiesEndpoint, HARVESTED_PROPERTY, OperatesOn, PropertySource, RecordKind,
    RecordQuery, RecordsPage, SRV_NS, ServiceReference, escape,
};
use crate::http::{HttpClient, HttpError, HttpResult};
use crate::ows::OwsFamily;

/// Buffer collecting everything a test subscriber writes.
#[derive(Clone, Debug, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn dispatch(&self) -> Dispatch {
        Dispatch::new(
            tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .without_time()
                .with_max_level(Level::TRACE)
                .finish(),
        )
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Option<String>,
}

/// Canned HTTP responses, keyed by URL without its query string.
///
/// A response registered with [`FakeHttp::with_service`] only answers requests whose
/// `SERVICE` parameter matches. Unknown URLs answer with HTTP 404.
#[derive(Debug, Default)]
pub struct FakeHttp {
    responses: HashMap<String, Result<String, u16>>,
    requests: Mutex<Vec<FakeRequest>>,
}

fn base_url(url: &Url) -> String {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.to_string()
}

fn base_of(url: &str) -> String {
    base_url(&Url::parse(url).unwrap())
}

impl FakeHttp {
    #[must_use]
    pub fn with(mut self, url: &str, body: String) -> Self {
        self.responses.insert(base_of(url), Ok(body));
        self
    }

    #[must_use]
    pub fn with_service(mut self, url: &str, family: OwsFamily, body: String) -> Self {
        let key = format!("{}#{family}", base_of(url));
        self.responses.insert(key, Ok(body));
        self
    }

    #[must_use]
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(base_of(url), Err(status));
        self
    }

    pub fn requests(&self) -> Vec<FakeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn respond(&self, method: &'static str, url: &Url, body: Option<String>) -> HttpResult<String> {
        self.requests.lock().unwrap().push(FakeRequest {
            method,
            url: url.to_string(),
            body,
        });
        let base = base_url(url);
        let service = url
            .query_pairs()
            .find(|(key, _)| key.eq_ignore_ascii_case("service"))
            .map(|(_, value)| value.to_uppercase());
        let response = service
            .and_then(|service| self.responses.get(&format!("{base}#{service}")))
            .or_else(|| self.responses.get(&base));
        match response {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(HttpError::StatusError(*status, url.to_string())),
            None => Err(HttpError::StatusError(404, url.to_string())),
        }
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, url: &Url) -> HttpResult<String> {
        self.respond("GET", url, None)
    }

    async fn post_xml(&self, url: &Url, body: String) -> HttpResult<String> {
        self.respond("POST", url, Some(body))
    }
}

#[derive(Clone, Debug)]
struct FakeEntry {
    record: CatalogRecord,
    harvested: bool,
    malformed: bool,
}

impl PropertySource for FakeEntry {
    fn property(&self, name: &str) -> Option<&str> {
        if name == HARVESTED_PROPERTY {
            Some(if self.harvested { "y" } else { "n" })
        } else {
            self.record.property(name)
        }
    }
}

/// In-memory catalog evaluating query filters the way a CSW server would.
///
/// A page containing a record added with [`FakeCatalog::with_malformed`] fails to
/// parse, while its identifier can still be read.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    entries: Vec<FakeEntry>,
    failing_pages: bool,
    unreachable: bool,
    record_requests: AtomicUsize,
    identifier_requests: AtomicUsize,
}

impl FakeCatalog {
    fn push(mut self, record: CatalogRecord, harvested: bool, malformed: bool) -> Self {
        self.entries.push(FakeEntry {
            record,
            harvested,
            malformed,
        });
        self
    }

    #[must_use]
    pub fn with_record(self, record: CatalogRecord) -> Self {
        self.push(record, false, false)
    }

    #[must_use]
    pub fn with_harvested(self, record: CatalogRecord) -> Self {
        self.push(record, true, false)
    }

    #[must_use]
    pub fn with_malformed(self, record: CatalogRecord) -> Self {
        self.push(record, false, true)
    }

    /// Every request for more than one record fails to parse.
    #[must_use]
    pub fn failing_pages(mut self) -> Self {
        self.failing_pages = true;
        self
    }

    /// Every request fails at the transport level.
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn record_requests(&self) -> usize {
        self.record_requests.load(Ordering::Relaxed)
    }

    pub fn identifier_requests(&self) -> usize {
        self.identifier_requests.load(Ordering::Relaxed)
    }

    fn select(&self, query: &RecordQuery) -> CswResult<(Vec<&FakeEntry>, usize)> {
        if self.unreachable {
            return Err(CswError::HttpError(HttpError::StatusError(
                503,
                "https://catalog.invalid/csw".to_string(),
            )));
        }
        let matching: Vec<&FakeEntry> = self
            .entries
            .iter()
            .filter(|entry| query.filter.matches(*entry))
            .collect();
        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(query.start_position.saturating_sub(1))
            .take(query.max_records)
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn get_records(&self, query: &RecordQuery) -> CswResult<RecordsPage> {
        self.record_requests.fetch_add(1, Ordering::Relaxed);
        let (page, matched) = self.select(query)?;
        if self.failing_pages && query.max_records > 1 {
            return Err(CswError::Malformed("unexpected end of stream".to_string()));
        }
        if let Some(broken) = page.iter().find(|entry| entry.malformed) {
            return Err(CswError::Malformed(format!(
                "record {} cannot be parsed",
                broken.record.identifier
            )));
        }
        let returned = page.len();
        let consumed = query.start_position.saturating_sub(1) + returned;
        Ok(RecordsPage {
            records: page.into_iter().map(|entry| entry.record.clone()).collect(),
            matched,
            returned,
            next_record: if consumed < matched {
                query.start_position + returned
            } else {
                0
            },
        })
    }

    async fn get_identifiers(&self, query: &RecordQuery) -> CswResult<Vec<String>> {
        self.identifier_requests.fetch_add(1, Ordering::Relaxed);
        let (page, _) = self.select(query)?;
        Ok(page
            .into_iter()
            .map(|entry| entry.record.identifier.clone())
            .collect())
    }
}

pub fn bare_record(identifier: &str, kind: RecordKind) -> CatalogRecord {
    CatalogRecord {
        identifier: identifier.to_string(),
        title: None,
        kind,
        service_references: Vec::new(),
        operates_on: Vec::new(),
        get_capabilities: None,
        coupled_resources: Vec::new(),
    }
}

/// A dataset record with `(protocol, url, layer)` online resources.
pub fn record_with_references(identifier: &str, references: &[(&str, &str, &str)]) -> CatalogRecord {
    CatalogRecord {
        service_references: references
            .iter()
            .map(|(protocol, url, name)| ServiceReference {
                protocol: (*protocol).to_string(),
                url: (*url).to_string(),
                name: Some((*name).to_string()).filter(|n| !n.is_empty()),
            })
            .collect(),
        ..bare_record(identifier, RecordKind::Dataset)
    }
}

/// A service record with `(dataset id, layer)` coupled resources bound to `GetMap`.
pub fn service_record_with(
    identifier: &str,
    operates_on: &[&str],
    get_capabilities: Option<(&str, &str)>,
    coupled: &[(&str, &str)],
) -> CatalogRecord {
    CatalogRecord {
        operates_on: operates_on
            .iter()
            .map(|id| OperatesOn {
                uuidref: (*id).to_string(),
                href: None,
            })
            .collect(),
        get_capabilities: get_capabilities.map(|(url, protocol)| GetCapabilitiesEndpoint {
            url: url.to_string(),
            protocol: Some(protocol.to_string()),
        }),
        coupled_resources: coupled
            .iter()
            .map(|(dataset, layer)| CoupledResource {
                operation_name: Some("GetMap".to_string()),
                identifier: Some((*dataset).to_string()),
                layer_name: Some((*layer).to_string()),
            })
            .collect(),
        ..bare_record(identifier, RecordKind::Service)
    }
}

fn char_string(element: &str, value: &str) -> String {
    format!(
        "<{element}><gco:CharacterString>{}</gco:CharacterString></{element}>",
        escape(value)
    )
}

fn md_open(identifier: &str, scope: &str) -> String {
    format!(
        concat!(
            r#"<gmd:MD_Metadata xmlns:gmd="{gmd}" xmlns:gco="http://www.isotc211.org/2005/gco" "#,
            r#"xmlns:srv="{srv}" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
            "{id}",
            r#"<gmd:hierarchyLevel><gmd:MD_ScopeCode codeListValue="{scope}"/></gmd:hierarchyLevel>"#,
        ),
        gmd = GMD_NS,
        srv = SRV_NS,
        id = char_string("gmd:fileIdentifier", identifier),
        scope = escape(scope),
    )
}

fn citation(title: &str) -> String {
    format!(
        "<gmd:citation><gmd:CI_Citation>{}</gmd:CI_Citation></gmd:citation>",
        char_string("gmd:title", title)
    )
}

fn online_resource(protocol: &str, url: &str, name: &str) -> String {
    let mut xml = format!(
        "<gmd:CI_OnlineResource><gmd:linkage><gmd:URL>{}</gmd:URL></gmd:linkage>{}",
        escape(url),
        char_string("gmd:protocol", protocol)
    );
    if !name.is_empty() {
        xml.push_str(&char_string("gmd:name", name));
    }
    xml.push_str("</gmd:CI_OnlineResource>");
    xml
}

/// A minimal ISO 19139 record.
pub fn md_metadata(identifier: &str, scope: &str) -> String {
    format!("{}</gmd:MD_Metadata>", md_open(identifier, scope))
}

/// An ISO 19139 dataset record with `(protocol, url, layer)` online resources.
pub fn dataset_record(identifier: &str, references: &[(&str, &str, &str)]) -> String {
    let mut xml = md_open(identifier, "dataset");
    let _ = write!(
        xml,
        "<gmd:identificationInfo><gmd:MD_DataIdentification>{}</gmd:MD_DataIdentification></gmd:identificationInfo>",
        citation(&format!("Dataset {identifier}"))
    );
    xml.push_str("<gmd:distributionInfo><gmd:MD_Distribution><gmd:transferOptions><gmd:MD_DigitalTransferOptions>");
    for (protocol, url, name) in references {
        let _ = write!(xml, "<gmd:onLine>{}</gmd:onLine>", online_resource(protocol, url, name));
    }
    xml.push_str("</gmd:MD_DigitalTransferOptions></gmd:transferOptions></gmd:MD_Distribution></gmd:distributionInfo>");
    xml.push_str("</gmd:MD_Metadata>");
    xml
}

/// An ISO 19139 service record.
///
/// `coupled` holds `(operation, dataset id, layer)` triples.
pub fn service_record(
    identifier: &str,
    operates_on: &[&str],
    get_capabilities: Option<(&str, &str)>,
    coupled: &[(&str, &str, &str)],
) -> String {
    let mut xml = md_open(identifier, "service");
    xml.push_str("<gmd:identificationInfo><srv:SV_ServiceIdentification>");
    xml.push_str(&citation(&format!("Service {identifier}")));
    for (operation, dataset, layer) in coupled {
        let _ = write!(
            xml,
            "<srv:coupledResource><srv:SV_CoupledResource>{}{}<gco:ScopedName>{}</gco:ScopedName></srv:SV_CoupledResource></srv:coupledResource>",
            char_string("srv:operationName", operation),
            char_string("srv:identifier", dataset),
            escape(layer)
        );
    }
    if let Some((url, protocol)) = get_capabilities {
        let _ = write!(
            xml,
            "<srv:containsOperations><srv:SV_OperationMetadata>{}<srv:connectPoint>{}</srv:connectPoint></srv:SV_OperationMetadata></srv:containsOperations>",
            char_string("srv:operationName", "GetCapabilities"),
            online_resource(protocol, url, "")
        );
    }
    for dataset in operates_on {
        let _ = write!(
            xml,
            r#"<srv:operatesOn uuidref="{}" xlink:href="https://sdi.example.org/geonetwork/md/{}.xml"/>"#,
            escape(dataset),
            escape(dataset)
        );
    }
    xml.push_str("</srv:SV_ServiceIdentification></gmd:identificationInfo></gmd:MD_Metadata>");
    xml
}

/// A `GetRecordsResponse` wrapping already rendered records.
pub fn records_response(records: &[String], matched: usize, next_record: usize) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<csw:GetRecordsResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" version="2.0.2">"#,
            r#"<csw:SearchStatus timestamp="2026-10-17T09:00:00"/>"#,
            r#"<csw:SearchResults numberOfRecordsMatched="{matched}" numberOfRecordsReturned="{returned}" "#,
            r#"elementSet="full" nextRecord="{next}">{records}</csw:SearchResults>"#,
            r#"</csw:GetRecordsResponse>"#,
        ),
        matched = matched,
        returned = records.len(),
        next = next_record,
        records = records.concat(),
    )
}

/// A WMS 1.3.0 capabilities document with layers linking to `text/xml` metadata.
pub fn wms_capabilities_with_metadata(layers: &[(&str, &[&str])]) -> String {
    let mut xml = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
        "<Service><Name>WMS</Name></Service><Capability><Layer><Title>Root</Title>",
    ));
    for (name, links) in layers {
        let _ = write!(xml, "<Layer><Name>{}</Name>", escape(name));
        for link in *links {
            let _ = write!(
                xml,
                r#"<MetadataURL type="ISO19115:2003"><Format>text/xml</Format><OnlineResource xlink:type="simple" xlink:href="{}"/></MetadataURL>"#,
                escape(link)
            );
        }
        xml.push_str("</Layer>");
    }
    xml.push_str("</Layer></Capability></WMS_Capabilities>");
    xml
}

/// A WMS 1.3.0 capabilities document advertising `layers`.
pub fn wms_capabilities(layers: &[&str]) -> String {
    let layers: Vec<(&str, &[&str])> = layers.iter().map(|name| (*name, &[][..])).collect();
    wms_capabilities_with_metadata(&layers)
}

/// A WFS 1.1.0 capabilities document advertising `feature_types`.
pub fn wfs_capabilities(feature_types: &[&str]) -> String {
    let mut xml = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<wfs:WFS_Capabilities version="1.1.0" xmlns:wfs="http://www.opengis.net/wfs">"#,
        "<wfs:FeatureTypeList>",
    ));
    for name in feature_types {
        let _ = write!(
            xml,
            "<wfs:FeatureType><wfs:Name>{}</wfs:Name></wfs:FeatureType>",
            escape(name)
        );
    }
    xml.push_str("</wfs:FeatureTypeList></wfs:WFS_Capabilities>");
    xml
}
