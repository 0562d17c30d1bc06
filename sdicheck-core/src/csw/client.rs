use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use roxmltree::{Document, Node};
use tracing::debug;
use url::Url;

use crate::Logger;
use crate::csw::record::GMD_NS;
use crate::csw::{CatalogRecord, CswError, CswResult, Filter};
use crate::http::SharedHttpClient;

pub const CSW_NS: &str = "http://www.opengis.net/cat/csw/2.0.2";
pub const OWS_NS: &str = "http://www.opengis.net/ows";

/// Amount of detail requested for each record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementSet {
    /// The whole record.
    Full,
    /// Identifier and a few core fields only.
    Brief,
}

impl ElementSet {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Brief => "brief",
        }
    }
}

/// One page of a `GetRecords` search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordQuery {
    pub filter: Filter,
    /// 1-based position of the first record of the page.
    pub start_position: usize,
    pub max_records: usize,
}

impl RecordQuery {
    /// Renders the `csw:GetRecords` request body.
    #[must_use]
    pub fn to_xml(&self, element_set: ElementSet) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<csw:GetRecords xmlns:csw="{csw}" xmlns:gmd="{gmd}" service="CSW" version="2.0.2" "#,
                r#"resultType="results" startPosition="{start}" maxRecords="{max}" "#,
                r#"outputFormat="application/xml" outputSchema="{gmd}">"#,
                r#"<csw:Query typeNames="gmd:MD_Metadata">"#,
                r#"<csw:ElementSetName>{esn}</csw:ElementSetName>"#,
                r#"<csw:Constraint version="1.1.0">{filter}</csw:Constraint>"#,
                r#"</csw:Query></csw:GetRecords>"#,
            ),
            csw = CSW_NS,
            gmd = GMD_NS,
            start = self.start_position,
            max = self.max_records,
            esn = element_set.as_str(),
            filter = self.filter.to_xml(),
        )
    }
}

/// Records returned by one page, with the result metadata of the search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordsPage {
    pub records: Vec<CatalogRecord>,
    /// Number of records matching the filter, across all pages.
    pub matched: usize,
    /// Number of records in this page.
    pub returned: usize,
    /// Position of the first record of the next page, `0` when there is none.
    pub next_record: usize,
}

/// The search operations of a catalog the record stream relies on.
#[async_trait]
pub trait CatalogClient: Send + Sync + Debug {
    /// Fetches one page of full records.
    async fn get_records(&self, query: &RecordQuery) -> CswResult<RecordsPage>;

    /// Fetches the identifiers of one page of records, without parsing their content.
    async fn get_identifiers(&self, query: &RecordQuery) -> CswResult<Vec<String>>;
}

pub type SharedCatalogClient = Arc<dyn CatalogClient>;

/// [`CatalogClient`] speaking CSW 2.0.2 over HTTP POST.
#[derive(Debug)]
pub struct CswClient {
    url: Url,
    http: SharedHttpClient,
    logger: Logger,
}

impl CswClient {
    pub fn new(url: &str, http: SharedHttpClient) -> CswResult<Self> {
        let url = Url::parse(url).map_err(|e| CswError::InvalidUrl(e, url.to_string()))?;
        Ok(Self {
            url,
            http,
            logger: Logger::default(),
        })
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn post(&self, query: &RecordQuery, element_set: ElementSet) -> CswResult<String> {
        self.logger.in_scope(|| {
            debug!(
                "GetRecords {} on {} (start={}, max={})",
                element_set.as_str(),
                self.url,
                query.start_position,
                query.max_records
            );
        });
        Ok(self.http.post_xml(&self.url, query.to_xml(element_set)).await?)
    }
}

#[async_trait]
impl CatalogClient for CswClient {
    async fn get_records(&self, query: &RecordQuery) -> CswResult<RecordsPage> {
        let body = self.post(query, ElementSet::Full).await?;
        parse_records_response(&body)
    }

    async fn get_identifiers(&self, query: &RecordQuery) -> CswResult<Vec<String>> {
        let body = self.post(query, ElementSet::Brief).await?;
        parse_identifiers_response(&body)
    }
}

fn exception_text(root: Node<'_, '_>) -> String {
    root.descendants()
        .filter(|n| n.is_element() && n.has_tag_name((OWS_NS, "ExceptionText")))
        .filter_map(|n| n.text())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("; ")
}

fn search_results<'a, 'i>(doc: &'a Document<'i>) -> CswResult<Node<'a, 'i>> {
    let root = doc.root_element();
    if root.has_tag_name((OWS_NS, "ExceptionReport")) {
        return Err(CswError::ServiceException(exception_text(root)));
    }
    if !root.has_tag_name((CSW_NS, "GetRecordsResponse")) {
        return Err(CswError::Malformed(format!(
            "unexpected root element {}",
            root.tag_name().name()
        )));
    }
    root.children()
        .find(|n| n.is_element() && n.has_tag_name((CSW_NS, "SearchResults")))
        .ok_or_else(|| CswError::Malformed("response has no SearchResults".to_string()))
}

fn count_attribute(node: Node<'_, '_>, name: &str) -> CswResult<usize> {
    let value = node
        .attribute(name)
        .ok_or_else(|| CswError::Malformed(format!("SearchResults has no {name}")))?;
    value
        .trim()
        .parse()
        .map_err(|_| CswError::Malformed(format!("invalid {name} '{value}'")))
}

fn metadata_children<'a, 'i>(results: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    results
        .children()
        .filter(|n| n.is_element() && n.has_tag_name((GMD_NS, "MD_Metadata")))
}

/// Parses a `GetRecordsResponse` carrying full ISO 19139 records.
pub fn parse_records_response(body: &str) -> CswResult<RecordsPage> {
    let doc = Document::parse(body)?;
    let results = search_results(&doc)?;
    let records = metadata_children(results)
        .map(CatalogRecord::from_node)
        .collect::<CswResult<Vec<_>>>()?;
    Ok(RecordsPage {
        matched: count_attribute(results, "numberOfRecordsMatched")?,
        returned: count_attribute(results, "numberOfRecordsReturned")?,
        next_record: count_attribute(results, "nextRecord")?,
        records,
    })
}

/// Parses a `GetRecordsResponse`, keeping only the record identifiers.
pub fn parse_identifiers_response(body: &str) -> CswResult<Vec<String>> {
    let doc = Document::parse(body)?;
    let results = search_results(&doc)?;
    Ok(metadata_children(results)
        .filter_map(CatalogRecord::identifier_of)
        .collect())
}
