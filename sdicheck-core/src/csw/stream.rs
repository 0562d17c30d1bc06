use std::collections::BTreeSet;
use std::mem;

use tracing::{debug, info, warn};

use crate::Logger;
use crate::csw::{CatalogRecord, CswError, Filter, RecordQuery, SharedCatalogClient};

/// Number of records requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 100;

pub type StreamResult<T> = Result<T, StreamError>;

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    CswError(#[from] CswError),

    #[error("Unable to isolate the unparsable record of the page starting at {position}: {source}")]
    UnresolvedFault {
        position: usize,
        #[source]
        source: CswError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum State {
    FetchingPage,
    /// Requesting the current page one record at a time, starting at `next`.
    Isolating { next: usize },
    /// The record with this identifier was found to be unparsable.
    Excluding(String),
    Exhausted,
}

/// Paginated retrieval of every catalog record matching a filter.
///
/// When a page cannot be parsed because of one broken record, the page is requested
/// record by record to find it. Its identifier is then added to an exclusion set and the page
/// is requested again with a filter that leaves out every excluded record. If that search
/// finds nothing, the page is retried once; failing again is fatal.
///
/// Transport and service errors are always fatal.
#[derive(Debug)]
pub struct RecordStream {
    client: SharedCatalogClient,
    filter: Filter,
    page_size: usize,
    /// 1-based position of the next page.
    position: usize,
    excluded: BTreeSet<String>,
    state: State,
    unresolved_fault: bool,
    page_fetches: usize,
    logger: Logger,
}

impl RecordStream {
    #[must_use]
    pub fn new(client: SharedCatalogClient, filter: Filter) -> Self {
        Self {
            client,
            filter,
            page_size: DEFAULT_PAGE_SIZE,
            position: 1,
            excluded: BTreeSet::new(),
            state: State::FetchingPage,
            unresolved_fault: false,
            page_fetches: 0,
            logger: Logger::default(),
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Identifiers of the records found to be unparsable so far.
    #[must_use]
    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    /// Number of full page requests issued, retries included.
    #[must_use]
    pub fn page_fetches(&self) -> usize {
        self.page_fetches
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    /// Restarts the stream from the first record. Excluded records stay excluded.
    pub fn reset(&mut self) {
        self.position = 1;
        self.state = State::FetchingPage;
        self.unresolved_fault = false;
        self.page_fetches = 0;
    }

    fn query(&self, start_position: usize, max_records: usize) -> RecordQuery {
        RecordQuery {
            filter: self.filter.excluding(&self.excluded),
            start_position,
            max_records,
        }
    }

    /// Returns the next page of records, or `None` once the catalog has no more.
    pub async fn next_page(&mut self) -> StreamResult<Option<Vec<CatalogRecord>>> {
        loop {
            match mem::replace(&mut self.state, State::FetchingPage) {
                State::Exhausted => {
                    self.state = State::Exhausted;
                    return Ok(None);
                }
                State::FetchingPage => {
                    if let Some(records) = self.fetch_page().await? {
                        return Ok(Some(records));
                    }
                }
                State::Isolating { next } => self.fetch_single(next).await?,
                State::Excluding(identifier) => self.exclude(identifier)?,
            }
        }
    }

    /// Fetches the page at the current position. Returns `None` when the state changed
    /// without producing records.
    async fn fetch_page(&mut self) -> StreamResult<Option<Vec<CatalogRecord>>> {
        let query = self.query(self.position, self.page_size);
        self.page_fetches += 1;
        match self.client.get_records(&query).await {
            Ok(page) => {
                self.unresolved_fault = false;
                self.logger.in_scope(|| {
                    debug!(
                        "Fetched {} record(s) at position {} ({} matched, next {})",
                        page.returned, self.position, page.matched, page.next_record
                    );
                });
                self.position += page.returned;
                if page.returned == 0 || page.next_record == 0 || self.position > page.matched {
                    self.state = State::Exhausted;
                }
                if page.records.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(page.records))
                }
            }
            Err(e) if e.is_malformed() => {
                if self.unresolved_fault {
                    return Err(StreamError::UnresolvedFault {
                        position: self.position,
                        source: e,
                    });
                }
                self.logger.in_scope(|| {
                    warn!(
                        "Page at position {} could not be parsed ({e}), looking for the faulty record",
                        self.position
                    );
                });
                self.state = State::Isolating {
                    next: self.position,
                };
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Requests the single record at `position`, moving on to the next one if it parses.
    async fn fetch_single(&mut self, position: usize) -> StreamResult<()> {
        if position >= self.position + self.page_size {
            self.give_up_isolation();
            return Ok(());
        }
        let query = self.query(position, 1);
        match self.client.get_records(&query).await {
            Ok(page) if page.returned == 0 => self.give_up_isolation(),
            Ok(_) => self.state = State::Isolating { next: position + 1 },
            Err(e) if e.is_malformed() => {
                let identifiers = self.client.get_identifiers(&query).await?;
                if let Some(identifier) = identifiers.into_iter().next() {
                    self.logger
                        .in_scope(|| info!("Record {identifier} at position {position} is unparsable"));
                    self.state = State::Excluding(identifier);
                } else {
                    self.give_up_isolation();
                }
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn give_up_isolation(&mut self) {
        self.logger.in_scope(|| {
            warn!(
                "No faulty record found in the page at position {}, retrying it",
                self.position
            );
        });
        self.unresolved_fault = true;
        self.state = State::FetchingPage;
    }

    fn exclude(&mut self, identifier: String) -> StreamResult<()> {
        if !self.excluded.insert(identifier.clone()) {
            // The catalog ignored the exclusion filter
            return Err(StreamError::UnresolvedFault {
                position: self.position,
                source: CswError::Malformed(format!(
                    "record {identifier} is still returned after being excluded"
                )),
            });
        }
        self.unresolved_fault = false;
        self.state = State::FetchingPage;
        Ok(())
    }

    /// Drains the stream, returning every remaining record in catalog order.
    pub async fn collect_all(&mut self) -> StreamResult<Vec<CatalogRecord>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }
        self.logger.in_scope(|| {
            info!(
                "Retrieved {} record(s) in {} page request(s), {} excluded",
                records.len(),
                self.page_fetches,
                self.excluded.len()
            );
        });
        Ok(records)
    }
}
