use std::collections::BTreeSet;
use std::sync::Arc;

use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use sdicheck_core::Logger;
use sdicheck_core::check::{FlexibleChecker, OwsChecker, ServiceIndex, StrictChecker};
use sdicheck_core::csw::{CatalogRecord, CswClient, Filter, RecordKind, RecordStream};
use sdicheck_core::ows::{CapabilityCache, OwsFamily};
use sdicheck_core::{csw, http, ows};

#[path = "../src/test_utils.rs"]
mod test_utils;
use test_utils::{
    CapturedLogs, FakeCatalog, FakeHttp, bare_record, dataset_record, record_with_references,
    records_response, service_record_with, wfs_capabilities, wms_capabilities,
    wms_capabilities_with_metadata,
};

const SERVER_X: &str = "https://x.example.org/geoserver/ows";
const CATALOG: &str = "https://catalog.example.org/geonetwork/srv/eng/csw";

fn server_x() -> Arc<FakeHttp> {
    Arc::new(FakeHttp::default().with(SERVER_X, wms_capabilities(&["ws:roads"])))
}

fn numbered(count: usize, malformed: &[usize]) -> Arc<FakeCatalog> {
    let mut catalog = FakeCatalog::default();
    for idx in 0..count {
        let record = bare_record(&format!("record-{idx}"), RecordKind::Dataset);
        catalog = if malformed.contains(&idx) {
            catalog.with_malformed(record)
        } else {
            catalog.with_record(record)
        };
    }
    Arc::new(catalog)
}

fn identifiers(records: &[CatalogRecord]) -> Vec<&str> {
    records.iter().map(|r| r.identifier.as_str()).collect()
}

#[tokio::test]
async fn flexible_check_of_two_records() {
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_record(record_with_references("A", &[("OGC:WMS", SERVER_X, "ws:roads")]))
            .with_record(bare_record("B", RecordKind::Dataset)),
    );
    let mut stream = RecordStream::new(catalog, Filter::datasets(false));
    let mut checker = FlexibleChecker::new(CapabilityCache::new(server_x()));

    let report = checker.check_stream(&mut stream).await.unwrap();

    assert_eq!(report.findings.len(), 3);
    assert_snapshot!(report.to_string(), @r"
    #1 Metadata A does not reference any WFS feature type
    #2 Metadata B does not reference any WMS layer
    #3 Metadata B does not reference any WFS feature type
    2 records parsed, 2 inconsistent (100%)
    ");
}

#[tokio::test]
async fn empty_catalog_reports_zero_percent() {
    let catalog = Arc::new(FakeCatalog::default());
    let mut stream = RecordStream::new(catalog, Filter::datasets(false));
    let mut checker = FlexibleChecker::new(CapabilityCache::new(server_x()));

    let report = checker.check_stream(&mut stream).await.unwrap();

    assert_eq!(report.summary(), "0 records parsed, 0 inconsistent (0%)");
}

#[tokio::test]
async fn pagination_fetches_each_page_once() {
    let mut stream = RecordStream::new(numbered(23, &[]), Filter::datasets(true)).with_page_size(5);

    let records = stream.collect_all().await.unwrap();

    let expected: Vec<_> = (0..23).map(|idx| format!("record-{idx}")).collect();
    assert_eq!(identifiers(&records), expected);
    assert_eq!(stream.page_fetches(), 23_usize.div_ceil(5));
}

#[tokio::test]
async fn broken_record_is_isolated() {
    let catalog = numbered(10, &[4]);
    let mut stream = RecordStream::new(catalog, Filter::datasets(true)).with_page_size(10);

    let page = stream.next_page().await.unwrap().unwrap();

    assert_eq!(page.len(), 9);
    assert!(!identifiers(&page).contains(&"record-4"));
    assert_eq!(stream.excluded(), &BTreeSet::from(["record-4".to_string()]));
    assert_eq!(stream.next_page().await.unwrap(), None);
}

#[tokio::test]
async fn harvested_records_are_left_out_by_default() {
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_record(bare_record("local", RecordKind::Dataset))
            .with_harvested(bare_record("remote", RecordKind::Dataset))
            .with_record(bare_record("service", RecordKind::Service)),
    );

    let local = RecordStream::new(catalog.clone(), Filter::datasets(false))
        .collect_all()
        .await
        .unwrap();
    let all = RecordStream::new(catalog, Filter::datasets(true))
        .collect_all()
        .await
        .unwrap();

    assert_eq!(identifiers(&local), ["local"]);
    assert_eq!(identifiers(&all), ["local", "remote"]);
}

#[tokio::test]
async fn strict_check_over_the_catalog() {
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_record(service_record_with(
                "S1",
                &["D1", "D2"],
                Some((SERVER_X, "OGC:WMS")),
                &[("D1", "ws:roads"), ("D2", "ws:rivers")],
            ))
            .with_record(service_record_with("S2", &["D3"], None, &[]))
            .with_record(bare_record("D1", RecordKind::Dataset))
            .with_record(bare_record("D2", RecordKind::Dataset))
            .with_record(bare_record("D3", RecordKind::Dataset))
            .with_record(bare_record("D4", RecordKind::Dataset)),
    );
    let mut services = RecordStream::new(catalog.clone(), Filter::services(false)).with_page_size(2);
    let mut datasets = RecordStream::new(catalog, Filter::datasets(false)).with_page_size(2);
    let mut checker = StrictChecker::new(CapabilityCache::new(server_x())).with_servers(["x.example.org"]);

    let report = checker.check_catalog(&mut services, &mut datasets).await.unwrap();

    assert_snapshot!(report.to_string(), @r"
    #1 Metadata S1 references a layer ws:rivers on https://x.example.org/geoserver/ows that does not exist
    #2 Metadata S1 references a layer ws:rivers on https://x.example.org/geoserver/ows that does not exist
    #3 Service metadata S2 operates on D3 but defines no GetCapabilities URL
    4 records parsed, 3 inconsistent (75%)
    ");
    let items: Vec<_> = report.findings.iter().map(|f| f.item.as_str()).collect();
    assert_eq!(items, ["D1", "D2", "D3"]);
    assert_eq!(checker.cache().len(), 1);
}

#[test]
fn strict_index_from_parsed_records() {
    let index = ServiceIndex::build(vec![service_record_with("S1", &["D1"], None, &[])]);
    assert_eq!(index.services_for("D1").count(), 1);
    assert_eq!(index.services_for("D2").count(), 0);
}

#[tokio::test]
async fn reverse_check_of_a_server() {
    let md = "https://catalog.example.org/geonetwork/md/roads.xml";
    let http = Arc::new(
        FakeHttp::default()
            .with(
                SERVER_X,
                wms_capabilities_with_metadata(&[("ws:roads", &[md]), ("ws:lakes", &[])]),
            )
            .with(md, "<html>maintenance</html>".to_string()),
    );
    let mut checker = OwsChecker::new(http);

    let report = checker.check_service(SERVER_X, OwsFamily::Wms).await;

    assert_snapshot!(report.to_string(), @r"
    #1 No metadata defined for layer ws:lakes
    #2 Metadata https://catalog.example.org/geonetwork/md/roads.xml not found or invalid for layer ws:roads: Unable to parse the text/xml metadata: unexpected root element html
    2 layers parsed, 2 inconsistent (100%)
    ");
}

#[tokio::test]
async fn flexible_check_through_the_csw_client() {
    let body = records_response(
        &[dataset_record(
            "A",
            &[("OGC:WMS-1.3.0-http-get-map", SERVER_X, "ws:roads"), ("OGC:WFS", SERVER_X, "ws:roads")],
        )],
        1,
        0,
    );
    let http = Arc::new(
        FakeHttp::default()
            .with(CATALOG, body)
            .with_service(SERVER_X, OwsFamily::Wms, wms_capabilities(&["ws:roads"]))
            .with_service(SERVER_X, OwsFamily::Wfs, wfs_capabilities(&["roads"])),
    );
    let client = Arc::new(CswClient::new(CATALOG, http.clone()).unwrap());
    let mut stream = RecordStream::new(client, Filter::datasets(false));
    let mut checker = FlexibleChecker::new(CapabilityCache::new(http.clone()));

    let report = checker.check_stream(&mut stream).await.unwrap();

    assert!(report.is_consistent(), "{report}");
    assert_eq!(report.summary(), "1 records parsed, 0 inconsistent (0%)");
    let methods: Vec<_> = http.requests().iter().map(|r| r.method).collect();
    assert_eq!(methods, ["POST", "GET", "GET"]);
}

#[tokio::test]
async fn injected_logger_sees_engine_events() {
    let logs = CapturedLogs::default();
    let logger = Logger::from(logs.dispatch());
    let mut checker =
        FlexibleChecker::new(CapabilityCache::new(server_x()).with_logger(logger.clone()))
            .with_logger(logger);
    let record = record_with_references("A", &[("OGC:WMS", SERVER_X, "ws:roads")]);

    checker.check_record(&record).await;

    assert!(logs.contents().contains("Fetching WMS capabilities from"));
}
