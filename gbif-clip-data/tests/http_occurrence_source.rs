//! Integration tests for [`HttpOccurrenceSource`] against a loopback server.

use std::time::Duration;

use gbif_clip_core::{
    FetchError, NoProgress, OccurrenceSource, Outcome, PagedFetcher, SpatialExtent,
};
use gbif_clip_data::test_support::{
    CannedResponse, CannedServer, SEARCH_PATH, occurrence_json, page_body, probe_body,
};
use gbif_clip_data::{HttpOccurrenceSource, HttpOccurrenceSourceConfig};
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn extent() -> SpatialExtent {
    SpatialExtent::new(10.0, 10.0, 20.0, 20.0).expect("valid extent")
}

fn records(first: u64, len: u64) -> Vec<serde_json::Value> {
    (first..first + len)
        .map(|id| occurrence_json(id, 15.0, 15.0))
        .collect()
}

#[rstest]
fn probe_reads_the_count(extent: SpatialExtent) {
    let server =
        CannedServer::start(vec![CannedResponse::json(&probe_body(4521))]).expect("server");
    let source = HttpOccurrenceSource::new(server.base_url()).expect("source should build");

    let count = source.count(&extent).expect("probe succeeds");

    assert_eq!(count, 4521);
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with(SEARCH_PATH));
    assert!(requests[0].contains("geometry=POLYGON%28%2810+10%2C20+10%2C20+20%2C10+20%2C10+10%29%29"));
    assert!(requests[0].ends_with("&limit=0"));
}

#[rstest]
fn negative_count_is_zero(extent: SpatialExtent) {
    let server = CannedServer::start(vec![CannedResponse::json(&probe_body(-1))]).expect("server");
    let source = HttpOccurrenceSource::new(server.base_url()).expect("source should build");

    assert_eq!(source.count(&extent).expect("probe succeeds"), 0);
}

#[rstest]
fn page_decodes_records(extent: SpatialExtent) {
    let mut unlocated = occurrence_json(99, 0.0, 0.0);
    unlocated["decimalLatitude"] = serde_json::Value::Null;
    let mut body_records = records(0, 2);
    body_records.push(unlocated);
    let server = CannedServer::start(vec![CannedResponse::json(&page_body(body_records))])
        .expect("server");
    let source = HttpOccurrenceSource::new(server.base_url()).expect("source should build");

    let page = source.page(&extent, 300, 300).expect("page succeeds");

    assert_eq!(page.len(), 3);
    let located = page
        .results
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| raw.into_record())
        .count();
    assert_eq!(located, 2);
    assert!(server.requests()[0].ends_with("&limit=300&offset=300"));
}

#[rstest]
fn error_status_is_an_http_error(extent: SpatialExtent) {
    let server = CannedServer::start(vec![CannedResponse::status(503, "{}")]).expect("server");
    let source = HttpOccurrenceSource::new(server.base_url()).expect("source should build");

    let err = source.count(&extent).expect_err("service unavailable");

    match err {
        FetchError::Http { status, url, .. } => {
            assert_eq!(status, 503);
            assert!(url.contains(SEARCH_PATH));
        }
        other => panic!("expected an HTTP error, got {other:?}"),
    }
}

#[rstest]
fn malformed_body_is_a_decode_error(extent: SpatialExtent) {
    let server =
        CannedServer::start(vec![CannedResponse::status(200, "<html>")]).expect("server");
    let source = HttpOccurrenceSource::new(server.base_url()).expect("source should build");

    let err = source.count(&extent).expect_err("not JSON");

    assert!(matches!(err, FetchError::Decode { .. }), "got {err:?}");
}

#[rstest]
fn textual_coordinates_are_a_decode_error(extent: SpatialExtent) {
    let body = json!({ "results": [{ "decimalLatitude": "51.5", "decimalLongitude": 0.1 }] });
    let server = CannedServer::start(vec![CannedResponse::json(&body)]).expect("server");
    let source = HttpOccurrenceSource::new(server.base_url()).expect("source should build");

    let err = source.page(&extent, 0, 300).expect_err("bad coordinates");

    assert!(matches!(err, FetchError::Decode { .. }), "got {err:?}");
}

#[rstest]
fn slow_responses_time_out(extent: SpatialExtent) {
    let server = CannedServer::start(vec![
        CannedResponse::json(&probe_body(1)).delayed(Duration::from_secs(3)),
    ])
    .expect("server");
    let config = HttpOccurrenceSourceConfig::new(server.base_url())
        .with_timeout(Duration::from_millis(300));
    let source = HttpOccurrenceSource::with_config(config).expect("source should build");

    let err = source.count(&extent).expect_err("request times out");

    assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
}

#[rstest]
fn unreachable_service_is_a_network_error(extent: SpatialExtent) {
    let server = CannedServer::start(Vec::new()).expect("server");
    // Give the empty script time to close the listener.
    std::thread::sleep(Duration::from_millis(100));
    let source = HttpOccurrenceSource::new(server.base_url()).expect("source should build");

    let err = source.count(&extent).expect_err("connection refused");

    assert!(matches!(err, FetchError::Network { .. }), "got {err:?}");
}

#[rstest]
fn pages_through_the_remote_result_set(extent: SpatialExtent) {
    let server = CannedServer::start(vec![
        CannedResponse::json(&probe_body(450)),
        CannedResponse::json(&page_body(records(0, 300))),
        CannedResponse::json(&page_body(records(300, 150))),
    ])
    .expect("server");
    let source = HttpOccurrenceSource::new(server.base_url()).expect("source should build");

    let outcome = PagedFetcher::new(source)
        .fetch(extent, "GBIF Occurrences-region", &mut NoProgress)
        .expect("fetch succeeds");

    let Outcome::Completed(collection) = outcome else {
        panic!("nothing cancelled the fetch");
    };
    assert_eq!(collection.len(), 450);
    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1].ends_with("&offset=0"));
    assert!(requests[2].ends_with("&offset=300"));
}

#[rstest]
fn works_from_a_multi_threaded_runtime_worker() {
    let server = CannedServer::start(vec![CannedResponse::json(&probe_body(7))]).expect("server");
    let source = HttpOccurrenceSource::new(server.base_url()).expect("source should build");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("runtime should build");

    // The source owns a runtime, so it must be dropped outside async code.
    let (source, count) = runtime.block_on(async move {
        tokio::spawn(async move {
            let extent = SpatialExtent::new(0.0, 0.0, 1.0, 1.0).expect("valid extent");
            let count = source.count(&extent);
            (source, count)
        })
        .await
        .expect("task should complete")
    });
    drop(runtime);
    drop(source);

    assert_eq!(count.expect("probe succeeds"), 7);
}
