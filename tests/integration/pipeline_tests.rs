//! Integration tests for the download pipeline
//!
//! These tests use wiremock to stand in for remote hosts and run the
//! source, fetch and sink stages end-to-end against temporary directories.

use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url_harvest::config::{Config, HttpConfig};
use url_harvest::sink::file_path_for;
use url_harvest::{
    FetchRecord, FetchStage, HarvestError, HttpFetcher, Item, Pipeline, SinkStage, SourceStage,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_input(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create input file");
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Address nothing listens on, without a scheme
fn unroutable_host() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("127.0.0.1:{}", port)
}

fn http_fetcher() -> HttpFetcher {
    HttpFetcher::from_config(&HttpConfig::default()).expect("Failed to build client")
}

fn build_pipeline(input: &Path, output: &Path) -> Pipeline {
    let mut config = Config::default();
    config.output.directory = output.display().to_string();
    url_harvest::build_pipeline(&config, input).expect("Failed to build pipeline")
}

fn closed_input() -> mpsc::Receiver<Item> {
    let (_, rx) = mpsc::channel(1);
    rx
}

fn file_count(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

async fn mount_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_good_and_bad_urls_stage_by_stage() {
    let server = MockServer::start().await;
    mount_ok(&server).await;

    let good = format!("{}/good", server.uri());
    let bad = unroutable_host();
    let input = create_input(&format!("Urls\n{}\n{}\n", good, bad));
    let cancel = CancellationToken::new();

    // Source
    let (url_tx, url_rx) = mpsc::channel(50);
    let emitted = SourceStage::new(input.path())
        .run(cancel.clone(), url_tx)
        .await
        .unwrap();
    assert_eq!(emitted, 2);

    // Fetch
    let (record_tx, mut record_rx) = mpsc::channel(50);
    let summary = FetchStage::new(http_fetcher(), 50)
        .run(cancel.clone(), url_rx, record_tx)
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let mut records: Vec<FetchRecord> = Vec::new();
    while let Some(item) = record_rx.recv().await {
        match item {
            Item::Record(record) => records.push(record),
            other => panic!("unexpected item: {:?}", other),
        }
    }
    assert_eq!(records.len(), 2);

    let ok = records.iter().find(|r| r.url == good).expect("missing good record");
    assert_eq!(ok.body(), Some(&b"ok"[..]));

    let failed = records
        .iter()
        .find(|r| r.url == format!("http://{}", bad))
        .expect("missing bad record");
    assert!(failed.error().is_some());

    // Sink
    let output = TempDir::new().unwrap();
    let (sink_tx, sink_rx) = mpsc::channel(50);
    for record in records {
        sink_tx.send(Item::Record(record)).await.unwrap();
    }
    drop(sink_tx);

    let written = SinkStage::new(output.path())
        .run(cancel, sink_rx)
        .await
        .unwrap();
    assert_eq!(written.written, 1);
    assert_eq!(written.failed, 1);
    assert_eq!(file_count(output.path()), 1);
}

#[tokio::test]
async fn test_full_pipeline_writes_one_file_per_success() {
    let server = MockServer::start().await;
    mount_ok(&server).await;

    let good = format!("{}/good", server.uri());
    let input = create_input(&format!("Urls\n{}\n{}\n", good, unroutable_host()));
    let output = TempDir::new().unwrap();
    let out_dir = output.path().join("downloads");

    build_pipeline(input.path(), &out_dir)
        .run(CancellationToken::new(), closed_input())
        .await
        .unwrap();

    assert_eq!(file_count(&out_dir), 1);
    let body = std::fs::read(file_path_for(&out_dir, &good)).unwrap();
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_scheme_less_url_is_fetched_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain body"))
        .expect(1)
        .mount(&server)
        .await;

    let bare = format!("{}/plain", server.address());
    let input = create_input(&format!("Urls\n{}\n", bare));
    let output = TempDir::new().unwrap();

    build_pipeline(input.path(), output.path())
        .run(CancellationToken::new(), closed_input())
        .await
        .unwrap();

    // Files are keyed by the normalized URL
    let stored = file_path_for(output.path(), &format!("http://{}", bare));
    assert_eq!(std::fs::read(stored).unwrap(), b"plain body");
}

#[tokio::test]
async fn test_non_200_statuses_produce_no_files() {
    let server = MockServer::start().await;
    for (route, status) in [("/moved", 304u16), ("/missing", 404), ("/error", 503)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }

    let uri = server.uri();
    let input = create_input(&format!(
        "Urls\n{}/moved\n{}/missing\n{}/error\n",
        uri, uri, uri
    ));
    let output = TempDir::new().unwrap();

    build_pipeline(input.path(), output.path())
        .run(CancellationToken::new(), closed_input())
        .await
        .unwrap();

    assert_eq!(file_count(output.path()), 0);
}

#[tokio::test]
async fn test_default_pipeline_has_three_stages() {
    let output = TempDir::new().unwrap();
    let pipeline = build_pipeline(Path::new("urls.csv"), output.path());
    assert_eq!(pipeline.len(), 3);
}

#[tokio::test]
async fn test_header_only_input() {
    let input = create_input("Urls\n");
    let output = TempDir::new().unwrap();

    let (tx, mut rx) = mpsc::channel(1);
    let emitted = SourceStage::new(input.path())
        .run(CancellationToken::new(), tx)
        .await
        .unwrap();
    assert_eq!(emitted, 0);
    assert!(rx.recv().await.is_none());

    build_pipeline(input.path(), output.path())
        .run(CancellationToken::new(), closed_input())
        .await
        .unwrap();
    assert_eq!(file_count(output.path()), 0);
}

#[tokio::test]
async fn test_rerun_overwrites_existing_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("version 1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("version 2"))
        .mount(&server)
        .await;

    let url = format!("{}/doc", server.uri());
    let input = create_input(&format!("Urls\n{}\n", url));
    let output = TempDir::new().unwrap();

    for _ in 0..2 {
        build_pipeline(input.path(), output.path())
            .run(CancellationToken::new(), closed_input())
            .await
            .unwrap();
    }

    assert_eq!(file_count(output.path()), 1);
    let body = std::fs::read(file_path_for(output.path(), &url)).unwrap();
    assert_eq!(body, b"version 2");
}

#[tokio::test]
async fn test_missing_input_does_not_hang() {
    let output = TempDir::new().unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        build_pipeline(Path::new("/nonexistent/urls.csv"), output.path())
            .run(CancellationToken::new(), closed_input()),
    )
    .await
    .expect("pipeline hung on a missing input file");

    // The source failure is logged; downstream stages see end-of-stream
    assert!(result.is_ok());
    assert_eq!(file_count(output.path()), 0);
}

#[tokio::test]
async fn test_cancellation_mid_run_returns_promptly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let lines: Vec<String> = (0..20).map(|i| format!("{}/slow/{}", uri, i)).collect();
    let input = create_input(&format!("Urls\n{}\n", lines.join("\n")));
    let output = TempDir::new().unwrap();
    let pipeline = build_pipeline(input.path(), output.path());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.run(cancel, closed_input()),
    )
    .await
    .expect("cancelled pipeline did not return promptly");
    assert!(matches!(result, Err(HarvestError::Cancelled)));

    // In-flight requests are aborted, so the stages wind down well before
    // the mock would have answered
    assert!(pipeline.wait_for_stages(Duration::from_secs(5)).await);
    assert_eq!(file_count(output.path()), 0);
}
