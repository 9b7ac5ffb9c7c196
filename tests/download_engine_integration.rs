//! Integration tests for the download engine.
//!
//! These tests drive DownloadEngine against a mock HTTP server and check the
//! file left in a temp directory, the progress sequence, and cancellation.

use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use grabfile_core::{
    DownloadEngine, DownloadError, DownloadOutcome, DownloadRequest, FailureKind, HttpClient,
    HttpClientConfig,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;

use support::raw_http::serve_once;
use support::socket_guard::start_mock_server_or_skip;

const ARCHIVE_BYTES: usize = 10_000_000;
const MIB: u64 = 1024 * 1024;

async fn mount_file(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read temp dir").count()
}

fn archive_body() -> Vec<u8> {
    (0..ARCHIVE_BYTES).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_archive_download_completes_with_final_percent_100() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let body = archive_body();
    mount_file(&mock_server, "/archive.zip", body.clone()).await;

    let engine = DownloadEngine::new(HttpClient::new(), temp_dir.path());
    let mut percents: Vec<u8> = Vec::new();
    let outcome = engine
        .run(
            DownloadRequest::new(format!("{}/archive.zip", mock_server.uri())),
            |progress| percents.extend(progress.percent_complete),
            || false,
        )
        .await;

    let done = match outcome {
        DownloadOutcome::Completed(done) => done,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(done.path, temp_dir.path().join("archive.zip"));
    assert_eq!(done.bytes_downloaded, ARCHIVE_BYTES as u64);
    assert_eq!(done.total_bytes, Some(ARCHIVE_BYTES as u64));

    let written = std::fs::read(&done.path).expect("read downloaded file");
    assert_eq!(written.len(), ARCHIVE_BYTES);
    assert_eq!(written, body);

    assert_eq!(percents.last(), Some(&100));
    assert!(
        percents.windows(2).all(|pair| pair[0] < pair[1]),
        "percent sequence must be strictly increasing: {percents:?}"
    );
}

#[tokio::test]
async fn test_cancel_after_four_million_bytes_leaves_no_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    mount_file(&mock_server, "/archive.zip", archive_body()).await;

    let engine = DownloadEngine::new(HttpClient::new(), temp_dir.path());
    let seen_bytes = AtomicU64::new(0);
    let outcome = engine
        .run(
            DownloadRequest::new(format!("{}/archive.zip", mock_server.uri())),
            |progress| seen_bytes.store(progress.downloaded_bytes, Ordering::SeqCst),
            || seen_bytes.load(Ordering::SeqCst) >= 4_000_000,
        )
        .await;

    assert!(
        matches!(outcome, DownloadOutcome::Cancelled),
        "expected cancellation, got {outcome:?}"
    );
    assert!(seen_bytes.load(Ordering::SeqCst) >= 4_000_000);
    assert_eq!(file_count(temp_dir.path()), 0, "partial file must be removed");
}

#[tokio::test]
async fn test_not_found_fails_without_file_or_progress() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    Mock::given(method("GET"))
        .and(path("/missing.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let engine = DownloadEngine::new(HttpClient::new(), temp_dir.path());
    let calls = AtomicUsize::new(0);
    let outcome = engine
        .run(
            DownloadRequest::new(format!("{}/missing.zip", mock_server.uri())),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            },
            || false,
        )
        .await;

    match outcome {
        DownloadOutcome::Failed(error) => {
            assert!(matches!(error, DownloadError::HttpStatus { status: 404, .. }));
            assert_eq!(error.kind(), FailureKind::HttpStatus);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(file_count(temp_dir.path()), 0);
}

#[tokio::test]
async fn test_server_error_fails_without_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    Mock::given(method("GET"))
        .and(path("/broken.bin"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&mock_server)
        .await;

    let outcome = DownloadEngine::new(HttpClient::new(), temp_dir.path())
        .run(
            DownloadRequest::new(format!("{}/broken.bin", mock_server.uri())),
            |_| {},
            || false,
        )
        .await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Failed(DownloadError::HttpStatus { status: 500, .. })
    ));
    assert_eq!(file_count(temp_dir.path()), 0);
}

#[tokio::test]
async fn test_repeated_downloads_get_numbered_names() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    mount_file(&mock_server, "/report.zip", b"report body".to_vec()).await;

    let engine = DownloadEngine::new(HttpClient::new(), temp_dir.path());
    let url = format!("{}/report.zip", mock_server.uri());

    let mut names = Vec::new();
    for _ in 0..3 {
        match engine.run(DownloadRequest::new(&url), |_| {}, || false).await {
            DownloadOutcome::Completed(done) => names.push(
                done.path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .expect("utf-8 file name")
                    .to_string(),
            ),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    assert_eq!(names, vec!["report.zip", "report(1).zip", "report(2).zip"]);
    for name in &names {
        assert_eq!(
            std::fs::read(temp_dir.path().join(name)).expect("read file"),
            b"report body"
        );
    }
}

#[tokio::test]
async fn test_content_disposition_name_wins_over_url() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    Mock::given(method("GET"))
        .and(path("/api/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Content-Disposition",
                    r#"attachment; filename="quarterly-report.pdf""#,
                )
                .set_body_bytes(b"PDF bytes".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let outcome = DownloadEngine::new(HttpClient::new(), temp_dir.path())
        .run(
            DownloadRequest::new(format!("{}/api/download", mock_server.uri())),
            |_| {},
            || false,
        )
        .await;

    let DownloadOutcome::Completed(done) = outcome else {
        panic!("download should complete");
    };
    assert_eq!(done.path, temp_dir.path().join("quarterly-report.pdf"));
}

#[tokio::test]
async fn test_url_without_file_segment_uses_content_type_fallback() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/pdf")
                .set_body_bytes(b"%PDF".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let outcome = DownloadEngine::new(HttpClient::new(), temp_dir.path())
        .run(
            DownloadRequest::new(format!("{}/", mock_server.uri())),
            |_| {},
            || false,
        )
        .await;

    let DownloadOutcome::Completed(done) = outcome else {
        panic!("download should complete");
    };
    assert_eq!(done.path, temp_dir.path().join("download.pdf"));
}

#[tokio::test]
async fn test_slow_headers_hit_read_timeout() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    Mock::given(method("GET"))
        .and(path("/slow.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 16])
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(HttpClientConfig {
        connect_timeout_secs: 5,
        read_timeout_secs: 1,
        ..HttpClientConfig::default()
    })
    .expect("client builds");
    let outcome = DownloadEngine::new(client, temp_dir.path())
        .run(
            DownloadRequest::new(format!("{}/slow.bin", mock_server.uri())),
            |_| {},
            || false,
        )
        .await;

    match outcome {
        DownloadOutcome::Failed(error) => assert_eq!(error.kind(), FailureKind::Connection),
        other => panic!("expected timeout failure, got {other:?}"),
    }
    assert_eq!(file_count(temp_dir.path()), 0);
}

#[tokio::test]
async fn test_missing_output_dir_is_io_failure() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    mount_file(&mock_server, "/a.bin", b"abc".to_vec()).await;

    let outcome = DownloadEngine::new(HttpClient::new(), temp_dir.path().join("absent"))
        .run(
            DownloadRequest::new(format!("{}/a.bin", mock_server.uri())),
            |_| {},
            || false,
        )
        .await;

    match outcome {
        DownloadOutcome::Failed(error) => assert_eq!(error.kind(), FailureKind::Io),
        other => panic!("expected io failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_connection_failure() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    // Port 9 on localhost is the discard service and is closed on test hosts.
    let outcome = DownloadEngine::new(HttpClient::new(), temp_dir.path())
        .run(DownloadRequest::new("http://127.0.0.1:9/file.bin"), |_| {}, || false)
        .await;

    match outcome {
        DownloadOutcome::Failed(error) => assert_eq!(error.kind(), FailureKind::Connection),
        other => panic!("expected connection failure, got {other:?}"),
    }
    assert_eq!(file_count(temp_dir.path()), 0);
}

#[tokio::test]
async fn test_body_cut_short_removes_partial_file() {
    let head = "HTTP/1.1 200 OK\r\nContent-Length: 100000\r\nConnection: close\r\n\r\n";
    let Some((base_url, server)) = serve_once(head.to_string(), vec![5u8; 1000]) else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let outcome = DownloadEngine::new(HttpClient::new(), temp_dir.path())
        .run(
            DownloadRequest::new(format!("{base_url}/truncated.bin")),
            |_| {},
            || false,
        )
        .await;
    server.join().expect("responder thread");

    match outcome {
        DownloadOutcome::Failed(error) => {
            assert!(
                matches!(
                    error,
                    DownloadError::Body { .. } | DownloadError::Integrity { .. }
                ),
                "unexpected error: {error:?}"
            );
            assert_eq!(error.kind(), FailureKind::Io);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(file_count(temp_dir.path()), 0, "partial file must be removed");
}

#[tokio::test]
async fn test_unknown_length_keeps_received_bytes_and_reports_per_mib() {
    let body: Vec<u8> = (0..(3 * MIB + MIB / 2)).map(|i| (i % 239) as u8).collect();
    let head = "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n";
    let Some((base_url, server)) = serve_once(head.to_string(), body.clone()) else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let mut reports = Vec::new();
    let outcome = DownloadEngine::new(HttpClient::new(), temp_dir.path())
        .run(
            DownloadRequest::new(format!("{base_url}/stream.bin")),
            |progress| reports.push(*progress),
            || false,
        )
        .await;
    server.join().expect("responder thread");

    let done = match outcome {
        DownloadOutcome::Completed(done) => done,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(done.path, temp_dir.path().join("stream.bin"));
    assert_eq!(done.total_bytes, None);
    assert_eq!(done.bytes_downloaded, body.len() as u64);
    assert_eq!(std::fs::read(&done.path).expect("read file"), body);

    assert!(reports.len() >= 2, "expected several reports: {reports:?}");
    assert!(reports
        .iter()
        .all(|p| p.percent_complete.is_none() && p.eta_seconds.is_none()));
    assert!(
        reports
            .windows(2)
            .all(|pair| pair[1].downloaded_bytes - pair[0].downloaded_bytes >= MIB),
        "reports must be at least 1 MiB apart"
    );
}
