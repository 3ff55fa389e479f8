mod support;

use std::sync::Arc;
use std::time::Duration;

use docagent::auth::StaticToken;
use docagent::graph::DriveClient;
use docagent::ingest::{Ingestor, SyncOptions};
use docagent::util::retry::RetryPolicy;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::MINIMAL_PDF;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn ingestor(server: &MockServer, docs: &TempDir) -> Ingestor {
    let drive = Arc::new(DriveClient::new(
        server.uri(),
        Arc::new(StaticToken("graph-token".into())),
    ));
    Ingestor::new(drive, docs.path()).with_retry(fast_retry())
}

async fn mount_drive(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/me/drive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "drive-1",
            "name": "OneDrive",
            "driveType": "personal"
        })))
        .mount(server)
        .await;
}

async fn mount_tree(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/me/drive/root:/Boeing:/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {
                    "id": "pdf-1",
                    "name": "manual.pdf",
                    "lastModifiedDateTime": "2020-01-01T00:00:00Z",
                    "file": { "mimeType": "application/pdf" }
                },
                { "id": "vault", "name": "Personal Vault", "folder": {} },
                { "id": "sub", "name": "Notes", "folder": { "childCount": 1 } }
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/drive/root:/Boeing/Notes:/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "txt-1",
                "name": "todo?.txt",
                "lastModifiedDateTime": "2020-01-01T00:00:00Z",
                "file": {}
            }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/drive/root:/Boeing/Personal%20Vault:/children"))
        .respond_with(ResponseTemplate::new(403))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/drive/items/pdf-1/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(MINIMAL_PDF))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/drive/items/txt-1/content"))
        .respond_with(ResponseTemplate::new(200).set_body_string("buy milk"))
        .mount(server)
        .await;
}

fn options() -> SyncOptions {
    SyncOptions::builder().folder_path("/Boeing").build()
}

#[tokio::test]
async fn sync_mirrors_files_and_subfolders() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_tree(&server).await;

    let docs = TempDir::new().unwrap();
    let stats = ingestor(&server, &docs)
        .sync_folder(&options())
        .await
        .expect("sync");

    assert_eq!(stats.total, 2);
    assert_eq!(stats.downloaded, 2);
    assert_eq!(stats.failed, 0);
    assert!(stats.folders.contains("Notes"));
    assert_eq!(std::fs::read(docs.path().join("manual.pdf")).unwrap(), MINIMAL_PDF);
    assert_eq!(
        std::fs::read_to_string(docs.path().join("Notes").join("todo.txt")).unwrap(),
        "buy milk"
    );
}

#[tokio::test]
async fn second_sync_skips_up_to_date_files() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_tree(&server).await;

    let docs = TempDir::new().unwrap();
    let ingestor = ingestor(&server, &docs);
    ingestor.sync_folder(&options()).await.expect("first sync");
    let stats = ingestor.sync_folder(&options()).await.expect("second sync");

    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.downloaded, 0);
}

#[tokio::test]
async fn force_redownload_replaces_existing_files() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_tree(&server).await;

    let docs = TempDir::new().unwrap();
    let ingestor = ingestor(&server, &docs);
    ingestor.sync_folder(&options()).await.expect("first sync");
    let forced = SyncOptions::builder()
        .folder_path("/Boeing")
        .force_redownload(true)
        .build();
    let stats = ingestor.sync_folder(&forced).await.expect("forced sync");

    assert_eq!(stats.redownloaded, 2);
    assert_eq!(stats.skipped, 0);
}

#[tokio::test]
async fn corrupted_local_copy_is_redownloaded() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_tree(&server).await;

    let docs = TempDir::new().unwrap();
    std::fs::write(docs.path().join("manual.pdf"), b"<html>proxy error</html>").unwrap();

    let stats = ingestor(&server, &docs)
        .sync_folder(&SyncOptions::builder().folder_path("/Boeing").recursive(false).build())
        .await
        .expect("sync");

    assert_eq!(stats.total, 1);
    assert_eq!(stats.redownloaded, 1);
    assert_eq!(std::fs::read(docs.path().join("manual.pdf")).unwrap(), MINIMAL_PDF);
}

#[tokio::test]
async fn truncated_download_is_retried_then_counted_as_failed() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    Mock::given(method("GET"))
        .and(path("/me/drive/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "id": "bad", "name": "broken.pdf", "file": {} }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/drive/items/bad/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 truncated".to_vec()))
        .expect(3)
        .mount(&server)
        .await;

    let docs = TempDir::new().unwrap();
    let stats = ingestor(&server, &docs)
        .sync_folder(&SyncOptions::builder().build())
        .await
        .expect("sync completes");

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.failures[0].0, "broken.pdf");
    assert!(!docs.path().join("broken.pdf").exists());
}

#[tokio::test]
async fn fix_corrupted_removes_and_resyncs() {
    let server = MockServer::start().await;
    mount_drive(&server).await;
    mount_tree(&server).await;

    let docs = TempDir::new().unwrap();
    std::fs::write(docs.path().join("manual.pdf"), b"garbage").unwrap();

    let report = ingestor(&server, &docs)
        .fix_corrupted(&options())
        .await
        .expect("fix");

    assert_eq!(report.removed, vec!["manual.pdf".to_string()]);
    assert_eq!(report.sync.downloaded, 2);
}
