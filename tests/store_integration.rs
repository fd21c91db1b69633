//! Integration tests for the app metadata store and the sync workflow.

mod support;

use std::sync::Arc;
use std::time::Duration;

use adscout_core::db::Database;
use adscout_core::fetch::{FetchTimeouts, PageFetcher};
use adscout_core::metadata::{AppMetadata, MetadataEndpoints, build_default_metadata_resolver};
use adscout_core::pipeline::{AppSync, SyncOptions};
use adscout_core::store::{AppRecord, MetadataStore, SqliteMetadataStore};
use adscout_core::target::{Store, classify};
use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn open_store(dir: &TempDir) -> (Database, Arc<SqliteMetadataStore>) {
    let db = Database::new(&dir.path().join("nested").join("apps.db"))
        .await
        .expect("failed to open database");
    let store = Arc::new(SqliteMetadataStore::new(db.clone()));
    (db, store)
}

fn sync_over(mock_server: &MockServer, store: Arc<SqliteMetadataStore>, options: SyncOptions) -> AppSync {
    let fetcher = Arc::new(PageFetcher::new(FetchTimeouts::store()).unwrap());
    let resolver = Arc::new(build_default_metadata_resolver(
        fetcher,
        &MetadataEndpoints::single_base(&mock_server.uri()),
    ));
    AppSync::new(resolver, store, options).unwrap()
}

fn absent_record(target: &str, notes: &str) -> AppRecord {
    AppRecord::from_metadata(&classify(target), &AppMetadata::absent(notes)).unwrap()
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    assert!(db.is_wal_enabled().await.unwrap());

    let record = absent_record("com.gone.app", "App not found(404).");
    store.put(&record).await.unwrap();
    db.close().await;

    let (_db, store) = open_store(&dir).await;
    let stored = store.get("com.gone.app").await.unwrap().unwrap();
    assert_eq!(stored.store(), Some(Store::PlayStore));
    assert_eq!(stored.country.as_deref(), Some("us"));
    assert_eq!(stored.language.as_deref(), Some("en"));
    assert_eq!(stored.notes.as_deref(), Some("App not found(404)."));
}

#[tokio::test]
async fn test_sync_stores_found_and_missing_apps() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/lookup"))
        .and(query_param("id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"resultCount":1,"results":[{"trackName":"One","sellerUrl":"https://one.dev/x"}]}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lookup"))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"resultCount":0,"results":[]}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_db, store) = open_store(&dir).await;
    let sync = sync_over(&mock_server, store.clone(), SyncOptions::default());

    let stats = sync
        .run(
            &lines(&["1", "2", "https://example.com", "nonsense!"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(stats.stored(), 1);
    assert_eq!(stats.not_found(), 1);
    assert_eq!(stats.skipped(), 2);
    assert_eq!(stats.failed(), 0);

    let one = store.get("1").await.unwrap().unwrap();
    assert_eq!(one.app_name.as_deref(), Some("One"));
    assert_eq!(one.app_domain.as_deref(), Some("https://one.dev"));
    let two = store.get("2").await.unwrap().unwrap();
    assert_eq!(two.notes.as_deref(), Some("No app found with ID 2"));
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_sync_skips_stored_apps_but_rechecks_unparseable() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/lookup"))
        .and(query_param("id", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"resultCount":1,"results":[{"trackName":"Twenty","sellerUrl":"https://twenty.dev"}]}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lookup"))
        .and(query_param("id", "10"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_db, store) = open_store(&dir).await;
    store
        .put(&absent_record("10", "No app found with ID 10"))
        .await
        .unwrap();
    store
        .put(&absent_record("20", "Could not parse app store response for ID 20"))
        .await
        .unwrap();

    let sync = sync_over(&mock_server, store.clone(), SyncOptions::default());
    let stats = sync
        .run(&lines(&["10", "20"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.skipped(), 1);
    assert_eq!(stats.stored(), 1);
    let twenty = store.get("20").await.unwrap().unwrap();
    assert_eq!(twenty.app_name.as_deref(), Some("Twenty"));
    assert!(twenty.notes.is_none());
}

#[tokio::test]
async fn test_sync_force_refetches_and_only_new_wins() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"resultCount":1,"results":[{"trackName":"Renamed","sellerUrl":"https://five.dev"}]}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_db, store) = open_store(&dir).await;
    store
        .put(&absent_record("5", "No app found with ID 5"))
        .await
        .unwrap();

    let only_new = SyncOptions {
        force: true,
        only_new_apps: true,
        ..SyncOptions::default()
    };
    let stats = sync_over(&mock_server, store.clone(), only_new)
        .run(&lines(&["5"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stats.skipped(), 1);

    let forced = SyncOptions {
        force: true,
        ..SyncOptions::default()
    };
    let stats = sync_over(&mock_server, store.clone(), forced)
        .run(&lines(&["5"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stats.stored(), 1);
    assert_eq!(
        store.get("5").await.unwrap().unwrap().app_name.as_deref(),
        Some("Renamed")
    );
}

#[tokio::test]
async fn test_sync_store_outage_writes_nothing() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_db, store) = open_store(&dir).await;
    let stats = sync_over(&mock_server, store.clone(), SyncOptions::default())
        .run(&lines(&["com.down.app"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.failed(), 1);
    assert!(store.get("com.down.app").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sync_cancel_abandons_in_flight_lookups() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/lookup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"resultCount":1,"results":[{"trackName":"Slow","sellerUrl":"https://slow.dev"}]}"#)
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (_db, store) = open_store(&dir).await;
    let sync = sync_over(&mock_server, store.clone(), SyncOptions::default());
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let stats = tokio::time::timeout(Duration::from_secs(1), sync.run(&lines(&["11", "12"]), &token))
        .await
        .expect("cancelled sync must not wait for lookups")
        .unwrap();

    assert_eq!(stats.cancelled(), 2);
    assert_eq!(stats.stored(), 0);
    assert!(store.get("11").await.unwrap().is_none());
    assert!(store.get("12").await.unwrap().is_none());
}
