//! Store provider tests: one store, one ingestion, marker lifecycle, reinitialize

mod helpers;

use helpers::{three_people, DatasetBuilder, HeldSource};
use nutri_common::db::models::Metric;
use nutri_common::{ReadinessPublisher, ReadinessState};
use nutri_ingest::provider::StoreProvider;
use nutri_ingest::source::{DatasetSource, FileSource};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn provider(dir: &TempDir, source: Arc<dyn DatasetSource>) -> StoreProvider {
    StoreProvider::new(
        dir.path().join("nutritrack.db"),
        source,
        ReadinessPublisher::new(),
    )
}

#[tokio::test]
async fn test_first_open_ingests_and_clears_marker() {
    let dir = TempDir::new().unwrap();
    let provider = provider(&dir, three_people().source());

    let store = provider.store().await.unwrap();
    provider.join_ingestion().await;

    assert_eq!(provider.readiness().current(), ReadinessState::FullReady);
    assert!(!provider.marker().is_set());
    assert_eq!(store.records().count().await.unwrap(), 3);

    let report = provider.last_report().await.unwrap();
    assert_eq!(report.full.rows_parsed, 3);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_store() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(provider(&dir, three_people().source()));

    let (a, b) = tokio::join!(provider.store(), provider.store());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));

    provider.join_ingestion().await;
    let c = provider.store().await.unwrap();
    assert!(Arc::ptr_eq(&a, &c));
    assert_eq!(c.records().count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_reopening_initialized_store_skips_ingestion() {
    let dir = TempDir::new().unwrap();

    let first = provider(&dir, three_people().source());
    first.store().await.unwrap();
    first.join_ingestion().await;

    // A different dataset proves nothing is re-read
    let other = DatasetBuilder::new().row("42", "61400000042", "Female", 1.0, &[]);
    let second = provider(&dir, other.source());
    let store = second.store().await.unwrap();
    second.join_ingestion().await;

    assert_eq!(second.readiness().current(), ReadinessState::FullReady);
    assert!(second.last_report().await.is_none());
    assert_eq!(store.records().count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_leftover_marker_forces_ingestion() {
    let dir = TempDir::new().unwrap();

    let first = provider(&dir, three_people().source());
    first.store().await.unwrap();
    first.join_ingestion().await;

    // Simulate a crash mid-load
    first.marker().set().unwrap();

    let other = DatasetBuilder::new().row("42", "61400000042", "Female", 1.0, &[]);
    let second = provider(&dir, other.source());
    let store = second.store().await.unwrap();
    second.join_ingestion().await;

    assert!(!second.marker().is_set());
    assert_eq!(store.records().list_user_ids().await.unwrap(), vec!["42".to_string()]);
}

#[tokio::test]
async fn test_failed_ingestion_keeps_marker() {
    let dir = TempDir::new().unwrap();
    let source: Arc<dyn DatasetSource> = Arc::new(FileSource::new(dir.path().join("absent.csv")));
    let provider = provider(&dir, source);

    provider.store().await.unwrap();
    provider.join_ingestion().await;

    assert!(provider.marker().is_set());
    assert_eq!(provider.readiness().current(), ReadinessState::Uninitialized);
    assert!(provider.last_report().await.is_none());
}

#[tokio::test]
async fn test_reinitialize_reloads_dataset() {
    let dir = TempDir::new().unwrap();
    let provider = provider(&dir, three_people().source());

    let before = provider.store().await.unwrap();
    provider.join_ingestion().await;
    before
        .records()
        .replace_all(&[nutri_common::db::models::NutritionRecord::new("stale", "0", "Male")])
        .await
        .unwrap();

    assert!(provider.reinitialize().await.unwrap());
    assert_eq!(provider.readiness().current(), ReadinessState::Uninitialized);
    assert!(provider.marker().is_set());

    // Already pending: second call changes nothing
    assert!(!provider.reinitialize().await.unwrap());

    let after = provider.store().await.unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    provider.join_ingestion().await;

    assert_eq!(provider.readiness().current(), ReadinessState::FullReady);
    assert!(!provider.marker().is_set());
    assert_eq!(after.records().count().await.unwrap(), 3);
    assert!(!after.records().exists("stale").await.unwrap());
    let record = after.records().get("3").await.unwrap().unwrap();
    assert_eq!(record.metric(Metric::WaterTotalMl), Some(2600.0));
}

#[tokio::test]
async fn test_reinitialize_waits_for_in_flight_run() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(provider(&dir, three_people().source()));

    provider.store().await.unwrap();
    // No join: the run may still be in flight
    assert!(provider.reinitialize().await.unwrap());

    // The first run finished before the reset, so its report exists
    assert!(provider.last_report().await.is_some());
    assert_eq!(provider.readiness().current(), ReadinessState::Uninitialized);

    let store = provider.store().await.unwrap();
    provider.join_ingestion().await;
    assert_eq!(provider.readiness().current(), ReadinessState::FullReady);
    assert_eq!(store.records().count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_reinitialize_during_load_keeps_store_available() {
    let dir = TempDir::new().unwrap();
    let held = HeldSource::new(three_people().build());
    let provider = Arc::new(provider(&dir, held.source()));

    let loading = provider.store().await.unwrap();

    let waiting = {
        let provider = provider.clone();
        tokio::spawn(async move { provider.reinitialize().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiting.is_finished());

    // Readers still get the cached store while the reset waits for the run
    let during = tokio::time::timeout(Duration::from_secs(1), provider.store())
        .await
        .expect("store() must not wait on the in-flight run")
        .unwrap();
    assert!(Arc::ptr_eq(&loading, &during));

    // A second reset while the first is in progress collapses into it
    assert!(!provider.reinitialize().await.unwrap());

    held.release();
    assert!(waiting.await.unwrap().unwrap());
    assert!(provider.last_report().await.is_some());
    assert_eq!(provider.readiness().current(), ReadinessState::Uninitialized);

    let reloaded = provider.store().await.unwrap();
    assert!(!Arc::ptr_eq(&loading, &reloaded));
    provider.join_ingestion().await;
    assert_eq!(provider.readiness().current(), ReadinessState::FullReady);
    assert!(!provider.marker().is_set());
    assert_eq!(reloaded.records().count().await.unwrap(), 3);
}
