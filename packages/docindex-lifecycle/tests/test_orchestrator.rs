//! Integration tests for batch migration across many indices

mod common;

use common::{init_tracing, manager, seed_books};
use docindex_lifecycle::{
    IndexDescriptor, IndexLifecycleManager, LifecycleConfig, LifecycleError, MigrationCode,
    MigrationOrchestrator,
};
use docindex_store::{InMemoryStoreClient, MappingDefinition, StoreClient, StoreError, StoreOp};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn panicking_manager(store: &InMemoryStoreClient, base_name: &str) -> IndexLifecycleManager {
    let mapping = || -> MappingDefinition { panic!("mapping source unavailable") };
    IndexLifecycleManager::new(
        IndexDescriptor::new("t", "en", base_name, 1).unwrap(),
        Arc::new(store.clone()),
        Arc::new(mapping),
    )
}

#[tokio::test]
async fn test_two_fresh_descriptors_are_created() {
    init_tracing();
    let store = InMemoryStoreClient::new();
    let config = LifecycleConfig::from_yaml_str("prefix: t\ngroup_size: 2").unwrap();
    let mut orchestrator = MigrationOrchestrator::from_config(&config);
    orchestrator.register_all([manager(&store, "books", 1), manager(&store, "authors", 1)]);

    let outcome = orchestrator.migrate_if_needed().await;

    assert!(outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.report.len(), 2);
    assert_eq!(outcome.summary.len(), 2);
    assert_eq!(outcome.summary["t-en-books"], MigrationCode::CreatedIndex);
    assert_eq!(outcome.summary["t-en-authors"], MigrationCode::CreatedIndex);
}

#[tokio::test]
async fn test_batch_version_bump_migrates_every_index() {
    let store = InMemoryStoreClient::new();
    let names = ["books", "authors", "reviews"];

    let mut v1 = MigrationOrchestrator::new().with_group_size(1);
    v1.register_all(names.iter().map(|name| manager(&store, name, 1)));
    assert!(v1.migrate_if_needed().await.success);
    for name in names {
        seed_books(&store, &format!("t-en-{}", name), 2);
    }

    let mut v2 = MigrationOrchestrator::new().with_group_size(1);
    v2.register_all(names.iter().map(|name| manager(&store, name, 2)));
    let outcome = v2.migrate_if_needed().await;

    assert!(outcome.success);
    assert!(outcome
        .summary
        .values()
        .all(|code| *code == MigrationCode::Migrated));
    for name in names {
        let alias = format!("t-en-{}", name);
        assert_eq!(
            store.get_alias_target(&alias).await.unwrap(),
            Some(format!("{}-v2", alias))
        );
        assert_eq!(store.document_count(&alias).unwrap(), 2);
    }
    assert_eq!(store.index_names().len(), 3);
}

#[tokio::test]
async fn test_failed_manager_marks_batch_unsuccessful() {
    let store = InMemoryStoreClient::new();
    let mut orchestrator = MigrationOrchestrator::new();
    orchestrator.register_all([manager(&store, "books", 1), manager(&store, "authors", 1)]);

    // One group, so the first manager in registration order takes the fault
    store.fail_next(StoreOp::IndexExists, StoreError::connection("refused"));
    let outcome = orchestrator.migrate_if_needed().await;

    assert!(!outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.summary["t-en-books"], MigrationCode::Error);
    assert_eq!(outcome.summary["t-en-authors"], MigrationCode::CreatedIndex);
    assert_eq!(outcome.report[0].code, MigrationCode::Error);
}

#[tokio::test]
async fn test_aborted_group_keeps_partial_report() {
    init_tracing();
    let store = InMemoryStoreClient::new();
    let mut orchestrator = MigrationOrchestrator::new();
    orchestrator.register(manager(&store, "books", 1));
    orchestrator.register(panicking_manager(&store, "authors"));
    orchestrator.register(manager(&store, "reviews", 1));

    // Groups: [books, authors] and [reviews]
    let outcome = orchestrator.migrate_if_needed().await;

    assert!(!outcome.success);
    assert!(matches!(outcome.error, Some(LifecycleError::GroupAborted(_))));
    assert_eq!(outcome.report.len(), 2);
    assert_eq!(outcome.summary["t-en-books"], MigrationCode::CreatedIndex);
    assert_eq!(outcome.summary["t-en-reviews"], MigrationCode::CreatedIndex);
    assert!(!outcome.summary.contains_key("t-en-authors"));
}

#[tokio::test]
async fn test_status_and_drop_all() {
    let store = InMemoryStoreClient::new();
    let mut orchestrator = MigrationOrchestrator::new().with_group_size(1);
    orchestrator.register_all([manager(&store, "books", 1), manager(&store, "authors", 1)]);

    let before = orchestrator.get_status().await;
    assert!(before.success);
    assert!(before.summary.values().all(|exists| *exists == Some(false)));

    orchestrator.migrate_if_needed().await;
    let after = orchestrator.get_status().await;
    assert!(after.summary.values().all(|exists| *exists == Some(true)));

    let dropped = orchestrator.drop_all().await;
    assert!(dropped.success);
    assert_eq!(dropped.report.len(), 2);
    assert!(store.index_names().is_empty());
    assert_eq!(store.get_alias_target("t-en-books").await.unwrap(), None);

    // Dropping again fails per index but still reports every manager
    let again = orchestrator.drop_all().await;
    assert!(!again.success);
    assert!(again.error.is_none());
    assert!(again.summary.values().all(|acked| acked.is_none()));
}

/// Bootstrap `names` through a store adding `latency` to every call; returns
/// the new index names in completion order and the wall-clock time
async fn timed_bootstrap(
    names: &[&str],
    group_size: usize,
    latency: Duration,
) -> (Vec<Option<String>>, Duration) {
    let slow = InMemoryStoreClient::new().with_latency(latency);
    let mut orchestrator = MigrationOrchestrator::new().with_group_size(group_size);
    orchestrator.register_all(names.iter().map(|name| manager(&slow, name, 1)));

    let started = Instant::now();
    let outcome = orchestrator.migrate_if_needed().await;
    let elapsed = started.elapsed();

    assert!(outcome.success);
    let order = outcome.report.into_iter().map(|r| r.new_name).collect();
    (order, elapsed)
}

#[tokio::test]
async fn test_groups_run_concurrently_and_members_in_order() {
    // A fresh bootstrap makes 4 store calls: exists, create, alias lookup, bind
    let latency = Duration::from_millis(30);
    let per_manager = latency * 4;
    let names = ["aa", "bb", "cc", "dd"];

    // One group: strictly sequential, in registration order
    let (order, sequential) = timed_bootstrap(&names, 4, latency).await;
    assert_eq!(
        order,
        vec![
            Some("t-en-aa-v1".to_string()),
            Some("t-en-bb-v1".to_string()),
            Some("t-en-cc-v1".to_string()),
            Some("t-en-dd-v1".to_string()),
        ]
    );
    assert!(sequential >= per_manager * 4, "{:?}", sequential);

    // Two groups [aa, bb] and [cc, dd]: concurrent across, ordered within
    let (order, paired) = timed_bootstrap(&names, 2, latency).await;
    let position = |name: &str| {
        order
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .unwrap()
    };
    assert!(position("t-en-aa-v1") < position("t-en-bb-v1"));
    assert!(position("t-en-cc-v1") < position("t-en-dd-v1"));
    assert!(paired >= per_manager * 2, "{:?}", paired);
    assert!(paired < sequential, "{:?} vs {:?}", paired, sequential);

    // Singleton groups all run at once
    let (_, parallel) = timed_bootstrap(&names, 1, latency).await;
    assert!(parallel < per_manager * 3, "{:?}", parallel);
}
