//! Shared fixtures for lifecycle integration tests

#![allow(dead_code)]

use docindex_lifecycle::{IndexDescriptor, IndexLifecycleManager, StaticMapping};
use docindex_store::InMemoryStoreClient;
use serde_json::json;
use std::sync::Arc;

pub const PREFIX: &str = "t";
pub const LANG: &str = "en";

/// Install a test subscriber; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn books_mapping() -> StaticMapping {
    StaticMapping::new(json!({
        "properties": {
            "title": { "type": "text" },
            "year": { "type": "integer" }
        }
    }))
}

pub fn manager(store: &InMemoryStoreClient, base_name: &str, version: u32) -> IndexLifecycleManager {
    let descriptor = IndexDescriptor::new(PREFIX, LANG, base_name, version)
        .expect("valid test descriptor");
    IndexLifecycleManager::new(descriptor, Arc::new(store.clone()), Arc::new(books_mapping()))
}

/// Index `count` books through `target` (an index or alias name)
pub fn seed_books(store: &InMemoryStoreClient, target: &str, count: usize) {
    for i in 1..=count {
        store
            .index_document(target, &i.to_string(), json!({ "title": format!("Book {}", i), "year": 2000 + i }))
            .expect("seed write");
    }
}
