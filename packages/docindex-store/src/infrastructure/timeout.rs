//! Per-call deadline for any [`StoreClient`]
//!
//! The port itself has no timeout or cancellation: a stuck reindex or replay
//! page would otherwise block a migration indefinitely. Wrapping the client
//! bounds every call; an expired call surfaces as `ErrorKind::Timeout`.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::domain::{
    Ack, AliasAction, ConflictPolicy, Document, IndexSettings, MappingDefinition, Refresh,
    ReindexSummary, StoreClient,
};
use crate::{Result, StoreError};

pub struct TimeoutStoreClient {
    inner: Arc<dyn StoreClient>,
    timeout: Duration,
}

impl TimeoutStoreClient {
    pub fn new(inner: Arc<dyn StoreClient>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(&self, op: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {}ms", op, self.timeout.as_millis());
                Err(StoreError::timeout(format!(
                    "{} timed out after {}ms",
                    op,
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl StoreClient for TimeoutStoreClient {
    async fn index_exists(&self, name: &str) -> Result<bool> {
        self.bounded("index_exists", self.inner.index_exists(name))
            .await
    }

    async fn create_index(
        &self,
        name: &str,
        mapping: &MappingDefinition,
        settings: &IndexSettings,
    ) -> Result<Ack> {
        self.bounded(
            "create_index",
            self.inner.create_index(name, mapping, settings),
        )
        .await
    }

    async fn delete_index(&self, name: &str) -> Result<Ack> {
        self.bounded("delete_index", self.inner.delete_index(name))
            .await
    }

    async fn set_write_blocked(&self, name: &str, blocked: bool) -> Result<Ack> {
        self.bounded(
            "set_write_blocked",
            self.inner.set_write_blocked(name, blocked),
        )
        .await
    }

    async fn get_alias_target(&self, alias: &str) -> Result<Option<String>> {
        self.bounded("get_alias_target", self.inner.get_alias_target(alias))
            .await
    }

    async fn put_alias(&self, alias: &str, index: &str) -> Result<Ack> {
        self.bounded("put_alias", self.inner.put_alias(alias, index))
            .await
    }

    async fn delete_alias(&self, alias: &str, index: &str) -> Result<Ack> {
        self.bounded("delete_alias", self.inner.delete_alias(alias, index))
            .await
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<Ack> {
        self.bounded("update_aliases", self.inner.update_aliases(actions))
            .await
    }

    async fn sequence_watermark(&self, name: &str) -> Result<i64> {
        self.bounded("sequence_watermark", self.inner.sequence_watermark(name))
            .await
    }

    async fn reindex(
        &self,
        source: &str,
        dest: &str,
        conflicts: ConflictPolicy,
    ) -> Result<ReindexSummary> {
        self.bounded("reindex", self.inner.reindex(source, dest, conflicts))
            .await
    }

    async fn search_by_sequence_above(
        &self,
        name: &str,
        watermark: i64,
        from: usize,
        size: usize,
    ) -> Result<Vec<Document>> {
        self.bounded(
            "search_by_sequence_above",
            self.inner
                .search_by_sequence_above(name, watermark, from, size),
        )
        .await
    }

    async fn bulk_upsert(&self, dest: &str, rows: &[Document], refresh: Refresh) -> Result<Ack> {
        self.bounded("bulk_upsert", self.inner.bulk_upsert(dest, rows, refresh))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryStoreClient;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_fast_calls_pass_through() {
        let store = InMemoryStoreClient::new();
        let bounded = TimeoutStoreClient::new(Arc::new(store), Duration::from_secs(5));

        assert!(!bounded.index_exists("books").await.unwrap());
    }

    #[tokio::test]
    async fn test_slow_calls_are_classified_as_timeout() {
        let slow = InMemoryStoreClient::new().with_latency(Duration::from_millis(500));
        let bounded = TimeoutStoreClient::new(Arc::new(slow), Duration::from_millis(20));

        let err = bounded.index_exists("books").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.message.contains("index_exists"));
    }

    #[tokio::test]
    async fn test_inner_errors_are_preserved() {
        let store = InMemoryStoreClient::new();
        let bounded = TimeoutStoreClient::new(Arc::new(store), Duration::from_secs(5));

        let err = bounded.delete_index("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
