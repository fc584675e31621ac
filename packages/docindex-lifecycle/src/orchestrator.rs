//! Batch driver over many lifecycle managers
//!
//! Managers are split into groups of `group_size` (default 2, or the
//! config's `group_size`) with [`chunkify`]. Each group runs as its own Tokio
//! task, and managers inside a group run one after another in registration
//! order. A larger `group_size` therefore means fewer, longer groups and
//! less concurrency.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::{LifecycleConfig, DEFAULT_GROUP_SIZE};
use crate::envelope::{elapsed_ms, Envelope};
use crate::error::LifecycleError;
use crate::manager::IndexLifecycleManager;
use crate::migration::{MigrationCode, MigrationResult};

/// Aggregate of one orchestrator call
#[derive(Debug)]
pub struct BatchOutcome<R, S> {
    /// Every manager succeeded and no group aborted
    pub success: bool,
    pub took_ms: u64,
    /// Per-manager results in completion order
    pub report: Vec<R>,
    /// alias_name -> outcome
    pub summary: BTreeMap<String, S>,
    /// Set when one or more groups aborted
    pub error: Option<LifecycleError>,
}

pub type MigrationBatch = BatchOutcome<MigrationResult, MigrationCode>;
pub type StatusBatch = BatchOutcome<Envelope<bool>, Option<bool>>;

/// Split `items` into consecutive groups of at most `size`; a size of 0 is
/// treated as 1
pub fn chunkify<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

pub struct MigrationOrchestrator {
    managers: Vec<Arc<IndexLifecycleManager>>,
    group_size: usize,
}

impl Default for MigrationOrchestrator {
    fn default() -> Self {
        Self {
            managers: Vec::new(),
            group_size: DEFAULT_GROUP_SIZE,
        }
    }
}

impl MigrationOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orchestrator grouping managers by the config's `group_size`
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self::new().with_group_size(config.group_size)
    }

    /// Managers per group; 0 is treated as 1
    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size.max(1);
        self
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn register(&mut self, manager: IndexLifecycleManager) {
        self.managers.push(Arc::new(manager));
    }

    pub fn register_all(&mut self, managers: impl IntoIterator<Item = IndexLifecycleManager>) {
        self.managers.extend(managers.into_iter().map(Arc::new));
    }

    pub fn managers(&self) -> &[Arc<IndexLifecycleManager>] {
        &self.managers
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Run `migrate_if_needed` on every registered manager
    pub async fn migrate_if_needed(&self) -> MigrationBatch {
        let outcome = self
            .run_groups(
                "migrate",
                |manager| async move { manager.migrate_if_needed().await },
                |result: &MigrationResult| (result.success, result.code),
            )
            .await;

        for (alias, code) in &outcome.summary {
            info!("  {} -> {}", alias, code);
        }
        outcome
    }

    /// Existence of every registered manager's full index name
    pub async fn get_status(&self) -> StatusBatch {
        self.run_groups(
            "status",
            |manager| async move { manager.exists().await },
            envelope_outcome,
        )
        .await
    }

    /// Drop every registered manager's index
    pub async fn drop_all(&self) -> StatusBatch {
        self.run_groups(
            "drop",
            |manager| async move { manager.drop_index().await },
            envelope_outcome,
        )
        .await
    }

    async fn run_groups<R, S, F, Fut, O>(
        &self,
        operation: &'static str,
        call: F,
        outcome_of: O,
    ) -> BatchOutcome<R, S>
    where
        R: Send + 'static,
        O: Fn(&R) -> (bool, S),
        F: Fn(Arc<IndexLifecycleManager>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let started = Instant::now();
        let groups = chunkify(&self.managers, self.group_size);
        info!(
            "Orchestrator {}: {} managers in {} groups",
            operation,
            self.managers.len(),
            groups.len()
        );

        // Shared so a group that aborts part-way keeps what it finished
        let completed: Arc<Mutex<Vec<(String, R)>>> = Arc::new(Mutex::new(Vec::new()));

        let mut tasks = Vec::with_capacity(groups.len());
        for group in groups {
            let completed = completed.clone();
            let call = call.clone();
            tasks.push(tokio::spawn(async move {
                for manager in group {
                    let alias = manager.alias_name();
                    let result = call(manager).await;
                    completed.lock().push((alias, result));
                }
            }));
        }

        let mut aborted = Vec::new();
        for (i, joined) in futures::future::join_all(tasks).await.into_iter().enumerate() {
            if let Err(join_err) = joined {
                error!("Orchestrator {}: group {} aborted: {}", operation, i, join_err);
                aborted.push(format!("group {}: {}", i, join_err));
            }
        }

        let completed = std::mem::take(&mut *completed.lock());
        let mut success = aborted.is_empty();
        let mut report = Vec::with_capacity(completed.len());
        let mut summary = BTreeMap::new();
        for (alias, result) in completed {
            let (ok, outcome) = outcome_of(&result);
            success &= ok;
            summary.insert(alias, outcome);
            report.push(result);
        }

        let took_ms = elapsed_ms(started);
        if success {
            info!(
                "Orchestrator {} finished: {} results in {}ms",
                operation,
                report.len(),
                took_ms
            );
        } else {
            warn!(
                "Orchestrator {} finished with failures: {} results, {} aborted groups in {}ms",
                operation,
                report.len(),
                aborted.len(),
                took_ms
            );
        }

        BatchOutcome {
            success,
            took_ms,
            report,
            summary,
            error: (!aborted.is_empty()).then(|| LifecycleError::GroupAborted(aborted.join("; "))),
        }
    }
}

fn envelope_outcome(envelope: &Envelope<bool>) -> (bool, Option<bool>) {
    (envelope.is_ok(), envelope.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::IndexDescriptor;
    use crate::mapping::StaticMapping;
    use docindex_store::InMemoryStoreClient;

    #[test]
    fn test_chunkify() {
        let items: Vec<i32> = (1..=7).collect();
        assert_eq!(
            chunkify(&items, 3),
            vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]
        );
        assert_eq!(chunkify(&items, 7), vec![items.clone()]);
        assert_eq!(chunkify(&items, 10), vec![items.clone()]);
        assert!(chunkify::<i32>(&[], 3).is_empty());
    }

    #[test]
    fn test_chunkify_zero_size_means_singletons() {
        assert_eq!(chunkify(&[1, 2], 0), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_register() {
        let store = Arc::new(InMemoryStoreClient::new());
        let manager = |name: &str| {
            IndexLifecycleManager::new(
                IndexDescriptor::new("t", "en", name, 1).unwrap(),
                store.clone(),
                Arc::new(StaticMapping::default()),
            )
        };

        let mut orchestrator = MigrationOrchestrator::new();
        assert!(orchestrator.is_empty());
        orchestrator.register(manager("books"));
        orchestrator.register_all([manager("authors"), manager("reviews")]);

        assert_eq!(orchestrator.len(), 3);
        assert_eq!(orchestrator.managers()[2].alias_name(), "t-en-reviews");
    }

    #[test]
    fn test_group_size_from_config() {
        assert_eq!(MigrationOrchestrator::new().group_size(), 2);

        let config = LifecycleConfig::from_yaml_str("group_size: 5").unwrap();
        assert_eq!(MigrationOrchestrator::from_config(&config).group_size(), 5);
        assert_eq!(MigrationOrchestrator::new().with_group_size(0).group_size(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_succeeds() {
        let outcome = MigrationOrchestrator::new().migrate_if_needed().await;
        assert!(outcome.success);
        assert!(outcome.report.is_empty());
        assert!(outcome.summary.is_empty());
        assert!(outcome.error.is_none());
    }
}
