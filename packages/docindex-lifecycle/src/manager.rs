//! Single-index lifecycle: existence checks, idempotent creation and the
//! versioned migration protocol.
//!
//! Every public operation reports through an envelope and never returns
//! `Err`. Internally the steps use `?` and the outcome is classified once, at
//! the operation boundary.

use docindex_store::{
    Ack, AliasAction, ConflictPolicy, IndexSettings, Refresh, StoreClient, StoreError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{LifecycleConfig, DEFAULT_REPLAY_PAGE_SIZE};
use crate::descriptor::IndexDescriptor;
use crate::envelope::{elapsed_ms, CreateCode, CreateResult, Envelope};
use crate::error::{LifecycleError, Result};
use crate::mapping::MappingProvider;
use crate::migration::{MigrationCode, MigrationProgress, MigrationResult, MigrationState};
use crate::write_block::WriteBlockGuard;

pub struct IndexLifecycleManager {
    descriptor: IndexDescriptor,
    store: Arc<dyn StoreClient>,
    mapping: Arc<dyn MappingProvider>,
    settings: IndexSettings,
    replay_page_size: usize,
}

impl IndexLifecycleManager {
    pub fn new(
        descriptor: IndexDescriptor,
        store: Arc<dyn StoreClient>,
        mapping: Arc<dyn MappingProvider>,
    ) -> Self {
        Self {
            descriptor,
            store,
            mapping,
            settings: IndexSettings::default(),
            replay_page_size: DEFAULT_REPLAY_PAGE_SIZE,
        }
    }

    /// Manager using the config's settings, replay page size and request timeout
    pub fn from_config(
        config: &LifecycleConfig,
        descriptor: IndexDescriptor,
        store: Arc<dyn StoreClient>,
        mapping: Arc<dyn MappingProvider>,
    ) -> Self {
        Self::new(descriptor, config.wrap_store(store), mapping)
            .with_settings(config.settings.clone())
            .with_replay_page_size(config.replay_page_size)
    }

    pub fn with_settings(mut self, settings: IndexSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_replay_page_size(mut self, page_size: usize) -> Self {
        self.replay_page_size = page_size.max(1);
        self
    }

    pub fn full_name(&self) -> String {
        self.descriptor.full_name()
    }

    pub fn alias_name(&self) -> String {
        self.descriptor.alias_name()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Single-step operations
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn exists(&self) -> Envelope<bool> {
        let started = Instant::now();
        let index = self.full_name();
        let request = json!({ "index": index });

        match self.store.index_exists(&index).await {
            Ok(exists) => Envelope::ok(exists, started, request, Some(json!(exists))),
            Err(err) => {
                warn!("Existence check for {} failed: {}", index, err);
                Envelope::failed(err.into(), started, request)
            }
        }
    }

    /// Whether the alias exists; a "not found" reply counts as `false`
    pub async fn alias_exists(&self) -> Envelope<bool> {
        let started = Instant::now();
        let alias = self.alias_name();
        let request = json!({ "alias": alias });

        match self.resolve_alias(&alias).await {
            Ok(target) => {
                let response = json!({ "alias": alias, "index": target });
                Envelope::ok(target.is_some(), started, request, Some(response))
            }
            Err(err) => {
                warn!("Alias lookup for {} failed: {}", alias, err);
                Envelope::failed(err.into(), started, request)
            }
        }
    }

    /// Create the index at `full_name()`; the value is the index name
    pub async fn create(&self) -> Envelope<String> {
        let started = Instant::now();
        let index = self.full_name();
        let mapping = self.mapping.to_mapping_definition();
        let request = json!({
            "index": index,
            "mappings": mapping.as_json(),
            "settings": serde_json::to_value(&self.settings).ok(),
        });

        match self.store.create_index(&index, &mapping, &self.settings).await {
            Ok(ack) => {
                info!("Created index {}", index);
                Envelope::ok(index, started, request, ack_json(ack))
            }
            Err(err) => {
                error!("Creating index {} failed: {}", index, err);
                Envelope::failed(err.into(), started, request)
            }
        }
    }

    /// Bind `alias_name()` to `full_name()`; the value is the acknowledgement
    pub async fn create_alias(&self) -> Envelope<bool> {
        let started = Instant::now();
        let (index, alias) = (self.full_name(), self.alias_name());
        let request = json!({ "index": index, "alias": alias });

        match self.store.put_alias(&alias, &index).await {
            Ok(ack) => {
                info!("Bound alias {} to {}", alias, index);
                Envelope::ok(ack.acknowledged, started, request, ack_json(ack))
            }
            Err(err) => {
                error!("Binding alias {} to {} failed: {}", alias, index, err);
                Envelope::failed(err.into(), started, request)
            }
        }
    }

    pub async fn create_if_needed(&self) -> CreateResult {
        let started = Instant::now();
        let exists = self.exists().await;

        match exists.value {
            Some(true) => created(CreateCode::AlreadyExists, started, None),
            Some(false) => {
                let create = self.create().await;
                match create.error {
                    None => created(CreateCode::Created, started, None),
                    Some(err) => created(CreateCode::Error, started, Some(err)),
                }
            }
            None => created(CreateCode::Error, started, exists.error),
        }
    }

    pub async fn create_alias_if_needed(&self) -> CreateResult {
        let started = Instant::now();
        let exists = self.alias_exists().await;

        match exists.value {
            Some(true) => created(CreateCode::AlreadyExists, started, None),
            Some(false) => {
                let bind = self.create_alias().await;
                match bind.error {
                    None => created(CreateCode::Created, started, None),
                    Some(err) => created(CreateCode::Error, started, Some(err)),
                }
            }
            None => created(CreateCode::Error, started, exists.error),
        }
    }

    /// Delete `full_name()`, unbinding the alias first when it points here
    pub async fn drop_index(&self) -> Envelope<bool> {
        let started = Instant::now();
        let (index, alias) = (self.full_name(), self.alias_name());
        let request = json!({ "index": index, "alias": alias });

        match self.try_drop_index(&index, &alias).await {
            Ok(ack) => {
                info!("Dropped index {}", index);
                Envelope::ok(ack.acknowledged, started, request, ack_json(ack))
            }
            Err(err) => {
                error!("Dropping index {} failed: {}", index, err);
                Envelope::failed(err, started, request)
            }
        }
    }

    /// Remove the alias from whichever index it currently resolves to
    pub async fn drop_alias(&self) -> Envelope<bool> {
        let started = Instant::now();
        let alias = self.alias_name();
        let request = json!({ "alias": alias });

        match self.try_drop_alias(&alias).await {
            Ok(ack) => {
                info!("Dropped alias {}", alias);
                Envelope::ok(ack.acknowledged, started, request, ack_json(ack))
            }
            Err(err) => {
                error!("Dropping alias {} failed: {}", alias, err);
                Envelope::failed(err, started, request)
            }
        }
    }

    async fn try_drop_index(&self, index: &str, alias: &str) -> Result<Ack> {
        if self.resolve_alias(alias).await?.as_deref() == Some(index) {
            self.store.delete_alias(alias, index).await?;
        }
        Ok(self.store.delete_index(index).await?)
    }

    async fn try_drop_alias(&self, alias: &str) -> Result<Ack> {
        let target = self
            .resolve_alias(alias)
            .await?
            .ok_or_else(|| StoreError::not_found(alias))?;
        Ok(self.store.delete_alias(alias, &target).await?)
    }

    async fn resolve_alias(&self, alias: &str) -> std::result::Result<Option<String>, StoreError> {
        match self.store.get_alias_target(alias).await {
            Ok(target) => Ok(target),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Migration protocol
    // ═══════════════════════════════════════════════════════════════════════

    /// Bring the alias onto `full_name()`, moving data from the index it
    /// currently resolves to
    ///
    /// Codes:
    /// - `NO_CHANGE`: the target version already exists
    /// - `CREATED_INDEX`: target created, no prior alias to migrate from
    /// - `MIGRATED`: reindexed, cut over, replayed, old index deleted
    /// - `MIGRATION_FAILED`: a step after target creation failed
    /// - `ERROR`: the existence check or the target creation failed
    ///
    /// The old index's write block is always lifted before this returns.
    ///
    /// Callers must not run two migrations of the same descriptor at once;
    /// nothing here prevents it.
    pub async fn migrate_if_needed(&self) -> MigrationResult {
        let started = Instant::now();
        let target = self.full_name();
        let mut progress = MigrationProgress::new();

        info!("Migration check for {} (alias {})", target, self.alias_name());
        let outcome = self.run_migration(&target, &mut progress).await;
        let took_ms = elapsed_ms(started);

        match outcome {
            Ok(code) => {
                info!("Migration of {} finished: {} in {}ms", target, code, took_ms);
                progress.finish(code, took_ms, None)
            }
            Err(err) => {
                let code = if progress.target_created() {
                    MigrationCode::MigrationFailed
                } else {
                    MigrationCode::Error
                };
                error!(
                    "Migration of {} failed after {:?}: {} ({})",
                    target,
                    progress.states.last(),
                    err,
                    code
                );
                progress.finish(code, took_ms, Some(err))
            }
        }
    }

    async fn run_migration(
        &self,
        target: &str,
        progress: &mut MigrationProgress,
    ) -> Result<MigrationCode> {
        if self.store.index_exists(target).await? {
            progress.enter(MigrationState::TargetExists);
            return Ok(MigrationCode::NoChange);
        }
        progress.enter(MigrationState::TargetMissing);

        let mapping = self.mapping.to_mapping_definition();
        self.store
            .create_index(target, &mapping, &self.settings)
            .await?;
        progress.new_name = Some(target.to_string());
        progress.enter(MigrationState::CreatedTarget);

        let alias = self.alias_name();
        let old = match self.resolve_alias(&alias).await? {
            Some(old) if old != target => old,
            _ => {
                self.store.put_alias(&alias, target).await?;
                progress.enter(MigrationState::NoPriorAlias);
                return Ok(MigrationCode::CreatedIndex);
            }
        };
        progress.old_name = Some(old.clone());
        progress.enter(MigrationState::PriorAliasFound);

        let watermark = self.store.sequence_watermark(&old).await?;
        let reindexed = self
            .store
            .reindex(&old, target, ConflictPolicy::Proceed)
            .await?;
        info!(
            "Reindexed {} -> {}: {} created, {} conflicts skipped (watermark {})",
            old, target, reindexed.created, reindexed.version_conflicts, watermark
        );
        progress.enter(MigrationState::Reindexed);

        let guard = WriteBlockGuard::acquire(self.store.clone(), &old).await?;
        let quiesced = self
            .cutover_and_replay(&alias, &old, target, watermark, progress)
            .await;
        let released = guard.release().await;
        quiesced?;
        released?;

        self.store.delete_index(&old).await?;
        progress.enter(MigrationState::OldDeleted);
        Ok(MigrationCode::Migrated)
    }

    /// Steps run while the old index is write-blocked
    async fn cutover_and_replay(
        &self,
        alias: &str,
        old: &str,
        target: &str,
        watermark: i64,
        progress: &mut MigrationProgress,
    ) -> Result<()> {
        self.store
            .update_aliases(&[
                AliasAction::remove(old, alias),
                AliasAction::add(target, alias),
            ])
            .await?;
        info!("Alias {} cut over from {} to {}", alias, old, target);
        progress.enter(MigrationState::Cutover);

        let replayed = self.replay(old, target, watermark).await?;
        info!("Replayed {} late writes from {} into {}", replayed, old, target);
        progress.enter(MigrationState::Replayed);
        Ok(())
    }

    /// Copy documents written to `old` after `watermark`, page by page
    async fn replay(&self, old: &str, target: &str, watermark: i64) -> Result<usize> {
        let page_size = self.replay_page_size;
        let mut from = 0;
        let mut replayed = 0;

        loop {
            let rows = self
                .store
                .search_by_sequence_above(old, watermark, from, page_size)
                .await?;
            if !rows.is_empty() {
                self.store
                    .bulk_upsert(target, &rows, Refresh::WaitFor)
                    .await?;
                replayed += rows.len();
                debug!("Replay page at offset {}: {} rows", from, rows.len());
            }
            if rows.len() < page_size {
                break;
            }
            from += page_size;
        }

        Ok(replayed)
    }
}

fn created(
    code: CreateCode,
    started: Instant,
    error: Option<LifecycleError>,
) -> CreateResult {
    CreateResult {
        code,
        took_ms: elapsed_ms(started),
        error,
    }
}

fn ack_json(ack: Ack) -> Option<serde_json::Value> {
    serde_json::to_value(ack).ok()
}
