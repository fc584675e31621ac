//! In-Memory Store Client
//!
//! HashMap-based document store with the semantics the lifecycle manager
//! relies on: per-index sequence numbers, write blocks, alias bindings and
//! all-or-nothing alias updates.
//!
//! It also carries test instrumentation: one-shot fault injection, one-shot
//! hooks run before an operation, an operation log and optional latency.
//! NOT for production use.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::{
    Ack, AliasAction, ConflictPolicy, Document, IndexSettings, MappingDefinition, Refresh,
    ReindexSummary, StoreClient,
};
use crate::{Result, StoreError};

/// Operations of the [`StoreClient`] port, used to target instrumentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    IndexExists,
    CreateIndex,
    DeleteIndex,
    SetWriteBlocked,
    GetAliasTarget,
    PutAlias,
    DeleteAlias,
    UpdateAliases,
    SequenceWatermark,
    Reindex,
    SearchBySequenceAbove,
    BulkUpsert,
}

type Hook = Box<dyn FnOnce(&InMemoryStoreClient) + Send>;

struct IndexState {
    mapping: MappingDefinition,
    settings: IndexSettings,
    docs: BTreeMap<String, Document>,
    max_seq_no: i64,
    write_blocked: bool,
}

impl IndexState {
    fn new(mapping: MappingDefinition, settings: IndexSettings) -> Self {
        Self {
            mapping,
            settings,
            docs: BTreeMap::new(),
            max_seq_no: -1,
            write_blocked: false,
        }
    }

    fn write(&mut self, id: &str, source: serde_json::Value) -> i64 {
        self.max_seq_no += 1;
        let seq_no = self.max_seq_no;
        self.docs.insert(
            id.to_string(),
            Document {
                id: id.to_string(),
                seq_no,
                source,
            },
        );
        seq_no
    }
}

#[derive(Default)]
struct Cluster {
    indices: HashMap<String, IndexState>,
    aliases: BTreeMap<String, BTreeSet<String>>,
}

impl Cluster {
    /// Resolve an index or single-index alias to a concrete index name
    fn resolve(&self, target: &str) -> Result<String> {
        if self.indices.contains_key(target) {
            return Ok(target.to_string());
        }
        match self.aliases.get(target) {
            Some(bound) if bound.len() == 1 => Ok(bound.iter().next().cloned().unwrap_or_default()),
            Some(_) => Err(StoreError::response(
                400,
                format!("alias [{}] has more than one index associated with it", target),
            )),
            None => Err(StoreError::not_found(target)),
        }
    }

    fn index(&self, target: &str) -> Result<&IndexState> {
        let name = self.resolve(target)?;
        self.indices
            .get(&name)
            .ok_or_else(|| StoreError::not_found(name))
    }

    fn writable(&mut self, target: &str) -> Result<&mut IndexState> {
        let name = self.resolve(target)?;
        let index = self
            .indices
            .get_mut(&name)
            .ok_or_else(|| StoreError::not_found(name.clone()))?;
        if index.write_blocked {
            return Err(StoreError::response(
                403,
                format!("index [{}] blocked by: [FORBIDDEN/8/index write (api)]", name),
            ));
        }
        Ok(index)
    }

    fn unbind_index(&mut self, index: &str) {
        for bound in self.aliases.values_mut() {
            bound.remove(index);
        }
        self.aliases.retain(|_, bound| !bound.is_empty());
    }
}

fn apply_alias_action(
    indices: &HashMap<String, IndexState>,
    aliases: &mut BTreeMap<String, BTreeSet<String>>,
    action: &AliasAction,
) -> Result<()> {
    match action {
        AliasAction::Add { index, alias } => {
            if !indices.contains_key(index) {
                return Err(StoreError::not_found(index.as_str()));
            }
            if indices.contains_key(alias) {
                return Err(StoreError::response(
                    400,
                    format!("an index exists with the same name as the alias [{}]", alias),
                ));
            }
            aliases
                .entry(alias.clone())
                .or_default()
                .insert(index.clone());
            Ok(())
        }
        AliasAction::Remove { index, alias } => {
            let removed = aliases
                .get_mut(alias)
                .map(|bound| bound.remove(index))
                .unwrap_or(false);
            if !removed {
                return Err(StoreError::response(
                    404,
                    format!("aliases [{}] missing on index [{}]", alias, index),
                ));
            }
            aliases.retain(|_, bound| !bound.is_empty());
            Ok(())
        }
    }
}

#[derive(Default)]
struct Instrumentation {
    faults: HashMap<StoreOp, VecDeque<StoreError>>,
    hooks: HashMap<StoreOp, VecDeque<Hook>>,
    log: Vec<StoreOp>,
}

/// In-process document store
///
/// Clones share the same state.
#[derive(Clone)]
pub struct InMemoryStoreClient {
    cluster: Arc<RwLock<Cluster>>,
    instrumentation: Arc<Mutex<Instrumentation>>,
    latency: Option<Duration>,
}

impl InMemoryStoreClient {
    pub fn new() -> Self {
        Self {
            cluster: Arc::new(RwLock::new(Cluster::default())),
            instrumentation: Arc::new(Mutex::new(Instrumentation::default())),
            latency: None,
        }
    }

    /// Handle over the same state that sleeps `latency` before every call
    pub fn with_latency(&self, latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..self.clone()
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Instrumentation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.instrumentation
            .lock()
            .faults
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Run `hook` right before the next call of `op` is applied
    pub fn before_next<F>(&self, op: StoreOp, hook: F)
    where
        F: FnOnce(&InMemoryStoreClient) + Send + 'static,
    {
        self.instrumentation
            .lock()
            .hooks
            .entry(op)
            .or_default()
            .push_back(Box::new(hook));
    }

    /// Every port operation called so far, in call order
    pub fn operations(&self) -> Vec<StoreOp> {
        self.instrumentation.lock().log.clone()
    }

    async fn intercept(&self, op: StoreOp) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let hook = {
            let mut inst = self.instrumentation.lock();
            inst.log.push(op);
            inst.hooks.get_mut(&op).and_then(VecDeque::pop_front)
        };
        if let Some(hook) = hook {
            hook(self);
        }

        let fault = self
            .instrumentation
            .lock()
            .faults
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Direct data access (outside the port)
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Index a single document through an index or alias name
    ///
    /// Returns the assigned sequence number.
    pub fn index_document(
        &self,
        target: &str,
        id: &str,
        source: serde_json::Value,
    ) -> Result<i64> {
        let mut cluster = self.cluster.write();
        Ok(cluster.writable(target)?.write(id, source))
    }

    pub fn get_document(&self, target: &str, id: &str) -> Result<Option<Document>> {
        let cluster = self.cluster.read();
        Ok(cluster.index(target)?.docs.get(id).cloned())
    }

    pub fn document_count(&self, target: &str) -> Result<usize> {
        let cluster = self.cluster.read();
        Ok(cluster.index(target)?.docs.len())
    }

    pub fn is_write_blocked(&self, name: &str) -> Result<bool> {
        let cluster = self.cluster.read();
        Ok(cluster.index(name)?.write_blocked)
    }

    pub fn mapping_of(&self, name: &str) -> Result<MappingDefinition> {
        let cluster = self.cluster.read();
        Ok(cluster.index(name)?.mapping.clone())
    }

    pub fn settings_of(&self, name: &str) -> Result<IndexSettings> {
        let cluster = self.cluster.read();
        Ok(cluster.index(name)?.settings.clone())
    }

    /// All index names, sorted
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cluster.read().indices.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for InMemoryStoreClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreClient for InMemoryStoreClient {
    async fn index_exists(&self, name: &str) -> Result<bool> {
        self.intercept(StoreOp::IndexExists).await?;
        Ok(self.cluster.read().indices.contains_key(name))
    }

    async fn create_index(
        &self,
        name: &str,
        mapping: &MappingDefinition,
        settings: &IndexSettings,
    ) -> Result<Ack> {
        self.intercept(StoreOp::CreateIndex).await?;
        let mut cluster = self.cluster.write();
        if cluster.indices.contains_key(name) {
            return Err(StoreError::response(
                400,
                format!("index [{}] already exists", name),
            ));
        }
        if cluster.aliases.contains_key(name) {
            return Err(StoreError::response(
                400,
                format!("[{}] already exists as alias", name),
            ));
        }
        cluster.indices.insert(
            name.to_string(),
            IndexState::new(mapping.clone(), settings.clone()),
        );
        Ok(Ack::YES)
    }

    async fn delete_index(&self, name: &str) -> Result<Ack> {
        self.intercept(StoreOp::DeleteIndex).await?;
        let mut cluster = self.cluster.write();
        if cluster.indices.remove(name).is_none() {
            return Err(StoreError::not_found(name));
        }
        cluster.unbind_index(name);
        Ok(Ack::YES)
    }

    async fn set_write_blocked(&self, name: &str, blocked: bool) -> Result<Ack> {
        self.intercept(StoreOp::SetWriteBlocked).await?;
        let mut cluster = self.cluster.write();
        let index = cluster
            .indices
            .get_mut(name)
            .ok_or_else(|| StoreError::not_found(name))?;
        index.write_blocked = blocked;
        Ok(Ack::YES)
    }

    async fn get_alias_target(&self, alias: &str) -> Result<Option<String>> {
        self.intercept(StoreOp::GetAliasTarget).await?;
        Ok(self
            .cluster
            .read()
            .aliases
            .get(alias)
            .and_then(|bound| bound.iter().next().cloned()))
    }

    async fn put_alias(&self, alias: &str, index: &str) -> Result<Ack> {
        self.intercept(StoreOp::PutAlias).await?;
        let mut guard = self.cluster.write();
        let cluster = &mut *guard;
        apply_alias_action(
            &cluster.indices,
            &mut cluster.aliases,
            &AliasAction::add(index, alias),
        )?;
        Ok(Ack::YES)
    }

    async fn delete_alias(&self, alias: &str, index: &str) -> Result<Ack> {
        self.intercept(StoreOp::DeleteAlias).await?;
        let mut guard = self.cluster.write();
        let cluster = &mut *guard;
        apply_alias_action(
            &cluster.indices,
            &mut cluster.aliases,
            &AliasAction::remove(index, alias),
        )?;
        Ok(Ack::YES)
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<Ack> {
        self.intercept(StoreOp::UpdateAliases).await?;
        let mut guard = self.cluster.write();
        let cluster = &mut *guard;

        // Staged on a copy so a failing action leaves the bindings untouched
        let mut staged = cluster.aliases.clone();
        for action in actions {
            apply_alias_action(&cluster.indices, &mut staged, action)?;
        }
        cluster.aliases = staged;
        Ok(Ack::YES)
    }

    async fn sequence_watermark(&self, name: &str) -> Result<i64> {
        self.intercept(StoreOp::SequenceWatermark).await?;
        Ok(self.cluster.read().index(name)?.max_seq_no)
    }

    async fn reindex(
        &self,
        source: &str,
        dest: &str,
        conflicts: ConflictPolicy,
    ) -> Result<ReindexSummary> {
        self.intercept(StoreOp::Reindex).await?;
        let mut cluster = self.cluster.write();
        let docs: Vec<Document> = cluster.index(source)?.docs.values().cloned().collect();
        let target = cluster.writable(dest)?;

        let clashing = docs
            .iter()
            .filter(|doc| target.docs.contains_key(&doc.id))
            .count() as u64;
        if clashing > 0 && conflicts == ConflictPolicy::Abort {
            return Err(StoreError::response(
                409,
                format!("{} version conflicts reindexing [{}] into [{}]", clashing, source, dest),
            ));
        }

        let mut summary = ReindexSummary {
            total: docs.len() as u64,
            ..Default::default()
        };
        for doc in docs {
            if target.docs.contains_key(&doc.id) {
                summary.version_conflicts += 1;
                continue;
            }
            target.write(&doc.id, doc.source);
            summary.created += 1;
        }

        debug!(
            "reindex {} -> {}: {} created, {} conflicts",
            source, dest, summary.created, summary.version_conflicts
        );
        Ok(summary)
    }

    async fn search_by_sequence_above(
        &self,
        name: &str,
        watermark: i64,
        from: usize,
        size: usize,
    ) -> Result<Vec<Document>> {
        self.intercept(StoreOp::SearchBySequenceAbove).await?;
        let cluster = self.cluster.read();
        let mut hits: Vec<&Document> = cluster
            .index(name)?
            .docs
            .values()
            .filter(|doc| doc.seq_no > watermark)
            .collect();
        hits.sort_by_key(|doc| doc.seq_no);
        Ok(hits.into_iter().skip(from).take(size).cloned().collect())
    }

    async fn bulk_upsert(&self, dest: &str, rows: &[Document], _refresh: Refresh) -> Result<Ack> {
        self.intercept(StoreOp::BulkUpsert).await?;
        // Writes are visible immediately, so every refresh mode is satisfied
        let mut cluster = self.cluster.write();
        let target = cluster.writable(dest)?;
        for row in rows {
            target.write(&row.id, row.source.clone());
        }
        Ok(Ack::YES)
    }
}
