//! Domain layer for the document store
//!
//! # Domain Models
//!
//! - `Document`: a stored document with its per-index sequence number
//! - `MappingDefinition`: opaque mapping body handed to `create_index`
//! - `IndexSettings`: settings applied at index creation
//! - `AliasAction`: one half of an atomic alias rebinding
//!
//! # Port Trait
//!
//! - `StoreClient`: administrative and data API of the document store
//!
//! # Examples
//!
//! ```rust,ignore
//! use docindex_store::{AliasAction, StoreClient};
//!
//! async fn cutover(store: &dyn StoreClient) -> docindex_store::Result<()> {
//!     store
//!         .update_aliases(&[
//!             AliasAction::remove("t-en-books-v1", "t-en-books"),
//!             AliasAction::add("t-en-books-v2", "t-en-books"),
//!         ])
//!         .await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// A stored document
///
/// `seq_no` is assigned by the index on every write and grows monotonically
/// within one index. It is what the migration watermark is compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub seq_no: i64,
    pub source: serde_json::Value,
}

/// Mapping body produced by a mapping provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingDefinition(pub serde_json::Value);

impl MappingDefinition {
    pub fn new(body: serde_json::Value) -> Self {
        Self(body)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Index settings applied at creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    /// Anything else (analysis chains, refresh interval...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 1,
            extra: serde_json::Map::new(),
        }
    }
}

/// One action of an atomic alias update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Add {
            index: index.into(),
            alias: alias.into(),
        }
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Remove {
            index: index.into(),
            alias: alias.into(),
        }
    }
}

/// What a reindex does when a document already exists in the destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Skip the conflicting document and keep going
    #[default]
    Proceed,
    /// Fail the whole reindex
    Abort,
}

/// Visibility requirement for a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refresh {
    /// Return only once the write is visible to search
    WaitFor,
    #[default]
    None,
}

/// Acknowledgement of an administrative call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub acknowledged: bool,
}

impl Ack {
    pub const YES: Ack = Ack { acknowledged: true };
}

/// Outcome of a completed reindex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexSummary {
    pub total: u64,
    pub created: u64,
    pub version_conflicts: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait: StoreClient
// ═══════════════════════════════════════════════════════════════════════════

/// Document store abstraction consumed by the lifecycle manager
///
/// # Core Operations
///
/// 1. **Index Management**: `index_exists`, `create_index`, `delete_index`,
///    `set_write_blocked`
/// 2. **Alias Management**: `get_alias_target`, `put_alias`, `delete_alias`,
///    `update_aliases`
/// 3. **Data Movement**: `sequence_watermark`, `reindex`,
///    `search_by_sequence_above`, `bulk_upsert`
///
/// # Implementations
///
/// - `InMemoryStoreClient`: in-process store for tests and local runs
/// - `TimeoutStoreClient`: decorator adding a per-call deadline
#[async_trait]
pub trait StoreClient: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // Index Operations
    // ═══════════════════════════════════════════════════════════════════════

    async fn index_exists(&self, name: &str) -> Result<bool>;

    /// Create an index
    ///
    /// # Errors
    ///
    /// Returns a `Response` error (400) if the index already exists
    async fn create_index(
        &self,
        name: &str,
        mapping: &MappingDefinition,
        settings: &IndexSettings,
    ) -> Result<Ack>;

    /// Delete an index together with every alias bound to it
    async fn delete_index(&self, name: &str) -> Result<Ack>;

    /// Toggle the write block of an index
    ///
    /// A blocked index stays readable; every write is rejected.
    async fn set_write_blocked(&self, name: &str, blocked: bool) -> Result<Ack>;

    // ═══════════════════════════════════════════════════════════════════════
    // Alias Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Resolve an alias to the index it points at
    ///
    /// Returns `None` when the alias does not exist.
    async fn get_alias_target(&self, alias: &str) -> Result<Option<String>>;

    async fn put_alias(&self, alias: &str, index: &str) -> Result<Ack>;

    async fn delete_alias(&self, alias: &str, index: &str) -> Result<Ack>;

    /// Apply every action as one unit
    ///
    /// Atomicity is only as strong as the backing store's combined alias
    /// update. Without it, a remove+add pair leaves a window in which the
    /// alias resolves to neither (or both) indexes.
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<Ack>;

    // ═══════════════════════════════════════════════════════════════════════
    // Data Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Highest sequence number assigned in the index (`-1` if none)
    async fn sequence_watermark(&self, name: &str) -> Result<i64>;

    /// Copy every document from `source` into `dest`, waiting for completion
    async fn reindex(
        &self,
        source: &str,
        dest: &str,
        conflicts: ConflictPolicy,
    ) -> Result<ReindexSummary>;

    /// Documents with `seq_no > watermark`, ordered by `seq_no`
    async fn search_by_sequence_above(
        &self,
        name: &str,
        watermark: i64,
        from: usize,
        size: usize,
    ) -> Result<Vec<Document>>;

    /// Insert or replace documents by id
    async fn bulk_upsert(&self, dest: &str, rows: &[Document], refresh: Refresh) -> Result<Ack>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_and_extra() {
        let settings: IndexSettings = serde_json::from_value(serde_json::json!({
            "number_of_replicas": 0,
            "refresh_interval": "1s"
        }))
        .unwrap();

        assert_eq!(settings.number_of_shards, 1);
        assert_eq!(settings.number_of_replicas, 0);
        assert_eq!(settings.extra["refresh_interval"], "1s");
    }

    #[test]
    fn test_alias_action_serde() {
        let action = AliasAction::add("t-en-books-v2", "t-en-books");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"add": {"index": "t-en-books-v2", "alias": "t-en-books"}})
        );
    }

    #[test]
    fn test_mapping_is_transparent() {
        let mapping = MappingDefinition::new(serde_json::json!({"properties": {}}));
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"properties":{}}"#);
    }
}
