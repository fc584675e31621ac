//! docindex-lifecycle - versioned index lifecycle and zero-downtime migration
//!
//! Each logical index is addressed through a stable alias (`t-en-books`)
//! that resolves to exactly one versioned index (`t-en-books-v2`). Bumping
//! the version of an [`IndexDescriptor`] and calling
//! [`IndexLifecycleManager::migrate_if_needed`] moves the data:
//!
//! 1. create the new version
//! 2. read the old index's sequence watermark and reindex old -> new
//! 3. write-block the old index, swap the alias atomically
//! 4. replay writes that landed after the watermark, lift the block
//! 5. delete the old index
//!
//! [`MigrationOrchestrator`] runs many managers in concurrent groups.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docindex_lifecycle::{IndexLifecycleManager, LifecycleConfig, StaticMapping};
//!
//! let config = LifecycleConfig::from_yaml_file("lifecycle.yaml")?;
//! let manager = IndexLifecycleManager::from_config(
//!     &config,
//!     config.descriptor("en", "books", 2)?,
//!     store,
//!     Arc::new(StaticMapping::new(mapping)),
//! );
//! let result = manager.migrate_if_needed().await;
//! println!("{} ({}ms)", result.code, result.took_ms);
//! ```

pub mod config;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod manager;
pub mod mapping;
pub mod migration;
pub mod orchestrator;
pub mod write_block;

pub use config::{LifecycleConfig, DEFAULT_GROUP_SIZE, DEFAULT_REPLAY_PAGE_SIZE};
pub use descriptor::IndexDescriptor;
pub use envelope::{CreateCode, CreateResult, Envelope};
pub use error::{LifecycleError, Result};
pub use manager::IndexLifecycleManager;
pub use mapping::{MappingProvider, StaticMapping};
pub use migration::{MigrationCode, MigrationResult, MigrationState};
pub use orchestrator::{chunkify, BatchOutcome, MigrationBatch, MigrationOrchestrator, StatusBatch};
pub use write_block::WriteBlockGuard;
