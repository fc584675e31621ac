//! docindex-store - document store port for versioned index administration
//!
//! The lifecycle manager never talks to a wire client directly. Everything it
//! needs from the document store goes through the [`StoreClient`] trait:
//!
//! - index existence, creation and deletion
//! - alias lookup and atomic alias rebinding
//! - write blocks (read-only quiescence)
//! - reindex, sequence watermarks, range search and bulk upsert
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docindex_store::{InMemoryStoreClient, StoreClient};
//!
//! let store = InMemoryStoreClient::new();
//! store.create_index("t-en-books-v1", &mapping, &settings).await?;
//! store.put_alias("t-en-books", "t-en-books-v1").await?;
//! assert_eq!(
//!     store.get_alias_target("t-en-books").await?.as_deref(),
//!     Some("t-en-books-v1")
//! );
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StoreError};

pub use domain::{
    Ack, AliasAction, ConflictPolicy, Document, IndexSettings, MappingDefinition, Refresh,
    ReindexSummary, StoreClient,
};
pub use infrastructure::{InMemoryStoreClient, StoreOp, TimeoutStoreClient};
