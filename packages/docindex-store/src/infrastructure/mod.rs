//! Store Infrastructure Layer
//!
//! Implementations of the `StoreClient` port

pub mod memory_store;
pub use memory_store::{InMemoryStoreClient, StoreOp};

pub mod timeout;
pub use timeout::TimeoutStoreClient;
