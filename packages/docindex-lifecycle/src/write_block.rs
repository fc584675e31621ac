//! Scoped write block on an index
//!
//! Acquiring a [`WriteBlockGuard`] marks the index read-only. Release it with
//! [`WriteBlockGuard::release`] to observe the outcome; if the guard is
//! dropped unreleased (an early return, a cancelled future, a panic, or a
//! failed release) the unblock is scheduled on the current Tokio runtime.

use docindex_store::StoreClient;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;

pub struct WriteBlockGuard {
    store: Arc<dyn StoreClient>,
    index: String,
    released: bool,
}

impl WriteBlockGuard {
    /// Block writes on `index`
    ///
    /// # Errors
    ///
    /// Returns the store error if the block could not be set. The block may
    /// still have been applied by the store (e.g. the reply timed out), so an
    /// unblock is attempted before returning.
    pub async fn acquire(store: Arc<dyn StoreClient>, index: &str) -> Result<Self> {
        if let Err(err) = store.set_write_blocked(index, true).await {
            if let Err(undo) = store.set_write_blocked(index, false).await {
                warn!("Failed to clear write block on {} after failed acquire: {}", index, undo);
            }
            return Err(err.into());
        }

        info!("Write block acquired on {}", index);
        Ok(Self {
            store,
            index: index.to_string(),
            released: false,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Lift the write block, retrying once inline
    ///
    /// # Errors
    ///
    /// Returns the store error if both attempts failed; the guard then tries
    /// once more in the background when it is dropped.
    pub async fn release(mut self) -> Result<()> {
        if let Err(err) = self.store.set_write_blocked(&self.index, false).await {
            warn!("Releasing write block on {} failed, retrying: {}", self.index, err);
            self.store.set_write_blocked(&self.index, false).await?;
        }
        self.released = true;
        info!("Write block released on {}", self.index);
        Ok(())
    }
}

impl Drop for WriteBlockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        // Without a runtime there is nothing to schedule on
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("Write block on {} left in place: no runtime to release it", self.index);
            return;
        };

        warn!("Write block guard on {} dropped unreleased, releasing in background", self.index);
        let store = self.store.clone();
        let index = std::mem::take(&mut self.index);
        handle.spawn(async move {
            if let Err(err) = store.set_write_blocked(&index, false).await {
                warn!("Background release of write block on {} failed: {}", index, err);
            }
        });
    }
}
