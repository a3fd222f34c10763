//! Process-wide cache of OAuth client handles keyed by callback URL.
//!
//! The redirect URI used for the authorize step must match the one used in
//! the token exchange, so a handle is bound to one canonical callback URL.
//! Entries are created on first use and never evicted; the key space is the
//! small set of public URLs the proxy routes to this server.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Concurrent map from callback URL to a shared handle.
#[derive(Debug)]
pub struct ClientRegistry<H> {
    entries: RwLock<HashMap<String, Arc<H>>>,
}

impl<H> ClientRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the handle for `callback_url`, creating it if absent.
    ///
    /// `create` runs without the lock held. If two callers race on the same
    /// URL both may create a handle, but the first one inserted is kept and
    /// returned to both.
    pub async fn get_or_try_insert_with<E>(
        &self,
        callback_url: &str,
        create: impl FnOnce() -> Result<H, E>,
    ) -> Result<Arc<H>, E> {
        if let Some(handle) = self.entries.read().await.get(callback_url) {
            return Ok(Arc::clone(handle));
        }

        let created = Arc::new(create()?);

        let mut entries = self.entries.write().await;
        let handle = entries
            .entry(callback_url.to_string())
            .or_insert(created);
        Ok(Arc::clone(handle))
    }

    /// Returns the number of cached handles.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl<H> Default for ClientRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
