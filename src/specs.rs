//! Registry of exchange trading constraints per symbol.
//!
//! The registry keeps an immutable snapshot behind an `Arc`. A refresh
//! builds a complete new map from a [`SpecSource`] and swaps it in under a
//! short write lock, so readers never observe a half-updated registry and
//! never wait on the network.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::info;

use crate::models::{Credentials, SymbolSpec};

type Snapshot = Arc<BTreeMap<String, SymbolSpec>>;

/// Something that can list every tradable symbol with its constraints.
pub trait SpecSource: Send + Sync {
    /// Fetches the complete set of symbol specs, keyed by uppercase symbol.
    fn fetch_specs(
        &self,
        credentials: Option<&Credentials>,
    ) -> impl Future<Output = crate::Result<BTreeMap<String, SymbolSpec>>> + Send;
}

/// Last successfully fetched set of symbol specs.
pub struct SpecRegistry {
    snapshot: RwLock<Snapshot>,
    refresh_lock: Mutex<()>,
}

impl Default for SpecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(BTreeMap::new())),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Re-fetches all specs from `source` and swaps them in.
    ///
    /// Concurrent refreshes are serialised. On failure the previous snapshot
    /// stays in place.
    ///
    /// # Errors
    ///
    /// Propagates whatever error the source returns.
    pub async fn refresh<S: SpecSource>(
        &self,
        source: &S,
        credentials: Option<&Credentials>,
    ) -> crate::Result<usize> {
        let _guard = self.refresh_lock.lock().await;
        let specs = source.fetch_specs(credentials).await?;
        let count = specs.len();
        self.store(specs);
        info!(count, "Symbol specifications refreshed");
        Ok(count)
    }

    /// Replaces the snapshot with `specs` directly.
    pub fn replace(&self, specs: impl IntoIterator<Item = SymbolSpec>) {
        let map = specs
            .into_iter()
            .map(|mut spec| {
                spec.symbol = spec.symbol.trim().to_uppercase();
                (spec.symbol.clone(), spec)
            })
            .collect();
        self.store(map);
    }

    /// Case-insensitive point lookup.
    pub fn get(&self, symbol: &str) -> Option<SymbolSpec> {
        self.current().get(&symbol.trim().to_uppercase()).cloned()
    }

    /// Every spec, ordered by symbol.
    pub fn all(&self) -> Vec<SymbolSpec> {
        self.current().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    fn current(&self) -> Snapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, specs: BTreeMap<String, SymbolSpec>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(specs);
    }
}
