//! In-memory instrument catalog.
//!
//! [`InstrumentCatalog`] holds every configured instrument behind a single
//! async mutex. Each operation takes the lock for its whole duration and
//! never awaits I/O while holding it, so concurrent calls are linearizable.
//! Persistence is the caller's job (see [`crate::app::GridHedge`]).

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::{Instrument, InstrumentUpdate, ValidationError};
use crate::specs::SpecRegistry;

/// Reason the catalog rejected an operation. All variants are
/// caller-correctable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// No instrument with this symbol is configured.
    #[error("instrument {0} not found")]
    NotFound(String),

    /// An instrument with this symbol is already configured.
    #[error("instrument {0} already exists")]
    AlreadyExists(String),

    /// The exchange does not list this symbol.
    #[error("instrument {0} is not available on the exchange")]
    NotTradable(String),

    /// The resulting instrument would break an invariant.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Uppercased, trimmed catalog key.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Authoritative set of configured instruments, ordered by symbol.
pub struct InstrumentCatalog {
    instruments: Mutex<BTreeMap<String, Instrument>>,
    specs: Arc<SpecRegistry>,
}

impl InstrumentCatalog {
    /// Creates an empty catalog that resolves new symbols against `specs`.
    pub fn new(specs: Arc<SpecRegistry>) -> Self {
        Self {
            instruments: Mutex::new(BTreeMap::new()),
            specs,
        }
    }

    /// Snapshot of every instrument, ordered by symbol.
    pub async fn list(&self) -> Vec<Instrument> {
        self.instruments.lock().await.values().cloned().collect()
    }

    /// Looks up one instrument; `symbol` is case-insensitive.
    pub async fn get(&self, symbol: &str) -> Option<Instrument> {
        let symbol = normalize_symbol(symbol);
        self.instruments.lock().await.get(&symbol).cloned()
    }

    /// Number of configured instruments.
    pub async fn len(&self) -> usize {
        self.instruments.lock().await.len()
    }

    /// Whether no instrument is configured.
    pub async fn is_empty(&self) -> bool {
        self.instruments.lock().await.is_empty()
    }

    /// Adds a new instrument seeded from the exchange's trading constraints.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Validation`] if the symbol is blank or the exchange
    ///   values produce an invalid instrument
    /// - [`CatalogError::NotTradable`] if the spec registry has no entry
    /// - [`CatalogError::AlreadyExists`] if the symbol is already configured
    pub async fn create(&self, symbol: &str) -> Result<Instrument, CatalogError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol.into());
        }
        let spec = self
            .specs
            .get(&symbol)
            .ok_or_else(|| CatalogError::NotTradable(symbol.clone()))?;

        let mut instruments = self.instruments.lock().await;
        if instruments.contains_key(&symbol) {
            return Err(CatalogError::AlreadyExists(symbol));
        }

        let instrument = Instrument::from_spec(&symbol, &spec)?;
        instruments.insert(symbol.clone(), instrument.clone());
        info!(symbol = %symbol, tick_size = %spec.tick_size, qty_step = %spec.qty_step, "Instrument created");
        Ok(instrument)
    }

    /// Merges `patch` onto the stored instrument and replaces it with the
    /// validated result. On any error the stored value is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown symbol and
    /// [`CatalogError::Validation`] when the merged instrument is invalid.
    pub async fn update(
        &self,
        symbol: &str,
        patch: &InstrumentUpdate,
    ) -> Result<Instrument, CatalogError> {
        let symbol = normalize_symbol(symbol);
        let mut instruments = self.instruments.lock().await;
        let current = instruments
            .get(&symbol)
            .ok_or_else(|| CatalogError::NotFound(symbol.clone()))?;

        let updated = patch.apply(current)?;
        instruments.insert(symbol.clone(), updated.clone());
        debug!(symbol = %symbol, "Instrument updated");
        Ok(updated)
    }

    /// Removes an instrument. Absent symbols are not an error; the return
    /// value tells whether anything was removed.
    pub async fn delete(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let removed = self.instruments.lock().await.remove(&symbol).is_some();
        if removed {
            info!(symbol = %symbol, "Instrument deleted");
        }
        removed
    }

    /// Replaces the whole catalog, keyed by each instrument's symbol.
    ///
    /// Used when restoring persisted state; inputs are trusted and not
    /// re-validated. A later duplicate symbol overwrites an earlier one.
    pub async fn replace_all(&self, instruments: impl IntoIterator<Item = Instrument>) {
        let replacement: BTreeMap<String, Instrument> = instruments
            .into_iter()
            .map(|instrument| (instrument.symbol.clone(), instrument))
            .collect();
        *self.instruments.lock().await = replacement;
    }
}
