//! Composition root wiring storage, settings, specs and the catalog.
//!
//! [`GridHedge`] is constructed explicitly and shared by handle; nothing in
//! the crate lives in a process-wide global. Every successful catalog
//! mutation made through it is followed by a full snapshot write.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::Result;
use crate::bybit::BybitClient;
use crate::catalog::InstrumentCatalog;
use crate::config::AppConfig;
use crate::models::{
    AppSettings, Instrument, InstrumentUpdate, SettingsStatus, SettingsUpdate, SymbolSpec,
};
use crate::settings::SettingsService;
use crate::specs::{SpecRegistry, SpecSource};
use crate::storage::StateStorage;

/// Application services plus the exchange spec source they refresh from.
pub struct GridHedge<S = BybitClient> {
    storage: Arc<StateStorage>,
    settings: SettingsService,
    specs: Arc<SpecRegistry>,
    catalog: InstrumentCatalog,
    /// Held from catalog snapshot to file write so snapshots land in order.
    persist_lock: Mutex<()>,
    source: S,
}

impl GridHedge<BybitClient> {
    /// Builds the application from configuration, talking to Bybit.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Config`](crate::GridError::Config) if the HTTP
    /// client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = BybitClient::new(&config.bybit)?;
        Ok(Self::new(StateStorage::new(&config.storage.state_path), source))
    }
}

impl<S: SpecSource> GridHedge<S> {
    pub fn new(storage: StateStorage, source: S) -> Self {
        let storage = Arc::new(storage);
        let specs = Arc::new(SpecRegistry::new());
        Self {
            settings: SettingsService::new(storage.clone()),
            catalog: InstrumentCatalog::new(specs.clone()),
            persist_lock: Mutex::new(()),
            storage,
            specs,
            source,
        }
    }

    pub fn catalog(&self) -> &InstrumentCatalog {
        &self.catalog
    }

    pub fn spec_registry(&self) -> &SpecRegistry {
        &self.specs
    }

    pub fn storage(&self) -> &StateStorage {
        &self.storage
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Restores settings and instruments from the state document.
    pub async fn restore(&self) -> Result<usize> {
        self.settings.load().await?;
        info!("Application settings restored");

        let instruments = self.storage.load_instruments().await?;
        let count = instruments.len();
        self.catalog.replace_all(instruments).await;
        info!(count, "Restored instruments from state");
        Ok(count)
    }

    /// Re-fetches symbol specs using the current credentials.
    pub async fn refresh_specs(&self) -> Result<usize> {
        let credentials = self.settings.current().await.credentials();
        self.specs.refresh(&self.source, credentials.as_ref()).await
    }

    /// Restores state, then loads symbol specs. A failed spec load is
    /// logged and leaves the registry empty rather than aborting startup.
    pub async fn bootstrap(&self) -> Result<()> {
        self.restore().await?;
        if let Err(e) = self.refresh_specs().await {
            warn!(error = %e, "Failed to load instrument specifications");
        }
        Ok(())
    }

    pub async fn instruments(&self) -> Vec<Instrument> {
        self.catalog.list().await
    }

    pub async fn instrument(&self, symbol: &str) -> Option<Instrument> {
        self.catalog.get(symbol).await
    }

    /// Creates an instrument and persists the catalog.
    pub async fn create_instrument(&self, symbol: &str) -> Result<Instrument> {
        let instrument = self.catalog.create(symbol).await?;
        self.persist_instruments().await?;
        Ok(instrument)
    }

    /// Applies a merge-patch and persists the catalog.
    pub async fn update_instrument(
        &self,
        symbol: &str,
        patch: &InstrumentUpdate,
    ) -> Result<Instrument> {
        let instrument = self.catalog.update(symbol, patch).await?;
        self.persist_instruments().await?;
        Ok(instrument)
    }

    /// Deletes an instrument; persists only if something was removed.
    pub async fn delete_instrument(&self, symbol: &str) -> Result<bool> {
        let removed = self.catalog.delete(symbol).await;
        if removed {
            self.persist_instruments().await?;
        }
        Ok(removed)
    }

    pub fn specs(&self) -> Vec<SymbolSpec> {
        self.specs.all()
    }

    pub async fn settings(&self) -> AppSettings {
        self.settings.current().await
    }

    pub async fn settings_status(&self) -> SettingsStatus {
        self.settings.status().await
    }

    /// Applies a settings patch and reports whether the key pair changed,
    /// comparing against the value replaced under the settings lock.
    pub async fn apply_settings(&self, patch: &SettingsUpdate) -> Result<(AppSettings, bool)> {
        let (previous, updated) = self.settings.update(patch).await?;
        let rekeyed = previous.key_pair() != updated.key_pair();
        Ok((updated, rekeyed))
    }

    async fn persist_instruments(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.catalog.list().await;
        self.storage.save_instruments(&snapshot).await
    }
}

impl<S: SpecSource + 'static> GridHedge<S> {
    /// Applies a settings patch. When the key pair changes, specs are
    /// refreshed in the background with the new credentials; a failure
    /// there is only logged.
    pub async fn update_settings(self: &Arc<Self>, patch: &SettingsUpdate) -> Result<AppSettings> {
        let (updated, rekeyed) = self.apply_settings(patch).await?;

        if rekeyed {
            let app = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = app.refresh_specs().await {
                    warn!(error = %e, "Failed to refresh specs after settings update");
                }
            });
        }
        Ok(updated)
    }
}
