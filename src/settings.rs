//! In-memory holder for the persisted settings blob.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::Result;
use crate::models::{AppSettings, SettingsStatus, SettingsUpdate};
use crate::storage::StateStorage;

/// Owns the current [`AppSettings`] and writes every change through to
/// [`StateStorage`] while holding its lock.
pub struct SettingsService {
    storage: Arc<StateStorage>,
    current: Mutex<AppSettings>,
}

impl SettingsService {
    pub fn new(storage: Arc<StateStorage>) -> Self {
        Self {
            storage,
            current: Mutex::new(AppSettings::default()),
        }
    }

    /// Replaces the in-memory value with what is on disk.
    pub async fn load(&self) -> Result<AppSettings> {
        let settings = self.storage.load_settings().await?;
        *self.current.lock().await = settings.clone();
        Ok(settings)
    }

    pub async fn current(&self) -> AppSettings {
        self.current.lock().await.clone()
    }

    pub async fn status(&self) -> SettingsStatus {
        self.current.lock().await.status()
    }

    /// Applies `patch`, persists, and returns `(previous, updated)`, both
    /// observed under the same lock.
    ///
    /// The in-memory value only changes once the write has succeeded.
    pub async fn update(&self, patch: &SettingsUpdate) -> Result<(AppSettings, AppSettings)> {
        let mut current = self.current.lock().await;
        let updated = patch.apply(&current);
        self.storage.save_settings(&updated).await?;
        let previous = std::mem::replace(&mut *current, updated.clone());
        Ok((previous, updated))
    }

    /// Replaces the settings wholesale and persists them.
    pub async fn overwrite(&self, settings: AppSettings) -> Result<AppSettings> {
        let mut current = self.current.lock().await;
        self.storage.save_settings(&settings).await?;
        *current = settings.clone();
        Ok(settings)
    }
}
