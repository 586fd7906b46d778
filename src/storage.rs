//! Durable application state in a single JSON document.
//!
//! Layout:
//!
//! ```json
//! { "instruments": [ ... ], "settings": { "bybitApiKey": "", "bybitSecretKey": "" } }
//! ```
//!
//! Writes go to a `.tmp` sibling that is then renamed over the document, so
//! a crash never leaves a truncated file. A document that fails to parse is
//! moved aside to `.bak` and replaced with an empty one instead of failing
//! startup.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::{AppSettings, Instrument};
use crate::{GridError, Result};

/// Raw halves of the state document. Entries are kept as JSON so one bad
/// instrument cannot poison the rest.
#[derive(Debug, Default)]
struct StateDocument {
    instruments: Vec<Value>,
    settings: Map<String, Value>,
}

impl StateDocument {
    fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut root) = value else {
            return None;
        };
        let instruments = match root.remove("instruments") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let settings = match root.remove("settings") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Some(Self {
            instruments,
            settings,
        })
    }

    fn to_value(&self) -> Value {
        json!({
            "instruments": self.instruments,
            "settings": self.settings,
        })
    }
}

/// File-backed store for instruments and settings.
pub struct StateStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl StateStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt document is moved before reinitialising.
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("bak")
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    /// Loads persisted instruments. Entries that fail to deserialize or
    /// validate are skipped with a warning.
    pub async fn load_instruments(&self) -> Result<Vec<Instrument>> {
        let state = {
            let _guard = self.lock.lock().await;
            self.read_state().await?
        };

        let mut instruments = Vec::with_capacity(state.instruments.len());
        for (index, item) in state.instruments.into_iter().enumerate() {
            if !item.is_object() {
                warn!(index, "Skipping non-object instrument entry in state");
                continue;
            }
            match serde_json::from_value::<Instrument>(item) {
                Ok(instrument) => match instrument.validate() {
                    Ok(()) => instruments.push(instrument),
                    Err(e) => {
                        warn!(index, symbol = %instrument.symbol, error = %e, "Failed to restore instrument from state");
                    }
                },
                Err(e) => warn!(index, error = %e, "Failed to restore instrument from state"),
            }
        }
        Ok(instruments)
    }

    /// Persists the full instrument list, keeping the stored settings.
    pub async fn save_instruments(&self, instruments: &[Instrument]) -> Result<()> {
        let serialized = instruments
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let _guard = self.lock.lock().await;
        let mut state = self.read_state().await?;
        state.instruments = serialized;
        self.write_state(&state).await
    }

    /// Loads the settings blob; an unreadable blob yields defaults.
    pub async fn load_settings(&self) -> Result<AppSettings> {
        let state = {
            let _guard = self.lock.lock().await;
            self.read_state().await?
        };
        Ok(
            serde_json::from_value(Value::Object(state.settings)).unwrap_or_else(|e| {
                warn!(error = %e, "Stored settings are invalid, using defaults");
                AppSettings::default()
            }),
        )
    }

    /// Persists the settings blob, keeping the stored instruments.
    pub async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let serialized = match serde_json::to_value(settings)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let _guard = self.lock.lock().await;
        let mut state = self.read_state().await?;
        state.settings = serialized;
        self.write_state(&state).await
    }

    /// Reads the document, creating or repairing it as needed. Caller must
    /// hold `self.lock`.
    async fn read_state(&self) -> Result<StateDocument> {
        self.ensure_file().await?;

        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read state file, resetting to defaults");
                self.move_aside().await;
                return self.reinitialise().await;
            }
        };

        match serde_json::from_slice::<Value>(&raw) {
            Ok(value) => match StateDocument::from_value(value) {
                Some(state) => Ok(state),
                None => {
                    warn!(path = %self.path.display(), "State file does not contain a JSON object, reinitialising");
                    self.reinitialise().await
                }
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file is corrupted, resetting to defaults");
                self.move_aside().await;
                self.reinitialise().await
            }
        }
    }

    /// Renames the current document to [`Self::backup_path`], best effort.
    async fn move_aside(&self) {
        let backup = self.backup_path();
        match tokio::fs::rename(&self.path, &backup).await {
            Ok(()) => info!(backup = %backup.display(), "Corrupted state moved aside"),
            Err(e) => debug!(error = %e, "Failed to move corrupted state file to backup"),
        }
    }

    async fn reinitialise(&self) -> Result<StateDocument> {
        let state = StateDocument::default();
        self.write_state(&state).await?;
        Ok(state)
    }

    async fn ensure_file(&self) -> Result<()> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| io_error("failed to stat", &self.path, e))?;
        if !exists {
            self.write_state(&StateDocument::default()).await?;
        }
        Ok(())
    }

    async fn write_state(&self, state: &StateDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("failed to create", parent, e))?;
        }

        let data = serde_json::to_string_pretty(&state.to_value())?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| io_error("failed to write", &tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error("failed to replace", &self.path, e))
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> GridError {
    GridError::Io(format!("{action} {}: {err}", path.display()))
}
