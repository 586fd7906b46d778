//! Persisted application settings (exchange credentials).

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Settings blob stored next to the instruments in the state document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default, alias = "bybit_api_key")]
    pub bybit_api_key: String,
    #[serde(default, alias = "bybit_secret_key")]
    pub bybit_secret_key: String,
}

/// Sparse settings patch. Present values are trimmed before being applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, alias = "bybit_api_key")]
    pub bybit_api_key: Option<String>,
    #[serde(default, alias = "bybit_secret_key")]
    pub bybit_secret_key: Option<String>,
}

/// Whether credentials have been configured, without exposing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingsStatus {
    pub configured: bool,
}

/// API key pair used to sign exchange requests.
///
/// The secret is wiped from memory on drop and never printed.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: Zeroizing<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl AppSettings {
    /// Both key and secret are non-blank.
    pub fn is_configured(&self) -> bool {
        !self.bybit_api_key.trim().is_empty() && !self.bybit_secret_key.trim().is_empty()
    }

    /// Returns trimmed credentials when configured.
    pub fn credentials(&self) -> Option<Credentials> {
        self.is_configured().then(|| Credentials {
            api_key: self.bybit_api_key.trim().to_string(),
            api_secret: Zeroizing::new(self.bybit_secret_key.trim().to_string()),
        })
    }

    pub fn status(&self) -> SettingsStatus {
        SettingsStatus {
            configured: self.is_configured(),
        }
    }

    /// Trimmed key pair, used to detect credential changes.
    pub fn key_pair(&self) -> (&str, &str) {
        (self.bybit_api_key.trim(), self.bybit_secret_key.trim())
    }
}

impl SettingsUpdate {
    /// Returns a copy of `base` with the present fields applied.
    pub fn apply(&self, base: &AppSettings) -> AppSettings {
        let mut updated = base.clone();
        if let Some(key) = &self.bybit_api_key {
            updated.bybit_api_key = key.trim().to_string();
        }
        if let Some(secret) = &self.bybit_secret_key {
            updated.bybit_secret_key = secret.trim().to_string();
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_are_not_configured() {
        let settings = AppSettings {
            bybit_api_key: "key".into(),
            bybit_secret_key: "   ".into(),
        };
        assert!(!settings.is_configured());
        assert!(settings.credentials().is_none());
        assert_eq!(settings.status(), SettingsStatus { configured: false });
    }

    #[test]
    fn credentials_are_trimmed() {
        let settings = AppSettings {
            bybit_api_key: " key ".into(),
            bybit_secret_key: "secret\n".into(),
        };
        let creds = settings.credentials().unwrap();
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.api_secret.as_str(), "secret");
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials {
            api_key: "key".into(),
            api_secret: Zeroizing::new("hunter2".into()),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("key"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn update_applies_only_present_fields() {
        let base = AppSettings {
            bybit_api_key: "old-key".into(),
            bybit_secret_key: "old-secret".into(),
        };
        let patch = SettingsUpdate {
            bybit_api_key: Some("  new-key ".into()),
            bybit_secret_key: None,
        };
        let updated = patch.apply(&base);
        assert_eq!(updated.bybit_api_key, "new-key");
        assert_eq!(updated.bybit_secret_key, "old-secret");
    }

    #[test]
    fn accepts_both_field_spellings() {
        let camel: AppSettings =
            serde_json::from_str(r#"{"bybitApiKey": "a", "bybitSecretKey": "b"}"#).unwrap();
        let snake: AppSettings =
            serde_json::from_str(r#"{"bybit_api_key": "a", "bybit_secret_key": "b"}"#).unwrap();
        assert_eq!(camel, snake);

        let empty: AppSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, AppSettings::default());
    }
}
