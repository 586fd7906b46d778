//! Application configuration loaded from environment variables.
//!
//! - `GRIDHEDGE_STATE_PATH` — location of the persisted state document
//!   (default `$HOME/.grid_hedge_bot/state.json`)
//! - `BYBIT_REST_URL` — REST endpoint (default `https://api.bybit.com`)
//! - `BYBIT_RECV_WINDOW_MS` — receive window for signed requests
//! - `BYBIT_TIMEOUT_MS` — HTTP request timeout
//!
//! Exchange credentials are not read here; they are part of the persisted
//! settings and managed by [`crate::settings::SettingsService`].

use std::path::PathBuf;
use std::time::Duration;

/// Default public REST endpoint.
const DEFAULT_REST_URL: &str = "https://api.bybit.com";

const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Directory under `$HOME` holding the state document.
const STATE_DIR: &str = ".grid_hedge_bot";
const STATE_FILE: &str = "state.json";

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub bybit: BybitConfig,
}

/// Where the state document lives.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub state_path: PathBuf,
}

/// Bybit REST client settings.
#[derive(Debug, Clone)]
pub struct BybitConfig {
    pub rest_url: String,
    pub recv_window_ms: u64,
    pub timeout: Duration,
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            rest_url: DEFAULT_REST_URL.to_string(),
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`GridError::Config`](crate::GridError::Config) if a numeric
/// variable is set but cannot be parsed.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let state_path = non_empty_var("GRIDHEDGE_STATE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(default_state_path);

    let rest_url = non_empty_var("BYBIT_REST_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_REST_URL.to_string());

    let recv_window_ms = parse_u64_var("BYBIT_RECV_WINDOW_MS")?.unwrap_or(DEFAULT_RECV_WINDOW_MS);
    let timeout_ms = parse_u64_var("BYBIT_TIMEOUT_MS")?.unwrap_or(DEFAULT_TIMEOUT_MS);

    Ok(AppConfig {
        storage: StorageConfig { state_path },
        bybit: BybitConfig {
            rest_url,
            recv_window_ms,
            timeout: Duration::from_millis(timeout_ms),
        },
    })
}

/// `$HOME/.grid_hedge_bot/state.json`, or relative to the working
/// directory when `HOME` is unset.
pub fn default_state_path() -> PathBuf {
    let base = non_empty_var("HOME").map(PathBuf::from).unwrap_or_default();
    base.join(STATE_DIR).join(STATE_FILE)
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parse_u64_var(name: &str) -> crate::Result<Option<u64>> {
    non_empty_var(name)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|e| {
                crate::GridError::Config(format!("{name} must be a whole number, got {raw:?}: {e}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Serialises tests that touch the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper that temporarily sets env vars, runs `f`, then restores originals.
    ///
    /// # Safety
    ///
    /// Holds [`ENV_LOCK`] for the duration so no other test in this module
    /// reads these env vars concurrently.
    fn with_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let originals: Vec<(&str, Option<String>)> = vars
            .iter()
            .map(|(k, _)| (*k, std::env::var(k).ok()))
            .collect();

        for (k, v) in vars {
            // SAFETY: guarded by ENV_LOCK.
            unsafe {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }

        f();

        for (k, original) in originals {
            // SAFETY: restoring original values, still holding ENV_LOCK.
            unsafe {
                match original {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    const ALL_VARS: [&str; 4] = [
        "GRIDHEDGE_STATE_PATH",
        "BYBIT_REST_URL",
        "BYBIT_RECV_WINDOW_MS",
        "BYBIT_TIMEOUT_MS",
    ];

    fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
        ALL_VARS.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    fn defaults_without_env_vars() {
        let mut vars = cleared();
        vars.push(("HOME", Some("/home/operator")));
        with_env(&vars, || {
            let config = fetch_config().unwrap();
            assert_eq!(config.bybit.rest_url, DEFAULT_REST_URL);
            assert_eq!(config.bybit.recv_window_ms, 5_000);
            assert_eq!(config.bybit.timeout, Duration::from_secs(10));
            assert_eq!(
                config.storage.state_path,
                PathBuf::from("/home/operator/.grid_hedge_bot/state.json")
            );
        });
    }

    #[test]
    fn overrides_from_env() {
        with_env(
            &[
                ("GRIDHEDGE_STATE_PATH", Some("/tmp/gh/state.json")),
                ("BYBIT_REST_URL", Some("https://api-testnet.bybit.com/")),
                ("BYBIT_RECV_WINDOW_MS", Some("20000")),
                ("BYBIT_TIMEOUT_MS", Some("2500")),
            ],
            || {
                let config = fetch_config().unwrap();
                assert_eq!(config.storage.state_path, PathBuf::from("/tmp/gh/state.json"));
                assert_eq!(config.bybit.rest_url, "https://api-testnet.bybit.com");
                assert_eq!(config.bybit.recv_window_ms, 20_000);
                assert_eq!(config.bybit.timeout, Duration::from_millis(2_500));
            },
        );
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let mut vars = cleared();
        vars.push(("BYBIT_TIMEOUT_MS", Some("soon")));
        with_env(&vars, || {
            let err = fetch_config().unwrap_err();
            assert!(err.to_string().contains("BYBIT_TIMEOUT_MS"));
        });
    }

    #[test]
    fn empty_values_treated_as_absent() {
        with_env(
            &[
                ("GRIDHEDGE_STATE_PATH", Some("")),
                ("BYBIT_REST_URL", Some("")),
                ("BYBIT_RECV_WINDOW_MS", Some("")),
                ("BYBIT_TIMEOUT_MS", Some("")),
                ("HOME", Some("/root")),
            ],
            || {
                let config = fetch_config().unwrap();
                assert_eq!(config.bybit.rest_url, DEFAULT_REST_URL);
                assert_eq!(config.bybit.recv_window_ms, DEFAULT_RECV_WINDOW_MS);
                assert!(config.storage.state_path.ends_with(".grid_hedge_bot/state.json"));
            },
        );
    }
}
