//! Shared test utilities.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use gridhedge::models::{Credentials, SymbolSpec};
use gridhedge::specs::SpecSource;
use gridhedge::{GridError, Result};
use rust_decimal::Decimal;

/// Path to a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn spec(symbol: &str, tick_size: Decimal, qty_step: Decimal) -> SymbolSpec {
    SymbolSpec {
        symbol: symbol.to_string(),
        tick_size,
        qty_step,
    }
}

/// In-memory spec source that records the API key of each fetch.
#[derive(Default)]
pub struct StubSource {
    specs: Vec<SymbolSpec>,
    fail: bool,
    pub fetches: AtomicUsize,
    pub seen_keys: Mutex<Vec<Option<String>>>,
}

impl StubSource {
    pub fn with_specs(specs: Vec<SymbolSpec>) -> Self {
        Self {
            specs,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SpecSource for StubSource {
    async fn fetch_specs(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<BTreeMap<String, SymbolSpec>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.seen_keys
            .lock()
            .unwrap()
            .push(credentials.map(|c| c.api_key.clone()));

        if self.fail {
            return Err(GridError::Exchange {
                code: 10002,
                message: "request expired".into(),
            });
        }
        Ok(self
            .specs
            .iter()
            .map(|s| (s.symbol.clone(), s.clone()))
            .collect())
    }
}
