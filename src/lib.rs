//! Instrument catalog and grid/hedge parameter store.
//!
//! Keeps per-instrument take-profit, stop-loss and refill settings
//! consistent with Bybit's trading constraints (tick size, quantity step),
//! and persists them with the exchange credentials to a local JSON file.

pub mod app;
pub mod auth;
pub mod bybit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod settings;
pub mod specs;
pub mod storage;

pub use app::GridHedge;
pub use catalog::{CatalogError, InstrumentCatalog};
pub use error::{GridError, Result};
