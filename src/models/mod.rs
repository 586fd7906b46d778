//! Data model shared by the catalog, the state store and the exchange client.
//!
//! Everything here serialises with camelCase field names and accepts the
//! snake_case spelling on input. Decimal values are written as strings.

pub mod instrument;
pub mod settings;
pub mod spec;

pub use instrument::{
    Instrument, InstrumentUpdate, RefillConfig, StopLossConfig, TakeProfitLevel, ValidationError,
};
pub use settings::{AppSettings, Credentials, SettingsStatus, SettingsUpdate};
pub use spec::SymbolSpec;
