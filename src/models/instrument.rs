//! Instrument configuration: take-profit levels, stop-loss ladders, refill
//! triggers, and the invariants tying them together.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, de};

use super::spec::SymbolSpec;

/// Upper bound for `price_decimals` / `volume_decimals`.
pub const MAX_DECIMALS: u32 = 10;

/// Number of take-profit levels every instrument carries.
pub const TP_LEVEL_COUNT: usize = 2;

/// Upper bound for a single stop-loss ladder, and for both ladders combined.
pub const MAX_SL_COUNT: u32 = 10;

const DEFAULT_SL_COUNT: u32 = 5;

/// A configured instrument, keyed by its uppercase `symbol`.
///
/// Values are only produced through [`Instrument::from_spec`] or
/// [`InstrumentUpdate::apply`], both of which run [`Instrument::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub symbol: String,
    #[serde(default, alias = "is_active")]
    pub is_active: bool,
    #[serde(alias = "entry_price_usdt")]
    pub entry_price_usdt: Decimal,
    #[serde(alias = "entry_volume_usdt")]
    pub entry_volume_usdt: Decimal,
    #[serde(alias = "price_decimals")]
    pub price_decimals: u32,
    #[serde(alias = "volume_decimals")]
    pub volume_decimals: u32,
    /// Minimum price increment imposed by the exchange.
    #[serde(alias = "tick_size")]
    pub tick_size: Decimal,
    /// Minimum quantity increment imposed by the exchange.
    #[serde(alias = "qty_step")]
    pub qty_step: Decimal,
    #[serde(alias = "tp_levels")]
    pub tp_levels: Vec<TakeProfitLevel>,
    #[serde(alias = "sl_long")]
    pub sl_long: StopLossConfig,
    #[serde(alias = "sl_short")]
    pub sl_short: StopLossConfig,
    pub refill: RefillConfig,
}

/// Price offset and share of the position closed at that offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeProfitLevel {
    #[serde(alias = "step_usdt")]
    pub step_usdt: Decimal,
    /// Percentage of the position, 0–100.
    #[serde(alias = "volume_percent")]
    pub volume_percent: Decimal,
}

/// Count and spacing of stop-loss triggers on one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopLossConfig {
    pub count: u32,
    #[serde(alias = "step_usdt")]
    pub step_usdt: Decimal,
}

/// Auxiliary re-entry trigger, independent of the main grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefillConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(alias = "long_price_usdt")]
    pub long_price_usdt: Decimal,
    #[serde(alias = "long_volume_usdt")]
    pub long_volume_usdt: Decimal,
    #[serde(alias = "short_price_usdt")]
    pub short_price_usdt: Decimal,
    #[serde(alias = "short_volume_usdt")]
    pub short_volume_usdt: Decimal,
}

/// Sparse merge-patch for an [`Instrument`].
///
/// Fields absent from the request stay `None` and leave the stored value
/// untouched. Every instrument field is required, so an explicit `null`
/// is rejected instead of being read as "unchanged". The symbol cannot be
/// patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentUpdate {
    #[serde(default, deserialize_with = "non_null", alias = "is_active")]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "non_null", alias = "entry_price_usdt")]
    pub entry_price_usdt: Option<Decimal>,
    #[serde(default, deserialize_with = "non_null", alias = "entry_volume_usdt")]
    pub entry_volume_usdt: Option<Decimal>,
    #[serde(default, deserialize_with = "non_null", alias = "price_decimals")]
    pub price_decimals: Option<u32>,
    #[serde(default, deserialize_with = "non_null", alias = "volume_decimals")]
    pub volume_decimals: Option<u32>,
    #[serde(default, deserialize_with = "non_null", alias = "tick_size")]
    pub tick_size: Option<Decimal>,
    #[serde(default, deserialize_with = "non_null", alias = "qty_step")]
    pub qty_step: Option<Decimal>,
    #[serde(default, deserialize_with = "non_null", alias = "tp_levels")]
    pub tp_levels: Option<Vec<TakeProfitLevel>>,
    #[serde(default, deserialize_with = "non_null", alias = "sl_long")]
    pub sl_long: Option<StopLossConfig>,
    #[serde(default, deserialize_with = "non_null", alias = "sl_short")]
    pub sl_short: Option<StopLossConfig>,
    #[serde(default, deserialize_with = "non_null")]
    pub refill: Option<RefillConfig>,
}

/// The invariant an instrument violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptySymbol,
    Negative {
        field: &'static str,
        value: Decimal,
    },
    NotPositive {
        field: &'static str,
        value: Decimal,
    },
    DecimalsOutOfRange {
        field: &'static str,
        value: u32,
    },
    TakeProfitLevelCount {
        count: usize,
    },
    TakeProfitStepTooLow {
        level: usize,
        value: Decimal,
    },
    TakeProfitPercentOutOfRange {
        level: usize,
        value: Decimal,
    },
    TakeProfitSum {
        sum: Decimal,
    },
    StopLossCountOutOfRange {
        side: &'static str,
        count: u32,
    },
    StopLossTotal {
        total: u32,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySymbol => write!(f, "symbol must not be empty"),
            Self::Negative { field, value } => {
                write!(f, "{field} must be >= 0, got {value}")
            }
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be > 0, got {value}")
            }
            Self::DecimalsOutOfRange { field, value } => {
                write!(f, "{field} must be between 0 and {MAX_DECIMALS}, got {value}")
            }
            Self::TakeProfitLevelCount { count } => {
                write!(
                    f,
                    "tp_levels must contain exactly {TP_LEVEL_COUNT} items, got {count}"
                )
            }
            Self::TakeProfitStepTooLow { level, value } => {
                write!(f, "tp_levels[{level}].step_usdt must be > -1, got {value}")
            }
            Self::TakeProfitPercentOutOfRange { level, value } => {
                write!(
                    f,
                    "tp_levels[{level}].volume_percent must be between 0 and 100, got {value}"
                )
            }
            Self::TakeProfitSum { sum } => {
                write!(f, "sum of TP volumes must be 100, got {sum}")
            }
            Self::StopLossCountOutOfRange { side, count } => {
                write!(
                    f,
                    "{side}.count must be between 1 and {MAX_SL_COUNT}, got {count}"
                )
            }
            Self::StopLossTotal { total } => {
                write!(f, "total SL count must be <= {MAX_SL_COUNT}, got {total}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl Instrument {
    /// Builds a fresh, inactive instrument from exchange trading constraints.
    ///
    /// Display precision is the number of fractional digits `tick_size` and
    /// `qty_step` need once trailing zeros are stripped. Everything else
    /// starts at its default: zero entry, 50/50 take-profit split, five
    /// stop-loss steps per side, refill disabled.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the spec values are not positive or
    /// need more than [`MAX_DECIMALS`] fractional digits.
    pub fn from_spec(symbol: &str, spec: &SymbolSpec) -> Result<Self, ValidationError> {
        let instrument = Self {
            symbol: symbol.to_string(),
            is_active: false,
            entry_price_usdt: Decimal::ZERO,
            entry_volume_usdt: Decimal::ZERO,
            price_decimals: decimal_places(spec.tick_size),
            volume_decimals: decimal_places(spec.qty_step),
            tick_size: spec.tick_size,
            qty_step: spec.qty_step,
            tp_levels: default_take_profit(),
            sl_long: StopLossConfig::default(),
            sl_short: StopLossConfig::default(),
            refill: RefillConfig::default(),
        };
        instrument.validate()?;
        Ok(instrument)
    }

    /// Checks every field range and cross-field invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        non_negative("entry_price_usdt", self.entry_price_usdt)?;
        non_negative("entry_volume_usdt", self.entry_volume_usdt)?;
        decimals_in_range("price_decimals", self.price_decimals)?;
        decimals_in_range("volume_decimals", self.volume_decimals)?;
        positive("tick_size", self.tick_size)?;
        positive("qty_step", self.qty_step)?;

        if self.tp_levels.len() != TP_LEVEL_COUNT {
            return Err(ValidationError::TakeProfitLevelCount {
                count: self.tp_levels.len(),
            });
        }
        for (level, tp) in self.tp_levels.iter().enumerate() {
            if tp.step_usdt <= Decimal::NEGATIVE_ONE {
                return Err(ValidationError::TakeProfitStepTooLow {
                    level,
                    value: tp.step_usdt,
                });
            }
            if tp.volume_percent < Decimal::ZERO || tp.volume_percent > Decimal::ONE_HUNDRED {
                return Err(ValidationError::TakeProfitPercentOutOfRange {
                    level,
                    value: tp.volume_percent,
                });
            }
        }
        let sum: Decimal = self.tp_levels.iter().map(|tp| tp.volume_percent).sum();
        if sum != Decimal::ONE_HUNDRED {
            return Err(ValidationError::TakeProfitSum { sum });
        }

        self.sl_long.validate("sl_long", "sl_long.step_usdt")?;
        self.sl_short.validate("sl_short", "sl_short.step_usdt")?;
        let total = self.sl_long.count + self.sl_short.count;
        if total > MAX_SL_COUNT {
            return Err(ValidationError::StopLossTotal { total });
        }

        non_negative("refill.long_price_usdt", self.refill.long_price_usdt)?;
        non_negative("refill.long_volume_usdt", self.refill.long_volume_usdt)?;
        non_negative("refill.short_price_usdt", self.refill.short_price_usdt)?;
        non_negative("refill.short_volume_usdt", self.refill.short_volume_usdt)?;

        Ok(())
    }
}

impl StopLossConfig {
    fn validate(&self, side: &'static str, step_field: &'static str) -> Result<(), ValidationError> {
        if !(1..=MAX_SL_COUNT).contains(&self.count) {
            return Err(ValidationError::StopLossCountOutOfRange {
                side,
                count: self.count,
            });
        }
        non_negative(step_field, self.step_usdt)
    }
}

impl Default for StopLossConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_SL_COUNT,
            step_usdt: Decimal::ZERO,
        }
    }
}

impl InstrumentUpdate {
    /// Returns `true` when the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the present fields onto a copy of `base` and validates the
    /// result as a whole. `base` is never modified.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] the merged instrument violates.
    pub fn apply(&self, base: &Instrument) -> Result<Instrument, ValidationError> {
        let mut merged = base.clone();

        if let Some(v) = self.is_active {
            merged.is_active = v;
        }
        if let Some(v) = self.entry_price_usdt {
            merged.entry_price_usdt = v;
        }
        if let Some(v) = self.entry_volume_usdt {
            merged.entry_volume_usdt = v;
        }
        if let Some(v) = self.price_decimals {
            merged.price_decimals = v;
        }
        if let Some(v) = self.volume_decimals {
            merged.volume_decimals = v;
        }
        if let Some(v) = self.tick_size {
            merged.tick_size = v;
        }
        if let Some(v) = self.qty_step {
            merged.qty_step = v;
        }
        if let Some(v) = &self.tp_levels {
            merged.tp_levels = v.clone();
        }
        if let Some(v) = &self.sl_long {
            merged.sl_long = v.clone();
        }
        if let Some(v) = &self.sl_short {
            merged.sl_short = v.clone();
        }
        if let Some(v) = &self.refill {
            merged.refill = v.clone();
        }

        merged.validate()?;
        Ok(merged)
    }
}

/// Fractional digits needed to write `value` exactly; 0 for integers.
pub fn decimal_places(value: Decimal) -> u32 {
    value.normalize().scale()
}

/// Field-present deserializer for [`InstrumentUpdate`]: a value is wrapped
/// in `Some`, `null` is an error.
fn non_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<T>::deserialize(deserializer)? {
        Some(value) => Ok(Some(value)),
        None => Err(de::Error::custom(
            "null is not allowed, omit the field to keep its value",
        )),
    }
}

fn default_take_profit() -> Vec<TakeProfitLevel> {
    let half = Decimal::from(50);
    vec![
        TakeProfitLevel {
            step_usdt: Decimal::ZERO,
            volume_percent: half,
        },
        TakeProfitLevel {
            step_usdt: Decimal::ZERO,
            volume_percent: half,
        },
    ]
}

fn non_negative(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

fn positive(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(())
}

fn decimals_in_range(field: &'static str, value: u32) -> Result<(), ValidationError> {
    if value > MAX_DECIMALS {
        return Err(ValidationError::DecimalsOutOfRange { field, value });
    }
    Ok(())
}
