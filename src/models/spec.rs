//! Exchange trading constraints and the Bybit `instruments-info` reply.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price/quantity granularity the exchange imposes on one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSpec {
    pub symbol: String,
    #[serde(alias = "tick_size")]
    pub tick_size: Decimal,
    #[serde(alias = "qty_step")]
    pub qty_step: Decimal,
}

/// Envelope of `GET /v5/market/instruments-info`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentsInfoResponse {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    #[serde(default)]
    pub result: Option<InstrumentsInfoResult>,
}

/// One page of instrument reference data.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentsInfoResult {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub list: Vec<LinearInstrumentInfo>,
    /// Empty or absent on the last page.
    #[serde(default)]
    pub next_page_cursor: Option<String>,
}

/// Reference data for a single linear contract.
///
/// Numeric fields arrive as strings and are parsed by
/// [`LinearInstrumentInfo::to_spec`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearInstrumentInfo {
    pub symbol: String,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub base_coin: Option<String>,
    #[serde(default)]
    pub quote_coin: Option<String>,
    #[serde(default)]
    pub price_filter: Option<PriceFilter>,
    #[serde(default)]
    pub lot_size_filter: Option<LotSizeFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    #[serde(default)]
    pub min_price: Option<String>,
    #[serde(default)]
    pub max_price: Option<String>,
    #[serde(default)]
    pub tick_size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSizeFilter {
    #[serde(default)]
    pub max_order_qty: Option<String>,
    #[serde(default)]
    pub min_order_qty: Option<String>,
    #[serde(default)]
    pub qty_step: Option<String>,
}

/// Why a listed contract could not be turned into a [`SymbolSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSkip {
    /// Not a USDT-quoted linear perpetual.
    NotUsdtPerpetual,
    /// `priceFilter.tickSize` or `lotSizeFilter.qtyStep` missing.
    MissingFilter,
    /// A filter value is not a decimal number.
    Unparsable(String),
    /// A filter value parsed but is zero or negative.
    NonPositive(Decimal),
}

impl LinearInstrumentInfo {
    /// Whether the contract is a USDT-margined perpetual.
    pub fn is_usdt_perpetual(&self) -> bool {
        self.quote_coin.as_deref() == Some("USDT")
            && self.contract_type.as_deref() == Some("LinearPerpetual")
    }

    /// Extracts exact tick size and quantity step.
    pub fn to_spec(&self) -> Result<SymbolSpec, SpecSkip> {
        if !self.is_usdt_perpetual() {
            return Err(SpecSkip::NotUsdtPerpetual);
        }
        let tick = self
            .price_filter
            .as_ref()
            .and_then(|f| f.tick_size.as_deref());
        let step = self
            .lot_size_filter
            .as_ref()
            .and_then(|f| f.qty_step.as_deref());
        let (Some(tick), Some(step)) = (tick, step) else {
            return Err(SpecSkip::MissingFilter);
        };
        Ok(SymbolSpec {
            symbol: self.symbol.clone(),
            tick_size: positive(parse_decimal(tick)?)?,
            qty_step: positive(parse_decimal(step)?)?,
        })
    }
}

fn positive(value: Decimal) -> Result<Decimal, SpecSkip> {
    if value > Decimal::ZERO {
        Ok(value)
    } else {
        Err(SpecSkip::NonPositive(value))
    }
}

/// Parses plain (`"0.01"`) or scientific (`"1e-8"`) notation exactly.
pub fn parse_decimal(raw: &str) -> Result<Decimal, SpecSkip> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| SpecSkip::Unparsable(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn info(json: &str) -> LinearInstrumentInfo {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_plain_and_scientific() {
        assert_eq!(parse_decimal("0.01"), Ok(dec!(0.01)));
        assert_eq!(parse_decimal(" 5 "), Ok(dec!(5)));
        assert_eq!(parse_decimal("1e-8"), Ok(dec!(0.00000001)));
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn usdt_perpetual_converts() {
        let inst = info(
            r#"{
                "symbol": "BTCUSDT",
                "contractType": "LinearPerpetual",
                "quoteCoin": "USDT",
                "priceFilter": {"tickSize": "0.10"},
                "lotSizeFilter": {"qtyStep": "0.001"}
            }"#,
        );
        let spec = inst.to_spec().unwrap();
        assert_eq!(spec.symbol, "BTCUSDT");
        assert_eq!(spec.tick_size, dec!(0.10));
        assert_eq!(spec.qty_step, dec!(0.001));
    }

    #[test]
    fn other_contracts_are_skipped() {
        let usdc = info(
            r#"{"symbol": "BTCPERP", "contractType": "LinearPerpetual", "quoteCoin": "USDC",
                "priceFilter": {"tickSize": "0.5"}, "lotSizeFilter": {"qtyStep": "0.001"}}"#,
        );
        assert_eq!(usdc.to_spec(), Err(SpecSkip::NotUsdtPerpetual));

        let future = info(
            r#"{"symbol": "BTCUSDT-27MAR26", "contractType": "LinearFutures", "quoteCoin": "USDT"}"#,
        );
        assert_eq!(future.to_spec(), Err(SpecSkip::NotUsdtPerpetual));
    }

    #[test]
    fn missing_filter_is_skipped() {
        let inst = info(
            r#"{"symbol": "ETHUSDT", "contractType": "LinearPerpetual", "quoteCoin": "USDT",
                "priceFilter": {"tickSize": "0.01"}}"#,
        );
        assert_eq!(inst.to_spec(), Err(SpecSkip::MissingFilter));
    }

    #[test]
    fn non_positive_filters_are_skipped() {
        let zero_tick = info(
            r#"{"symbol": "ZEROUSDT", "contractType": "LinearPerpetual", "quoteCoin": "USDT",
                "priceFilter": {"tickSize": "0"}, "lotSizeFilter": {"qtyStep": "0.1"}}"#,
        );
        assert_eq!(zero_tick.to_spec(), Err(SpecSkip::NonPositive(dec!(0))));

        let negative_step = info(
            r#"{"symbol": "NEGUSDT", "contractType": "LinearPerpetual", "quoteCoin": "USDT",
                "priceFilter": {"tickSize": "0.01"}, "lotSizeFilter": {"qtyStep": "-1"}}"#,
        );
        assert_eq!(negative_step.to_spec(), Err(SpecSkip::NonPositive(dec!(-1))));
    }
}
