//! Bybit V5 REST client for linear-perpetual instrument specifications.
//!
//! Walks `GET /v5/market/instruments-info?category=linear` page by page and
//! keeps the tick size and quantity step of every USDT perpetual.

use std::collections::BTreeMap;

use reqwest::Url;
use tracing::{debug, warn};

use crate::auth::sign_request;
use crate::config::BybitConfig;
use crate::models::spec::{InstrumentsInfoResponse, InstrumentsInfoResult, SpecSkip};
use crate::models::{Credentials, SymbolSpec};
use crate::specs::SpecSource;
use crate::{GridError, Result};

const INSTRUMENTS_PATH: &str = "/v5/market/instruments-info";
const CATEGORY: &str = "linear";

/// Largest page size the endpoint accepts.
const PAGE_LIMIT: &str = "1000";

/// Stops following cursors after this many pages.
const MAX_PAGES: usize = 100;

/// Thin async client over the Bybit REST API.
#[derive(Debug, Clone)]
pub struct BybitClient {
    http: reqwest::Client,
    base_url: String,
    recv_window_ms: u64,
}

impl BybitClient {
    /// Builds a client with the configured endpoint and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &BybitConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GridError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            recv_window_ms: config.recv_window_ms,
        })
    }

    /// Fetches one page of linear instruments.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Http`] on transport or HTTP status failures,
    /// [`GridError::Exchange`] when `retCode` is non-zero, and
    /// [`GridError::MalformedMessage`] when the reply has no `result`.
    pub async fn instruments_page(
        &self,
        cursor: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<InstrumentsInfoResult> {
        let mut url = Url::parse(&format!("{}{INSTRUMENTS_PATH}", self.base_url))
            .map_err(|e| GridError::Config(format!("invalid Bybit REST url: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("category", CATEGORY);
            query.append_pair("limit", PAGE_LIMIT);
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }

        let mut request = self.http.get(url.clone());
        if let Some(credentials) = credentials {
            let signed = sign_request(credentials, self.recv_window_ms, url.query().unwrap_or(""))?;
            for (name, value) in signed.pairs() {
                request = request.header(name, value);
            }
        }

        let response = request.send().await?.error_for_status()?;
        let body: InstrumentsInfoResponse = response.json().await?;

        if body.ret_code != 0 {
            return Err(GridError::Exchange {
                code: body.ret_code,
                message: body.ret_msg,
            });
        }
        body.result.ok_or_else(|| {
            GridError::MalformedMessage("missing result in instruments-info response".into())
        })
    }
}

impl SpecSource for BybitClient {
    async fn fetch_specs(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<BTreeMap<String, SymbolSpec>> {
        let mut specs = BTreeMap::new();
        let mut cursor: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let result = self.instruments_page(cursor.as_deref(), credentials).await?;
            debug!(page, listed = result.list.len(), "Fetched instruments page");

            for info in &result.list {
                match info.to_spec() {
                    Ok(spec) => {
                        specs.insert(spec.symbol.clone(), spec);
                    }
                    Err(SpecSkip::Unparsable(raw)) => {
                        warn!(symbol = %info.symbol, value = %raw, "Skipping instrument with unparsable filter");
                    }
                    Err(SpecSkip::NonPositive(value)) => {
                        warn!(symbol = %info.symbol, %value, "Skipping instrument with non-positive filter");
                    }
                    Err(SpecSkip::NotUsdtPerpetual | SpecSkip::MissingFilter) => {}
                }
            }

            cursor = result.next_page_cursor.filter(|c| !c.is_empty());
            if cursor.is_none() {
                return Ok(specs);
            }
        }

        warn!(pages = MAX_PAGES, "Stopped following instruments-info cursor");
        Ok(specs)
    }
}
