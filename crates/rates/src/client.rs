//! Exchange rate API client.
//!
//! Talks to an exchangerates-data style API: `/convert`, `/symbols` and
//! `/fluctuation`, authenticated with an `apikey` header.

use std::time::Duration;

use fxledger_core::rates::{
    CurrencySymbols, FluctuationQuery, FluctuationSeries, Quote, RateError, RateProvider,
};
use fxledger_shared::config::RatesConfig;
use fxledger_shared::types::CurrencyCode;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::wire;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "apikey";

/// HTTP rate provider.
#[derive(Debug, Clone)]
pub struct ExchangeRatesClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ExchangeRatesClient {
    /// Creates a client against `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RateError> {
        if api_key.trim().is_empty() {
            return Err(RateError::Rejected(
                "exchange rate API key cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// See [`ExchangeRatesClient::new`].
    pub fn from_config(config: &RatesConfig) -> Result<Self, RateError> {
        Self::new(&config.base_url, &config.api_key, config.timeout())
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, RateError> {
        let url = format!("{}/{path}", self.base_url);
        debug!(url = %url, "Requesting exchange rate API");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(map_request_error)?;

        let response = check_response_status(response)?;
        response.text().await.map_err(map_request_error)
    }
}

fn map_request_error(e: reqwest::Error) -> RateError {
    if e.is_timeout() {
        RateError::Timeout
    } else {
        RateError::Transport(e.to_string())
    }
}

fn check_response_status(response: Response) -> Result<Response, RateError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        warn!(status = status.as_u16(), url = %response.url(), "Exchange rate API returned an error status");
        Err(RateError::Upstream(status.as_u16()))
    }
}

impl RateProvider for ExchangeRatesClient {
    async fn convert(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> Result<Quote, RateError> {
        let body = self
            .get(
                "convert",
                &[
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                    ("amount", amount.to_string()),
                ],
            )
            .await?;
        wire::parse_quote(&body, from, to, amount)
    }

    async fn supported_currencies(&self) -> Result<CurrencySymbols, RateError> {
        let body = self.get("symbols", &[]).await?;
        wire::parse_symbols(&body)
    }

    async fn fluctuation(&self, query: &FluctuationQuery) -> Result<FluctuationSeries, RateError> {
        let mut params = vec![
            ("start_date", query.start_date.to_string()),
            ("end_date", query.end_date.to_string()),
            ("base", query.base.to_string()),
        ];
        if !query.symbols.is_empty() {
            let symbols: Vec<&str> = query.symbols.iter().map(CurrencyCode::as_str).collect();
            params.push(("symbols", symbols.join(",")));
        }

        let body = self.get("fluctuation", &params).await?;
        wire::parse_fluctuation(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_empty_api_key() {
        let result = ExchangeRatesClient::new("http://localhost", "  ", Duration::from_secs(1));
        assert!(matches!(result, Err(RateError::Rejected(ref m)) if m.contains("cannot be empty")));
    }

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let config = RatesConfig {
            base_url: "https://rates.example.com/exchangerates_data/".to_string(),
            api_key: "key".to_string(),
            timeout_secs: 3,
            symbols_ttl_secs: 60,
        };

        let client = ExchangeRatesClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://rates.example.com/exchangerates_data");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client =
            ExchangeRatesClient::new("http://127.0.0.1:9", "key", Duration::from_secs(2)).unwrap();
        let rub = CurrencyCode::new("RUB").unwrap();
        let usd = CurrencyCode::new("USD").unwrap();

        let result = client.convert(&rub, &usd, Decimal::ONE).await;
        assert!(matches!(
            result,
            Err(RateError::Transport(_) | RateError::Timeout)
        ));
    }
}
