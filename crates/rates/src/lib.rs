//! HTTP exchange rate provider for fxledger.
//!
//! [`ExchangeRatesClient`] implements `RateProvider` against the exchange rate
//! API. Wrap it with [`build_provider`] to serve the currency listing from cache.

mod client;
mod wire;

use fxledger_core::rates::{CachedRateProvider, RateError};
use fxledger_shared::config::RatesConfig;

pub use client::ExchangeRatesClient;

/// Builds the HTTP provider with the supported currency listing cached for
/// the configured TTL.
///
/// # Errors
///
/// Returns an error if the client cannot be created from `config`.
pub fn build_provider(
    config: &RatesConfig,
) -> Result<CachedRateProvider<ExchangeRatesClient>, RateError> {
    let client = ExchangeRatesClient::from_config(config)?;
    Ok(CachedRateProvider::new(client, config.symbols_ttl()))
}
