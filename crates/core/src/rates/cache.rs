//! Supported currency caching using Moka.
//!
//! Only the symbols listing is cached. Quotes and fluctuation reports always go
//! upstream, since a quote must be fresh for the operation that asked for it.

use std::sync::Arc;
use std::time::Duration;

use fxledger_shared::types::CurrencyCode;
use moka::sync::Cache;
use rust_decimal::Decimal;
use tracing::debug;

use super::provider::{RateError, RateProvider};
use super::types::{CurrencySymbols, FluctuationQuery, FluctuationSeries, Quote};

/// Wraps a provider and serves `supported_currencies` from cache within the TTL.
pub struct CachedRateProvider<P> {
    inner: P,
    symbols: Cache<(), Arc<CurrencySymbols>>,
}

impl<P: RateProvider> CachedRateProvider<P> {
    /// Creates a caching wrapper with the given time-to-live.
    #[must_use]
    pub fn new(inner: P, ttl: Duration) -> Self {
        let symbols = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { inner, symbols }
    }

    /// Returns the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drops the cached listing.
    pub fn invalidate(&self) {
        self.symbols.invalidate_all();
    }
}

impl<P: RateProvider> RateProvider for CachedRateProvider<P> {
    async fn convert(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> Result<Quote, RateError> {
        self.inner.convert(from, to, amount).await
    }

    async fn supported_currencies(&self) -> Result<CurrencySymbols, RateError> {
        if let Some(cached) = self.symbols.get(&()) {
            debug!(count = cached.len(), "Serving currency symbols from cache");
            return Ok((*cached).clone());
        }

        let fresh = self.inner.supported_currencies().await?;
        self.symbols.insert((), Arc::new(fresh.clone()));
        Ok(fresh)
    }

    async fn fluctuation(&self, query: &FluctuationQuery) -> Result<FluctuationSeries, RateError> {
        self.inner.fluctuation(query).await
    }
}
