//! The `RateProvider` trait and its error type.

use fxledger_shared::types::CurrencyCode;
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{CurrencySymbols, FluctuationQuery, FluctuationSeries, Quote};

/// Failures at the exchange rate boundary.
///
/// All of them surface to ledger callers as `LedgerError::RateUnavailable`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// The lookup did not complete in time.
    #[error("rate lookup timed out")]
    Timeout,

    /// The request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success HTTP status.
    #[error("upstream returned status {0}")]
    Upstream(u16),

    /// Upstream answered but reported the request as unsuccessful.
    #[error("upstream rejected the request: {0}")]
    Rejected(String),

    /// Upstream payload could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Source of exchange rates and currency metadata.
///
/// This trait is implemented by the rates crate against the HTTP API, and by
/// test doubles.
pub trait RateProvider: Send + Sync {
    /// Converts `amount` of `from` into `to`.
    fn convert(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> impl std::future::Future<Output = Result<Quote, RateError>> + Send;

    /// Lists the currencies the provider can quote.
    fn supported_currencies(
        &self,
    ) -> impl std::future::Future<Output = Result<CurrencySymbols, RateError>> + Send;

    /// Reports how currencies moved against a base over a date window.
    fn fluctuation(
        &self,
        query: &FluctuationQuery,
    ) -> impl std::future::Future<Output = Result<FluctuationSeries, RateError>> + Send;
}
