//! Exchange rate provider boundary.
//!
//! The ledger never computes a conversion itself. Every converted amount is
//! taken verbatim from a single `RateProvider::convert` call.

mod cache;
mod provider;
mod types;

pub use cache::CachedRateProvider;
pub use provider::{RateError, RateProvider};
pub use types::{CurrencySymbols, Fluctuation, FluctuationQuery, FluctuationSeries, Quote};
