//! Rate provider data types.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use fxledger_shared::types::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supported currencies keyed by code, with a human readable name.
pub type CurrencySymbols = BTreeMap<CurrencyCode, String>;

/// A single conversion quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Source currency.
    pub from: CurrencyCode,
    /// Target currency.
    pub to: CurrencyCode,
    /// Amount in the source currency.
    pub amount: Decimal,
    /// Converted amount in the target currency, as returned upstream.
    pub result: Decimal,
    /// Rate used upstream (1 `from` = rate `to`), when reported.
    pub rate: Option<Decimal>,
    /// Date the rate applies to, when reported.
    pub date: Option<NaiveDate>,
}

/// Parameters for a fluctuation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluctuationQuery {
    /// First day of the window.
    pub start_date: NaiveDate,
    /// Last day of the window.
    pub end_date: NaiveDate,
    /// Base currency.
    pub base: CurrencyCode,
    /// Currencies to report against the base. Empty means all.
    pub symbols: Vec<CurrencyCode>,
}

/// Movement of one currency against the base over the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fluctuation {
    /// Rate on `start_date`.
    pub start_rate: Decimal,
    /// Rate on `end_date`.
    pub end_rate: Decimal,
    /// `end_rate - start_rate`.
    pub change: Decimal,
    /// Change in percent.
    pub change_pct: Decimal,
}

/// Fluctuation report as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluctuationSeries {
    /// First day of the window.
    pub start_date: NaiveDate,
    /// Last day of the window.
    pub end_date: NaiveDate,
    /// Base currency.
    pub base: CurrencyCode,
    /// Per-currency fluctuation.
    pub rates: BTreeMap<CurrencyCode, Fluctuation>,
}
