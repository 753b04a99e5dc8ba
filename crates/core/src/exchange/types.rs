//! Conversion request and outcome types.

use std::fmt;

use fxledger_shared::types::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::history::ConversionRecord;

/// A request to convert funds between two of the caller's accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Source currency.
    pub from: CurrencyCode,
    /// Destination currency.
    pub to: CurrencyCode,
    /// Amount to take from the source account.
    pub amount: Decimal,
}

/// Result of a committed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// The appended history record.
    pub record: ConversionRecord,
    /// The caller's open accounts after the commit.
    pub accounts: Vec<Account>,
}

/// Phase a conversion is in. Failures are reported with the phase they
/// happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    /// Precondition checks.
    Validate,
    /// Rate lookup, outside any lock.
    FetchRate,
    /// Locked debit, credit and history append.
    ApplyAtomic,
    /// Committed.
    Done,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::FetchRate => "fetch_rate",
            Self::ApplyAtomic => "apply_atomic",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
