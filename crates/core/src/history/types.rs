//! History record types.

use chrono::{DateTime, Utc};
use fxledger_shared::types::{ConversionId, CurrencyCode, PageRequest, TransferId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::{Account, Movement};
use crate::error::{LedgerError, LedgerResult};

/// A committed transfer between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Record ID.
    pub id: TransferId,
    /// Sending user.
    pub from_user: UserId,
    /// Receiving user.
    pub to_user: UserId,
    /// Currency moved.
    pub currency: CurrencyCode,
    /// Amount moved. Always positive.
    pub amount: Decimal,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

/// A committed conversion between two accounts of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Record ID.
    pub id: ConversionId,
    /// Converting user.
    pub user_id: UserId,
    /// Source currency.
    pub currency_from: CurrencyCode,
    /// Destination currency.
    pub currency_to: CurrencyCode,
    /// Amount debited in the source currency.
    pub value_from: Decimal,
    /// Amount credited in the destination currency.
    pub value_to: Decimal,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

/// Transfer to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransfer {
    /// Sending user.
    pub from_user: UserId,
    /// Receiving user.
    pub to_user: UserId,
    /// Currency moved.
    pub currency: CurrencyCode,
    /// Amount moved.
    pub amount: Decimal,
}

/// Conversion to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversion {
    /// Converting user.
    pub user_id: UserId,
    /// Source currency.
    pub currency_from: CurrencyCode,
    /// Destination currency.
    pub currency_to: CurrencyCode,
    /// Amount debited.
    pub value_from: Decimal,
    /// Amount credited.
    pub value_to: Decimal,
}

/// The history record a movement appends when it commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerRecord {
    /// Conversion between two accounts of the same user.
    Conversion(NewConversion),
    /// Transfer between two users in one currency.
    Transfer(NewTransfer),
}

impl LedgerRecord {
    /// Checks that the record describes exactly the movement between the two
    /// locked accounts.
    pub fn check_against(
        &self,
        movement: &Movement,
        debit: &Account,
        credit: &Account,
    ) -> LedgerResult<()> {
        match self {
            Self::Conversion(c) => {
                if c.value_from != movement.debit_amount || c.value_to != movement.credit_amount {
                    return Err(LedgerError::invariant(format!(
                        "conversion record {} -> {} does not match movement {} -> {}",
                        c.value_from, c.value_to, movement.debit_amount, movement.credit_amount
                    )));
                }
                if c.currency_from != debit.currency || c.currency_to != credit.currency {
                    return Err(LedgerError::invariant(format!(
                        "conversion {} -> {} recorded against accounts in {} -> {}",
                        c.currency_from, c.currency_to, debit.currency, credit.currency
                    )));
                }
                if debit.owner_id != c.user_id || credit.owner_id != c.user_id {
                    return Err(LedgerError::invariant(format!(
                        "conversion for user {} touches accounts of another user",
                        c.user_id
                    )));
                }
            }
            Self::Transfer(t) => {
                if t.amount != movement.debit_amount || t.amount != movement.credit_amount {
                    return Err(LedgerError::invariant(format!(
                        "transfer record amount {} does not match movement {} -> {}",
                        t.amount, movement.debit_amount, movement.credit_amount
                    )));
                }
                if debit.currency != t.currency || credit.currency != t.currency {
                    return Err(LedgerError::invariant(format!(
                        "transfer in {} recorded against accounts in {} and {}",
                        t.currency, debit.currency, credit.currency
                    )));
                }
                if debit.owner_id != t.from_user || credit.owner_id != t.to_user {
                    return Err(LedgerError::invariant(
                        "transfer parties do not own the movement accounts",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Assigns an id and commit time, producing the stored entry.
    #[must_use]
    pub fn into_entry(self, created_at: DateTime<Utc>) -> LedgerEntry {
        match self {
            Self::Conversion(c) => LedgerEntry::Conversion(ConversionRecord {
                id: ConversionId::new(),
                user_id: c.user_id,
                currency_from: c.currency_from,
                currency_to: c.currency_to,
                value_from: c.value_from,
                value_to: c.value_to,
                created_at,
            }),
            Self::Transfer(t) => LedgerEntry::Transfer(TransferRecord {
                id: TransferId::new(),
                from_user: t.from_user,
                to_user: t.to_user,
                currency: t.currency,
                amount: t.amount,
                created_at,
            }),
        }
    }
}

/// A stored history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEntry {
    /// Conversion record.
    Conversion(ConversionRecord),
    /// Transfer record.
    Transfer(TransferRecord),
}

impl LedgerEntry {
    /// Unwraps a conversion record.
    pub fn into_conversion(self) -> LedgerResult<ConversionRecord> {
        match self {
            Self::Conversion(record) => Ok(record),
            Self::Transfer(record) => Err(LedgerError::invariant(format!(
                "expected a conversion record, got transfer {}",
                record.id
            ))),
        }
    }

    /// Unwraps a transfer record.
    pub fn into_transfer(self) -> LedgerResult<TransferRecord> {
        match self {
            Self::Transfer(record) => Ok(record),
            Self::Conversion(record) => Err(LedgerError::invariant(format!(
                "expected a transfer record, got conversion {}",
                record.id
            ))),
        }
    }
}

/// History query scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryFilter {
    /// Restrict to records involving this user. `None` means unrestricted.
    pub user: Option<UserId>,
    /// Page to return.
    pub page: PageRequest,
}

impl HistoryFilter {
    /// Records involving `user`.
    #[must_use]
    pub fn for_user(user: UserId, page: PageRequest) -> Self {
        Self {
            user: Some(user),
            page,
        }
    }

    /// All records.
    #[must_use]
    pub fn all(page: PageRequest) -> Self {
        Self { user: None, page }
    }

    /// True if a conversion falls within the filter.
    #[must_use]
    pub fn matches_conversion(&self, record: &ConversionRecord) -> bool {
        self.user.is_none_or(|user| record.user_id == user)
    }

    /// True if a transfer falls within the filter. Both sender and recipient match.
    #[must_use]
    pub fn matches_transfer(&self, record: &TransferRecord) -> bool {
        self.user
            .is_none_or(|user| record.from_user == user || record.to_user == user)
    }
}
