//! Account domain types.

use chrono::{DateTime, Utc};
use fxledger_shared::types::{AccountId, CurrencyCode, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::history::{LedgerEntry, LedgerRecord};

/// A per-user, per-currency balance container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning user.
    pub owner_id: UserId,
    /// Account currency.
    pub currency: CurrencyCode,
    /// Current balance. Never negative.
    pub balance: Decimal,
    /// Closed accounts accept no movements.
    pub is_open: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last balance or state change.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new open account with zero balance.
    #[must_use]
    pub fn open(owner_id: UserId, currency: CurrencyCode) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            owner_id,
            currency,
            balance: Decimal::ZERO,
            is_open: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Computes the balance after applying `delta`, without mutating.
    ///
    /// Fails with `InsufficientFunds` if the result would be negative and with
    /// `BalanceOverflow` if it leaves the `Decimal` range.
    pub fn balance_after(&self, delta: Decimal) -> LedgerResult<Decimal> {
        let next = self
            .balance
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow(self.id))?;
        if next < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds {
                account_id: self.id,
                balance: self.balance,
                requested: -delta,
            });
        }
        Ok(next)
    }

    /// Fails with `NotFound` if the account is closed.
    pub fn ensure_open(&self) -> LedgerResult<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(LedgerError::not_found(format!(
                "open account {} ({})",
                self.id, self.currency
            )))
        }
    }
}

/// A debit of one account paired with a credit of another.
///
/// For transfers both amounts are equal; for conversions the credit amount is
/// the quoted result in the destination currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    /// Account to debit.
    pub debit: AccountId,
    /// Amount taken from the debit account.
    pub debit_amount: Decimal,
    /// Account to credit.
    pub credit: AccountId,
    /// Amount added to the credit account.
    pub credit_amount: Decimal,
}

impl Movement {
    /// Checks the structural invariants every atomic unit relies on.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.debit == self.credit {
            return Err(LedgerError::invariant(format!(
                "movement debits and credits the same account {}",
                self.debit
            )));
        }
        if self.debit_amount <= Decimal::ZERO {
            return Err(LedgerError::invariant(format!(
                "non-positive debit {} reached the atomic unit",
                self.debit_amount
            )));
        }
        if self.credit_amount <= Decimal::ZERO {
            return Err(LedgerError::invariant(format!(
                "non-positive credit {} reached the atomic unit",
                self.credit_amount
            )));
        }
        Ok(())
    }

    /// The two accounts in lock acquisition order (ascending id).
    #[must_use]
    pub fn lock_order(&self) -> [AccountId; 2] {
        if self.debit < self.credit {
            [self.debit, self.credit]
        } else {
            [self.credit, self.debit]
        }
    }

    /// Checks the locked accounts against the movement and its record, then
    /// returns the new `(debit, credit)` balances.
    ///
    /// Nothing is mutated; callers apply the returned balances only when this
    /// succeeds.
    pub fn plan(
        &self,
        debit: &Account,
        credit: &Account,
        record: &LedgerRecord,
    ) -> LedgerResult<(Decimal, Decimal)> {
        debit.ensure_open()?;
        credit.ensure_open()?;
        record.check_against(self, debit, credit)?;
        let debit_balance = debit.balance_after(-self.debit_amount)?;
        let credit_balance = credit.balance_after(self.credit_amount)?;
        Ok((debit_balance, credit_balance))
    }
}

/// Result of a committed movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedMovement {
    /// Debited account after commit.
    pub debited: Account,
    /// Credited account after commit.
    pub credited: Account,
    /// The history entry appended in the same unit.
    pub entry: LedgerEntry,
}
