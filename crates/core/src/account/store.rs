//! Account persistence trait.

use fxledger_shared::types::{AccountId, CurrencyCode, UserId};
use rust_decimal::Decimal;

use super::types::{Account, CommittedMovement, Movement};
use crate::error::LedgerResult;
use crate::history::LedgerRecord;

/// Owner of account rows and of the atomic units that mutate balances.
///
/// Implementations must guarantee, for every mutating method:
/// - the balance is re-read under a lock scoped to the account;
/// - no balance ever becomes negative;
/// - when two accounts are involved, locks are taken in ascending `AccountId` order;
/// - changes become visible only on commit, and either all writes land or none do.
///
/// This trait is implemented by the db crate and by `InMemoryLedger`.
pub trait AccountStore: Send + Sync {
    /// Returns the owner's open account in `currency`, or `NotFound`.
    fn get_open_account(
        &self,
        owner: UserId,
        currency: &CurrencyCode,
    ) -> impl std::future::Future<Output = LedgerResult<Account>> + Send;

    /// Opens a zero-balance account.
    ///
    /// Fails with `AlreadyExists` if the owner already has an open account in
    /// `currency`, and with `NotFound` if the owner does not exist.
    fn create_account(
        &self,
        owner: UserId,
        currency: &CurrencyCode,
    ) -> impl std::future::Future<Output = LedgerResult<Account>> + Send;

    /// Lists all accounts of an owner, open and closed, oldest first.
    fn list_accounts(
        &self,
        owner: UserId,
    ) -> impl std::future::Future<Output = LedgerResult<Vec<Account>>> + Send;

    /// Applies `delta` to a single open account and returns the new balance.
    fn adjust_balance(
        &self,
        account_id: AccountId,
        delta: Decimal,
    ) -> impl std::future::Future<Output = LedgerResult<Decimal>> + Send;

    /// Debits one account, credits another and appends `record` to the
    /// history ledger as one atomic unit.
    fn commit_movement(
        &self,
        movement: Movement,
        record: LedgerRecord,
    ) -> impl std::future::Future<Output = LedgerResult<CommittedMovement>> + Send;

    /// Closes an account with zero balance.
    fn close_account(
        &self,
        account_id: AccountId,
    ) -> impl std::future::Future<Output = LedgerResult<Account>> + Send;
}
