//! Account repository.
//!
//! Every balance change runs inside one database transaction that re-reads
//! the affected rows with `SELECT ... FOR UPDATE`. When two rows are involved
//! they are locked in ascending id order, so opposite movements between the
//! same pair of accounts cannot deadlock.

use chrono::{DateTime, Utc};
use fxledger_core::account::{Account, AccountStore, CommittedMovement, Movement};
use fxledger_core::history::LedgerRecord;
use fxledger_core::{LedgerError, LedgerResult};
use fxledger_shared::types::{AccountId, CurrencyCode, UserId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use super::history::insert_entry;
use crate::entities::accounts;
use crate::mapping::{db_error, now};

/// Postgres-backed account store.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Reads an account row and holds its row lock until the transaction ends.
async fn lock_row<C: ConnectionTrait>(conn: &C, id: AccountId) -> LedgerResult<accounts::Model> {
    accounts::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| LedgerError::not_found(format!("account {id}")))
}

async fn write_balance<C: ConnectionTrait>(
    conn: &C,
    row: accounts::Model,
    balance: Decimal,
    at: DateTime<Utc>,
) -> LedgerResult<Account> {
    let mut active: accounts::ActiveModel = row.into();
    active.balance = Set(balance);
    active.updated_at = Set(at.into());
    active.update(conn).await.map_err(db_error)?.try_into()
}

/// Inserts a zero-balance open account.
pub(crate) async fn insert_account<C: ConnectionTrait>(
    conn: &C,
    owner: UserId,
    currency: &CurrencyCode,
) -> LedgerResult<Account> {
    let account = Account::open(owner, currency.clone());
    let at = now();
    let row = accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        owner_id: Set(owner.into_inner()),
        currency: Set(currency.to_string()),
        balance: Set(Decimal::ZERO),
        is_open: Set(true),
        created_at: Set(at.into()),
        updated_at: Set(at.into()),
    };

    match row.insert(conn).await.map_err(db_error) {
        Ok(model) => model.try_into(),
        Err(LedgerError::AlreadyExists(_)) => Err(LedgerError::AlreadyExists(format!(
            "open {currency} account for user {owner}"
        ))),
        Err(LedgerError::NotFound(_)) => Err(LedgerError::not_found(format!("user {owner}"))),
        Err(e) => Err(e),
    }
}

impl AccountStore for AccountRepository {
    async fn get_open_account(
        &self,
        owner: UserId,
        currency: &CurrencyCode,
    ) -> LedgerResult<Account> {
        accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(owner.into_inner()))
            .filter(accounts::Column::Currency.eq(currency.as_str()))
            .filter(accounts::Column::IsOpen.eq(true))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| LedgerError::not_found(format!("open {currency} account for user {owner}")))?
            .try_into()
    }

    async fn create_account(
        &self,
        owner: UserId,
        currency: &CurrencyCode,
    ) -> LedgerResult<Account> {
        insert_account(&self.db, owner, currency).await
    }

    async fn list_accounts(&self, owner: UserId) -> LedgerResult<Vec<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(owner.into_inner()))
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn adjust_balance(&self, account_id: AccountId, delta: Decimal) -> LedgerResult<Decimal> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let row = lock_row(&txn, account_id).await?;
        let account = Account::try_from(row.clone())?;
        account.ensure_open()?;
        let balance = account.balance_after(delta)?;
        write_balance(&txn, row, balance, now()).await?;

        txn.commit().await.map_err(db_error)?;
        debug!(account_id = %account_id, delta = %delta, balance = %balance, "Balance adjusted");
        Ok(balance)
    }

    async fn commit_movement(
        &self,
        movement: Movement,
        record: LedgerRecord,
    ) -> LedgerResult<CommittedMovement> {
        movement.validate()?;

        // Dropping the transaction on any early return rolls it back.
        let txn = self.db.begin().await.map_err(db_error)?;

        let [low, high] = movement.lock_order();
        let low_row = lock_row(&txn, low).await?;
        let high_row = lock_row(&txn, high).await?;
        let (debit_row, credit_row) = if movement.debit == low {
            (low_row, high_row)
        } else {
            (high_row, low_row)
        };

        let debit = Account::try_from(debit_row.clone())?;
        let credit = Account::try_from(credit_row.clone())?;
        let (debit_balance, credit_balance) = movement.plan(&debit, &credit, &record)?;

        let at = now();
        let debited = write_balance(&txn, debit_row, debit_balance, at).await?;
        let credited = write_balance(&txn, credit_row, credit_balance, at).await?;
        let entry = record.into_entry(at);
        insert_entry(&txn, &entry).await?;

        txn.commit().await.map_err(db_error)?;

        Ok(CommittedMovement {
            debited,
            credited,
            entry,
        })
    }

    async fn close_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let row = lock_row(&txn, account_id).await?;
        let account = Account::try_from(row.clone())?;
        account.ensure_open()?;
        if !account.balance.is_zero() {
            return Err(LedgerError::AccountNotEmpty(account_id));
        }

        let mut active: accounts::ActiveModel = row.into();
        active.is_open = Set(false);
        active.updated_at = Set(now().into());
        let closed = active.update(&txn).await.map_err(db_error)?;

        txn.commit().await.map_err(db_error)?;
        closed.try_into()
    }
}
