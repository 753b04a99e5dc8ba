//! In-memory implementation of the store traits.
//!
//! Each account sits behind its own `tokio::sync::Mutex`; `DashMap` indices
//! resolve owners, usernames and open accounts without a global lock. History
//! is appended while the account locks of the movement are still held, so a
//! reader never sees a record without its balance changes or the reverse.

use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fxledger_shared::types::{AccountId, CurrencyCode, PageResponse, UserId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};

use crate::account::{Account, AccountStore, CommittedMovement, Movement};
use crate::error::{LedgerError, LedgerResult};
use crate::history::{
    ConversionRecord, HistoryFilter, HistoryLedger, LedgerEntry, LedgerRecord, TransferRecord,
};
use crate::users::{NewUser, User, UserDirectory, UserFilter, UserFlagsUpdate, UserProfileUpdate};

type AccountHandle = Arc<Mutex<Account>>;

/// Ledger state held in process memory.
#[derive(Default)]
pub struct InMemoryLedger {
    users: DashMap<UserId, User>,
    usernames: DashMap<String, UserId>,
    accounts: DashMap<AccountId, AccountHandle>,
    owned: DashMap<UserId, Vec<AccountId>>,
    open_accounts: DashMap<(UserId, CurrencyCode), AccountId>,
    conversions: RwLock<Vec<ConversionRecord>>,
    transfers: RwLock<Vec<TransferRecord>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed user, e.g. a bootstrap administrator.
    ///
    /// Fails with `AlreadyExists` when the username is taken.
    pub fn insert_user(&self, user: User) -> LedgerResult<User> {
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(LedgerError::AlreadyExists(format!(
                "username {}",
                user.username
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    /// Sums the balances of every account, open or closed, in `currency`.
    pub async fn total_balance(&self, currency: &CurrencyCode) -> Decimal {
        let handles: Vec<AccountHandle> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut total = Decimal::ZERO;
        for handle in handles {
            let account = handle.lock().await;
            if &account.currency == currency {
                total += account.balance;
            }
        }
        total
    }

    fn handle(&self, id: AccountId) -> LedgerResult<AccountHandle> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::not_found(format!("account {id}")))
    }

    fn open_account_locked(&self, owner: UserId, currency: &CurrencyCode) -> LedgerResult<Account> {
        match self.open_accounts.entry((owner, currency.clone())) {
            Entry::Occupied(_) => Err(LedgerError::AlreadyExists(format!(
                "open {currency} account for user {owner}"
            ))),
            Entry::Vacant(slot) => {
                let account = Account::open(owner, currency.clone());
                self.accounts
                    .insert(account.id, Arc::new(Mutex::new(account.clone())));
                self.owned.entry(owner).or_default().push(account.id);
                slot.insert(account.id);
                Ok(account)
            }
        }
    }

    async fn append(&self, entry: &LedgerEntry) {
        match entry {
            LedgerEntry::Conversion(record) => self.conversions.write().await.push(record.clone()),
            LedgerEntry::Transfer(record) => self.transfers.write().await.push(record.clone()),
        }
    }
}

/// Newest-first page over an append-ordered log.
fn page_newest_first<T: Clone>(
    log: &[T],
    filter: &HistoryFilter,
    matches: impl Fn(&T) -> bool,
) -> PageResponse<T> {
    let matching: Vec<&T> = log.iter().rev().filter(|item| matches(item)).collect();
    let total = matching.len() as u64;
    let offset = usize::try_from(filter.page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(filter.page.limit()).unwrap_or(usize::MAX);
    let data = matching
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();
    PageResponse::new(data, filter.page, total)
}

impl AccountStore for InMemoryLedger {
    async fn get_open_account(
        &self,
        owner: UserId,
        currency: &CurrencyCode,
    ) -> LedgerResult<Account> {
        let missing = || LedgerError::not_found(format!("open {currency} account for user {owner}"));
        let id = self
            .open_accounts
            .get(&(owner, currency.clone()))
            .map(|entry| *entry.value())
            .ok_or_else(missing)?;

        let account = self.handle(id)?.lock().await.clone();
        if account.is_open {
            Ok(account)
        } else {
            Err(missing())
        }
    }

    async fn create_account(
        &self,
        owner: UserId,
        currency: &CurrencyCode,
    ) -> LedgerResult<Account> {
        if !self.users.contains_key(&owner) {
            return Err(LedgerError::not_found(format!("user {owner}")));
        }
        self.open_account_locked(owner, currency)
    }

    async fn list_accounts(&self, owner: UserId) -> LedgerResult<Vec<Account>> {
        let ids = self
            .owned
            .get(&owner)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            accounts.push(self.handle(id)?.lock().await.clone());
        }
        accounts.sort_by_key(|a| (a.created_at, a.id));
        Ok(accounts)
    }

    async fn adjust_balance(&self, account_id: AccountId, delta: Decimal) -> LedgerResult<Decimal> {
        let handle = self.handle(account_id)?;
        let mut account = handle.lock().await;
        account.ensure_open()?;
        let balance = account.balance_after(delta)?;
        account.balance = balance;
        account.updated_at = Utc::now();
        Ok(balance)
    }

    async fn commit_movement(
        &self,
        movement: Movement,
        record: LedgerRecord,
    ) -> LedgerResult<CommittedMovement> {
        movement.validate()?;

        let [low, high] = movement.lock_order();
        let low_handle = self.handle(low)?;
        let high_handle = self.handle(high)?;
        let mut low_guard = low_handle.lock().await;
        let mut high_guard = high_handle.lock().await;

        let (debit, credit) = if movement.debit == low {
            (&mut *low_guard, &mut *high_guard)
        } else {
            (&mut *high_guard, &mut *low_guard)
        };

        let (debit_balance, credit_balance) = movement.plan(debit, credit, &record)?;

        let now = Utc::now();
        let entry = record.into_entry(now);
        self.append(&entry).await;

        debit.balance = debit_balance;
        debit.updated_at = now;
        credit.balance = credit_balance;
        credit.updated_at = now;

        Ok(CommittedMovement {
            debited: debit.clone(),
            credited: credit.clone(),
            entry,
        })
    }

    async fn close_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        let handle = self.handle(account_id)?;
        let mut account = handle.lock().await;
        account.ensure_open()?;
        if !account.balance.is_zero() {
            return Err(LedgerError::AccountNotEmpty(account_id));
        }

        account.is_open = false;
        account.updated_at = Utc::now();
        self.open_accounts
            .remove_if(&(account.owner_id, account.currency.clone()), |_, id| *id == account_id);
        Ok(account.clone())
    }
}

impl UserDirectory for InMemoryLedger {
    async fn find_user(&self, id: UserId) -> LedgerResult<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create_user(
        &self,
        input: NewUser,
        opening_currency: &CurrencyCode,
    ) -> LedgerResult<(User, Account)> {
        let slot = match self.usernames.entry(input.username.clone()) {
            Entry::Occupied(_) => {
                return Err(LedgerError::AlreadyExists(format!(
                    "username {}",
                    input.username
                )));
            }
            Entry::Vacant(slot) => slot,
        };

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: input.username,
            first_name: input.first_name,
            last_name: input.last_name,
            is_active: true,
            is_approved: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        let account = match self.open_account_locked(user.id, opening_currency) {
            Ok(account) => account,
            Err(e) => {
                self.users.remove(&user.id);
                return Err(e);
            }
        };
        slot.insert(user.id);
        Ok((user, account))
    }

    async fn list_users(&self, filter: UserFilter) -> LedgerResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|user| match filter {
                UserFilter::All => true,
                UserFilter::Pending => !user.is_superuser && !user.is_approved,
                UserFilter::Approved => !user.is_superuser && user.is_approved,
            })
            .collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    async fn update_flags(&self, id: UserId, update: UserFlagsUpdate) -> LedgerResult<User> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found(format!("user {id}")))?;
        if let Some(approved) = update.approved {
            user.is_approved = approved;
        }
        if let Some(active) = update.active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_profile(&self, id: UserId, update: UserProfileUpdate) -> LedgerResult<User> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found(format!("user {id}")))?;
        if let Some(first_name) = update.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            user.last_name = Some(last_name);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

impl HistoryLedger for InMemoryLedger {
    async fn conversions(&self, filter: HistoryFilter) -> LedgerResult<PageResponse<ConversionRecord>> {
        let log = self.conversions.read().await;
        Ok(page_newest_first(&log, &filter, |r| filter.matches_conversion(r)))
    }

    async fn transfers(&self, filter: HistoryFilter) -> LedgerResult<PageResponse<TransferRecord>> {
        let log = self.transfers.read().await;
        Ok(page_newest_first(&log, &filter, |r| filter.matches_transfer(r)))
    }
}
