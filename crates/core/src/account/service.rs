//! Account service: opening, listing, deposits and withdrawals.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use fxledger_shared::config::LedgerConfig;
use fxledger_shared::types::{CurrencyCode, CurrencyCodeError, UserId};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::store::AccountStore;
use super::types::Account;
use crate::error::{LedgerError, LedgerResult};
use crate::rates::RateProvider;
use crate::users::Principal;

/// Ledger policy derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Currency of the account every new user starts with.
    pub opening_currency: CurrencyCode,
    /// Currencies that may be deposited or withdrawn directly.
    pub deposit_currencies: BTreeSet<CurrencyCode>,
}

impl LedgerPolicy {
    /// Builds the policy from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured currency code is malformed.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, CurrencyCodeError> {
        let opening_currency = CurrencyCode::new(&config.opening_currency)?;
        let deposit_currencies = config
            .deposit_currencies
            .iter()
            .map(|code| CurrencyCode::new(code))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            opening_currency,
            deposit_currencies,
        })
    }

    /// Fails with `UnsupportedCurrency` unless deposits are allowed in `currency`.
    pub fn ensure_depositable(&self, currency: &CurrencyCode) -> LedgerResult<()> {
        if self.deposit_currencies.contains(currency) {
            Ok(())
        } else {
            Err(LedgerError::UnsupportedCurrency(currency.clone()))
        }
    }
}

/// Service for account lifecycle and single-account balance changes.
pub struct AccountService<S: AccountStore, R: RateProvider> {
    accounts: Arc<S>,
    rates: Arc<R>,
    policy: LedgerPolicy,
}

impl<S: AccountStore, R: RateProvider> AccountService<S, R> {
    /// Creates a new account service.
    #[must_use]
    pub fn new(accounts: Arc<S>, rates: Arc<R>, policy: LedgerPolicy) -> Self {
        Self {
            accounts,
            rates,
            policy,
        }
    }

    /// Opens an account in a currency the rate provider supports.
    pub async fn open_account(
        &self,
        principal: &Principal,
        currency: &CurrencyCode,
    ) -> LedgerResult<Account> {
        principal.ensure_active()?;

        let supported = self.rates.supported_currencies().await?;
        if !supported.contains_key(currency) {
            warn!(user_id = %principal.user_id, currency = %currency, "Rejected unsupported currency");
            return Err(LedgerError::UnsupportedCurrency(currency.clone()));
        }

        let account = self
            .accounts
            .create_account(principal.user_id, currency)
            .await?;
        info!(
            user_id = %principal.user_id,
            account_id = %account.id,
            currency = %currency,
            "Account opened"
        );
        Ok(account)
    }

    /// Lists the principal's own accounts.
    pub async fn my_accounts(&self, principal: &Principal) -> LedgerResult<Vec<Account>> {
        principal.ensure_active()?;
        self.accounts.list_accounts(principal.user_id).await
    }

    /// Lists another user's accounts. Administrators only.
    pub async fn accounts_of(
        &self,
        admin: &Principal,
        owner: UserId,
    ) -> LedgerResult<Vec<Account>> {
        admin.ensure_superuser()?;
        let accounts = self.accounts.list_accounts(owner).await?;
        if accounts.is_empty() {
            return Err(LedgerError::not_found(format!("accounts of user {owner}")));
        }
        Ok(accounts)
    }

    /// Adds funds to the principal's open account.
    pub async fn deposit(
        &self,
        principal: &Principal,
        currency: &CurrencyCode,
        amount: Decimal,
    ) -> LedgerResult<Account> {
        self.adjust(principal, currency, amount, amount).await
    }

    /// Takes funds from the principal's open account.
    pub async fn withdraw(
        &self,
        principal: &Principal,
        currency: &CurrencyCode,
        amount: Decimal,
    ) -> LedgerResult<Account> {
        self.adjust(principal, currency, amount, -amount).await
    }

    /// Closes the principal's open account in `currency`. The balance must be zero.
    pub async fn close_account(
        &self,
        principal: &Principal,
        currency: &CurrencyCode,
    ) -> LedgerResult<Account> {
        principal.ensure_can_transact()?;
        let account = self
            .accounts
            .get_open_account(principal.user_id, currency)
            .await?;
        let closed = self.accounts.close_account(account.id).await?;
        info!(user_id = %principal.user_id, account_id = %closed.id, "Account closed");
        Ok(closed)
    }

    async fn adjust(
        &self,
        principal: &Principal,
        currency: &CurrencyCode,
        amount: Decimal,
        delta: Decimal,
    ) -> LedgerResult<Account> {
        principal.ensure_can_transact()?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.policy.ensure_depositable(currency)?;

        let mut account = self
            .accounts
            .get_open_account(principal.user_id, currency)
            .await?;
        match self.accounts.adjust_balance(account.id, delta).await {
            Ok(balance) => {
                info!(
                    user_id = %principal.user_id,
                    account_id = %account.id,
                    delta = %delta,
                    balance = %balance,
                    "Balance adjusted"
                );
                account.balance = balance;
                account.updated_at = Utc::now();
                Ok(account)
            }
            Err(e) => {
                warn!(account_id = %account.id, delta = %delta, error = %e, "Balance adjustment rejected");
                Err(e)
            }
        }
    }
}
