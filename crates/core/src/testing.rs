//! Fixtures and test doubles for unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use fxledger_shared::types::{CurrencyCode, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::account::AccountStore;
use crate::memory::InMemoryLedger;
use crate::rates::{
    CurrencySymbols, Fluctuation, FluctuationQuery, FluctuationSeries, Quote, RateError,
    RateProvider,
};
use crate::users::{NewUser, Principal, User, UserDirectory, UserFlagsUpdate};

pub fn rub() -> CurrencyCode {
    CurrencyCode::new("RUB").unwrap()
}

pub fn usd() -> CurrencyCode {
    CurrencyCode::new("USD").unwrap()
}

pub fn eur() -> CurrencyCode {
    CurrencyCode::new("EUR").unwrap()
}

/// Inserts an approved superuser named `root`.
pub async fn admin(store: &InMemoryLedger) -> Principal {
    let now = Utc::now();
    let user = User {
        id: UserId::new(),
        username: "root".to_string(),
        first_name: None,
        last_name: None,
        is_active: true,
        is_approved: true,
        is_superuser: true,
        created_at: now,
        updated_at: now,
    };
    store.insert_user(user).unwrap().principal()
}

/// Registers a user with a RUB account and approves them.
pub async fn approved_user(store: &InMemoryLedger, username: &str) -> Principal {
    let (user, _) = store
        .create_user(NewUser::named(username), &rub())
        .await
        .unwrap();
    store
        .update_flags(
            user.id,
            UserFlagsUpdate {
                approved: Some(true),
                active: None,
            },
        )
        .await
        .unwrap()
        .principal()
}

/// Registers and approves a user, then deposits `rub_balance` on their RUB account.
pub async fn funded_user(store: &InMemoryLedger, username: &str, rub_balance: Decimal) -> Principal {
    let principal = approved_user(store, username).await;
    if rub_balance > Decimal::ZERO {
        let account = store
            .get_open_account(principal.user_id, &rub())
            .await
            .unwrap();
        store.adjust_balance(account.id, rub_balance).await.unwrap();
    }
    principal
}

/// Rate provider with a fixed rate table and call counters.
pub struct StaticRates {
    rates: BTreeMap<(CurrencyCode, CurrencyCode), Decimal>,
    symbols: CurrencySymbols,
    failure: Mutex<Option<RateError>>,
    result_override: Mutex<Option<Decimal>>,
    delay: Option<Duration>,
    symbol_calls: AtomicUsize,
    convert_calls: AtomicUsize,
}

impl StaticRates {
    /// RUB, USD and EUR with fixed cross rates.
    pub fn rub_usd() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert((rub(), usd()), dec!(0.0125));
        rates.insert((usd(), rub()), dec!(80));
        rates.insert((rub(), eur()), dec!(0.011));
        rates.insert((eur(), rub()), dec!(90));
        rates.insert((usd(), eur()), dec!(0.9));
        rates.insert((eur(), usd()), dec!(1.1));

        let symbols = [
            (rub(), "Russian Ruble"),
            (usd(), "United States Dollar"),
            (eur(), "Euro"),
        ]
        .into_iter()
        .map(|(code, name)| (code, name.to_string()))
        .collect();

        Self {
            rates,
            symbols,
            failure: Mutex::new(None),
            result_override: Mutex::new(None),
            delay: None,
            symbol_calls: AtomicUsize::new(0),
            convert_calls: AtomicUsize::new(0),
        }
    }

    /// Delays every call by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes every call fail with `error` until `recover` is called.
    pub fn fail_with(&self, error: RateError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Clears a failure set by `fail_with`.
    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Forces `convert` to report `result` regardless of the rate table.
    pub fn quote_result(&self, result: Decimal) {
        *self.result_override.lock().unwrap() = Some(result);
    }

    pub fn symbol_calls(&self) -> usize {
        self.symbol_calls.load(Ordering::SeqCst)
    }

    pub fn convert_calls(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }

    pub fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Decimal {
        self.rates[&(from.clone(), to.clone())]
    }

    async fn enter(&self) -> Result<(), RateError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn lookup(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, RateError> {
        self.rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| RateError::Rejected(format!("no rate for {from}/{to}")))
    }
}

impl RateProvider for StaticRates {
    async fn convert(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> Result<Quote, RateError> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        let rate = self.lookup(from, to)?;
        let result = self
            .result_override
            .lock()
            .unwrap()
            .unwrap_or(amount * rate);

        Ok(Quote {
            from: from.clone(),
            to: to.clone(),
            amount,
            result,
            rate: Some(rate),
            date: Some(Utc::now().date_naive()),
        })
    }

    async fn supported_currencies(&self) -> Result<CurrencySymbols, RateError> {
        self.symbol_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        Ok(self.symbols.clone())
    }

    async fn fluctuation(&self, query: &FluctuationQuery) -> Result<FluctuationSeries, RateError> {
        self.enter().await?;
        let symbols: Vec<CurrencyCode> = if query.symbols.is_empty() {
            self.symbols
                .keys()
                .filter(|code| **code != query.base)
                .cloned()
                .collect()
        } else {
            query.symbols.clone()
        };

        let mut rates = BTreeMap::new();
        for symbol in symbols {
            let rate = self.lookup(&query.base, &symbol)?;
            rates.insert(
                symbol,
                Fluctuation {
                    start_rate: rate,
                    end_rate: rate,
                    change: Decimal::ZERO,
                    change_pct: Decimal::ZERO,
                },
            );
        }

        Ok(FluctuationSeries {
            start_date: query.start_date,
            end_date: query.end_date,
            base: query.base.clone(),
            rates,
        })
    }
}
