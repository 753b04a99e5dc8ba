//! Conversion engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fxledger_shared::types::CurrencyCode;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::types::{ConversionOutcome, ConversionRequest, ConversionStage};
use crate::account::{Account, AccountStore, Movement};
use crate::error::{LedgerError, LedgerResult};
use crate::history::{LedgerRecord, NewConversion};
use crate::rates::{CurrencySymbols, FluctuationQuery, FluctuationSeries, Quote, RateError, RateProvider};
use crate::users::Principal;

/// Converts funds between a user's accounts at the provider's quoted rate.
pub struct ConversionEngine<S: AccountStore, R: RateProvider> {
    accounts: Arc<S>,
    rates: Arc<R>,
    rate_timeout: Duration,
}

impl<S: AccountStore, R: RateProvider> ConversionEngine<S, R> {
    /// Creates a new conversion engine.
    ///
    /// `rate_timeout` bounds every call to the rate provider.
    #[must_use]
    pub fn new(accounts: Arc<S>, rates: Arc<R>, rate_timeout: Duration) -> Self {
        Self {
            accounts,
            rates,
            rate_timeout,
        }
    }

    /// Converts `request.amount` from the caller's source account into their
    /// destination account.
    ///
    /// The rate is looked up once and never retried. On any error no balance
    /// has changed and no record was written. Once the movement commits the
    /// call succeeds.
    pub async fn convert(
        &self,
        principal: &Principal,
        request: ConversionRequest,
    ) -> LedgerResult<ConversionOutcome> {
        let mut stage = ConversionStage::Validate;
        match self.run(principal, &request, &mut stage).await {
            Ok(outcome) => {
                info!(
                    user_id = %principal.user_id,
                    conversion_id = %outcome.record.id,
                    from = %request.from,
                    to = %request.to,
                    value_from = %outcome.record.value_from,
                    value_to = %outcome.record.value_to,
                    "Conversion committed"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(
                    user_id = %principal.user_id,
                    from = %request.from,
                    to = %request.to,
                    amount = %request.amount,
                    stage = %stage,
                    error = %e,
                    "Conversion failed"
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        principal: &Principal,
        request: &ConversionRequest,
        stage: &mut ConversionStage,
    ) -> LedgerResult<ConversionOutcome> {
        let (source, destination) = self.validate(principal, request).await?;

        *stage = ConversionStage::FetchRate;
        let quote = self.fetch_quote(&request.from, &request.to, request.amount).await?;

        *stage = ConversionStage::ApplyAtomic;
        let movement = Movement {
            debit: source.id,
            debit_amount: request.amount,
            credit: destination.id,
            credit_amount: quote.result,
        };
        let record = LedgerRecord::Conversion(NewConversion {
            user_id: principal.user_id,
            currency_from: request.from.clone(),
            currency_to: request.to.clone(),
            value_from: request.amount,
            value_to: quote.result,
        });
        let committed = self.accounts.commit_movement(movement, record).await?;
        let record = committed.entry.clone().into_conversion()?;

        // Committed from here on: a failed listing must not surface as an error.
        *stage = ConversionStage::Done;
        let accounts = match self.accounts.list_accounts(principal.user_id).await {
            Ok(accounts) => accounts.into_iter().filter(|a| a.is_open).collect(),
            Err(e) => {
                warn!(
                    user_id = %principal.user_id,
                    conversion_id = %record.id,
                    error = %e,
                    "Account listing failed after commit, returning touched accounts"
                );
                vec![committed.debited, committed.credited]
            }
        };

        Ok(ConversionOutcome { record, accounts })
    }

    /// Advisory checks; the atomic unit re-checks balances under lock.
    async fn validate(
        &self,
        principal: &Principal,
        request: &ConversionRequest,
    ) -> LedgerResult<(Account, Account)> {
        principal.ensure_can_transact()?;
        ensure_convertible(&request.from, &request.to, request.amount)?;

        let source = self
            .accounts
            .get_open_account(principal.user_id, &request.from)
            .await?;
        source.balance_after(-request.amount)?;
        let destination = self
            .accounts
            .get_open_account(principal.user_id, &request.to)
            .await?;

        Ok((source, destination))
    }

    /// Looks up what `amount` of `from` is worth in `to`, without moving funds.
    pub async fn quote(
        &self,
        principal: &Principal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> LedgerResult<Quote> {
        principal.ensure_active()?;
        ensure_convertible(from, to, amount)?;
        self.fetch_quote(from, to, amount).await.inspect_err(|e| {
            warn!(from = %from, to = %to, error = %e, "Quote lookup failed");
        })
    }

    /// Reports how currencies moved against a base over a date window.
    pub async fn fluctuation(
        &self,
        principal: &Principal,
        query: &FluctuationQuery,
    ) -> LedgerResult<FluctuationSeries> {
        principal.ensure_active()?;
        if query.end_date < query.start_date {
            return Err(LedgerError::InvalidDateRange {
                start: query.start_date,
                end: query.end_date,
            });
        }
        Ok(self.bounded(self.rates.fluctuation(query)).await?)
    }

    /// Lists the currencies the provider can quote.
    pub async fn supported_currencies(
        &self,
        principal: &Principal,
    ) -> LedgerResult<CurrencySymbols> {
        principal.ensure_active()?;
        Ok(self.bounded(self.rates.supported_currencies()).await?)
    }

    async fn fetch_quote(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> LedgerResult<Quote> {
        let quote = self.bounded(self.rates.convert(from, to, amount)).await?;
        if &quote.from != from || &quote.to != to {
            return Err(RateError::Malformed(format!(
                "asked for {from}/{to}, quoted {}/{}",
                quote.from, quote.to
            ))
            .into());
        }
        if quote.result <= Decimal::ZERO {
            return Err(RateError::Malformed(format!(
                "non-positive result {} for {amount} {from}",
                quote.result
            ))
            .into());
        }
        Ok(quote)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RateError>>,
    ) -> Result<T, RateError> {
        tokio::time::timeout(self.rate_timeout, call)
            .await
            .map_err(|_| RateError::Timeout)?
    }
}

fn ensure_convertible(from: &CurrencyCode, to: &CurrencyCode, amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    if from == to {
        return Err(LedgerError::SameCurrency(from.clone()));
    }
    Ok(())
}
