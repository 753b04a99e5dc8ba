//! Transfer engine.

use std::sync::Arc;

use fxledger_shared::types::{CurrencyCode, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::account::{AccountStore, Movement};
use crate::error::{LedgerError, LedgerResult};
use crate::history::{LedgerRecord, NewTransfer, TransferRecord};
use crate::users::{Principal, UserDirectory};

/// A request to send funds to another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Receiving user.
    pub recipient: UserId,
    /// Currency to move. Both parties need an open account in it.
    pub currency: CurrencyCode,
    /// Amount to move.
    pub amount: Decimal,
}

/// Moves funds between two users' accounts in one currency.
///
/// No external calls are made; the whole operation is one atomic unit after
/// validation.
pub struct TransferEngine<S: AccountStore, U: UserDirectory> {
    accounts: Arc<S>,
    users: Arc<U>,
}

impl<S: AccountStore, U: UserDirectory> TransferEngine<S, U> {
    /// Creates a new transfer engine.
    #[must_use]
    pub fn new(accounts: Arc<S>, users: Arc<U>) -> Self {
        Self { accounts, users }
    }

    /// Transfers `request.amount` from the principal to the recipient.
    pub async fn transfer(
        &self,
        principal: &Principal,
        request: TransferRequest,
    ) -> LedgerResult<TransferRecord> {
        match self.run(principal, &request).await {
            Ok(record) => {
                info!(
                    transfer_id = %record.id,
                    from_user = %record.from_user,
                    to_user = %record.to_user,
                    currency = %record.currency,
                    amount = %record.amount,
                    "Transfer committed"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(
                    from_user = %principal.user_id,
                    to_user = %request.recipient,
                    currency = %request.currency,
                    amount = %request.amount,
                    error = %e,
                    "Transfer rejected"
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        principal: &Principal,
        request: &TransferRequest,
    ) -> LedgerResult<TransferRecord> {
        principal.ensure_can_transact()?;
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(request.amount));
        }
        if request.recipient == principal.user_id {
            return Err(LedgerError::SelfTransfer);
        }

        let recipient = self
            .users
            .find_user(request.recipient)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("user {}", request.recipient)))?;
        if !recipient.can_transact() {
            return Err(LedgerError::RecipientUnavailable);
        }

        let source = self
            .accounts
            .get_open_account(principal.user_id, &request.currency)
            .await?;
        source.balance_after(-request.amount)?;
        let destination = self
            .accounts
            .get_open_account(recipient.id, &request.currency)
            .await?;

        let movement = Movement {
            debit: source.id,
            debit_amount: request.amount,
            credit: destination.id,
            credit_amount: request.amount,
        };
        let record = LedgerRecord::Transfer(NewTransfer {
            from_user: principal.user_id,
            to_user: recipient.id,
            currency: request.currency.clone(),
            amount: request.amount,
        });

        self.accounts
            .commit_movement(movement, record)
            .await?
            .entry
            .into_transfer()
    }
}
