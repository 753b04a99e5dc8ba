//! Integration tests for the Postgres ledger.
//!
//! These tests verify that:
//! - Registration opens exactly one RUB account and rejects duplicate usernames
//! - Profile updates change only the supplied name fields
//! - At most one open account exists per owner and currency
//! - Transfers and conversions move balances and append history in one unit
//! - History tables reject UPDATE and DELETE
//! - The balance CHECK constraint holds even for direct writes

#![allow(clippy::uninlined_format_args)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FixedRates, balance, connect, funded_user, rub, unique_name, usd};
use fxledger_core::LedgerError;
use fxledger_core::account::AccountStore;
use fxledger_core::exchange::{ConversionEngine, ConversionRequest};
use fxledger_core::history::{HistoryFilter, HistoryLedger};
use fxledger_core::transfer::{TransferEngine, TransferRequest};
use fxledger_core::users::{NewUser, UserDirectory, UserProfileUpdate};
use fxledger_db::entities::{accounts, transfers};
use fxledger_shared::types::PageRequest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, ModelTrait};

#[tokio::test]
async fn test_register_opens_single_rub_account() {
    let Some(ledger) = connect().await else {
        return;
    };
    let name = unique_name("reg");

    let (user, account) = ledger
        .users
        .create_user(NewUser::named(name.clone()), &rub())
        .await
        .unwrap();
    assert!(!user.is_approved);
    assert!(user.is_active);
    assert_eq!(account.currency, rub());
    assert_eq!(account.balance, Decimal::ZERO);

    let listed = ledger.accounts.list_accounts(user.id).await.unwrap();
    assert_eq!(listed, vec![account]);

    let duplicate = ledger
        .users
        .create_user(NewUser::named(name.clone()), &rub())
        .await;
    assert!(matches!(duplicate, Err(LedgerError::AlreadyExists(_))));

    let found = ledger.users.find_by_username(&name).await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
}

#[tokio::test]
async fn test_update_profile_keeps_unset_fields() {
    let Some(ledger) = connect().await else {
        return;
    };
    let user = funded_user(&ledger, "profile", dec!(0)).await;

    let updated = ledger
        .users
        .update_profile(
            user.user_id,
            UserProfileUpdate {
                first_name: Some("Ivan".into()),
                last_name: Some("Petrov".into()),
            },
        )
        .await
        .unwrap();
    let renamed = ledger
        .users
        .update_profile(
            user.user_id,
            UserProfileUpdate {
                first_name: Some("Pyotr".into()),
                last_name: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.full_name(), "Pyotr Petrov");
    assert!(renamed.updated_at >= updated.updated_at);

    let stored = ledger.users.find_user(user.user_id).await.unwrap().unwrap();
    assert_eq!(stored, renamed);

    let missing = ledger
        .users
        .update_profile(fxledger_shared::types::UserId::new(), UserProfileUpdate::default())
        .await;
    assert!(matches!(missing, Err(LedgerError::NotFound(_))));
}

#[tokio::test]
async fn test_one_open_account_per_currency() {
    let Some(ledger) = connect().await else {
        return;
    };
    let user = funded_user(&ledger, "open", dec!(0)).await;

    let usd_account = ledger.accounts.create_account(user.user_id, &usd()).await.unwrap();
    let again = ledger.accounts.create_account(user.user_id, &usd()).await;
    assert!(matches!(again, Err(LedgerError::AlreadyExists(_))));

    let closed = ledger.accounts.close_account(usd_account.id).await.unwrap();
    assert!(!closed.is_open);

    // A closed account frees the slot.
    let reopened = ledger.accounts.create_account(user.user_id, &usd()).await.unwrap();
    assert_ne!(reopened.id, usd_account.id);
    assert_eq!(ledger.accounts.list_accounts(user.user_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_account_for_unknown_owner_is_not_found() {
    let Some(ledger) = connect().await else {
        return;
    };

    let result = ledger
        .accounts
        .create_account(fxledger_shared::types::UserId::new(), &usd())
        .await;
    assert!(matches!(result, Err(LedgerError::NotFound(_))));
}

#[tokio::test]
async fn test_close_account_with_funds_rejected() {
    let Some(ledger) = connect().await else {
        return;
    };
    let user = funded_user(&ledger, "close", dec!(5.00)).await;
    let account = ledger.accounts.get_open_account(user.user_id, &rub()).await.unwrap();

    let result = ledger.accounts.close_account(account.id).await;
    assert!(matches!(result, Err(LedgerError::AccountNotEmpty(id)) if id == account.id));
    assert!(ledger.accounts.get_open_account(user.user_id, &rub()).await.unwrap().is_open);
}

#[tokio::test]
async fn test_transfer_moves_funds_and_appends_history() {
    let Some(ledger) = connect().await else {
        return;
    };
    let a = funded_user(&ledger, "xa", dec!(100.00)).await;
    let b = funded_user(&ledger, "xb", dec!(10.00)).await;
    let engine = TransferEngine::new(
        Arc::new(ledger.accounts.clone()),
        Arc::new(ledger.users.clone()),
    );

    let record = engine
        .transfer(
            &a,
            TransferRequest {
                recipient: b.user_id,
                currency: rub(),
                amount: dec!(40.00),
            },
        )
        .await
        .unwrap();

    assert_eq!(balance(&ledger, &a, &rub()).await, dec!(60.00));
    assert_eq!(balance(&ledger, &b, &rub()).await, dec!(50.00));

    for user in [a, b] {
        let page = ledger
            .history
            .transfers(HistoryFilter::for_user(user.user_id, PageRequest::default()))
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data, vec![record.clone()]);
    }

    let overdraw = engine
        .transfer(
            &a,
            TransferRequest {
                recipient: b.user_id,
                currency: rub(),
                amount: dec!(60.01),
            },
        )
        .await;
    assert!(matches!(overdraw, Err(LedgerError::InsufficientFunds { .. })));
    assert_eq!(balance(&ledger, &a, &rub()).await, dec!(60.00));
}

#[tokio::test]
async fn test_conversion_credits_quoted_result() {
    let Some(ledger) = connect().await else {
        return;
    };
    let user = funded_user(&ledger, "conv", dec!(1000.00)).await;
    ledger.accounts.create_account(user.user_id, &usd()).await.unwrap();
    let engine = ConversionEngine::new(
        Arc::new(ledger.accounts.clone()),
        Arc::new(FixedRates),
        Duration::from_secs(5),
    );

    let outcome = engine
        .convert(
            &user,
            ConversionRequest {
                from: rub(),
                to: usd(),
                amount: dec!(400.00),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.record.value_from, dec!(400.00));
    assert_eq!(outcome.record.value_to, dec!(5.000000));
    assert_eq!(balance(&ledger, &user, &rub()).await, dec!(600.00));
    assert_eq!(balance(&ledger, &user, &usd()).await, dec!(5.000000));

    let page = ledger
        .history
        .conversions(HistoryFilter::for_user(user.user_id, PageRequest::default()))
        .await
        .unwrap();
    assert_eq!(page.data, vec![outcome.record]);
}

#[tokio::test]
async fn test_history_rows_are_append_only() {
    let Some(ledger) = connect().await else {
        return;
    };
    let a = funded_user(&ledger, "ha", dec!(10.00)).await;
    let b = funded_user(&ledger, "hb", dec!(0)).await;
    let engine = TransferEngine::new(
        Arc::new(ledger.accounts.clone()),
        Arc::new(ledger.users.clone()),
    );
    let record = engine
        .transfer(
            &a,
            TransferRequest {
                recipient: b.user_id,
                currency: rub(),
                amount: dec!(1.00),
            },
        )
        .await
        .unwrap();

    let row = transfers::Entity::find_by_id(record.id.into_inner())
        .one(&ledger.db)
        .await
        .unwrap()
        .unwrap();

    let mut active: transfers::ActiveModel = row.clone().into();
    active.amount = Set(dec!(1000.00));
    let update = active.update(&ledger.db).await;
    assert!(update.is_err(), "Trigger should reject UPDATE on transfers");

    let delete = row.delete(&ledger.db).await;
    assert!(delete.is_err(), "Trigger should reject DELETE on transfers");
}

#[tokio::test]
async fn test_balance_check_constraint() {
    let Some(ledger) = connect().await else {
        return;
    };
    let user = funded_user(&ledger, "chk", dec!(1.00)).await;
    let account = ledger.accounts.get_open_account(user.user_id, &rub()).await.unwrap();

    let row = accounts::Entity::find_by_id(account.id.into_inner())
        .one(&ledger.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: accounts::ActiveModel = row.into();
    active.balance = Set(dec!(-0.01));
    let result = active.update(&ledger.db).await;
    assert!(result.is_err(), "CHECK constraint should reject negative balance");

    let result = ledger.accounts.adjust_balance(account.id, dec!(-1.01)).await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
    assert_eq!(balance(&ledger, &user, &rub()).await, dec!(1.00));
}
