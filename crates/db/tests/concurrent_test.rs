//! Concurrent access tests for the Postgres ledger.
//!
//! These tests verify that:
//! - Concurrent transfers that together overdraw an account leave it non-negative
//! - Transfers in opposite directions between the same pair do not deadlock

#![allow(clippy::uninlined_format_args)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{balance, connect, funded_user, rub};
use futures::future::join_all;
use fxledger_core::LedgerError;
use fxledger_core::transfer::{TransferEngine, TransferRequest};
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overdraw_exactly_one_succeeds() {
    let Some(ledger) = connect().await else {
        return;
    };
    let a = funded_user(&ledger, "oa", dec!(100.00)).await;
    let b = funded_user(&ledger, "ob", dec!(0)).await;
    let c = funded_user(&ledger, "oc", dec!(0)).await;
    let engine = Arc::new(TransferEngine::new(
        Arc::new(ledger.accounts.clone()),
        Arc::new(ledger.users.clone()),
    ));

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [b, c]
        .into_iter()
        .map(|recipient| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                engine
                    .transfer(
                        &a,
                        TransferRequest {
                            recipient: recipient.user_id,
                            currency: rub(),
                            amount: dec!(70.00),
                        },
                    )
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
        .count();
    assert_eq!(successes, 1, "results: {:?}", results);
    assert_eq!(insufficient, 1, "results: {:?}", results);

    assert_eq!(balance(&ledger, &a, &rub()).await, dec!(30.00));
    let received = balance(&ledger, &b, &rub()).await + balance(&ledger, &c, &rub()).await;
    assert_eq!(received, dec!(70.00));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_transfers_do_not_deadlock() {
    const ROUNDS: usize = 25;

    let Some(ledger) = connect().await else {
        return;
    };
    let a = funded_user(&ledger, "da", dec!(100.00)).await;
    let b = funded_user(&ledger, "db", dec!(100.00)).await;
    let engine = Arc::new(TransferEngine::new(
        Arc::new(ledger.accounts.clone()),
        Arc::new(ledger.users.clone()),
    ));

    let barrier = Arc::new(Barrier::new(ROUNDS * 2));
    let mut handles = Vec::with_capacity(ROUNDS * 2);
    for i in 0..ROUNDS * 2 {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine
                .transfer(
                    &from,
                    TransferRequest {
                        recipient: to.user_id,
                        currency: rub(),
                        amount: dec!(1.00),
                    },
                )
                .await
        }));
    }

    let results = tokio::time::timeout(Duration::from_secs(60), join_all(handles))
        .await
        .expect("transfers deadlocked");
    for result in results {
        result.unwrap().unwrap();
    }

    assert_eq!(balance(&ledger, &a, &rub()).await, dec!(100.00));
    assert_eq!(balance(&ledger, &b, &rub()).await, dec!(100.00));
}
