//! Property-based tests for conversions.
//!
//! - Debit equals the requested amount; credit equals the quoted result
//! - A failed conversion leaves both balances and the history untouched

use std::sync::Arc;
use std::time::Duration;

use fxledger_shared::types::PageRequest;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::{ConversionEngine, ConversionRequest};
use crate::account::AccountStore;
use crate::error::LedgerError;
use crate::history::{HistoryFilter, HistoryLedger};
use crate::memory::InMemoryLedger;
use crate::testing::{funded_user, rub, usd, StaticRates};

/// Strategy to generate amounts in cents (0.01 to 100,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

/// Runs one conversion on a fresh ledger and reports the outcome, both
/// balances afterwards and the number of recorded conversions.
async fn convert_once(
    balance: Decimal,
    requested: Decimal,
) -> (Result<(), LedgerError>, Decimal, Decimal, u64) {
    let store = Arc::new(InMemoryLedger::new());
    let rates = Arc::new(StaticRates::rub_usd());
    let engine = ConversionEngine::new(Arc::clone(&store), rates, Duration::from_secs(5));
    let alice = funded_user(&store, "alice", balance).await;
    store.create_account(alice.user_id, &usd()).await.unwrap();

    let result = engine
        .convert(
            &alice,
            ConversionRequest {
                from: rub(),
                to: usd(),
                amount: requested,
            },
        )
        .await
        .map(|_| ());

    let rub_after = store.get_open_account(alice.user_id, &rub()).await.unwrap().balance;
    let usd_after = store.get_open_account(alice.user_id, &usd()).await.unwrap().balance;
    let records = store
        .conversions(HistoryFilter::all(PageRequest::default()))
        .await
        .unwrap()
        .meta
        .total;
    (result, rub_after, usd_after, records)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A covered conversion debits exactly the amount and credits exactly the quote.
    #[test]
    fn prop_conversion_moves_quoted_amounts(balance in amount(), requested in amount()) {
        prop_assume!(requested <= balance);
        let rate = StaticRates::rub_usd().rate(&rub(), &usd());

        let (result, rub_after, usd_after, records) = runtime().block_on(convert_once(balance, requested));

        prop_assert!(result.is_ok());
        prop_assert_eq!(rub_after, balance - requested);
        prop_assert_eq!(usd_after, requested * rate);
        prop_assert_eq!(records, 1);
    }

    /// An uncovered conversion fails and changes nothing.
    #[test]
    fn prop_overdraw_changes_nothing(balance in amount(), extra in amount()) {
        let requested = balance + extra;

        let (result, rub_after, usd_after, records) = runtime().block_on(convert_once(balance, requested));

        let is_insufficient = matches!(result, Err(LedgerError::InsufficientFunds { .. }));
        prop_assert!(is_insufficient);
        prop_assert_eq!(rub_after, balance);
        prop_assert_eq!(usd_after, Decimal::ZERO);
        prop_assert_eq!(records, 0);
    }
}
