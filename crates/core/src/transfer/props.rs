//! Property-based tests for transfers.
//!
//! - The sum of balances in a currency is unchanged by any sequence of transfers
//! - No balance ever becomes negative

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::{TransferEngine, TransferRequest};
use crate::account::AccountStore;
use crate::memory::InMemoryLedger;
use crate::testing::{funded_user, rub};

/// Strategy to generate balances in cents (0.00 to 1,000.00).
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate `(from, to, amount)` steps between three users.
fn steps() -> impl Strategy<Value = Vec<(usize, usize, Decimal)>> {
    prop::collection::vec(
        (0usize..3, 0usize..3, (1i64..60_000i64).prop_map(|cents| Decimal::new(cents, 2))),
        1..30,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_transfers_conserve_total(
        initial in prop::collection::vec(balance(), 3),
        steps in steps(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let (total_before, total_after, balances) = runtime.block_on(async {
            let store = Arc::new(InMemoryLedger::new());
            let engine = TransferEngine::new(Arc::clone(&store), Arc::clone(&store));

            let mut users = Vec::new();
            for (i, amount) in initial.iter().enumerate() {
                users.push(funded_user(&store, &format!("user{i}"), *amount).await);
            }
            let total_before = store.total_balance(&rub()).await;

            for (from, to, amount) in &steps {
                // Rejections (self transfer, overdraw) are expected and must change nothing.
                let _ = engine
                    .transfer(
                        &users[*from],
                        TransferRequest {
                            recipient: users[*to].user_id,
                            currency: rub(),
                            amount: *amount,
                        },
                    )
                    .await;
            }

            let mut balances = Vec::new();
            for user in &users {
                balances.push(store.get_open_account(user.user_id, &rub()).await.unwrap().balance);
            }
            (total_before, store.total_balance(&rub()).await, balances)
        });

        prop_assert_eq!(total_before, initial.iter().copied().sum::<Decimal>());
        prop_assert_eq!(total_before, total_after);
        for balance in balances {
            prop_assert!(balance >= Decimal::ZERO);
        }
    }
}
