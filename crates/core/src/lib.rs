//! Core ledger logic for fxledger.
//!
//! This crate contains the account ledger and transaction engine with ZERO web
//! or database dependencies. Storage and exchange rates are reached through the
//! `AccountStore`, `UserDirectory`, `HistoryLedger` and `RateProvider` traits.
//!
//! # Modules
//!
//! - `account` - Per-currency accounts and balance mutation
//! - `exchange` - Conversions at an externally quoted rate
//! - `transfer` - Same-currency transfers between users
//! - `history` - Append-only conversion and transfer records
//! - `rates` - Exchange rate provider boundary and caching
//! - `users` - Users, principals and administration
//! - `memory` - In-memory store implementation

pub mod account;
pub mod error;
pub mod exchange;
pub mod history;
pub mod memory;
pub mod rates;
pub mod transfer;
pub mod users;

#[cfg(test)]
mod testing;

pub use error::{LedgerError, LedgerResult};
