//! Per-currency accounts and the atomic units that mutate them.

mod service;
mod store;
mod types;

pub use service::{AccountService, LedgerPolicy};
pub use store::AccountStore;
pub use types::{Account, CommittedMovement, Movement};
