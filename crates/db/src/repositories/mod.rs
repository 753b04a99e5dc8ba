//! Repository abstractions for data access.
//!
//! Repositories implement the ledger's storage traits on top of `SeaORM`,
//! hiding the database details from the rest of the application.

pub mod account;
pub mod history;
pub mod user;

pub use account::AccountRepository;
pub use history::HistoryRepository;
pub use user::UserRepository;
