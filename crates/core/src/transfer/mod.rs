//! Same-currency transfers between users.

mod engine;

#[cfg(test)]
mod props;

pub use engine::{TransferEngine, TransferRequest};
