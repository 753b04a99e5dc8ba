//! Currency conversion between two accounts of the same user.
//!
//! A conversion runs in distinct phases. The rate is fetched with no account
//! lock held, and only then are both balances changed in one atomic unit. The
//! credited amount is exactly the amount the provider quoted.

mod engine;
mod types;

#[cfg(test)]
mod props;

pub use engine::ConversionEngine;
pub use types::{ConversionOutcome, ConversionRequest, ConversionStage};
