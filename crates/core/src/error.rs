//! Ledger error types.
//!
//! Every engine and store operation returns `LedgerError`. No operation
//! performs a partial write when it returns an error.

use chrono::NaiveDate;
use fxledger_shared::types::{AccountId, CurrencyCode};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::rates::RateError;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Lookup Errors ==========
    /// Account, user or record absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate open account or username.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // ========== Balance Errors ==========
    /// Applying the movement would drive the balance negative.
    #[error("Insufficient funds on account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// The account that would go negative.
        account_id: AccountId,
        /// Balance observed under lock.
        balance: Decimal,
        /// Amount requested.
        requested: Decimal,
    },

    /// Applying the movement would exceed the representable balance range.
    #[error("Balance of account {0} would exceed the supported range")]
    BalanceOverflow(AccountId),

    /// Account cannot be closed while it holds funds.
    #[error("Account {0} still holds funds and cannot be closed")]
    AccountNotEmpty(AccountId),

    // ========== Validation Errors ==========
    /// Amount must be strictly positive.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Source and target currencies must be different.
    #[error("Source and target currencies must be different: {0}")]
    SameCurrency(CurrencyCode),

    /// Sender and recipient are the same user.
    #[error("Cannot transfer funds to yourself")]
    SelfTransfer,

    /// Recipient exists but is blocked or not yet approved.
    #[error("Recipient is blocked or not approved")]
    RecipientUnavailable,

    /// Currency is not offered by the rate provider or policy.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(CurrencyCode),

    /// Username is empty or too long.
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// First or last name is blank or too long.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Date window ends before it starts.
    #[error("Invalid date range: {start} to {end}")]
    InvalidDateRange {
        /// First day of the window.
        start: NaiveDate,
        /// Last day of the window.
        end: NaiveDate,
    },

    // ========== Permission Errors ==========
    /// Role precondition failed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ========== External Errors ==========
    /// External quote failed or timed out.
    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(#[from] RateError),

    // ========== Internal Errors ==========
    /// Internal invariant broken; never produced by valid input.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Storage backend failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    /// Creates an invariant violation.
    #[must_use]
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation(detail.into())
    }

    /// Creates a store error.
    #[must_use]
    pub fn store(detail: impl std::fmt::Display) -> Self {
        Self::Store(detail.to_string())
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            Self::AccountNotEmpty(_) => "ACCOUNT_NOT_EMPTY",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::SameCurrency(_) => "SAME_CURRENCY",
            Self::SelfTransfer => "SELF_TRANSFER",
            Self::RecipientUnavailable => "RECIPIENT_UNAVAILABLE",
            Self::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            Self::InvalidUsername(_) => "INVALID_USERNAME",
            Self::InvalidName(_) => "INVALID_NAME",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::RateUnavailable(_) => "RATE_UNAVAILABLE",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_)
            | Self::SameCurrency(_)
            | Self::SelfTransfer
            | Self::UnsupportedCurrency(_)
            | Self::InvalidUsername(_)
            | Self::InvalidName(_)
            | Self::InvalidDateRange { .. } => 400,

            // 403 Forbidden - permission errors
            Self::Forbidden(_) => 403,

            // 404 Not Found
            Self::NotFound(_) | Self::RecipientUnavailable => 404,

            // 409 Conflict
            Self::AlreadyExists(_) | Self::AccountNotEmpty(_) => 409,

            // 422 Unprocessable - business rule
            Self::InsufficientFunds { .. } | Self::BalanceOverflow(_) => 422,

            // 503 Service Unavailable - upstream quote
            Self::RateUnavailable(_) => 503,

            // 500 Internal Server Error
            Self::InvariantViolation(_) | Self::Store(_) => 500,
        }
    }

    /// Returns true if the caller may retry the whole operation.
    ///
    /// The engines themselves never retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateUnavailable(_) | Self::Store(_))
    }
}
