//! Row to domain conversions and `DbErr` classification.

use chrono::{DateTime, SubsecRound, Utc};
use fxledger_core::LedgerError;
use fxledger_core::account::Account;
use fxledger_core::history::{ConversionRecord, TransferRecord};
use fxledger_core::users::User;
use fxledger_shared::types::CurrencyCode;
use sea_orm::{DbErr, SqlErr};

use crate::entities::{accounts, conversion_history, transfers, users};

/// Current time at the precision Postgres stores (microseconds).
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Maps a database error onto the ledger error space.
///
/// Constraint violations become `AlreadyExists`/`NotFound`; everything else
/// is a `Store` failure.
pub(crate) fn db_error(err: DbErr) -> LedgerError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => LedgerError::AlreadyExists(detail),
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => LedgerError::NotFound(detail),
        _ => LedgerError::store(err),
    }
}

fn currency(code: &str) -> Result<CurrencyCode, LedgerError> {
    CurrencyCode::new(code)
        .map_err(|e| LedgerError::store(format!("corrupt currency column {code:?}: {e}")))
}

impl TryFrom<accounts::Model> for Account {
    type Error = LedgerError;

    fn try_from(model: accounts::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id.into(),
            owner_id: model.owner_id.into(),
            currency: currency(&model.currency)?,
            balance: model.balance,
            is_open: model.is_open,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id.into(),
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            is_active: model.is_active,
            is_approved: model.is_approved,
            is_superuser: model.is_superuser,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl TryFrom<transfers::Model> for TransferRecord {
    type Error = LedgerError;

    fn try_from(model: transfers::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id.into(),
            from_user: model.from_user.into(),
            to_user: model.to_user.into(),
            currency: currency(&model.currency)?,
            amount: model.amount,
            created_at: model.created_at.into(),
        })
    }
}

impl TryFrom<conversion_history::Model> for ConversionRecord {
    type Error = LedgerError;

    fn try_from(model: conversion_history::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id.into(),
            user_id: model.user_id.into(),
            currency_from: currency(&model.currency_from)?,
            currency_to: currency(&model.currency_to)?,
            value_from: model.value_from,
            value_to: model.value_to,
            created_at: model.created_at.into(),
        })
    }
}
