//! User and principal types.

use chrono::{DateTime, Utc};
use fxledger_shared::types::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 20;

/// Maximum first or last name length.
pub const MAX_NAME_LEN: usize = 100;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// False once the user has been blocked.
    pub is_active: bool,
    /// Set by an administrator after registration.
    pub is_approved: bool,
    /// Administrator flag.
    pub is_superuser: bool,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last flag or profile change.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name: first and last name when both are known, username otherwise.
    #[must_use]
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            _ => self.username.clone(),
        }
    }

    /// Returns true if the user may send or receive funds.
    #[must_use]
    pub const fn can_transact(&self) -> bool {
        self.is_active && self.is_approved
    }

    /// The principal this user acts as.
    #[must_use]
    pub const fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            active: self.is_active,
            approved: self.is_approved,
            superuser: self.is_superuser,
        }
    }
}

/// Identity context supplied by the authorization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Authenticated user.
    pub user_id: UserId,
    /// User is not blocked.
    pub active: bool,
    /// User has been approved by an administrator.
    pub approved: bool,
    /// User is an administrator.
    pub superuser: bool,
}

impl Principal {
    /// Fails unless the principal is active.
    pub fn ensure_active(&self) -> LedgerResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(LedgerError::forbidden(format!("user {} is blocked", self.user_id)))
        }
    }

    /// Fails unless the principal is active and approved.
    pub fn ensure_can_transact(&self) -> LedgerResult<()> {
        self.ensure_active()?;
        if self.approved {
            Ok(())
        } else {
            Err(LedgerError::forbidden(format!(
                "user {} is not approved",
                self.user_id
            )))
        }
    }

    /// Fails unless the principal is an active administrator.
    pub fn ensure_superuser(&self) -> LedgerResult<()> {
        self.ensure_active()?;
        if self.superuser {
            Ok(())
        } else {
            Err(LedgerError::forbidden("administrator rights required"))
        }
    }
}

/// Input for registering a user.
///
/// Password hashing happens upstream; only the resulting hash is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Password hash produced by the authentication layer.
    pub password_hash: Option<String>,
}

impl NewUser {
    /// Creates a registration input with only a username.
    #[must_use]
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            first_name: None,
            last_name: None,
            password_hash: None,
        }
    }

    /// Validates the username shape.
    pub fn validate(&self) -> LedgerResult<()> {
        let len = self.username.chars().count();
        if self.username.trim().is_empty() || len > MAX_USERNAME_LEN {
            return Err(LedgerError::InvalidUsername(self.username.clone()));
        }
        Ok(())
    }
}

/// Selection for user listings. Superusers are never part of `Pending`/`Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserFilter {
    /// Every user.
    #[default]
    All,
    /// Non-superusers awaiting approval.
    Pending,
    /// Approved non-superusers.
    Approved,
}

/// Flag changes applied by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserFlagsUpdate {
    /// New `is_approved` value.
    pub approved: Option<bool>,
    /// New `is_active` value.
    pub active: Option<bool>,
}

/// Profile changes made by the user themselves. `None` leaves a field as is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserProfileUpdate {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
}

impl UserProfileUpdate {
    /// Returns true if the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }

    /// Rejects blank names and names longer than [`MAX_NAME_LEN`].
    pub fn validate(&self) -> LedgerResult<()> {
        for name in [&self.first_name, &self.last_name].into_iter().flatten() {
            if name.trim().is_empty() || name.chars().count() > MAX_NAME_LEN {
                return Err(LedgerError::InvalidName(name.clone()));
            }
        }
        Ok(())
    }
}
