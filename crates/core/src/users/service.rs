//! Registration and privileged user administration.

use std::sync::Arc;

use fxledger_shared::types::{CurrencyCode, UserId};
use tracing::info;

use super::directory::UserDirectory;
use super::types::{NewUser, Principal, User, UserFilter, UserFlagsUpdate, UserProfileUpdate};
use crate::account::Account;
use crate::error::{LedgerError, LedgerResult};

/// Service for registering users and changing their flags.
pub struct UserAdminService<U: UserDirectory> {
    users: Arc<U>,
    opening_currency: CurrencyCode,
}

impl<U: UserDirectory> UserAdminService<U> {
    /// Creates a new user admin service.
    #[must_use]
    pub fn new(users: Arc<U>, opening_currency: CurrencyCode) -> Self {
        Self {
            users,
            opening_currency,
        }
    }

    /// Registers a user and opens their first account.
    ///
    /// New users start active but unapproved.
    pub async fn register(&self, input: NewUser) -> LedgerResult<(User, Account)> {
        input.validate()?;
        let (user, account) = self
            .users
            .create_user(input, &self.opening_currency)
            .await?;
        info!(
            user_id = %user.id,
            username = %user.username,
            account_id = %account.id,
            currency = %account.currency,
            "User registered"
        );
        Ok((user, account))
    }

    /// Approves a pending user.
    ///
    /// Fails with `NotFound` if the user does not exist or is already approved.
    pub async fn approve(&self, admin: &Principal, user_id: UserId) -> LedgerResult<User> {
        admin.ensure_superuser()?;
        let user = self.find(user_id).await?;
        if user.is_approved {
            return Err(LedgerError::not_found(format!(
                "user {user_id} not found or already approved"
            )));
        }

        let user = self
            .users
            .update_flags(
                user_id,
                UserFlagsUpdate {
                    approved: Some(true),
                    active: None,
                },
            )
            .await?;
        info!(user_id = %user.id, admin_id = %admin.user_id, "User approved");
        Ok(user)
    }

    /// Blocks an active user.
    ///
    /// Fails with `NotFound` if the user does not exist or is already blocked.
    pub async fn block(&self, admin: &Principal, user_id: UserId) -> LedgerResult<User> {
        admin.ensure_superuser()?;
        if admin.user_id == user_id {
            return Err(LedgerError::forbidden("administrators cannot block themselves"));
        }
        let user = self.find(user_id).await?;
        if !user.is_active {
            return Err(LedgerError::not_found(format!(
                "user {user_id} not found or already blocked"
            )));
        }

        let user = self
            .users
            .update_flags(
                user_id,
                UserFlagsUpdate {
                    approved: None,
                    active: Some(false),
                },
            )
            .await?;
        info!(user_id = %user.id, admin_id = %admin.user_id, "User blocked");
        Ok(user)
    }

    /// Lists non-superusers awaiting approval.
    pub async fn pending(&self, admin: &Principal) -> LedgerResult<Vec<User>> {
        admin.ensure_superuser()?;
        self.users.list_users(UserFilter::Pending).await
    }

    /// Lists approved non-superusers.
    pub async fn approved(&self, admin: &Principal) -> LedgerResult<Vec<User>> {
        admin.ensure_superuser()?;
        self.users.list_users(UserFilter::Approved).await
    }

    /// Looks up the principal's own profile.
    pub async fn me(&self, principal: &Principal) -> LedgerResult<User> {
        principal.ensure_active()?;
        self.find(principal.user_id).await
    }

    /// Changes the principal's own first and/or last name.
    ///
    /// An empty update returns the profile unchanged.
    pub async fn update_profile(
        &self,
        principal: &Principal,
        update: UserProfileUpdate,
    ) -> LedgerResult<User> {
        principal.ensure_active()?;
        update.validate()?;
        if update.is_empty() {
            return self.find(principal.user_id).await;
        }

        let user = self.users.update_profile(principal.user_id, update).await?;
        info!(user_id = %user.id, "User profile updated");
        Ok(user)
    }

    async fn find(&self, user_id: UserId) -> LedgerResult<User> {
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("user {user_id}")))
    }
}
