//! User persistence trait.

use fxledger_shared::types::{CurrencyCode, UserId};

use super::types::{NewUser, User, UserFilter, UserFlagsUpdate, UserProfileUpdate};
use crate::account::Account;
use crate::error::LedgerResult;

/// Repository trait for users.
///
/// This trait is implemented by the db crate and by `InMemoryLedger`.
pub trait UserDirectory: Send + Sync {
    /// Finds a user by ID.
    fn find_user(
        &self,
        id: UserId,
    ) -> impl std::future::Future<Output = LedgerResult<Option<User>>> + Send;

    /// Creates a user together with their opening account, atomically.
    ///
    /// Fails with `AlreadyExists` when the username is taken.
    fn create_user(
        &self,
        input: NewUser,
        opening_currency: &CurrencyCode,
    ) -> impl std::future::Future<Output = LedgerResult<(User, Account)>> + Send;

    /// Lists users matching the filter, oldest first.
    fn list_users(
        &self,
        filter: UserFilter,
    ) -> impl std::future::Future<Output = LedgerResult<Vec<User>>> + Send;

    /// Applies flag changes and returns the updated user.
    ///
    /// Fails with `NotFound` when the user does not exist.
    fn update_flags(
        &self,
        id: UserId,
        update: UserFlagsUpdate,
    ) -> impl std::future::Future<Output = LedgerResult<User>> + Send;

    /// Replaces the given name fields and returns the updated user.
    ///
    /// Fails with `NotFound` when the user does not exist.
    fn update_profile(
        &self,
        id: UserId,
        update: UserProfileUpdate,
    ) -> impl std::future::Future<Output = LedgerResult<User>> + Send;
}
