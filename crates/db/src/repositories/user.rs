//! User repository.

use fxledger_core::account::Account;
use fxledger_core::users::{
    NewUser, User, UserDirectory, UserFilter, UserFlagsUpdate, UserProfileUpdate,
};
use fxledger_core::{LedgerError, LedgerResult};
use fxledger_shared::types::{CurrencyCode, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::info;

use super::account::insert_account;
use crate::entities::users;
use crate::mapping::{db_error, now};

/// Postgres-backed user directory.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_username(&self, username: &str) -> LedgerResult<Option<User>> {
        Ok(users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(User::from))
    }

    /// Creates an active, approved superuser without an opening account.
    ///
    /// Administrators are provisioned out of band; registration never sets
    /// the superuser flag.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` when the username is taken.
    pub async fn create_superuser(&self, input: NewUser) -> LedgerResult<User> {
        input.validate()?;
        let user = insert_user(&self.db, input, true).await?;
        info!(user_id = %user.id, username = %user.username, "Superuser created");
        Ok(user)
    }
}

async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    input: NewUser,
    superuser: bool,
) -> LedgerResult<User> {
    let at = now();
    let username = input.username.clone();
    let row = users::ActiveModel {
        id: Set(UserId::new().into_inner()),
        username: Set(input.username),
        first_name: Set(input.first_name),
        last_name: Set(input.last_name),
        password_hash: Set(input.password_hash),
        is_active: Set(true),
        is_approved: Set(superuser),
        is_superuser: Set(superuser),
        created_at: Set(at.into()),
        updated_at: Set(at.into()),
    };

    match row.insert(conn).await.map_err(db_error) {
        Ok(model) => Ok(model.into()),
        Err(LedgerError::AlreadyExists(_)) => {
            Err(LedgerError::AlreadyExists(format!("username {username}")))
        }
        Err(e) => Err(e),
    }
}

impl UserDirectory for UserRepository {
    async fn find_user(&self, id: UserId) -> LedgerResult<Option<User>> {
        Ok(users::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(User::from))
    }

    async fn create_user(
        &self,
        input: NewUser,
        opening_currency: &CurrencyCode,
    ) -> LedgerResult<(User, Account)> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let user = insert_user(&txn, input, false).await?;
        let account = insert_account(&txn, user.id, opening_currency).await?;

        txn.commit().await.map_err(db_error)?;
        Ok((user, account))
    }

    async fn list_users(&self, filter: UserFilter) -> LedgerResult<Vec<User>> {
        let mut query = users::Entity::find();
        query = match filter {
            UserFilter::All => query,
            UserFilter::Pending => query
                .filter(users::Column::IsSuperuser.eq(false))
                .filter(users::Column::IsApproved.eq(false)),
            UserFilter::Approved => query
                .filter(users::Column::IsSuperuser.eq(false))
                .filter(users::Column::IsApproved.eq(true)),
        };

        Ok(query
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(User::from)
            .collect())
    }

    async fn update_flags(&self, id: UserId, update: UserFlagsUpdate) -> LedgerResult<User> {
        let row = users::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| LedgerError::not_found(format!("user {id}")))?;

        let mut active: users::ActiveModel = row.into();
        if let Some(approved) = update.approved {
            active.is_approved = Set(approved);
        }
        if let Some(is_active) = update.active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(now().into());

        Ok(active.update(&self.db).await.map_err(db_error)?.into())
    }

    async fn update_profile(&self, id: UserId, update: UserProfileUpdate) -> LedgerResult<User> {
        let row = users::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| LedgerError::not_found(format!("user {id}")))?;

        let mut active: users::ActiveModel = row.into();
        if let Some(first_name) = update.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = update.last_name {
            active.last_name = Set(Some(last_name));
        }
        active.updated_at = Set(now().into());

        Ok(active.update(&self.db).await.map_err(db_error)?.into())
    }
}
