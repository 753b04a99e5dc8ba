//! Initial database migration.
//!
//! Creates users, per-currency accounts and the two append-only history
//! tables. Balances are guarded by a CHECK constraint and at most one open
//! account per `(owner, currency)` is enforced by a partial unique index.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSFERS_SQL).await?;
        db.execute_unprepared(CONVERSION_HISTORY_SQL).await?;

        // History rows are never rewritten.
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY,
    username VARCHAR(20) NOT NULL UNIQUE,
    first_name VARCHAR(100),
    last_name VARCHAR(100),
    password_hash VARCHAR(255),
    is_active BOOLEAN NOT NULL DEFAULT true,
    is_approved BOOLEAN NOT NULL DEFAULT false,
    is_superuser BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_username_not_blank CHECK (length(trim(username)) > 0)
);

CREATE INDEX idx_users_created ON users(created_at, id);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    currency CHAR(3) NOT NULL,
    balance NUMERIC NOT NULL DEFAULT 0,
    is_open BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_currency_upper CHECK (currency ~ '^[A-Z]{3}$')
);

CREATE UNIQUE INDEX uq_accounts_open_owner_currency
    ON accounts(owner_id, currency) WHERE is_open;
CREATE INDEX idx_accounts_owner ON accounts(owner_id, created_at, id);
";

const TRANSFERS_SQL: &str = r"
CREATE TABLE transfers (
    id UUID PRIMARY KEY,
    from_user UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    to_user UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    currency CHAR(3) NOT NULL,
    amount NUMERIC NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_transfer_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_transfer_distinct_users CHECK (from_user <> to_user)
);

CREATE INDEX idx_transfers_from ON transfers(from_user, created_at DESC);
CREATE INDEX idx_transfers_to ON transfers(to_user, created_at DESC);
CREATE INDEX idx_transfers_created ON transfers(created_at DESC, id DESC);
";

const CONVERSION_HISTORY_SQL: &str = r"
CREATE TABLE conversion_history (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    currency_from CHAR(3) NOT NULL,
    currency_to CHAR(3) NOT NULL,
    value_from NUMERIC NOT NULL,
    value_to NUMERIC NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_conversion_values_positive CHECK (value_from > 0 AND value_to > 0),
    CONSTRAINT chk_conversion_distinct_currencies CHECK (currency_from <> currency_to)
);

CREATE INDEX idx_conversion_history_user ON conversion_history(user_id, created_at DESC);
CREATE INDEX idx_conversion_history_created ON conversion_history(created_at DESC, id DESC);
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION reject_history_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'History table % is append-only', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_transfers_append_only
BEFORE UPDATE OR DELETE ON transfers
FOR EACH ROW
EXECUTE FUNCTION reject_history_mutation();

CREATE TRIGGER trg_conversion_history_append_only
BEFORE UPDATE OR DELETE ON conversion_history
FOR EACH ROW
EXECUTE FUNCTION reject_history_mutation();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_conversion_history_append_only ON conversion_history;
DROP TRIGGER IF EXISTS trg_transfers_append_only ON transfers;
DROP FUNCTION IF EXISTS reject_history_mutation();

DROP TABLE IF EXISTS conversion_history;
DROP TABLE IF EXISTS transfers;
DROP TABLE IF EXISTS accounts;
DROP TABLE IF EXISTS users;
";
