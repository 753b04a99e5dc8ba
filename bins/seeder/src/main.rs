//! Development data seeder for fxledger.
//!
//! Creates an administrator and a few approved demo users whose opening
//! accounts are funded through the regular deposit path. Existing usernames
//! are skipped, so the seeder can be re-run.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use fxledger_core::account::{AccountService, LedgerPolicy};
use fxledger_core::rates::RateProvider;
use fxledger_core::users::{NewUser, Principal, UserAdminService};
use fxledger_db::{AccountRepository, UserRepository};
use fxledger_shared::AppConfig;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Administrator username.
const ADMIN_USERNAME: &str = "admin";

/// Demo users: username, first name, last name, opening balance in cents.
const DEMO_USERS: [(&str, &str, &str, i64); 3] = [
    ("alice", "Alice", "Ivanova", 10_000_000),
    ("bob", "Bob", "Petrov", 2_500_000),
    ("carol", "Carol", "Smirnova", 0),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seeder=info,fxledger_core=info,fxledger_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let policy = LedgerPolicy::from_config(&config.ledger).context("Invalid ledger policy")?;

    let db = fxledger_db::connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let users = Arc::new(UserRepository::new(db.clone()));
    let accounts = Arc::new(AccountRepository::new(db));
    let rates = Arc::new(fxledger_rates::build_provider(&config.rates)?);

    let admin_service = UserAdminService::new(Arc::clone(&users), policy.opening_currency.clone());
    let account_service = AccountService::new(accounts, rates, policy.clone());

    let admin = seed_admin(&users).await?;

    for (username, first_name, last_name, cents) in DEMO_USERS {
        if users.find_by_username(username).await?.is_some() {
            info!(username, "Demo user already exists, skipping");
            continue;
        }

        let input = NewUser {
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            ..NewUser::named(username)
        };
        let (user, _) = admin_service.register(input).await?;
        let user = admin_service.approve(&admin, user.id).await?;

        let balance = Decimal::new(cents, 2);
        if balance > Decimal::ZERO {
            seed_balance(&account_service, &user.principal(), &policy, balance).await?;
        }
    }

    info!("Seeding complete");
    Ok(())
}

async fn seed_admin(users: &UserRepository) -> anyhow::Result<Principal> {
    if let Some(admin) = users.find_by_username(ADMIN_USERNAME).await? {
        info!(user_id = %admin.id, "Administrator already exists, skipping");
        return Ok(admin.principal());
    }

    let admin = users
        .create_superuser(NewUser::named(ADMIN_USERNAME))
        .await
        .context("Failed to create administrator")?;
    Ok(admin.principal())
}

async fn seed_balance<R: RateProvider>(
    accounts: &AccountService<AccountRepository, R>,
    user: &Principal,
    policy: &LedgerPolicy,
    amount: Decimal,
) -> anyhow::Result<()> {
    let account = accounts
        .deposit(user, &policy.opening_currency, amount)
        .await
        .context("Failed to fund demo account")?;
    info!(
        user_id = %user.user_id,
        account_id = %account.id,
        balance = %account.balance,
        "Demo account funded"
    );
    Ok(())
}
