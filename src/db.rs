//! Database Setup
//!
//! Pool construction and the idempotent schema migrations run at startup.
//! The UNIQUE constraints on accounts are the authoritative uniqueness
//! guarantee; their default names are relied on when mapping write
//! conflicts back to field errors.

use sqlx::PgPool;

use crate::error::ApiError;

/// Connect to Postgres
pub async fn connect(database_url: &str) -> Result<PgPool, ApiError> {
    let pool = PgPool::connect(database_url).await?;
    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(db: &PgPool) -> Result<(), ApiError> {
    tracing::info!("Running account database migrations");

    // Accounts table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            username VARCHAR(150) NOT NULL UNIQUE,
            email VARCHAR(254) NOT NULL UNIQUE,
            password_hash VARCHAR(255) NOT NULL,
            first_name VARCHAR(150) NOT NULL DEFAULT '',
            last_name VARCHAR(150) NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(db)
    .await?;

    // One profile row per account, created alongside it
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS account_profiles (
            account_id UUID PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(db)
    .await?;

    // Refresh token ledger, keyed by the jti claim
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            jti UUID PRIMARY KEY,
            account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            revoked_at TIMESTAMPTZ
        );
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_account ON refresh_tokens(account_id);",
    )
    .execute(db)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_expires ON refresh_tokens(expires_at);",
    )
    .execute(db)
    .await?;

    tracing::info!("Account migrations completed");
    Ok(())
}
