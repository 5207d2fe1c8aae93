//! Registration Workflow
//!
//! Explicit, ordered validation of a registration request followed by the
//! transactional creation of an account and its profile row. The phases
//! match the API contract:
//! - field shape and uniqueness problems aggregate per field
//! - a confirmation mismatch is reported alone
//! - every violated strength rule is reported at once
//!
//! Uniqueness is pre-checked here for friendly errors; the UNIQUE
//! constraints on the accounts table stay authoritative, and a write that
//! loses the race maps back to the same field errors.

use sqlx::PgPool;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::error::{ApiError, FieldErrors};
use crate::models::{Account, NewAccount, RegisterRequest};
use crate::password::{self, AccountAttributes, PasswordPolicy};

const MAX_USERNAME_LENGTH: usize = 150;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 150;

const MSG_REQUIRED: &str = "This field is required.";
const MSG_BLANK: &str = "This field may not be blank.";

/// Validate a registration request and create the account
pub async fn register(
    pool: &PgPool,
    policy: &PasswordPolicy,
    req: RegisterRequest,
) -> Result<Account, ApiError> {
    let mut errors = FieldErrors::new();

    let username = collect_field(
        validate_username(req.username.as_deref()),
        "username",
        &mut errors,
    );
    let email = collect_field(validate_email(req.email.as_deref()), "email", &mut errors);
    let password = collect_field(
        validate_password_field(req.password.as_deref()),
        "password",
        &mut errors,
    );
    let password2 = collect_field(
        validate_password_field(req.password2.as_deref()),
        "password2",
        &mut errors,
    );
    let first_name = collect_field(
        validate_name(req.first_name.as_deref()),
        "first_name",
        &mut errors,
    );
    let last_name = collect_field(
        validate_name(req.last_name.as_deref()),
        "last_name",
        &mut errors,
    );

    // Uniqueness joins the same per-field pass, but only for values whose
    // shape held up.
    if let Some(username) = &username {
        if username_exists(pool, username).await? {
            errors.add("username", ApiError::DuplicateUsername.to_string());
        }
    }
    if let Some(email) = &email {
        if email_exists(pool, email).await? {
            errors.add("email", ApiError::DuplicateEmail.to_string());
        }
    }

    let (username, email, password, password2, first_name, last_name) =
        match (username, email, password, password2, first_name, last_name) {
            (Some(u), Some(e), Some(p), Some(p2), Some(f), Some(l)) if errors.is_empty() => {
                (u, e, p, p2, f, l)
            }
            _ => return Err(errors.into()),
        };

    let attributes = AccountAttributes {
        username: &username,
        email: &email,
        first_name: &first_name,
        last_name: &last_name,
    };
    validate_password_rules(policy, &password, &password2, &attributes)?;

    let password_hash = password::hash_password(&password)?;

    let new_account = NewAccount {
        username,
        email,
        password_hash,
        first_name,
        last_name,
    };

    create_account(pool, new_account).await
}

// ============================================
// Field Validators
// ============================================

fn validate_username(value: Option<&str>) -> Result<String, Vec<String>> {
    let value = match value {
        Some(v) => v,
        None => return Err(vec![MSG_REQUIRED.to_string()]),
    };
    if value.is_empty() {
        return Err(vec![MSG_BLANK.to_string()]);
    }

    let mut messages = Vec::new();
    if value.chars().count() > MAX_USERNAME_LENGTH {
        messages.push(format!(
            "Ensure this field has no more than {} characters.",
            MAX_USERNAME_LENGTH
        ));
    }
    if !value.chars().all(is_username_char) {
        messages.push(
            "Enter a valid username. This value may contain only letters, numbers, \
             and @/./+/-/_ characters."
                .to_string(),
        );
    }

    if messages.is_empty() {
        Ok(value.to_string())
    } else {
        Err(messages)
    }
}

// Letters and digits in any script; emoji and punctuation outside @.+-_
// stay rejected.
fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

fn validate_email(value: Option<&str>) -> Result<String, Vec<String>> {
    let value = match value {
        Some(v) => v,
        None => return Err(vec![MSG_REQUIRED.to_string()]),
    };
    if value.is_empty() {
        return Err(vec![MSG_BLANK.to_string()]);
    }

    let mut messages = Vec::new();
    if value.chars().count() > MAX_EMAIL_LENGTH {
        messages.push(format!(
            "Ensure this field has no more than {} characters.",
            MAX_EMAIL_LENGTH
        ));
    }
    if !value.validate_email() {
        messages.push("Enter a valid email address.".to_string());
    }

    if messages.is_empty() {
        Ok(value.to_string())
    } else {
        Err(messages)
    }
}

/// Presence and blank checks only; strength rules run in a later phase
fn validate_password_field(value: Option<&str>) -> Result<String, Vec<String>> {
    match value {
        None => Err(vec![MSG_REQUIRED.to_string()]),
        Some("") => Err(vec![MSG_BLANK.to_string()]),
        Some(v) => Ok(v.to_string()),
    }
}

/// Name fields are optional and default to an empty string
fn validate_name(value: Option<&str>) -> Result<String, Vec<String>> {
    let value = value.unwrap_or("");
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(vec![format!(
            "Ensure this field has no more than {} characters.",
            MAX_NAME_LENGTH
        )]);
    }
    Ok(value.to_string())
}

fn collect_field(
    result: Result<String, Vec<String>>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match result {
        Ok(value) => Some(value),
        Err(messages) => {
            for message in messages {
                errors.add(field, message);
            }
            None
        }
    }
}

// ============================================
// Password Phases
// ============================================

/// Confirmation mismatch is terminal; strength violations aggregate
fn validate_password_rules(
    policy: &PasswordPolicy,
    password: &str,
    password2: &str,
    attributes: &AccountAttributes,
) -> Result<(), ApiError> {
    if password != password2 {
        return Err(ApiError::PasswordMismatch);
    }

    let violations = policy.validate(password, attributes);
    if !violations.is_empty() {
        return Err(ApiError::WeakPassword(
            violations.iter().map(|v| v.to_string()).collect(),
        ));
    }

    Ok(())
}

// ============================================
// Store Access
// ============================================

async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, ApiError> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM accounts WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(existing.is_some())
}

async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, ApiError> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM accounts WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(existing.is_some())
}

/// Insert the account and its profile row in one transaction
async fn create_account(pool: &PgPool, new_account: NewAccount) -> Result<Account, ApiError> {
    let mut tx = pool.begin().await?;

    let account = sqlx::query_as::<_, Account>(
        r#"
        INSERT INTO accounts (username, email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&new_account.username)
    .bind(&new_account.email)
    .bind(&new_account.password_hash)
    .bind(&new_account.first_name)
    .bind(&new_account.last_name)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO account_profiles (account_id) VALUES ($1)")
        .bind(account.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(account_id = %account.id, username = %account.username, "Account created");

    Ok(account)
}

// ============================================
// Tests
// ============================================
