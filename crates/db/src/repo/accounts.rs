use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use rand::Rng;
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;

use crate::DbError;

pub const PASSWORD_PROVIDER: &str = "password";

/// Account row from the database.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: String,
    pub email_verified: bool,
    pub created_ts: i64,
}

type AccountTuple = (String, String, Option<String>, String, bool, i64);

const SELECT_ACCOUNT: &str =
    "SELECT id, email, password_hash, provider, email_verified, created_ts FROM account";

/// A newly registered password account, with the code that verifies its email.
#[derive(Debug, Clone)]
pub struct Registration {
    pub id: String,
    pub verification_code: String,
}

/// Create an unverified password account and its profile.
pub async fn create_password_account(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<Registration, DbError> {
    let id = uuid::Uuid::new_v4().to_string();
    let hash = hash_password(password)?;
    let code = verification_code();
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO account (id, email, password_hash, provider, email_verified, verification_code, created_ts) \
         VALUES (?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(&hash)
    .bind(PASSWORD_PROVIDER)
    .bind(&code)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| duplicate_email(e, email))?;

    super::profiles::insert_profile(&mut tx, &id, email, display_name, now).await?;
    tx.commit().await?;

    Ok(Registration {
        id,
        verification_code: code,
    })
}

/// Create an administrator whose email is already verified (bootstrap).
pub async fn create_admin_account(
    pool: &SqlitePool,
    email: &str,
    password: &str,
) -> Result<String, DbError> {
    let registration = create_password_account(pool, email, password, Some("Administrator")).await?;
    mark_verified(pool, &registration.id).await?;
    super::profiles::set_admin(pool, &registration.id, true).await?;
    Ok(registration.id)
}

/// Find or create the account behind a federated identity. Federated
/// emails are treated as verified by the provider.
pub async fn upsert_federated_account(
    pool: &SqlitePool,
    provider: &str,
    email: &str,
    display_name: Option<&str>,
) -> Result<AccountRow, DbError> {
    if let Some(existing) = find_by_email(pool, email).await? {
        if !existing.email_verified {
            mark_verified(pool, &existing.id).await?;
        }
        return Ok(AccountRow {
            email_verified: true,
            ..existing
        });
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO account (id, email, password_hash, provider, email_verified, created_ts) \
         VALUES (?, ?, NULL, ?, 1, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(provider)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| duplicate_email(e, email))?;

    super::profiles::insert_profile(&mut tx, &id, email, display_name, now).await?;
    tx.commit().await?;

    Ok(AccountRow {
        id,
        email: email.to_string(),
        password_hash: None,
        provider: provider.to_string(),
        email_verified: true,
        created_ts: now,
    })
}

/// Find account by email.
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<AccountRow>, sqlx::Error> {
    let row: Option<AccountTuple> = sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(row_to_account))
}

/// Find account by ID.
pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<AccountRow>, sqlx::Error> {
    let row: Option<AccountTuple> = sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(row_to_account))
}

/// Check if any accounts exist (for admin bootstrap).
pub async fn count_accounts(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM account")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Verify an email address with the code issued at registration.
/// Returns `false` when the account is unknown or the code does not match.
pub async fn verify_email(pool: &SqlitePool, email: &str, code: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(String, Option<String>)> =
        sqlx::query_as("SELECT id, verification_code FROM account WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;

    let Some((id, Some(expected))) = row else {
        return Ok(false);
    };

    if !bool::from(expected.as_bytes().ct_eq(code.as_bytes())) {
        return Ok(false);
    }

    mark_verified(pool, &id).await?;
    Ok(true)
}

async fn mark_verified(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE account SET email_verified = 1, verification_code = NULL WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, DbError> {
    let parsed = PasswordHash::new(hash).map_err(|e| DbError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Six-digit numeric code.
fn verification_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

fn duplicate_email(e: sqlx::Error, email: &str) -> DbError {
    if crate::is_unique_violation(&e) {
        DbError::Duplicate(format!("account for {email}"))
    } else {
        DbError::Sqlx(e)
    }
}

fn row_to_account(r: AccountTuple) -> AccountRow {
    AccountRow {
        id: r.0,
        email: r.1,
        password_hash: r.2,
        provider: r.3,
        email_verified: r.4,
        created_ts: r.5,
    }
}
