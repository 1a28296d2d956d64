use marquee_core::types::Profile;
use sqlx::{Sqlite, SqlitePool, Transaction};

type ProfileTuple = (String, String, Option<String>, bool, i64);

pub(crate) async fn insert_profile(
    tx: &mut Transaction<'_, Sqlite>,
    uid: &str,
    email: &str,
    display_name: Option<&str>,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO profile (uid, email, display_name, is_admin, created_ts, updated_ts) \
         VALUES (?, ?, ?, 0, ?, ?)",
    )
    .bind(uid)
    .bind(email)
    .bind(display_name)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn get_profile(pool: &SqlitePool, uid: &str) -> Result<Option<Profile>, sqlx::Error> {
    let row: Option<ProfileTuple> = sqlx::query_as(
        "SELECT uid, email, display_name, is_admin, created_ts FROM profile WHERE uid = ?",
    )
    .bind(uid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(uid, email, display_name, is_admin, created_ts)| Profile {
        uid,
        email,
        display_name,
        is_admin,
        created_ts,
    }))
}

pub async fn update_display_name(
    pool: &SqlitePool,
    uid: &str,
    display_name: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE profile SET display_name = ?, updated_ts = ? WHERE uid = ?")
        .bind(display_name)
        .bind(chrono::Utc::now().timestamp())
        .bind(uid)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_admin(pool: &SqlitePool, uid: &str, is_admin: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE profile SET is_admin = ?, updated_ts = ? WHERE uid = ?")
        .bind(is_admin)
        .bind(chrono::Utc::now().timestamp())
        .bind(uid)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
