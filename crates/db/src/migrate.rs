use sqlx::SqlitePool;
use tracing::{debug, info};

const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial_schema",
    include_str!("../migrations/001_initial_schema.sql"),
)];

/// Apply pending forward-only migrations, each inside its own transaction.
/// Applied names are recorded in `_migrations`; re-running is a no-op.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_ts INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let applied: Vec<(String,)> = sqlx::query_as("SELECT name FROM _migrations")
        .fetch_all(pool)
        .await?;

    for (name, sql) in MIGRATIONS {
        if applied.iter().any(|(done,)| done == name) {
            debug!(migration = name, "already applied");
            continue;
        }

        info!(migration = name, "applying migration");
        let mut tx = pool.begin().await?;

        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query("INSERT INTO _migrations (name, applied_ts) VALUES (?, ?)")
            .bind(name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(migration = name, "migration applied");
    }

    Ok(())
}

/// Names of migrations recorded as applied, in application order.
pub async fn applied(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM _migrations ORDER BY applied_ts, name")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = crate::connect(":memory:").await.unwrap();
        run(&pool).await.unwrap();
        run(&pool).await.unwrap();

        assert_eq!(applied(&pool).await.unwrap(), vec!["001_initial_schema"]);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movie")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
