use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct BlobRow {
    pub id: String,
    pub kind: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub path: String,
    pub owner_id: Option<String>,
    pub created_ts: i64,
}

pub struct NewBlob<'a> {
    pub id: &'a str,
    pub kind: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
    pub sha256: &'a str,
    pub path: &'a str,
    pub owner_id: Option<&'a str>,
}

pub async fn insert_blob(pool: &SqlitePool, blob: &NewBlob<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO blob (id, kind, content_type, size_bytes, sha256, path, owner_id, created_ts) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(blob.id)
    .bind(blob.kind)
    .bind(blob.content_type)
    .bind(blob.size_bytes)
    .bind(blob.sha256)
    .bind(blob.path)
    .bind(blob.owner_id)
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_blob(pool: &SqlitePool, id: &str) -> Result<Option<BlobRow>, sqlx::Error> {
    let row: Option<(String, String, String, i64, String, String, Option<String>, i64)> =
        sqlx::query_as(
            "SELECT id, kind, content_type, size_bytes, sha256, path, owner_id, created_ts \
             FROM blob WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| BlobRow {
        id: r.0,
        kind: r.1,
        content_type: r.2,
        size_bytes: r.3,
        sha256: r.4,
        path: r.5,
        owner_id: r.6,
        created_ts: r.7,
    }))
}
