use std::path::PathBuf;

use sqlx::SqlitePool;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    /// HS256 key that federated identity assertions are signed with.
    /// `None` disables federated sign-in.
    pub federated_secret: Option<String>,
    pub blob_dir: PathBuf,
    /// Externally reachable base URL, used to build blob download URLs.
    pub public_url: String,
}

impl AppState {
    pub fn download_url(&self, blob_id: &str) -> String {
        format!("{}/blobs/{blob_id}", self.public_url.trim_end_matches('/'))
    }
}
