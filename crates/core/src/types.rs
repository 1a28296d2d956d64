use serde::{Deserialize, Serialize};

/// Number of movies requested per catalog batch.
pub const CATALOG_PAGE_SIZE: usize = 12;

/// A catalog entry as stored in the `movies` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub description: String,
    pub poster_url: String,
    pub video_url: String,
    pub genre: String,
    /// Free-form running time, e.g. "1h 30m".
    pub duration: String,
    pub rating: f64,
    pub year: i32,
}

impl Movie {
    /// Whether there is anything to attach a media element to.
    pub fn has_playable_source(&self) -> bool {
        !self.video_url.trim().is_empty()
    }
}

/// User-entered movie fields, before any media is uploaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDraft {
    pub title: String,
    pub description: String,
    pub genre: String,
    pub duration: String,
    pub rating: f64,
    pub year: i32,
}

/// Document creation payload: a draft plus the uploaded media locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    #[serde(flatten)]
    pub draft: MovieDraft,
    pub poster_url: String,
    pub video_url: String,
}

/// Per-user profile record. `is_admin` gates movie creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub created_ts: i64,
}

/// Signed-in identity as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    pub token: String,
}

/// Opaque continuation token referencing the last entity of a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaginationCursor(String);

impl PaginationCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaginationCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One batch of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<PaginationCursor>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}

/// A payload accepted by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    pub id: String,
    pub download_url: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Identity providers accepted for federated sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FederatedProvider {
    Google,
    Github,
}

impl FederatedProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "google" => Some(Self::Google),
            "github" => Some(Self::Github),
            _ => None,
        }
    }
}

impl std::fmt::Display for FederatedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
