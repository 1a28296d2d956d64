//! Backend service contracts.
//!
//! The application only talks to its backend through these traits.
//! [`crate::http::HttpBackend`] implements all three over HTTP; tests use
//! in-memory fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use marquee_core::types::{
    AuthSession, FederatedProvider, Movie, NewMovie, Page, PaginationCursor, Profile, StoredBlob,
};
use marquee_core::upload::{UploadKind, UploadRejection, check_upload};
use tokio::sync::watch;

use crate::error::ClientError;

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an unverified account. Does not sign in. Returns the new uid.
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, ClientError>;

    async fn verify_email(&self, email: &str, code: &str) -> Result<(), ClientError>;

    async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ClientError>;

    async fn sign_in_with_provider(
        &self,
        provider: FederatedProvider,
        assertion: &str,
    ) -> Result<AuthSession, ClientError>;

    async fn sign_out(&self) -> Result<(), ClientError>;

    fn current_session(&self) -> Option<AuthSession>;

    /// Session-change notifications. The receiver starts at the current session.
    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Movies newest first, strictly after `cursor`.
    async fn list_movies(
        &self,
        cursor: Option<&PaginationCursor>,
        limit: usize,
    ) -> Result<Page<Movie>, ClientError>;

    /// `Ok(None)` when no movie has this id.
    async fn get_movie(&self, id: &str) -> Result<Option<Movie>, ClientError>;

    async fn create_movie(&self, movie: &NewMovie) -> Result<Movie, ClientError>;

    /// Profile of the signed-in user.
    async fn get_profile(&self) -> Result<Profile, ClientError>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, kind: UploadKind, payload: UploadPayload)
    -> Result<StoredBlob, ClientError>;
}

#[derive(Debug, Clone)]
pub enum PayloadSource {
    Memory(Vec<u8>),
    File(PathBuf),
}

/// A file picked for upload. The size is known up front so limits can be
/// checked without reading the payload.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub content_type: String,
    pub size_bytes: u64,
    pub source: PayloadSource,
}

impl UploadPayload {
    pub fn from_bytes(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            size_bytes: bytes.len() as u64,
            source: PayloadSource::Memory(bytes),
        }
    }

    pub async fn from_path(
        path: impl AsRef<Path>,
        content_type: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await?;
        Ok(Self {
            content_type: content_type.into(),
            size_bytes: meta.len(),
            source: PayloadSource::File(path.to_path_buf()),
        })
    }

    pub fn check(&self, kind: UploadKind) -> Result<(), UploadRejection> {
        check_upload(kind, self.size_bytes, &self.content_type)
    }
}
