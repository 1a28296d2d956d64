use async_trait::async_trait;
use marquee_core::error::ErrorEnvelope;
use marquee_core::types::{
    AuthSession, FederatedProvider, Movie, NewMovie, Page, PaginationCursor, Profile, StoredBlob,
};
use marquee_core::upload::UploadKind;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use reqwest::Url;
use tokio::sync::watch;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::services::{AuthService, BlobStore, DocumentStore, PayloadSource, UploadPayload};

/// HTTP/JSON client for the reference backend. Holds the signed-in session
/// and implements every service contract.
pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
    session: watch::Sender<Option<AuthSession>>,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        let (session, _) = watch::channel(None);
        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
            session,
        })
    }

    /// API URL for `segments`, each percent-encoded as a single path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v1"]).extend(segments);
        }
        url
    }

    fn token(&self) -> Result<String, ClientError> {
        self.session
            .borrow()
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or(ClientError::NotSignedIn)
    }

    fn set_session(&self, session: Option<AuthSession>) {
        self.session.send_replace(session);
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &[&str],
        body: &serde_json::Value,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "backend request");
        let resp = self.client.post(url).json(body).send().await?;
        decode(resp).await
    }

    async fn get_authed<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "backend request");
        let resp = self
            .client
            .get(url)
            .bearer_auth(self.token()?)
            .query(query)
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    if !resp.status().is_success() {
        return Err(error_from(resp).await);
    }
    resp.json()
        .await
        .map_err(|e| ClientError::Network(format!("parse JSON: {e}")))
}

async fn error_from(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    match resp.json::<ErrorEnvelope>().await {
        Ok(envelope) if envelope.error.code == "validation_failed" => {
            let details = envelope.error.details;
            ClientError::Validation(details.get("fields").cloned().unwrap_or(details))
        }
        Ok(envelope) => ClientError::Service {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => ClientError::Service {
            status,
            code: "unknown".into(),
            message: format!("backend returned {status}"),
        },
    }
}

#[derive(Deserialize)]
struct Registered {
    uid: String,
}

#[async_trait]
impl AuthService for HttpBackend {
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, ClientError> {
        let registered: Registered = self
            .post_json(
                &["auth", "register"],
                &json!({ "email": email, "password": password, "display_name": display_name }),
            )
            .await?;
        info!(uid = %registered.uid, "account registered");
        Ok(registered.uid)
    }

    async fn verify_email(&self, email: &str, code: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.url(&["auth", "verify"]))
            .json(&json!({ "email": email, "code": code }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        Ok(())
    }

    async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ClientError> {
        let session: AuthSession = self
            .post_json(&["auth", "login"], &json!({ "email": email, "password": password }))
            .await
            .map_err(|e| match e {
                ClientError::Service { status: 401, .. } => ClientError::InvalidCredentials,
                other => other,
            })?;
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_provider(
        &self,
        provider: FederatedProvider,
        assertion: &str,
    ) -> Result<AuthSession, ClientError> {
        let session: AuthSession = self
            .post_json(
                &["auth", "federated"],
                &json!({ "provider": provider, "assertion": assertion }),
            )
            .await?;
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Bearer tokens are stateless, so signing out only forgets the session.
    async fn sign_out(&self) -> Result<(), ClientError> {
        self.set_session(None);
        Ok(())
    }

    fn current_session(&self) -> Option<AuthSession> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session.subscribe()
    }
}

#[async_trait]
impl DocumentStore for HttpBackend {
    async fn list_movies(
        &self,
        cursor: Option<&PaginationCursor>,
        limit: usize,
    ) -> Result<Page<Movie>, ClientError> {
        let limit = limit.to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.as_str()));
        }
        self.get_authed(&["movies"], &query).await
    }

    async fn get_movie(&self, id: &str) -> Result<Option<Movie>, ClientError> {
        match self.get_authed(&["movies", id], &[]).await {
            Ok(movie) => Ok(Some(movie)),
            Err(ClientError::Service { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_movie(&self, movie: &NewMovie) -> Result<Movie, ClientError> {
        let resp = self
            .client
            .post(self.url(&["movies"]))
            .bearer_auth(self.token()?)
            .json(movie)
            .send()
            .await?;
        decode(resp).await
    }

    async fn get_profile(&self) -> Result<Profile, ClientError> {
        self.get_authed(&["profile"], &[]).await
    }
}

#[async_trait]
impl BlobStore for HttpBackend {
    async fn upload(
        &self,
        kind: UploadKind,
        payload: UploadPayload,
    ) -> Result<StoredBlob, ClientError> {
        payload.check(kind)?;
        let token = self.token()?;

        let UploadPayload {
            content_type,
            size_bytes,
            source,
        } = payload;

        let body = match source {
            PayloadSource::Memory(bytes) => reqwest::Body::from(bytes),
            PayloadSource::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                reqwest::Body::wrap_stream(ReaderStream::new(file))
            }
        };

        debug!(%kind, size = size_bytes, "uploading blob");
        let resp = self
            .client
            .post(self.url(&["blobs", kind.as_str()]))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, size_bytes)
            .body(body)
            .send()
            .await?;
        decode(resp).await
    }
}
