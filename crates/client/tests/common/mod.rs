#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use marquee_client::ClientError;
use marquee_client::services::{AuthService, BlobStore, DocumentStore, UploadPayload};
use marquee_core::types::{
    AuthSession, FederatedProvider, Movie, NewMovie, Page, PaginationCursor, Profile, StoredBlob,
};
use marquee_core::upload::UploadKind;
use tokio::sync::{Notify, watch};

pub fn movie(id: &str, video_url: &str) -> Movie {
    Movie {
        id: id.into(),
        title: format!("Title {id}"),
        description: "A film.".into(),
        poster_url: format!("http://blobs/{id}.jpg"),
        video_url: video_url.into(),
        genre: "Drama".into(),
        duration: "1h 30m".into(),
        rating: 4.0,
        year: 2001,
    }
}

struct Account {
    uid: String,
    email: String,
    password: String,
    verified: bool,
    admin: bool,
}

/// In-memory stand-in for every backend service.
pub struct FakeBackend {
    movies: Mutex<Vec<Movie>>,
    accounts: Mutex<Vec<Account>>,
    session: watch::Sender<Option<AuthSession>>,
    pub list_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub sign_in_calls: AtomicUsize,
    pub fail_list: AtomicBool,
    pub hold_list: AtomicBool,
    pub release_list: Notify,
}

impl FakeBackend {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            movies: Mutex::new(Vec::new()),
            accounts: Mutex::new(Vec::new()),
            session,
            list_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            sign_in_calls: AtomicUsize::new(0),
            fail_list: AtomicBool::new(false),
            hold_list: AtomicBool::new(false),
            release_list: Notify::new(),
        }
    }

    /// `count` playable movies, newest first.
    pub fn with_movies(count: usize) -> Self {
        let backend = Self::new();
        {
            let mut movies = backend.movies.lock().unwrap();
            for i in (0..count).rev() {
                movies.push(movie(&format!("m{i:03}"), &format!("http://blobs/m{i:03}.mp4")));
            }
        }
        backend
    }

    pub fn add_account(&self, email: &str, password: &str, verified: bool, admin: bool) {
        let mut accounts = self.accounts.lock().unwrap();
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.push(Account {
            uid,
            email: email.into(),
            password: password.into(),
            verified,
            admin,
        });
    }

    pub fn insert_movie(&self, movie: Movie) {
        self.movies.lock().unwrap().insert(0, movie);
    }

    pub fn movie_count(&self) -> usize {
        self.movies.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthService for FakeBackend {
    async fn register(
        &self,
        email: &str,
        password: &str,
        _display_name: Option<&str>,
    ) -> Result<String, ClientError> {
        self.add_account(email, password, false, false);
        Ok(format!("uid-{}", self.accounts.lock().unwrap().len()))
    }

    async fn verify_email(&self, email: &str, _code: &str) -> Result<(), ClientError> {
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.iter_mut().find(|a| a.email == email) {
            Some(account) => {
                account.verified = true;
                Ok(())
            }
            None => Err(ClientError::Service {
                status: 400,
                code: "bad_request".into(),
                message: "invalid verification code".into(),
            }),
        }
    }

    async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ClientError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let session = {
            let accounts = self.accounts.lock().unwrap();
            let account = accounts
                .iter()
                .find(|a| a.email == email && a.password == password)
                .ok_or(ClientError::InvalidCredentials)?;
            AuthSession {
                uid: account.uid.clone(),
                email: account.email.clone(),
                email_verified: account.verified,
                token: format!("token-{}", account.uid),
            }
        };
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_provider(
        &self,
        _provider: FederatedProvider,
        assertion: &str,
    ) -> Result<AuthSession, ClientError> {
        if assertion.is_empty() {
            return Err(ClientError::Service {
                status: 401,
                code: "unauthorized".into(),
                message: "invalid assertion".into(),
            });
        }
        let session = AuthSession {
            uid: "fed-1".into(),
            email: "fed@example.com".into(),
            email_verified: true,
            token: "token-fed".into(),
        };
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.session.send_replace(None);
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
impl DocumentStore for FakeBackend {
    async fn list_movies(
        &self,
        cursor: Option<&PaginationCursor>,
        limit: usize,
    ) -> Result<Page<Movie>, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_list.load(Ordering::SeqCst) {
            self.release_list.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ClientError::Network("connection reset".into()));
        }

        let movies = self.movies.lock().unwrap();
        let start = match cursor {
            Some(c) => movies
                .iter()
                .position(|m| m.id == c.as_str())
                .map_or(movies.len(), |i| i + 1),
            None => 0,
        };
        let items: Vec<Movie> = movies.iter().skip(start).take(limit).cloned().collect();
        let next_cursor = items.last().map(|m| PaginationCursor::new(m.id.clone()));
        Ok(Page { items, next_cursor })
    }

    async fn get_movie(&self, id: &str) -> Result<Option<Movie>, ClientError> {
        Ok(self.movies.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn create_movie(&self, new_movie: &NewMovie) -> Result<Movie, ClientError> {
        let mut movies = self.movies.lock().unwrap();
        let d = &new_movie.draft;
        let created = Movie {
            id: format!("new{}", movies.len()),
            title: d.title.clone(),
            description: d.description.clone(),
            poster_url: new_movie.poster_url.clone(),
            video_url: new_movie.video_url.clone(),
            genre: d.genre.clone(),
            duration: d.duration.clone(),
            rating: d.rating,
            year: d.year,
        };
        movies.insert(0, created.clone());
        Ok(created)
    }

    async fn get_profile(&self) -> Result<Profile, ClientError> {
        let session = self.current_session().ok_or(ClientError::NotSignedIn)?;
        let accounts = self.accounts.lock().unwrap();
        let admin = accounts
            .iter()
            .find(|a| a.uid == session.uid)
            .is_some_and(|a| a.admin);
        Ok(Profile {
            uid: session.uid,
            email: session.email,
            display_name: None,
            is_admin: admin,
            created_ts: 0,
        })
    }
}

#[async_trait]
impl BlobStore for FakeBackend {
    async fn upload(
        &self,
        kind: UploadKind,
        payload: UploadPayload,
    ) -> Result<StoredBlob, ClientError> {
        payload.check(kind)?;
        let n = self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("blob{n}");
        Ok(StoredBlob {
            download_url: format!("http://blobs/{id}"),
            id,
            content_type: payload.content_type,
            size_bytes: payload.size_bytes,
        })
    }
}
