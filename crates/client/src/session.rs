//! Signed-in user state, owned by one context object.
//!
//! [`SessionContext::init`] subscribes to auth changes and loads the profile
//! for each new session; [`SessionContext::teardown`] unsubscribes. Subtrees
//! that need the user are handed a snapshot or a receiver explicitly.

use std::sync::Arc;

use marquee_core::types::{AuthSession, Profile};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::{AuthService, DocumentStore};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// True until the first session state (and its profile) is known.
    pub loading: bool,
    pub session: Option<AuthSession>,
    pub profile: Option<Profile>,
}

impl SessionSnapshot {
    pub fn loading() -> Self {
        Self {
            loading: true,
            session: None,
            profile: None,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            loading: false,
            session: None,
            profile: None,
        }
    }

    /// A session exists and its email address is verified.
    pub fn is_verified(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.email_verified)
    }

    pub fn is_admin(&self) -> bool {
        self.is_verified() && self.profile.as_ref().is_some_and(|p| p.is_admin)
    }
}

pub struct SessionContext {
    state: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl SessionContext {
    /// Start tracking the auth service. Must be called from within a tokio
    /// runtime.
    pub fn init(auth: Arc<dyn AuthService>, docs: Arc<dyn DocumentStore>) -> Self {
        let (tx, rx) = watch::channel(SessionSnapshot::loading());
        let auth_rx = auth.subscribe();
        let task = tokio::spawn(track(auth_rx, docs, tx));
        Self {
            state: rx,
            task: Some(task),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Wait until the current session (and its profile) has been resolved.
    pub async fn ready(&self) -> SessionSnapshot {
        let mut rx = self.state.clone();
        match rx.wait_for(|s| !s.loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    pub async fn teardown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        debug!("session context torn down");
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn track(
    mut auth_rx: watch::Receiver<Option<AuthSession>>,
    docs: Arc<dyn DocumentStore>,
    tx: watch::Sender<SessionSnapshot>,
) {
    loop {
        let session = auth_rx.borrow_and_update().clone();

        let snapshot = match session {
            None => SessionSnapshot::signed_out(),
            Some(session) => {
                let profile = match docs.get_profile().await {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        warn!(uid = %session.uid, error = %e, "failed to load profile");
                        None
                    }
                };
                SessionSnapshot {
                    loading: false,
                    session: Some(session),
                    profile,
                }
            }
        };

        // The session moved on while the profile was loading; start over.
        if auth_rx.has_changed().unwrap_or(false) {
            continue;
        }

        if let Some(s) = &snapshot.session {
            info!(uid = %s.uid, verified = s.email_verified, "session changed");
        } else {
            info!("signed out");
        }
        tx.send_replace(snapshot);

        if auth_rx.changed().await.is_err() {
            break;
        }
    }
}
