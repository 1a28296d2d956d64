//! Sign-in, registration and sign-out as the auth screen drives them.

use marquee_core::types::FederatedProvider;
use marquee_core::validation::{validate_credentials, validate_display_name};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ClientError;
use crate::notify::Notifications;
use crate::routes::Route;
use crate::services::AuthService;

/// What the screen should do once a flow finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    Navigate(Route),
    /// Per-field messages to show inline; nothing was sent.
    Invalid(Value),
    /// Stay put; a notification explains what went wrong.
    Stay,
}

pub const UNVERIFIED_MESSAGE: &str =
    "Please verify your email address before signing in. Check your inbox for the code.";

/// Report a failed auth call. Authentication failures go back to `/auth`.
fn auth_failure(notes: &Notifications, e: ClientError) -> FlowOutcome {
    match e {
        ClientError::Validation(fields) => FlowOutcome::Invalid(fields),
        e if e.is_auth_failure() => {
            notes.error(e.to_string());
            FlowOutcome::Navigate(Route::Auth)
        }
        e => {
            warn!(error = %e, "auth request failed");
            notes.error(e.to_string());
            FlowOutcome::Stay
        }
    }
}

pub async fn sign_in_with_email(
    auth: &dyn AuthService,
    notes: &Notifications,
    email: &str,
    password: &str,
) -> FlowOutcome {
    let email = email.trim();
    if let Some(fields) = validate_credentials(email, password) {
        return FlowOutcome::Invalid(fields);
    }

    let session = match auth.sign_in_with_email(email, password).await {
        Ok(session) => session,
        Err(e) => return auth_failure(notes, e),
    };

    if !session.email_verified {
        info!(uid = %session.uid, "unverified sign-in, signing out");
        if let Err(e) = auth.sign_out().await {
            warn!(error = %e, "sign-out after unverified sign-in failed");
        }
        notes.error(UNVERIFIED_MESSAGE);
        return FlowOutcome::Navigate(Route::Auth);
    }

    FlowOutcome::Navigate(Route::Catalog)
}

pub async fn sign_in_with_provider(
    auth: &dyn AuthService,
    notes: &Notifications,
    provider: FederatedProvider,
    assertion: &str,
) -> FlowOutcome {
    match auth.sign_in_with_provider(provider, assertion).await {
        Ok(session) => {
            info!(uid = %session.uid, %provider, "federated sign-in");
            FlowOutcome::Navigate(Route::Catalog)
        }
        Err(e) => auth_failure(notes, e),
    }
}

pub async fn register(
    auth: &dyn AuthService,
    notes: &Notifications,
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> FlowOutcome {
    let email = email.trim();
    let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());

    let mut fields = serde_json::Map::new();
    for errors in [
        validate_credentials(email, password),
        validate_display_name(display_name),
    ]
    .into_iter()
    .flatten()
    {
        if let Value::Object(map) = errors {
            fields.extend(map);
        }
    }
    if !fields.is_empty() {
        return FlowOutcome::Invalid(Value::Object(fields));
    }

    match auth.register(email, password, display_name).await {
        Ok(_) => {
            notes.info(format!(
                "Account created. Enter the verification code sent to {email}."
            ));
            FlowOutcome::Navigate(Route::Auth)
        }
        Err(e) => auth_failure(notes, e),
    }
}

pub async fn verify_email(
    auth: &dyn AuthService,
    notes: &Notifications,
    email: &str,
    code: &str,
) -> FlowOutcome {
    match auth.verify_email(email.trim(), code.trim()).await {
        Ok(()) => {
            notes.info("Email verified. You can sign in now.");
            FlowOutcome::Navigate(Route::Auth)
        }
        Err(e) => auth_failure(notes, e),
    }
}

pub async fn sign_out(auth: &dyn AuthService, notes: &Notifications) -> FlowOutcome {
    match auth.sign_out().await {
        Ok(()) => FlowOutcome::Navigate(Route::Auth),
        Err(e) => {
            warn!(error = %e, "sign-out failed");
            notes.error(e.to_string());
            FlowOutcome::Stay
        }
    }
}
