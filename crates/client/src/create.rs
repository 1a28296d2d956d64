//! The administrator's "add movie" flow: validate, upload media, create the
//! document, then open the new movie.

use marquee_core::types::{MovieDraft, NewMovie};
use marquee_core::upload::UploadKind;
use marquee_core::validation::validate_movie_draft;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::auth_flow::FlowOutcome;
use crate::error::ClientError;
use crate::notify::Notifications;
use crate::routes::Route;
use crate::services::{BlobStore, DocumentStore, UploadPayload};
use crate::session::SessionSnapshot;

pub struct CreateMovieForm {
    pub draft: MovieDraft,
    pub video: UploadPayload,
    pub poster: UploadPayload,
}

/// Everything wrong with the form, checked without touching the network.
pub fn check_form(form: &CreateMovieForm) -> Option<Value> {
    let mut fields = match validate_movie_draft(&form.draft) {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    if let Err(rejection) = form.video.check(UploadKind::Video) {
        fields.insert("video".into(), json!([rejection.to_string()]));
    }
    if let Err(rejection) = form.poster.check(UploadKind::Image) {
        fields.insert("poster".into(), json!([rejection.to_string()]));
    }
    (!fields.is_empty()).then_some(Value::Object(fields))
}

pub async fn create_movie(
    session: &SessionSnapshot,
    docs: &dyn DocumentStore,
    blobs: &dyn BlobStore,
    notes: &Notifications,
    form: CreateMovieForm,
) -> FlowOutcome {
    if !session.is_admin() {
        notes.error(ClientError::NotAdmin.to_string());
        return FlowOutcome::Navigate(Route::Catalog);
    }

    if let Some(fields) = check_form(&form) {
        return FlowOutcome::Invalid(fields);
    }

    let CreateMovieForm {
        draft,
        video,
        poster,
    } = form;

    let video = match blobs.upload(UploadKind::Video, video).await {
        Ok(blob) => blob,
        Err(e) => return abandon(notes, "video upload", e),
    };
    let poster = match blobs.upload(UploadKind::Image, poster).await {
        Ok(blob) => blob,
        Err(e) => return abandon(notes, "poster upload", e),
    };

    let new_movie = NewMovie {
        draft,
        poster_url: poster.download_url,
        video_url: video.download_url,
    };

    match docs.create_movie(&new_movie).await {
        Ok(movie) => {
            info!(movie_id = %movie.id, title = %movie.title, "movie created");
            notes.info(format!("\"{}\" was added to the catalog.", movie.title));
            FlowOutcome::Navigate(Route::Watch(movie.id))
        }
        Err(ClientError::Validation(fields)) => FlowOutcome::Invalid(fields),
        Err(e) => abandon(notes, "movie creation", e),
    }
}

fn abandon(notes: &Notifications, step: &str, e: ClientError) -> FlowOutcome {
    warn!(step, error = %e, "movie creation abandoned");
    notes.error(format!("{step} failed: {e}"));
    if e.is_auth_failure() {
        FlowOutcome::Navigate(Route::Auth)
    } else {
        FlowOutcome::Stay
    }
}
