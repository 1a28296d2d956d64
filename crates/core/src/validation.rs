use chrono::Datelike;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;

use crate::types::{MovieDraft, NewMovie};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const EARLIEST_FILM_YEAR: i32 = 1888;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Validate sign-in or registration credentials. Returns field errors or `None`.
pub fn validate_credentials(email: &str, password: &str) -> Option<Value> {
    let mut fields = serde_json::Map::new();

    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        fields.insert("email".to_string(), json!(["must be a valid email address"]));
    }

    if password.len() < MIN_PASSWORD_LEN || password.len() > 1024 {
        fields.insert(
            "password".to_string(),
            json!([format!(
                "must be between {MIN_PASSWORD_LEN} and 1024 characters"
            )]),
        );
    }

    if fields.is_empty() {
        None
    } else {
        Some(Value::Object(fields))
    }
}

/// Validate an optional display name.
pub fn validate_display_name(display_name: Option<&str>) -> Option<Value> {
    match display_name {
        Some(name) if name.trim().is_empty() || name.len() > 64 => Some(json!({
            "display_name": ["must be between 1 and 64 characters"]
        })),
        _ => None,
    }
}

/// Validate the user-entered fields of a movie.
pub fn validate_movie_draft(draft: &MovieDraft) -> Option<Value> {
    let mut fields = serde_json::Map::new();

    if draft.title.trim().is_empty() || draft.title.len() > 200 {
        fields.insert(
            "title".to_string(),
            json!(["must be between 1 and 200 characters"]),
        );
    }

    if draft.description.trim().is_empty() || draft.description.len() > 5000 {
        fields.insert(
            "description".to_string(),
            json!(["must be between 1 and 5000 characters"]),
        );
    }

    if draft.genre.trim().is_empty() || draft.genre.len() > 64 {
        fields.insert(
            "genre".to_string(),
            json!(["must be between 1 and 64 characters"]),
        );
    }

    if draft.duration.trim().is_empty() || draft.duration.len() > 32 {
        fields.insert(
            "duration".to_string(),
            json!(["must be between 1 and 32 characters"]),
        );
    }

    if !draft.rating.is_finite() || !(0.0..=5.0).contains(&draft.rating) {
        fields.insert("rating".to_string(), json!(["must be between 0 and 5"]));
    }

    let latest_year = chrono::Utc::now().year() + 5;
    if draft.year < EARLIEST_FILM_YEAR || draft.year > latest_year {
        fields.insert(
            "year".to_string(),
            json!([format!(
                "must be between {EARLIEST_FILM_YEAR} and {latest_year}"
            )]),
        );
    }

    if fields.is_empty() {
        None
    } else {
        Some(Value::Object(fields))
    }
}

/// Validate a complete creation payload: the draft plus both media URLs.
pub fn validate_new_movie(movie: &NewMovie) -> Option<Value> {
    let mut fields = match validate_movie_draft(&movie.draft) {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };

    if movie.video_url.trim().is_empty() {
        fields.insert("video_url".to_string(), json!(["is required"]));
    }

    if movie.poster_url.trim().is_empty() {
        fields.insert("poster_url".to_string(), json!(["is required"]));
    }

    if fields.is_empty() {
        None
    } else {
        Some(Value::Object(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MovieDraft {
        MovieDraft {
            title: "Night Train".into(),
            description: "A long ride.".into(),
            genre: "Drama".into(),
            duration: "1h 30m".into(),
            rating: 4.5,
            year: 1999,
        }
    }

    #[test]
    fn credentials_ok() {
        assert!(validate_credentials("ada@example.com", "secret1").is_none());
    }

    #[test]
    fn credentials_report_each_field() {
        let errors = validate_credentials("not-an-email", "123").unwrap();
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn display_name_optional() {
        assert!(validate_display_name(None).is_none());
        assert!(validate_display_name(Some("Ada")).is_none());
        assert!(validate_display_name(Some("   ")).is_some());
    }

    #[test]
    fn draft_ok() {
        assert!(validate_movie_draft(&draft()).is_none());
    }

    #[test]
    fn draft_rating_out_of_range() {
        let mut d = draft();
        d.rating = 5.5;
        let errors = validate_movie_draft(&d).unwrap();
        assert_eq!(errors["rating"][0], "must be between 0 and 5");

        d.rating = f64::NAN;
        assert!(validate_movie_draft(&d).unwrap().get("rating").is_some());
    }

    #[test]
    fn draft_missing_title_and_year() {
        let mut d = draft();
        d.title = " ".into();
        d.year = 1700;
        let errors = validate_movie_draft(&d).unwrap();
        assert!(errors.get("title").is_some());
        assert!(errors.get("year").is_some());
        assert!(errors.get("genre").is_none());
    }

    #[test]
    fn new_movie_requires_media_urls() {
        let movie = NewMovie {
            draft: draft(),
            poster_url: String::new(),
            video_url: "http://localhost/blobs/1".into(),
        };
        let errors = validate_new_movie(&movie).unwrap();
        assert!(errors.get("poster_url").is_some());
        assert!(errors.get("video_url").is_none());
    }
}
