use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router, middleware};
use marquee_core::error::ApiError;
use marquee_core::types::{AuthSession, FederatedProvider, Movie, NewMovie, Page, Profile};
use marquee_core::validation::{validate_credentials, validate_display_name, validate_new_movie};
use marquee_db::repo::movies::MovieCursor;
use marquee_db::repo::{accounts, movies, profiles};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::auth::{
    AdminUser, AuthUser, VerifiedUser, issue_token, validate_federated_assertion,
};
use crate::error::AppError;
use crate::rate_limit::{
    AUTH_ATTEMPTS_PER_WINDOW, AUTH_WINDOW_SECS, RateLimiter, rate_limit_middleware,
};
use crate::state::AppState;

const MAX_PAGE_LIMIT: i64 = 100;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .route("/blobs/{id}", get(crate::blobs::download_blob))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_router())
        // Profile
        .route("/profile", get(get_profile).patch(update_profile))
        // Document store
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/{id}", get(get_movie))
        // Blob store; size limits are enforced while streaming
        .route(
            "/blobs/{kind}",
            post(crate::blobs::upload_blob).layer(DefaultBodyLimit::disable()),
        )
}

fn auth_router() -> Router<AppState> {
    let rate_limiter = RateLimiter::new(AUTH_ATTEMPTS_PER_WINDOW, AUTH_WINDOW_SECS);
    Router::new()
        .route("/register", post(register))
        .route("/verify", post(verify_email))
        .route("/login", post(login))
        .route("/federated", post(federated_login))
        .layer(middleware::from_fn(rate_limit_middleware))
        .layer(Extension(rate_limiter))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("database check failed: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    uid: String,
    email: String,
    email_verified: bool,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let email = body.email.trim().to_lowercase();

    let mut fields = validate_credentials(&email, &body.password)
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    if let Some(serde_json::Value::Object(more)) = validate_display_name(body.display_name.as_deref())
    {
        fields.extend(more);
    }
    if !fields.is_empty() {
        return Err(ApiError::validation(serde_json::Value::Object(fields)).into());
    }

    let registration =
        accounts::create_password_account(&state.db, &email, &body.password, body.display_name.as_deref())
            .await?;

    // No mail transport: the code is handed to the operator log.
    info!(
        uid = %registration.id,
        email = %email,
        code = %registration.verification_code,
        "account registered, verification code issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            uid: registration.id,
            email,
            email_verified: false,
        }),
    ))
}

#[derive(Deserialize)]
struct VerifyRequest {
    email: String,
    code: String,
}

async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> Result<StatusCode, AppError> {
    let email = body.email.trim().to_lowercase();
    if !accounts::verify_email(&state.db, &email, body.code.trim()).await? {
        return Err(ApiError::BadRequest("invalid verification code".into()).into());
    }
    info!(email = %email, "email verified");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Credentials sign-in. Unverified accounts still receive a token; the
/// caller decides what to do with `email_verified`.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let email = body.email.trim().to_lowercase();
    let account = accounts::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".into()))?;

    let Some(hash) = account.password_hash.as_deref() else {
        return Err(ApiError::Unauthorized("invalid credentials".into()).into());
    };

    if !accounts::verify_password(&body.password, hash)? {
        return Err(ApiError::Unauthorized("invalid credentials".into()).into());
    }

    let token = issue_token(&account.id, &account.email, account.email_verified, &state.jwt_secret)?;
    debug!(uid = %account.id, verified = account.email_verified, "password sign-in");

    Ok(Json(AuthSession {
        uid: account.id,
        email: account.email,
        email_verified: account.email_verified,
        token,
    }))
}

#[derive(Deserialize)]
struct FederatedLoginRequest {
    provider: FederatedProvider,
    assertion: String,
}

async fn federated_login(
    State(state): State<AppState>,
    Json(body): Json<FederatedLoginRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let secret = state
        .federated_secret
        .as_deref()
        .ok_or_else(|| ApiError::Forbidden("federated sign-in is not configured".into()))?;

    let claims = validate_federated_assertion(&body.assertion, body.provider, secret)?;
    let email = claims.email.trim().to_lowercase();

    let account = accounts::upsert_federated_account(
        &state.db,
        body.provider.as_str(),
        &email,
        claims.name.as_deref(),
    )
    .await?;

    let token = issue_token(&account.id, &account.email, true, &state.jwt_secret)?;
    debug!(uid = %account.id, provider = %body.provider, "federated sign-in");

    Ok(Json(AuthSession {
        uid: account.id,
        email: account.email,
        email_verified: true,
        token,
    }))
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

async fn get_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Profile>, AppError> {
    let profile = profiles::get_profile(&state.db, &auth.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("profile not found".into()))?;
    Ok(Json(profile))
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    display_name: Option<String>,
}

async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    if let Some(fields) = validate_display_name(body.display_name.as_deref()) {
        return Err(ApiError::validation(fields).into());
    }

    let display_name = body.display_name.as_deref().map(str::trim);
    if !profiles::update_display_name(&state.db, &auth.account_id, display_name).await? {
        return Err(ApiError::NotFound("profile not found".into()).into());
    }

    get_profile(auth, State(state)).await
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ListMoviesQuery {
    cursor: Option<String>,
    limit: Option<i64>,
}

async fn list_movies(
    _user: VerifiedUser,
    State(state): State<AppState>,
    Query(query): Query<ListMoviesQuery>,
) -> Result<Json<Page<Movie>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(marquee_core::types::CATALOG_PAGE_SIZE as i64)
        .clamp(1, MAX_PAGE_LIMIT);

    let after = match query.cursor.as_deref().filter(|c| !c.is_empty()) {
        Some(raw) => Some(
            MovieCursor::decode(&marquee_core::types::PaginationCursor::new(raw))
                .ok_or_else(|| ApiError::BadRequest("invalid cursor".into()))?,
        ),
        None => None,
    };

    let rows = movies::list_page(&state.db, after.as_ref(), limit).await?;
    let next_cursor = rows.last().map(|row| row.cursor().encode());

    Ok(Json(Page {
        items: rows.into_iter().map(movies::MovieRow::into_movie).collect(),
        next_cursor,
    }))
}

async fn get_movie(
    _user: VerifiedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Movie>, AppError> {
    let row = movies::get_movie(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("movie not found".into()))?;
    Ok(Json(row.into_movie()))
}

async fn create_movie(
    admin: AdminUser,
    State(state): State<AppState>,
    Json(body): Json<NewMovie>,
) -> Result<(StatusCode, Json<Movie>), AppError> {
    if let Some(fields) = validate_new_movie(&body) {
        return Err(ApiError::validation(fields).into());
    }

    let row = movies::insert_movie(&state.db, &body, Some(&admin.account_id)).await?;
    info!(movie_id = %row.id, title = %row.title, created_by = %admin.email, "movie created");

    Ok((StatusCode::CREATED, Json(row.into_movie())))
}
