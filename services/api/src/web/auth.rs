//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, login, logout and federated sign-in.
//! Credentials are checked by the identity provider; this service only keeps
//! the resulting tokens in a session behind an opaque cookie.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use research_navigator_core::domain::{
    AuthSession, NewProfile, Notice, Profile, MAX_TOKEN_LIFETIME_SECS,
};
use research_navigator_core::ports::PortError;
use research_navigator_core::routing::Route;
use research_navigator_core::views::{self, Failure, SignUpForm, SignedIn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::{session_id_from, SESSION_COOKIE};
use crate::web::respond::respond;
use crate::web::state::{AppState, SESSION_MAX_AGE};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub currently_pursuing: String,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub phone: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Tokens handed back by the federated provider after its redirect.
#[derive(Deserialize, ToSchema)]
pub struct CallbackRequest {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct FederatedParams {
    /// Defaults to the configured provider.
    pub provider: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// Where the client navigates next.
    pub redirect: String,
    #[schema(value_type = Option<Object>)]
    pub profile: Option<Profile>,
    #[schema(value_type = Option<Object>)]
    pub notice: Option<Notice>,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn session_cookie(session_id: &str) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        SESSION_MAX_AGE.as_secs()
    )
}

fn cleared_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0")
}

fn failure_response(failure: Failure) -> Response {
    respond(None, Err(failure), StatusCode::OK, serde_json::Value::Null)
}

/// Opens a session for a completed sign-in and answers with its cookie.
async fn open_session(state: &AppState, signed_in: SignedIn, status: StatusCode) -> Response {
    let SignedIn {
        session,
        profile,
        landing,
        notice,
    } = signed_in;

    let user_session = state.sessions.open(session).await;
    if let Some(profile) = &profile {
        user_session.settings.lock().await.preload(profile.clone());
    }

    let body = AuthResponse {
        user_id: user_session.user.user_id,
        email: user_session.user.email.clone(),
        redirect: landing.path().to_string(),
        profile,
        notice,
    };

    (
        status,
        [(header::SET_COOKIE, session_cookie(&user_session.id))],
        Json(body),
    )
        .into_response()
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create an account and its profile
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = AuthResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 401, description = "The identity provider refused the sign-up")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Response {
    let form = SignUpForm {
        email: req.email,
        password: req.password,
        profile: NewProfile {
            name: req.name,
            dob: req.dob,
            currently_pursuing: req.currently_pursuing,
            interests: req.interests,
            phone: req.phone,
        },
    };
    match views::sign_up(state.identity.as_ref(), state.store.as_ref(), form).await {
        Ok(signed_in) => open_session(&state, signed_in, StatusCode::CREATED).await,
        Err(failure) => failure_response(failure),
    }
}

/// POST /auth/login - Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid email or password format"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    match views::sign_in(state.identity.as_ref(), &req.email, &req.password).await {
        Ok(signed_in) => open_session(&state, signed_in, StatusCode::OK).await,
        Err(failure) => failure_response(failure),
    }
}

/// POST /auth/logout - Close the session and revoke its tokens
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = session_id_from(&headers)
        .ok_or(ApiError::Port(PortError::Unauthorized))?;
    let session = state
        .sessions
        .close(session_id)
        .await
        .ok_or(ApiError::Port(PortError::Unauthorized))?;

    // The local session is gone either way; a failed revoke only means the
    // provider's token lives until it expires.
    if let Err(e) = state.identity.sign_out(&session.access_token().await).await {
        warn!("Provider sign-out failed for user {}: {}", session.user.user_id, e);
    }

    Ok((StatusCode::OK, [(header::SET_COOKIE, cleared_cookie())]))
}

/// GET /auth/federated - Start a federated sign-in
#[utoipa::path(
    get,
    path = "/auth/federated",
    params(FederatedParams),
    responses(
        (status = 303, description = "Redirect to the provider's consent screen"),
        (status = 401, description = "Provider unknown to the identity service")
    )
)]
pub async fn federated_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FederatedParams>,
) -> Result<Redirect, ApiError> {
    let provider = params
        .provider
        .unwrap_or_else(|| state.config.federated_provider.clone());
    let url = state
        .identity
        .federated_sign_in_url(&provider, state.config.federated_redirect_url.as_deref())?;
    info!("Starting federated sign-in with {}", provider);
    Ok(Redirect::to(&url))
}

/// POST /auth/callback - Finish a federated sign-in
#[utoipa::path(
    post,
    path = "/auth/callback",
    request_body = CallbackRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Token lifetime out of range"),
        (status = 401, description = "The tokens were rejected")
    )
)]
pub async fn callback_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CallbackRequest>,
) -> Result<Response, ApiError> {
    let expires_at = AuthSession::expiry_after(Utc::now(), req.expires_in).ok_or_else(|| {
        PortError::Validation(format!(
            "expires_in must be between 1 and {MAX_TOKEN_LIFETIME_SECS} seconds"
        ))
    })?;
    let user = state.identity.resolve_user(&req.access_token).await?;
    info!("User {} signed in through a federated provider", user.user_id);

    let signed_in = SignedIn {
        session: AuthSession {
            user,
            access_token: req.access_token,
            refresh_token: req.refresh_token,
            expires_at,
        },
        profile: None,
        landing: Route::Home,
        notice: None,
    };
    Ok(open_session(&state, signed_in, StatusCode::OK).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookies_match_the_session_header_format() {
        assert_eq!(
            session_cookie("abc"),
            "session=abc; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=2592000"
        );
        assert!(cleared_cookie().starts_with("session=;"));
        assert!(cleared_cookie().ends_with("Max-Age=0"));
    }
}
