//! services/api/src/web/middleware.rs
//!
//! Session resolution for the JSON API and the route guard for pages.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use research_navigator_core::routing::{guard, RouteDecision, SessionState};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::web::state::{AppState, UserSession};

pub const SESSION_COOKIE: &str = "session";

/// The session visible to a page handler; `None` for signed-out visitors.
#[derive(Clone)]
pub struct CurrentSession(pub Option<Arc<UserSession>>);

/// Extracts the session id from the `Cookie` header.
pub fn session_id_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| {
            let c = c.trim();
            c.strip_prefix(SESSION_COOKIE)?.strip_prefix('=')
        })
        .filter(|id| !id.is_empty())
}

async fn current_session(state: &AppState, headers: &HeaderMap) -> Option<Arc<UserSession>> {
    let session_id = session_id_from(headers)?;
    state.resolve_session(session_id).await
}

/// Middleware that resolves the session cookie for API routes.
///
/// If valid, inserts the user's session into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session = current_session(&state, req.headers()).await.ok_or_else(|| {
        warn!("Rejected unauthenticated request to {}", req.uri().path());
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Middleware that applies the route guard to page requests: signed-out
/// visitors are sent to `/login` from private pages, signed-in users to `/`
/// from public-only pages.
pub async fn page_guard(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = current_session(&state, req.headers()).await;
    let session_state = match &session {
        Some(s) => SessionState::SignedIn(s.identity().await),
        None => SessionState::SignedOut,
    };

    match guard(req.uri().path(), &session_state) {
        RouteDecision::Render(route) => {
            req.extensions_mut().insert(route);
            req.extensions_mut().insert(CurrentSession(session));
            next.run(req).await
        }
        RouteDecision::Redirect(route) => {
            debug!("Redirecting {} to {}", req.uri().path(), route.path());
            Redirect::to(route.path()).into_response()
        }
        RouteDecision::Wait => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
