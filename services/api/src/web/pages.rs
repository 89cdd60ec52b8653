//! services/api/src/web/pages.rs
//!
//! The page routes. Each protected page answers with its initial load, the
//! way the browser screens fetch their data when they mount.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use research_navigator_core::routing::Route;
use std::sync::Arc;
use tracing::error;

use crate::web::middleware::CurrentSession;
use crate::web::respond::respond;
use crate::web::state::AppState;

/// Renders whichever page the guard let through.
pub async fn page_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(route): Extension<Route>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Response {
    let page = Some(route.page_name());

    let Some(session) = session else {
        return respond(page, Ok(None), StatusCode::OK, serde_json::Value::Null);
    };

    let store = app_state.store.as_ref();
    let who = session.identity().await;

    match route {
        Route::Home => {
            let view = session.search.lock().await;
            respond(page, Ok(None), StatusCode::OK, &*view)
        }
        Route::Tagged => {
            let mut view = session.folders.lock().await;
            let outcome = view.load(store, &who).await;
            respond(page, outcome, StatusCode::OK, &*view)
        }
        Route::History => {
            let mut view = session.history.lock().await;
            let outcome = view.load(store, &who).await;
            respond(page, outcome, StatusCode::OK, &*view)
        }
        Route::Settings => {
            let mut view = session.settings.lock().await;
            let outcome = view.load(store, &who).await;
            respond(page, outcome, StatusCode::OK, &*view)
        }
        Route::Login | Route::Signup | Route::Landing => {
            // The guard never lets a signed-in user reach these.
            error!("Public page {:?} rendered for a signed-in user", route);
            Redirect::to(Route::Home.path()).into_response()
        }
    }
}

/// Any path the app does not know leads home.
pub async fn fallback_handler() -> Redirect {
    Redirect::to(Route::Home.path())
}
