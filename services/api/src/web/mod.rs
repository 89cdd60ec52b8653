pub mod auth;
pub mod debounce;
pub mod middleware;
pub mod pages;
pub mod protocol;
pub mod respond;
pub mod rest;
pub mod search_socket;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use research_navigator_core::routing::Route;
use std::sync::Arc;

pub use middleware::{page_guard, require_auth};
pub use search_socket::search_socket_handler;
pub use state::AppState;

/// Builds the application router: the auth endpoints, the JSON API behind
/// the session cookie, and the guarded page routes.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no session required)
    let auth_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/federated", get(auth::federated_handler))
        .route("/auth/callback", post(auth::callback_handler));

    // Protected routes (session required)
    let api_routes = Router::new()
        .route(
            "/api/folders",
            get(rest::list_folders_handler).post(rest::create_folder_handler),
        )
        .route(
            "/api/folders/{id}",
            patch(rest::update_folder_handler).delete(rest::delete_folder_handler),
        )
        .route(
            "/api/profile",
            get(rest::get_profile_handler).patch(rest::update_profile_handler),
        )
        .route("/api/history", get(rest::list_history_handler))
        .route("/api/search", post(rest::search_handler))
        .route("/ws/search", get(search_socket_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let page_routes = Route::ALL
        .into_iter()
        .fold(Router::new(), |router, route| {
            router.route(route.path(), get(pages::page_handler))
        })
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            page_guard,
        ));

    Router::new()
        .merge(auth_routes)
        .merge(api_routes)
        .merge(page_routes)
        .fallback(pages::fallback_handler)
        .with_state(state)
}
