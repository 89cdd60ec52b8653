//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the JSON API behind the folder manager,
//! history viewer, profile editor and search page, and the master definition
//! for the OpenAPI specification.

use crate::web::{auth, respond::respond, state::{AppState, UserSession}};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Extension, Json,
};
use research_navigator_core::domain::{
    AdvancedSearchParams, FolderUpdate, NewFolder, ProfileUpdate,
};
use research_navigator_core::ports::DataStore;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::federated_handler,
        auth::callback_handler,
        list_folders_handler,
        create_folder_handler,
        update_folder_handler,
        delete_folder_handler,
        get_profile_handler,
        update_profile_handler,
        list_history_handler,
        search_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::CallbackRequest,
            auth::AuthResponse,
            CreateFolderRequest,
            UpdateFolderRequest,
            SearchRequest,
        )
    ),
    tags(
        (name = "Research Navigator API", description = "API endpoints for managing research-paper searches.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateFolderRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    /// Advanced-search form; present only while advanced mode is open.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub advanced: Option<AdvancedSearchParams>,
}

//=========================================================================================
// Folder Handlers
//=========================================================================================

/// List the user's folders, newest first.
#[utoipa::path(
    get,
    path = "/api/folders",
    responses(
        (status = 200, description = "The user's folders"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The store could not be reached")
    )
)]
pub async fn list_folders_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
) -> Response {
    let who = session.identity().await;
    let mut view = session.folders.lock().await;
    let outcome = view.load(app_state.store.as_ref(), &who).await;
    respond(None, outcome, StatusCode::OK, view.folders())
}

/// Create a folder.
#[utoipa::path(
    post,
    path = "/api/folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created; the updated list is returned"),
        (status = 400, description = "Folder name missing"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The store rejected the insert")
    )
)]
pub async fn create_folder_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Json(req): Json<CreateFolderRequest>,
) -> Response {
    let who = session.identity().await;
    let draft = NewFolder {
        name: req.name,
        description: req.description,
    };
    let mut view = session.folders.lock().await;
    let outcome = view.create(app_state.store.as_ref(), &who, draft).await;
    respond(None, outcome, StatusCode::CREATED, view.folders())
}

/// Rename or re-describe a folder.
#[utoipa::path(
    patch,
    path = "/api/folders/{id}",
    request_body = UpdateFolderRequest,
    params(("id" = Uuid, Path, description = "The folder to change")),
    responses(
        (status = 200, description = "Folder updated; the updated list is returned"),
        (status = 400, description = "Folder name blank"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "No such folder, or the store rejected the update")
    )
)]
pub async fn update_folder_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Path(folder_id): Path<Uuid>,
    Json(req): Json<UpdateFolderRequest>,
) -> Response {
    let who = session.identity().await;
    let changes = FolderUpdate {
        name: req.name,
        description: req.description,
    };
    let mut view = session.folders.lock().await;
    let outcome = view
        .update(app_state.store.as_ref(), &who, folder_id, changes)
        .await;
    respond(None, outcome, StatusCode::OK, view.folders())
}

/// Delete a folder. There is no undo.
#[utoipa::path(
    delete,
    path = "/api/folders/{id}",
    params(("id" = Uuid, Path, description = "The folder to delete")),
    responses(
        (status = 200, description = "Folder deleted; the updated list is returned"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The store rejected the delete")
    )
)]
pub async fn delete_folder_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Path(folder_id): Path<Uuid>,
) -> Response {
    let who = session.identity().await;
    let mut view = session.folders.lock().await;
    let outcome = view.delete(app_state.store.as_ref(), &who, folder_id).await;
    respond(None, outcome, StatusCode::OK, view.folders())
}

//=========================================================================================
// Profile Handlers
//=========================================================================================

/// Fetch the user's profile, creating an empty one on the first visit.
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "The profile and whether it is being edited"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The store could not be reached")
    )
)]
pub async fn get_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
) -> Response {
    let who = session.identity().await;
    let mut view = session.settings.lock().await;
    let outcome = view.load(app_state.store.as_ref(), &who).await;
    respond(None, outcome, StatusCode::OK, &*view)
}

/// Save profile changes. Only the fields present in the body change;
/// `"dob": null` clears the date of birth.
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body(content_type = "application/json", description = "Any of name, dob, currently_pursuing, interests, phone."),
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Profile not loaded yet"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The store rejected the update")
    )
)]
pub async fn update_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Json(changes): Json<ProfileUpdate>,
) -> Response {
    let who = session.identity().await;
    let mut view = session.settings.lock().await;
    if view.profile().is_none() {
        // Saving straight after sign-in: load (or create) the row first.
        if let Err(failure) = view.load(app_state.store.as_ref(), &who).await {
            return respond(None, Err(failure), StatusCode::OK, &*view);
        }
    }
    let outcome = view.save(app_state.store.as_ref(), &who, changes).await;
    respond(None, outcome, StatusCode::OK, &*view)
}

//=========================================================================================
// History Handler
//=========================================================================================

/// List past searches, newest first.
#[utoipa::path(
    get,
    path = "/api/history",
    responses(
        (status = 200, description = "The user's search history"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The store could not be reached")
    )
)]
pub async fn list_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
) -> Response {
    let who = session.identity().await;
    let mut view = session.history.lock().await;
    let outcome = view.load(app_state.store.as_ref(), &who).await;
    respond(None, outcome, StatusCode::OK, view.entries())
}

//=========================================================================================
// Search Handler
//=========================================================================================

/// Run a search immediately (the search button).
#[utoipa::path(
    post,
    path = "/api/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "The search page with its results"),
        (status = 400, description = "Empty query, or advanced mode with every field blank"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The search API failed")
    )
)]
pub async fn search_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Json(req): Json<SearchRequest>,
) -> Response {
    let who = session.identity().await;
    let mut view = session.search.lock().await;
    view.set_query(req.query);
    view.set_advanced_open(req.advanced.is_some());
    if let Some(params) = req.advanced {
        view.set_advanced(params);
    }

    let recorder: &dyn DataStore = app_state.store.as_ref();
    let history = app_state
        .config
        .record_search_history
        .then_some((recorder, &who));
    let outcome = view.search(app_state.papers.as_ref(), history).await;
    respond(None, outcome, StatusCode::OK, &*view)
}
