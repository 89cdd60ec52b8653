//! crates/research_navigator_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: the hosted
//! store, the identity provider and the paper-search API are all reached
//! through them, so the page models never see HTTP.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AuthSession, AuthenticatedUser, Folder, FolderUpdate, Identity, NewFolder, NewProfile,
    Paper, PaperQuery, Profile, ProfileUpdate, SearchFilters, SearchHistoryEntry,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error taxonomy shared by every port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// Client-side input rejected before any remote call.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Transport or server failure while reading.
    #[error("Remote read failed: {0}")]
    RemoteRead(String),
    /// Transport, constraint or no-match failure while writing.
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),
    /// Zero rows where exactly one was expected.
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Sign-in, sign-up or sign-out rejected by the identity provider.
    #[error("Authentication failed: {0}")]
    Auth(String),
    /// Missing or expired access token.
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The data-access layer: one call per (entity, operation), each scoped to
/// the caller's identity. Implementations log failures and propagate them;
/// none retry, batch or cache.
#[async_trait]
pub trait DataStore: Send + Sync {
    // --- Profiles ---
    async fn create_profile(&self, who: &Identity, fields: NewProfile) -> PortResult<Profile>;

    /// Exactly one row, or `NotFound`.
    async fn get_profile(&self, who: &Identity) -> PortResult<Profile>;

    /// Zero or one row.
    async fn find_profile(&self, who: &Identity) -> PortResult<Option<Profile>>;

    async fn update_profile(&self, who: &Identity, changes: ProfileUpdate)
        -> PortResult<Profile>;

    // --- Folders ---
    async fn create_folder(&self, who: &Identity, draft: NewFolder) -> PortResult<Folder>;

    /// Newest first.
    async fn get_folders(&self, who: &Identity) -> PortResult<Vec<Folder>>;

    async fn update_folder(
        &self,
        who: &Identity,
        folder_id: Uuid,
        changes: FolderUpdate,
    ) -> PortResult<Folder>;

    async fn delete_folder(&self, who: &Identity, folder_id: Uuid) -> PortResult<()>;

    // --- Search history ---
    async fn add_search_history(
        &self,
        who: &Identity,
        query: &str,
        filters: SearchFilters,
    ) -> PortResult<SearchHistoryEntry>;

    /// Newest first.
    async fn get_search_history(&self, who: &Identity) -> PortResult<Vec<SearchHistoryEntry>>;
}

/// The external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> PortResult<AuthSession>;

    /// The URL the browser is sent to for a federated sign-in.
    fn federated_sign_in_url(&self, provider: &str, redirect_to: Option<&str>)
        -> PortResult<String>;

    /// Looks up the user an access token belongs to.
    async fn resolve_user(&self, access_token: &str) -> PortResult<AuthenticatedUser>;

    async fn refresh(&self, refresh_token: &str) -> PortResult<AuthSession>;

    async fn sign_out(&self, access_token: &str) -> PortResult<()>;
}

#[async_trait]
pub trait PaperSearchService: Send + Sync {
    /// Runs one query against the external search API.
    async fn search(&self, query: &PaperQuery) -> PortResult<Vec<Paper>>;
}
