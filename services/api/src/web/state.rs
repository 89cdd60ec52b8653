//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-user session contexts.

use crate::config::Config;
use chrono::Utc;
use research_navigator_core::domain::{AuthSession, AuthenticatedUser, Identity};
use research_navigator_core::ports::{
    DataStore, IdentityProvider, PaperSearchService, PortError, PortResult,
};
use research_navigator_core::views::{
    ProfileSettingsView, SearchHistoryView, SearchView, TaggedFoldersView,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Tokens this close to expiry are refreshed before use.
const REFRESH_LEEWAY_SECS: i64 = 60;

/// Sessions nobody has used for this long are dropped.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Sessions are dropped this long after sign-in; the cookie lives as long.
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub papers: Arc<dyn PaperSearchService>,
    pub config: Arc<Config>,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Looks up the session behind a cookie id, refreshing its tokens when
    /// they are about to expire. A session whose refresh fails is closed.
    pub async fn resolve_session(&self, session_id: &str) -> Option<Arc<UserSession>> {
        let session = self.sessions.get(session_id).await?;
        match session.ensure_fresh(self.identity.as_ref()).await {
            Ok(()) => Some(session),
            Err(e) => {
                warn!("Token refresh failed for user {}: {}", session.user.user_id, e);
                self.sessions.close(session_id).await;
                None
            }
        }
    }
}

//=========================================================================================
// UserSession (One Signed-in User)
//=========================================================================================

/// The context of one signed-in user: their tokens and the local state of
/// every page. Created at sign-in, dropped at sign-out. Each page sits behind
/// its own lock so calls against the same page run one at a time.
pub struct UserSession {
    pub id: String,
    pub user: AuthenticatedUser,
    tokens: RwLock<AuthSession>,
    pub search: Mutex<SearchView>,
    pub folders: Mutex<TaggedFoldersView>,
    pub history: Mutex<SearchHistoryView>,
    pub settings: Mutex<ProfileSettingsView>,
}

impl UserSession {
    pub fn new(auth: AuthSession) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: auth.user.clone(),
            tokens: RwLock::new(auth),
            search: Mutex::new(SearchView::new()),
            folders: Mutex::new(TaggedFoldersView::new()),
            history: Mutex::new(SearchHistoryView::new()),
            settings: Mutex::new(ProfileSettingsView::new()),
        }
    }

    /// The identity store calls made for this user are scoped by.
    pub async fn identity(&self) -> Identity {
        self.tokens.read().await.identity()
    }

    pub async fn access_token(&self) -> String {
        self.tokens.read().await.access_token.clone()
    }

    async fn needs_refresh(&self) -> bool {
        self.tokens
            .read()
            .await
            .is_expiring(Utc::now(), REFRESH_LEEWAY_SECS)
    }

    /// Refreshes the tokens if they are about to expire. Concurrent callers
    /// wait on the write lock and reuse the first caller's refresh, so a
    /// refresh token is only ever spent once.
    pub async fn ensure_fresh(&self, identity: &dyn IdentityProvider) -> PortResult<()> {
        if !self.needs_refresh().await {
            return Ok(());
        }

        let mut tokens = self.tokens.write().await;
        if !tokens.is_expiring(Utc::now(), REFRESH_LEEWAY_SECS) {
            return Ok(());
        }

        let fresh = identity.refresh(&tokens.refresh_token).await?;
        if fresh.user.user_id != self.user.user_id {
            warn!("Refresh for session {} returned a different user", self.id);
            return Err(PortError::Auth("Token refresh returned a different user".to_string()));
        }
        *tokens = fresh;
        info!("Refreshed tokens for user {}", self.user.user_id);
        Ok(())
    }
}

//=========================================================================================
// SessionRegistry
//=========================================================================================

struct Entry {
    session: Arc<UserSession>,
    opened_at: Instant,
    last_seen: Instant,
}

impl Entry {
    fn is_stale(&self, now: Instant, idle_timeout: Duration, max_age: Duration) -> bool {
        now.duration_since(self.last_seen) > idle_timeout
            || now.duration_since(self.opened_at) > max_age
    }
}

/// Open user sessions keyed by the id stored in the session cookie.
///
/// A session is dropped once it has been idle for `idle_timeout` or open for
/// `max_age`; lookups never return a stale session and `evict_stale` (run by
/// the sweeper) reclaims the ones nobody asks for again.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
    idle_timeout: Duration,
    max_age: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(SESSION_IDLE_TIMEOUT, SESSION_MAX_AGE)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_age: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
            max_age,
        }
    }

    pub async fn open(&self, auth: AuthSession) -> Arc<UserSession> {
        let session = Arc::new(UserSession::new(auth));
        let now = Instant::now();
        self.inner.write().await.insert(
            session.id.clone(),
            Entry {
                session: session.clone(),
                opened_at: now,
                last_seen: now,
            },
        );
        info!("Opened session for user {}", session.user.user_id);
        session
    }

    /// Returns a live session and marks it as used.
    pub async fn get(&self, session_id: &str) -> Option<Arc<UserSession>> {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let entry = sessions.get_mut(session_id)?;
        if entry.is_stale(now, self.idle_timeout, self.max_age) {
            if let Some(stale) = sessions.remove(session_id) {
                info!("Session for user {} expired", stale.session.user.user_id);
            }
            return None;
        }
        entry.last_seen = now;
        Some(entry.session.clone())
    }

    pub async fn close(&self, session_id: &str) -> Option<Arc<UserSession>> {
        let closed = self.inner.write().await.remove(session_id).map(|e| e.session);
        if let Some(session) = &closed {
            info!("Closed session for user {}", session.user.user_id);
        }
        closed
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Drops every stale session and returns how many went.
    pub async fn evict_stale(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_stale(now, self.idle_timeout, self.max_age));
        before - sessions.len()
    }

    /// Runs `evict_stale` every `period` until the returned task is aborted.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_stale().await;
                if evicted > 0 {
                    info!("Evicted {} stale sessions", evicted);
                }
            }
        })
    }
}
