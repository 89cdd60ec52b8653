//! crates/research_navigator_core/src/routing.rs
//!
//! The page routes of the application and the guard deciding whether a page
//! is rendered or the visitor is redirected.

use crate::domain::Identity;

/// Where a session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The session is still being resolved at startup.
    Resolving,
    SignedOut,
    SignedIn(Identity),
}

impl SessionState {
    /// The identity to scope store calls by, once resolved.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::SignedIn(identity) => Some(identity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Only for signed-in users.
    Private,
    /// Only for signed-out visitors.
    PublicOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Signup,
    Home,
    Tagged,
    History,
    Settings,
    Landing,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Login,
        Route::Signup,
        Route::Home,
        Route::Tagged,
        Route::History,
        Route::Settings,
        Route::Landing,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Home => "/",
            Route::Tagged => "/tagged",
            Route::History => "/history",
            Route::Settings => "/settings",
            Route::Landing => "/landing",
        }
    }

    /// Matches a request path; trailing slashes are ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Route::ALL.into_iter().find(|r| r.path() == normalized)
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Login | Route::Signup | Route::Landing => Access::PublicOnly,
            Route::Home | Route::Tagged | Route::History | Route::Settings => Access::Private,
        }
    }

    /// The page name reported to the client.
    pub fn page_name(&self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::Signup => "signup",
            Route::Home => "search",
            Route::Tagged => "tagged",
            Route::History => "history",
            Route::Settings => "settings",
            Route::Landing => "landing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Render(Route),
    Redirect(Route),
    /// Session not resolved yet; nothing may be fetched.
    Wait,
}

/// Decides what a request for `path` leads to. Unknown paths redirect home.
pub fn guard(path: &str, session: &SessionState) -> RouteDecision {
    let Some(route) = Route::from_path(path) else {
        return RouteDecision::Redirect(Route::Home);
    };

    match (route.access(), session) {
        (_, SessionState::Resolving) => RouteDecision::Wait,
        (Access::Private, SessionState::SignedOut) => RouteDecision::Redirect(Route::Login),
        (Access::PublicOnly, SessionState::SignedIn(_)) => RouteDecision::Redirect(Route::Home),
        _ => RouteDecision::Render(route),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    fn signed_in() -> SessionState {
        SessionState::SignedIn(Identity {
            user_id: Uuid::new_v4(),
            access_token: "token".into(),
        })
    }

    #[rstest]
    #[case("/", Route::Home)]
    #[case("/tagged", Route::Tagged)]
    #[case("/history", Route::History)]
    #[case("/settings", Route::Settings)]
    fn private_pages_send_visitors_to_login(#[case] path: &str, #[case] route: Route) {
        assert_eq!(guard(path, &SessionState::SignedOut), RouteDecision::Redirect(Route::Login));
        assert_eq!(guard(path, &signed_in()), RouteDecision::Render(route));
    }

    #[rstest]
    #[case("/login")]
    #[case("/signup")]
    #[case("/landing")]
    fn public_pages_send_users_home(#[case] path: &str) {
        assert_eq!(guard(path, &signed_in()), RouteDecision::Redirect(Route::Home));
        assert!(matches!(guard(path, &SessionState::SignedOut), RouteDecision::Render(_)));
    }

    #[test]
    fn unknown_path_redirects_home() {
        assert_eq!(guard("/nope", &SessionState::SignedOut), RouteDecision::Redirect(Route::Home));
        assert_eq!(guard("/nope", &signed_in()), RouteDecision::Redirect(Route::Home));
    }

    #[test]
    fn resolving_session_defers() {
        assert_eq!(guard("/history", &SessionState::Resolving), RouteDecision::Wait);
        assert!(SessionState::Resolving.identity().is_none());
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(Route::from_path("/history/"), Some(Route::History));
        assert_eq!(Route::from_path(""), Some(Route::Home));
    }
}
