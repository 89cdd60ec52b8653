//! services/api/src/adapters/identity.rs
//!
//! The identity-provider adapter: password sign-in, sign-up, token refresh,
//! sign-out and federated sign-in against the hosted auth API
//! (`{SUPABASE_URL}/auth/v1`).

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, Url};
use research_navigator_core::domain::{AuthSession, AuthenticatedUser};
use research_navigator_core::ports::{IdentityProvider, PortError, PortResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    auth_url: String,
    anon_key: String,
}

impl SupabaseAuth {
    pub fn new(client: Client, supabase_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            client,
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
        }
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/{}", self.auth_url, path))
            .header("apikey", &self.anon_key)
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpPayload<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata<'a>,
}

#[derive(Serialize)]
struct SignUpMetadata<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct RefreshPayload<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct UserRecord {
    id: Uuid,
    email: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: self.id,
            email: self.email,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: UserRecord,
}
impl TokenResponse {
    fn to_domain(self) -> PortResult<AuthSession> {
        let expires_at = AuthSession::expiry_after(Utc::now(), self.expires_in).ok_or_else(|| {
            error!("Identity provider issued a token with expires_in={}", self.expires_in);
            PortError::Auth("The identity provider issued an unusable token".to_string())
        })?;
        Ok(AuthSession {
            user: self.user.to_domain(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}

/// Sign-up answers with a session when accounts are confirmed automatically,
/// and with the bare user when an email confirmation is still pending.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    PendingConfirmation(UserRecord),
}

/// The auth API reports errors under a few different keys.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}
impl AuthErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

//=========================================================================================
// Request Helpers
//=========================================================================================

async fn send(builder: RequestBuilder, what: &str) -> PortResult<Response> {
    let response = builder.send().await.map_err(|e| {
        error!("Error during {}: {}", what, e);
        PortError::Auth(format!("{what} failed: {e}"))
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<AuthErrorBody>()
        .await
        .unwrap_or_default()
        .into_message()
        .unwrap_or_else(|| format!("{what} failed with {status}"));
    error!("Error during {} ({}): {}", what, status, message);
    Err(PortError::Auth(message))
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> PortResult<T> {
    response.json::<T>().await.map_err(|e| {
        error!("Malformed response during {}: {}", what, e);
        PortError::Auth(format!("{what}: malformed response"))
    })
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let builder = self
            .post("token")
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials { email, password });
        let response = send(builder, "sign-in").await?;
        let tokens: TokenResponse = decode(response, "sign-in").await?;
        tokens.to_domain()
    }

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> PortResult<AuthSession> {
        let builder = self.post("signup").json(&SignUpPayload {
            email,
            password,
            data: SignUpMetadata { name },
        });
        let response = send(builder, "sign-up").await?;
        match decode::<SignUpResponse>(response, "sign-up").await? {
            SignUpResponse::Session(tokens) => tokens.to_domain(),
            SignUpResponse::PendingConfirmation(user) => {
                info!("User {} signed up, confirmation pending", user.id);
                Err(PortError::Auth(
                    "Check your email to confirm your account, then sign in".to_string(),
                ))
            }
        }
    }

    fn federated_sign_in_url(
        &self,
        provider: &str,
        redirect_to: Option<&str>,
    ) -> PortResult<String> {
        let mut params = vec![("provider", provider)];
        if let Some(redirect) = redirect_to {
            params.push(("redirect_to", redirect));
        }
        let url = Url::parse_with_params(&format!("{}/authorize", self.auth_url), &params)
            .map_err(|e| PortError::Auth(format!("invalid authorize URL: {e}")))?;
        Ok(url.to_string())
    }

    async fn resolve_user(&self, access_token: &str) -> PortResult<AuthenticatedUser> {
        let response = self
            .client
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!("Error resolving user: {}", e);
                PortError::Auth(format!("resolving user failed: {e}"))
            })?;
        if !response.status().is_success() {
            error!("Access token rejected with {}", response.status());
            return Err(PortError::Unauthorized);
        }
        let user: UserRecord = decode(response, "resolving user").await?;
        Ok(user.to_domain())
    }

    async fn refresh(&self, refresh_token: &str) -> PortResult<AuthSession> {
        let builder = self
            .post("token")
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshPayload { refresh_token });
        let response = send(builder, "token refresh").await?;
        let tokens: TokenResponse = decode(response, "token refresh").await?;
        tokens.to_domain()
    }

    async fn sign_out(&self, access_token: &str) -> PortResult<()> {
        let builder = self.post("logout").bearer_auth(access_token);
        send(builder, "sign-out").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn federated_url_carries_provider_and_redirect() {
        let auth = SupabaseAuth::new(Client::new(), "https://project.supabase.co/", "anon");

        let url = auth
            .federated_sign_in_url("google", Some("http://localhost:3000/"))
            .unwrap();

        assert_eq!(
            url,
            "https://project.supabase.co/auth/v1/authorize?provider=google&redirect_to=http%3A%2F%2Flocalhost%3A3000%2F"
        );
    }

    #[test]
    fn sign_up_without_session_is_pending_confirmation() {
        let body = serde_json::json!({
            "id": "7f1c6d0e-3a7e-4bfb-9a53-1b0b7a0d2f11",
            "email": "a@b.com",
            "confirmation_sent_at": "2024-01-01T00:00:00Z"
        });
        let parsed: SignUpResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(parsed, SignUpResponse::PendingConfirmation(_)));
    }

    #[test]
    fn error_description_wins_over_generic_error() {
        let body: AuthErrorBody = serde_json::from_value(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        }))
        .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid login credentials"));
    }

    fn token_body(expires_in: i64) -> serde_json::Value {
        serde_json::json!({
            "access_token": "jwt",
            "refresh_token": "refresh",
            "expires_in": expires_in,
            "user": { "id": "7f1c6d0e-3a7e-4bfb-9a53-1b0b7a0d2f11", "email": "a@b.com" }
        })
    }

    #[test]
    fn tokens_with_unusable_lifetimes_are_refused() {
        for expires_in in [i64::MAX, i64::MIN, 0] {
            let tokens: TokenResponse = serde_json::from_value(token_body(expires_in)).unwrap();
            assert!(matches!(tokens.to_domain(), Err(PortError::Auth(_))));
        }

        let tokens: TokenResponse = serde_json::from_value(token_body(3600)).unwrap();
        let session = tokens.to_domain().unwrap();
        assert!(!session.is_expiring(Utc::now(), 60));
    }
}
