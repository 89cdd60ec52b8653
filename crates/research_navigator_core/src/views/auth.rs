//! The sign-in and sign-up forms.

use serde::Deserialize;
use tracing::{info, warn};

use super::Failure;
use crate::domain::{AuthSession, NewProfile, Notice, Profile};
use crate::ports::{DataStore, IdentityProvider, PortError};
use crate::routing::Route;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: NewProfile,
}

/// A completed sign-in: the new session and where the user lands.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session: AuthSession,
    pub profile: Option<Profile>,
    pub landing: Route,
    pub notice: Option<Notice>,
}

fn check_credentials(email: &str, password: &str) -> Result<(), Failure> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Failure::new(
            "Please enter a valid email address",
            PortError::Validation("invalid email".to_string()),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Failure::new(
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            PortError::Validation("password too short".to_string()),
        ));
    }
    Ok(())
}

/// Shows the provider's own message for auth failures.
fn auth_failure(e: PortError) -> Failure {
    let message = match &e {
        PortError::Auth(message) => message.clone(),
        _ => "An error occurred".to_string(),
    };
    Failure::new(message, e)
}

pub async fn sign_in(
    identity: &dyn IdentityProvider,
    email: &str,
    password: &str,
) -> Result<SignedIn, Failure> {
    check_credentials(email, password)?;

    let session = identity
        .sign_in(email.trim(), password)
        .await
        .map_err(|e| {
            warn!("Sign-in failed for {}: {}", email, e);
            auth_failure(e)
        })?;

    info!("User {} signed in", session.user.user_id);
    Ok(SignedIn {
        session,
        profile: None,
        landing: Route::Home,
        notice: None,
    })
}

/// Creates the account, then the profile row for the new user.
///
/// The account stays usable when the profile insert fails; the settings page
/// creates the missing row on the next visit.
pub async fn sign_up(
    identity: &dyn IdentityProvider,
    store: &dyn DataStore,
    form: SignUpForm,
) -> Result<SignedIn, Failure> {
    check_credentials(&form.email, &form.password)?;

    let session = identity
        .sign_up(form.email.trim(), &form.password, &form.profile.name)
        .await
        .map_err(|e| {
            warn!("Sign-up failed for {}: {}", form.email, e);
            auth_failure(e)
        })?;

    let who = session.identity();
    let (profile, notice) = match store.create_profile(&who, form.profile).await {
        Ok(profile) => (Some(profile), None),
        Err(e) => {
            warn!("Profile creation failed for new user {}: {}", who.user_id, e);
            (
                None,
                Some(Notice::error(
                    "Account created, but your profile could not be saved",
                )),
            )
        }
    };

    info!("User {} signed up", who.user_id);
    Ok(SignedIn {
        session,
        profile,
        landing: Route::Home,
        notice,
    })
}
