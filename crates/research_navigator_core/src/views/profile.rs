//! The settings screen: view and edit the user's profile.
//!
//! Loading uses the zero-or-one read and creates an empty profile when the
//! user has none yet; `DataStore::get_profile` keeps its strict contract for
//! every other caller.

use serde::Serialize;
use tracing::{info, warn};

use super::{Failure, ViewResult};
use crate::domain::{Identity, NewProfile, Notice, Profile, ProfileUpdate};
use crate::ports::{DataStore, PortError};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileSettingsView {
    profile: Option<Profile>,
    editing: bool,
}

impl ProfileSettingsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Seeds the view with a profile fetched elsewhere (at sign-up).
    pub fn preload(&mut self, profile: Profile) {
        self.profile = Some(profile);
        self.editing = false;
    }

    pub fn begin_edit(&mut self) {
        if self.profile.is_some() {
            self.editing = true;
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = false;
    }

    /// Fetches the profile, creating a blank one on first visit.
    pub async fn load(&mut self, store: &dyn DataStore, who: &Identity) -> ViewResult {
        let existing = store.find_profile(who).await.map_err(|e| {
            warn!("Failed to load profile for {}: {}", who.user_id, e);
            Failure::new("Failed to load profile", e)
        })?;

        if let Some(profile) = existing {
            self.profile = Some(profile);
            return Ok(None);
        }

        info!("No profile for {}, creating one", who.user_id);
        let created = store
            .create_profile(who, NewProfile::default())
            .await
            .map_err(|e| {
                warn!("Failed to create profile for {}: {}", who.user_id, e);
                Failure::new("Failed to create profile", e)
            })?;

        self.profile = Some(created);
        self.editing = true;
        Ok(Some(Notice::success(
            "New profile created! Please fill in your details.",
        )))
    }

    pub async fn save(
        &mut self,
        store: &dyn DataStore,
        who: &Identity,
        changes: ProfileUpdate,
    ) -> ViewResult {
        if self.profile.is_none() {
            return Err(Failure::new(
                "Failed to update profile",
                PortError::Validation("profile has not been loaded".to_string()),
            ));
        }

        let updated = store.update_profile(who, changes).await.map_err(|e| {
            warn!("Failed to update profile for {}: {}", who.user_id, e);
            Failure::new("Failed to update profile", e)
        })?;

        self.profile = Some(updated);
        self.editing = false;
        Ok(Some(Notice::success("Profile updated successfully")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use uuid::Uuid;

    fn who() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            access_token: "token".into(),
        }
    }

    #[tokio::test]
    async fn first_visit_creates_a_blank_profile_in_edit_mode() {
        let store = InMemoryStore::new();
        let me = who();
        let mut view = ProfileSettingsView::new();

        let notice = view.load(&store, &me).await.unwrap();

        assert!(notice.is_some());
        assert!(view.is_editing());
        let profile = view.profile().unwrap();
        assert_eq!(profile.user_id, me.user_id);
        assert!(profile.interests.is_empty());

        // A second visit finds the row instead of creating another.
        let mut again = ProfileSettingsView::new();
        assert_eq!(again.load(&store, &me).await, Ok(None));
        assert!(!again.is_editing());
    }

    #[tokio::test]
    async fn save_merges_and_leaves_edit_mode() {
        let store = InMemoryStore::new();
        let me = who();
        store
            .create_profile(
                &me,
                NewProfile {
                    name: "Ada".into(),
                    phone: "555".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let mut view = ProfileSettingsView::new();
        view.load(&store, &me).await.unwrap();
        view.begin_edit();

        view.save(
            &store,
            &me,
            ProfileUpdate {
                interests: Some(vec!["NLP".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let profile = view.profile().unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.phone, "555");
        assert_eq!(profile.interests, vec!["NLP".to_string()]);
        assert!(!view.is_editing());
    }

    #[tokio::test]
    async fn failed_save_keeps_previous_profile() {
        let store = InMemoryStore::new();
        let me = who();
        let mut view = ProfileSettingsView::new();
        view.load(&store, &me).await.unwrap();
        let before = view.profile().cloned();

        store.set_offline(true);
        let failure = view
            .save(
                &store,
                &me,
                ProfileUpdate {
                    name: Some("Grace".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(failure.notice, Notice::error("Failed to update profile"));
        assert_eq!(view.profile().cloned(), before);
        assert!(view.is_editing());
    }
}
