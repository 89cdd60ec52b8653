//! crates/research_navigator_core/src/memory.rs
//!
//! An in-process `DataStore` with the same contract as the hosted store:
//! user scoping, one profile per user, newest-first listings. Used by tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    Folder, FolderUpdate, Identity, NewFolder, NewProfile, Profile, ProfileUpdate,
    SearchFilters, SearchHistoryEntry,
};
use crate::ports::{DataStore, PortError, PortResult};

#[derive(Default)]
struct Tables {
    profiles: Vec<Profile>,
    folders: Vec<Folder>,
    history: Vec<SearchHistoryEntry>,
    last_stamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Creation timestamps are strictly increasing.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails like a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_read(&self) -> PortResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PortError::RemoteRead("store is offline".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> PortResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PortError::RemoteWrite("store is offline".to_string()));
        }
        Ok(())
    }
}

fn newest_first<T>(mut rows: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn create_profile(&self, who: &Identity, fields: NewProfile) -> PortResult<Profile> {
        self.check_write()?;
        let mut tables = self.tables.lock().await;
        if tables.profiles.iter().any(|p| p.user_id == who.user_id) {
            return Err(PortError::RemoteWrite(format!(
                "duplicate key value violates unique constraint: profile for {} exists",
                who.user_id
            )));
        }
        let profile = Profile {
            id: Uuid::new_v4(),
            user_id: who.user_id,
            name: fields.name,
            dob: fields.dob,
            currently_pursuing: fields.currently_pursuing,
            interests: fields.interests.unwrap_or_default(),
            phone: fields.phone,
        };
        tables.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, who: &Identity) -> PortResult<Profile> {
        self.find_profile(who)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Profile for {} not found", who.user_id)))
    }

    async fn find_profile(&self, who: &Identity) -> PortResult<Option<Profile>> {
        self.check_read()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.user_id == who.user_id)
            .cloned())
    }

    async fn update_profile(
        &self,
        who: &Identity,
        changes: ProfileUpdate,
    ) -> PortResult<Profile> {
        self.check_write()?;
        let mut tables = self.tables.lock().await;
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.user_id == who.user_id)
            .ok_or_else(|| {
                PortError::RemoteWrite(format!("no profile row matched user {}", who.user_id))
            })?;
        changes.apply_to(profile);
        Ok(profile.clone())
    }

    async fn create_folder(&self, who: &Identity, draft: NewFolder) -> PortResult<Folder> {
        self.check_write()?;
        let mut tables = self.tables.lock().await;
        let folder = Folder {
            id: Uuid::new_v4(),
            user_id: who.user_id,
            name: draft.name,
            description: draft.description,
            created_at: tables.next_stamp(),
        };
        tables.folders.push(folder.clone());
        Ok(folder)
    }

    async fn get_folders(&self, who: &Identity) -> PortResult<Vec<Folder>> {
        self.check_read()?;
        let tables = self.tables.lock().await;
        let mine = tables
            .folders
            .iter()
            .filter(|f| f.user_id == who.user_id)
            .cloned()
            .collect();
        Ok(newest_first(mine, |f: &Folder| f.created_at))
    }

    async fn update_folder(
        &self,
        who: &Identity,
        folder_id: Uuid,
        changes: FolderUpdate,
    ) -> PortResult<Folder> {
        self.check_write()?;
        let mut tables = self.tables.lock().await;
        let folder = tables
            .folders
            .iter_mut()
            .find(|f| f.id == folder_id && f.user_id == who.user_id)
            .ok_or_else(|| PortError::RemoteWrite(format!("no folder row matched {folder_id}")))?;
        changes.apply_to(folder);
        Ok(folder.clone())
    }

    async fn delete_folder(&self, who: &Identity, folder_id: Uuid) -> PortResult<()> {
        self.check_write()?;
        let mut tables = self.tables.lock().await;
        tables
            .folders
            .retain(|f| !(f.id == folder_id && f.user_id == who.user_id));
        Ok(())
    }

    async fn add_search_history(
        &self,
        who: &Identity,
        query: &str,
        filters: SearchFilters,
    ) -> PortResult<SearchHistoryEntry> {
        self.check_write()?;
        let mut tables = self.tables.lock().await;
        let entry = SearchHistoryEntry {
            id: Uuid::new_v4(),
            user_id: who.user_id,
            query: query.to_string(),
            filters,
            created_at: tables.next_stamp(),
        };
        tables.history.push(entry.clone());
        Ok(entry)
    }

    async fn get_search_history(&self, who: &Identity) -> PortResult<Vec<SearchHistoryEntry>> {
        self.check_read()?;
        let tables = self.tables.lock().await;
        let mine = tables
            .history
            .iter()
            .filter(|e| e.user_id == who.user_id)
            .cloned()
            .collect();
        Ok(newest_first(mine, |e: &SearchHistoryEntry| e.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn who() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            access_token: "token".into(),
        }
    }

    fn draft(name: &str) -> NewFolder {
        NewFolder {
            name: name.into(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn created_profile_reads_back_with_default_interests() {
        let store = InMemoryStore::new();
        let me = who();
        let fields = NewProfile {
            name: "Jane".into(),
            dob: chrono::NaiveDate::from_ymd_opt(1990, 4, 2),
            currently_pursuing: "PhD in CS".into(),
            interests: None,
            phone: "555-0100".into(),
        };

        let created = store.create_profile(&me, fields.clone()).await.unwrap();
        let read = store.get_profile(&me).await.unwrap();

        assert_eq!(created, read);
        assert_eq!(read.name, fields.name);
        assert_eq!(read.dob, fields.dob);
        assert_eq!(read.currently_pursuing, fields.currently_pursuing);
        assert_eq!(read.phone, fields.phone);
        assert!(read.interests.is_empty());
    }

    #[tokio::test]
    async fn second_profile_for_same_user_is_rejected() {
        let store = InMemoryStore::new();
        let me = who();
        store.create_profile(&me, NewProfile::default()).await.unwrap();

        let err = store.create_profile(&me, NewProfile::default()).await.unwrap_err();

        assert!(matches!(err, PortError::RemoteWrite(_)));
    }

    #[tokio::test]
    async fn missing_profile_is_not_found_but_find_is_empty() {
        let store = InMemoryStore::new();
        let me = who();

        assert!(matches!(store.get_profile(&me).await, Err(PortError::NotFound(_))));
        assert_eq!(store.find_profile(&me).await, Ok(None));
        assert!(matches!(
            store.update_profile(&me, ProfileUpdate::default()).await,
            Err(PortError::RemoteWrite(_))
        ));
    }

    #[tokio::test]
    async fn folders_are_scoped_to_their_owner() {
        let store = InMemoryStore::new();
        let (alice, bob) = (who(), who());
        let hers = store.create_folder(&alice, draft("alice's")).await.unwrap();
        store.create_folder(&bob, draft("bob's")).await.unwrap();

        let bobs = store.get_folders(&bob).await.unwrap();
        assert!(bobs.iter().all(|f| f.user_id == bob.user_id));
        assert!(!bobs.iter().any(|f| f.id == hers.id));

        // Bob can neither change nor remove Alice's folder.
        assert!(store
            .update_folder(&bob, hers.id, FolderUpdate { name: Some("x".into()), description: None })
            .await
            .is_err());
        store.delete_folder(&bob, hers.id).await.unwrap();
        assert_eq!(store.get_folders(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleted_folder_is_gone() {
        let store = InMemoryStore::new();
        let me = who();
        let doomed = store.create_folder(&me, draft("doomed")).await.unwrap();
        store.create_folder(&me, draft("kept")).await.unwrap();

        store.delete_folder(&me, doomed.id).await.unwrap();

        let left = store.get_folders(&me).await.unwrap();
        assert!(left.iter().all(|f| f.id != doomed.id));
        assert_eq!(left.len(), 1);
    }

    #[tokio::test]
    async fn folder_update_merges_given_fields_only() {
        let store = InMemoryStore::new();
        let me = who();
        let folder = store
            .create_folder(
                &me,
                NewFolder {
                    name: "Reading list".into(),
                    description: "Papers for the survey".into(),
                },
            )
            .await
            .unwrap();

        let updated = store
            .update_folder(
                &me,
                folder.id,
                FolderUpdate {
                    name: None,
                    description: Some("Survey, round two".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Reading list");
        assert_eq!(updated.description, "Survey, round two");
        assert_eq!(updated.created_at, folder.created_at);
    }

    #[tokio::test]
    async fn history_is_strictly_newest_first() {
        let store = InMemoryStore::new();
        let me = who();
        for query in ["one", "two", "three", "four"] {
            store
                .add_search_history(&me, query, SearchFilters::new())
                .await
                .unwrap();
        }

        let history = store.get_search_history(&me).await.unwrap();

        assert_eq!(history.len(), 4);
        assert_eq!(history[0].query, "four");
        assert!(history
            .windows(2)
            .all(|pair| pair[0].created_at > pair[1].created_at));
    }
}
