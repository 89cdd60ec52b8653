//! The "tagged pages" screen: the user's folders.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::{Failure, ViewResult};
use crate::domain::{Folder, FolderUpdate, Identity, NewFolder, Notice};
use crate::ports::{DataStore, PortError};

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaggedFoldersView {
    folders: Vec<Folder>,
}

impl TaggedFoldersView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first, as last reconciled with the store.
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub async fn load(&mut self, store: &dyn DataStore, who: &Identity) -> ViewResult {
        match store.get_folders(who).await {
            Ok(folders) => {
                self.folders = folders;
                Ok(None)
            }
            Err(e) => {
                warn!("Failed to load folders for {}: {}", who.user_id, e);
                Err(Failure::new("Failed to load folders", e))
            }
        }
    }

    pub async fn create(
        &mut self,
        store: &dyn DataStore,
        who: &Identity,
        draft: NewFolder,
    ) -> ViewResult {
        if draft.name.trim().is_empty() {
            return Err(Failure::new(
                "Folder name is required",
                PortError::Validation("folder name is empty".to_string()),
            ));
        }

        let folder = store.create_folder(who, draft).await.map_err(|e| {
            warn!("Failed to create folder for {}: {}", who.user_id, e);
            Failure::new("Failed to create folder", e)
        })?;

        self.folders.insert(0, folder);
        Ok(Some(Notice::success("Folder created successfully")))
    }

    pub async fn update(
        &mut self,
        store: &dyn DataStore,
        who: &Identity,
        folder_id: Uuid,
        changes: FolderUpdate,
    ) -> ViewResult {
        if changes.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(Failure::new(
                "Folder name is required",
                PortError::Validation("folder name is empty".to_string()),
            ));
        }
        if changes.is_empty() {
            return Ok(None);
        }

        let updated = store
            .update_folder(who, folder_id, changes)
            .await
            .map_err(|e| {
                warn!("Failed to update folder {}: {}", folder_id, e);
                Failure::new("Failed to update folder", e)
            })?;

        match self.folders.iter_mut().find(|f| f.id == updated.id) {
            Some(slot) => *slot = updated,
            None => self.folders.insert(0, updated),
        }
        Ok(Some(Notice::success("Folder updated successfully")))
    }

    pub async fn delete(
        &mut self,
        store: &dyn DataStore,
        who: &Identity,
        folder_id: Uuid,
    ) -> ViewResult {
        store.delete_folder(who, folder_id).await.map_err(|e| {
            warn!("Failed to delete folder {}: {}", folder_id, e);
            Failure::new("Failed to delete folder", e)
        })?;

        self.folders.retain(|f| f.id != folder_id);
        Ok(Some(Notice::success("Folder deleted successfully")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn who() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            access_token: "token".into(),
        }
    }

    fn draft(name: &str) -> NewFolder {
        NewFolder {
            name: name.into(),
            description: format!("about {name}"),
        }
    }

    #[tokio::test]
    async fn created_folder_goes_to_the_front() {
        let store = InMemoryStore::new();
        let me = who();
        let mut view = TaggedFoldersView::new();

        view.create(&store, &me, draft("older")).await.unwrap();
        let notice = view.create(&store, &me, draft("newer")).await.unwrap();

        assert_eq!(notice, Some(Notice::success("Folder created successfully")));
        let names: Vec<_> = view.folders().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["newer", "older"]);
    }

    #[tokio::test]
    async fn failed_create_leaves_list_untouched() {
        let store = InMemoryStore::new();
        let me = who();
        let mut view = TaggedFoldersView::new();
        view.create(&store, &me, draft("kept")).await.unwrap();

        store.set_offline(true);
        let failure = view.create(&store, &me, draft("lost")).await.unwrap_err();

        assert_eq!(failure.notice, Notice::error("Failed to create folder"));
        assert!(matches!(failure.cause, PortError::RemoteWrite(_)));
        assert_eq!(view.folders().len(), 1);
        assert_eq!(view.folders()[0].name, "kept");
    }

    #[tokio::test]
    async fn blank_name_never_reaches_the_store() {
        let store = InMemoryStore::new();
        let me = who();
        let mut view = TaggedFoldersView::new();

        let failure = view.create(&store, &me, draft("   ")).await.unwrap_err();

        assert!(matches!(failure.cause, PortError::Validation(_)));
        assert!(store.get_folders(&me).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_folder() {
        let store = InMemoryStore::new();
        let me = who();
        let mut view = TaggedFoldersView::new();
        view.create(&store, &me, draft("stays")).await.unwrap();
        let id = view.folders()[0].id;

        store.set_offline(true);
        assert!(view.delete(&store, &me, id).await.is_err());
        assert_eq!(view.folders().len(), 1);

        store.set_offline(false);
        view.delete(&store, &me, id).await.unwrap();
        assert!(view.folders().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_the_local_row() {
        let store = InMemoryStore::new();
        let me = who();
        let mut view = TaggedFoldersView::new();
        view.create(&store, &me, draft("draft")).await.unwrap();
        let id = view.folders()[0].id;

        view.update(
            &store,
            &me,
            id,
            FolderUpdate {
                name: Some("final".into()),
                description: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(view.folders()[0].name, "final");
        assert_eq!(view.folders()[0].description, "about draft");
    }

    #[tokio::test]
    async fn load_replaces_state_and_failure_keeps_it() {
        let store = InMemoryStore::new();
        let me = who();
        store.create_folder(&me, draft("remote")).await.unwrap();
        let mut view = TaggedFoldersView::new();

        assert_eq!(view.load(&store, &me).await, Ok(None));
        assert_eq!(view.folders().len(), 1);

        store.set_offline(true);
        let failure = view.load(&store, &me).await.unwrap_err();
        assert_eq!(failure.notice, Notice::error("Failed to load folders"));
        assert_eq!(view.folders().len(), 1);
    }
}
