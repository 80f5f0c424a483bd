use std::sync::Mutex;

use super::{ApiFavorite, FavoriteCandidate, action_favorite_id};
use crate::storage::{StorageError, StorageRepository};

pub const FAVORITES_STORAGE_KEY: &str = "api_favorites";

/// Persisted favorites list, most recently added first.
///
/// Every mutation writes the full resulting list before returning. Mutations
/// through one repository are serialized, so two quick adds cannot drop each
/// other's write.
pub struct FavoritesRepository<S: StorageRepository> {
    storage: S,
    write_lock: Mutex<()>,
}

impl<S: StorageRepository> FavoritesRepository<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the stored list, distinguishing "nothing stored" from a failed or
    /// corrupt read.
    pub fn load_favorites(&self) -> Result<Vec<ApiFavorite>, StorageError> {
        Ok(self
            .storage
            .get_object::<Vec<ApiFavorite>>(FAVORITES_STORAGE_KEY)?
            .unwrap_or_default())
    }

    /// Load the stored list. Read failures are logged and yield an empty list.
    pub fn get_favorites(&self) -> Vec<ApiFavorite> {
        self.load_favorites().unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to get API favorites");
            Vec::new()
        })
    }

    /// Overwrite the stored list in a single write.
    pub fn set_favorites(&self, favorites: &[ApiFavorite]) -> Result<(), StorageError> {
        match self.storage.set_object(FAVORITES_STORAGE_KEY, &favorites) {
            Ok(()) => {
                tracing::debug!(count = favorites.len(), "stored API favorites");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to set API favorites");
                Err(e)
            }
        }
    }

    /// Save a favorite at the front, replacing any entry with the same id.
    pub fn add_favorite(
        &self,
        candidate: FavoriteCandidate,
    ) -> Result<Vec<ApiFavorite>, StorageError> {
        let favorite = candidate.into_favorite();
        self.mutate(|current| {
            let id = favorite.id().to_string();
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(favorite);
            next.extend(current.into_iter().filter(|f| f.id() != id));
            next
        })
    }

    /// Remove every entry with `id`. Removing an unknown id is not an error.
    pub fn remove_favorite(&self, id: &str) -> Result<Vec<ApiFavorite>, StorageError> {
        self.mutate(|current| current.into_iter().filter(|f| f.id() != id).collect())
    }

    /// Star toggle for commands without arguments.
    pub fn toggle_action_id(&self, action_id: &str) -> Result<Vec<ApiFavorite>, StorageError> {
        let id = action_favorite_id(action_id, None);
        self.mutate(|current| {
            if current.iter().any(|f| f.id() == id) {
                current.into_iter().filter(|f| f.id() != id).collect()
            } else {
                let mut next = Vec::with_capacity(current.len() + 1);
                next.push(ApiFavorite::Action {
                    id: id.clone(),
                    action_id: action_id.to_string(),
                    data: None,
                });
                next.extend(current);
                next
            }
        })
    }

    // A corrupt store is reported rather than replaced by an empty list.
    fn mutate(
        &self,
        f: impl FnOnce(Vec<ApiFavorite>) -> Vec<ApiFavorite>,
    ) -> Result<Vec<ApiFavorite>, StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::Unavailable("favorites lock poisoned".to_string()))?;

        let current = self.load_favorites().inspect_err(|e| {
            tracing::error!(error = %e, "failed to read API favorites before update");
        })?;
        let next = f(current);
        self.set_favorites(&next)?;
        Ok(next)
    }
}

/// Whether the argument-less favorite for `action_id` is in `favorites`.
pub fn is_action_favorited(favorites: &[ApiFavorite], action_id: &str) -> bool {
    let id = action_favorite_id(action_id, None);
    favorites.iter().any(|f| f.id() == id)
}
