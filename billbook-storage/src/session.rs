//! Persisted session state.
//!
//! The only state that outlives the process is which business is active.
//! Switching business or logging out empties the cache so nothing cached
//! for one business is served to another.

use std::path::{Path, PathBuf};

use billbook_core::{BillbookError, BusinessId, StorageError};
use serde::{Deserialize, Serialize};

use crate::cache::CacheStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub active_business_id: Option<BusinessId>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub fn load(path: &Path) -> Result<Option<PersistedSession>, SessionError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    let state = serde_json::from_str::<PersistedSession>(&contents)?;
    Ok(Some(state))
}

pub fn save(path: &Path, state: &PersistedSession) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(state)?;
    std::fs::write(path, contents)?;
    Ok(())
}

fn persistence_error(path: &Path, err: SessionError) -> BillbookError {
    StorageError::Persistence {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
    .into()
}

/// Active session: the persisted state plus the cache it guards.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    cache: CacheStore,
    state: PersistedSession,
}

impl Session {
    /// Open the session stored at `path`, starting empty if there is none.
    pub fn open(path: impl Into<PathBuf>, cache: CacheStore) -> Result<Self, BillbookError> {
        let path = path.into();
        let state = load(&path)
            .map_err(|e| persistence_error(&path, e))?
            .unwrap_or_default();
        tracing::debug!(path = %path.display(), active = ?state.active_business_id, "session opened");
        Ok(Self { path, cache, state })
    }

    pub fn active_business(&self) -> Option<BusinessId> {
        self.state.active_business_id
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make `business_id` the active business and persist the choice.
    pub fn select_business(&mut self, business_id: BusinessId) -> Result<(), BillbookError> {
        if self.state.active_business_id == Some(business_id) {
            return Ok(());
        }
        if self.state.active_business_id.is_some() {
            self.cache.clear();
        }
        self.state.active_business_id = Some(business_id);
        save(&self.path, &self.state).map_err(|e| persistence_error(&self.path, e))?;
        tracing::info!(business_id = %business_id, "active business selected");
        Ok(())
    }

    /// Forget the active business, empty the cache and delete the session file.
    pub fn logout(&mut self) -> Result<(), BillbookError> {
        self.cache.clear();
        self.state = PersistedSession::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(persistence_error(&self.path, e.into())),
        }
        tracing::info!("logged out");
        Ok(())
    }
}
