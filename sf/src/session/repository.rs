//! Session persistence over the sessionstore document store
//!
//! Saves the full session aggregate as one JSON document per id; every
//! field round-trips losslessly. Late-arriving writes for an abandoned
//! session are prevented by keying every write on the session id.

use eyre::{Context, Result};
use sessionstore::DirStore;
use std::path::Path;
use tracing::{debug, info};

use super::{Session, SessionMode};

/// Lightweight listing entry for the session picker
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub mode: SessionMode,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Persists sessions as JSON documents
pub struct SessionRepository {
    store: DirStore,
}

impl SessionRepository {
    /// Open a repository rooted at `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let store = DirStore::open(dir).context("Failed to open session store")?;
        Ok(Self { store })
    }

    /// Save (or overwrite) a session under its own id
    pub fn save(&self, session: &Session) -> Result<()> {
        debug!(id = %session.id, "SessionRepository::save: called");
        self.store
            .save(&session.id.to_string(), session)
            .context("Failed to save session")
    }

    /// Load a session by id
    pub fn load(&self, id: &str) -> Result<Session> {
        debug!(%id, "SessionRepository::load: called");
        self.store.load(id).context("Failed to load session")
    }

    /// Delete a session by id; returns false when none existed
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.store.delete(id).context("Failed to delete session")?;
        if removed {
            info!(%id, "SessionRepository::delete: session removed");
        }
        Ok(removed)
    }

    /// List stored sessions, newest first
    ///
    /// Unreadable documents are skipped rather than failing the listing.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries = Vec::new();
        for entry in self.store.list().context("Failed to list sessions")? {
            match self.store.load::<Session>(&entry.id) {
                Ok(session) => summaries.push(SessionSummary {
                    id: entry.id,
                    title: session.original_story.title.clone(),
                    mode: session.mode,
                    created_at: session.created_at,
                }),
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "SessionRepository::list: skipping unreadable session");
                }
            }
        }
        Ok(summaries)
    }
}
