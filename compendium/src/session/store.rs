//! On-disk session storage.
//!
//! The whole cookie jar is written as one JSON blob. Every failure here is
//! logged and swallowed: a missing or corrupt blob just means logging in
//! again.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::models::Session;

const SESSION_FILE: &str = "cookies.json";

/// Location of the persisted session blob.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Open a store in `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "failed to create session directory");
        }
        Self {
            path: dir.join(SESSION_FILE),
        }
    }

    /// Path of the blob.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the session, replacing any previous blob.
    pub fn save(&self, session: &Session) {
        let json = match serde_json::to_vec_pretty(session) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize session");
                return;
            }
        };

        match std::fs::write(&self.path, json) {
            Ok(()) => debug!(path = %self.path.display(), cookies = session.len(), "saved session"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to save session"),
        }
    }

    /// Read the stored session, if there is a readable one.
    pub fn load(&self) -> Option<Session> {
        if !self.path.exists() {
            return None;
        }

        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read session");
                return None;
            }
        };

        match serde_json::from_slice::<Session>(&content) {
            Ok(session) => {
                debug!(path = %self.path.display(), cookies = session.len(), "loaded session");
                Some(session)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt session file");
                None
            }
        }
    }

    /// Delete the stored blob.
    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed session"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove session"),
        }
    }
}
