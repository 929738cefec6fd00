//! Token persistence
//!
//! The client only needs the current access/refresh pair. `MemoryTokenStore`
//! lives as long as the process; `FileTokenStore` keeps the session in a JSON
//! file so CLI tools stay signed in between runs.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: RwLock<Option<Session>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

fn poisoned() -> ClientError {
    ClientError::Storage("token store lock poisoned".to_string())
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<Session> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.session.write().map_err(|_| poisoned())? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.write().map_err(|_| poisoned())? = None;
        Ok(())
    }
}

/// JSON file store; reads go through an in-memory copy
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<Session>>,
}

impl FileTokenStore {
    /// Open the store, reading an existing session if the file holds one
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let cached = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            path,
            cached: RwLock::new(cached),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Truncate or create the session file, readable by the owner only
#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode only applies on creation; tighten a file left by an older version
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<Session> {
        self.cached.read().ok().and_then(|s| s.clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(session)?;
        let mut file = open_private(&self.path).map_err(|e| ClientError::Storage(e.to_string()))?;
        file.write_all(&bytes)
            .map_err(|e| ClientError::Storage(e.to_string()))?;

        *self.cached.write().map_err(|_| poisoned())? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.cached.write().map_err(|_| poisoned())? = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }
}
