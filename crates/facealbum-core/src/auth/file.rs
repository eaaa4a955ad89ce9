use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{StoreError, TokenStore};

/// Token file name in cache directory
const TOKEN_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub stored_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            stored_at: Utc::now(),
        }
    }

    /// Minutes since the token was written (for display)
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.stored_at).num_minutes().max(0)
    }
}

/// Token store persisted as JSON in the cache directory.
pub struct FileTokenStore {
    cache_dir: PathBuf,
    // Serializes read-modify-write of the file within this process
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            lock: Mutex::new(()),
        }
    }

    /// Load the full record, including when it was stored
    pub fn load(&self) -> Result<Option<StoredToken>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.read_file()
    }

    fn read_file(&self) -> Result<Option<StoredToken>, StoreError> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let record: StoredToken = serde_json::from_str(&contents)?;
        Ok(Some(record))
    }

    fn token_path(&self) -> PathBuf {
        self.cache_dir.join(TOKEN_FILE)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.map(|record| record.access_token))
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let path = self.token_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&StoredToken::new(token))?;
        std::fs::write(&path, contents)?;
        debug!(path = %path.display(), "Stored access token");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(&path)?;
            debug!(path = %path.display(), "Removed access token");
        }
        Ok(())
    }
}
