use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use tracing::debug;

use super::StoreError;

/// Cookie jar file name in cache directory
const COOKIE_FILE: &str = "cookies.json";

/// Cookie jar shared with the HTTP client.
///
/// The refresh credential is a server-set cookie. A jar opened on a cache
/// directory writes its persistent cookies to `cookies.json` so a later
/// process can still refresh; an in-memory jar forgets them on exit.
#[derive(Clone)]
pub struct SessionCookies {
    jar: Arc<CookieStoreMutex>,
    path: Option<PathBuf>,
}

impl SessionCookies {
    pub fn in_memory() -> Self {
        Self {
            jar: Arc::new(CookieStoreMutex::new(CookieStore::default())),
            path: None,
        }
    }

    /// Open the jar kept in `cache_dir`, starting empty if there is none yet.
    pub fn open(cache_dir: &Path) -> Result<Self, StoreError> {
        let path = cache_dir.join(COOKIE_FILE);
        let store = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            cookie_store::serde::json::load(reader).map_err(|e| StoreError::Cookies(e.to_string()))?
        } else {
            CookieStore::default()
        };

        Ok(Self {
            jar: Arc::new(CookieStoreMutex::new(store)),
            path: Some(path),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    /// Write unexpired persistent cookies back to disk. No-op in memory.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = self.jar.lock().map_err(|_| StoreError::Poisoned)?;
        let mut writer = BufWriter::new(File::create(path)?);
        cookie_store::serde::json::save(&store, &mut writer)
            .map_err(|e| StoreError::Cookies(e.to_string()))?;
        debug!(path = %path.display(), "Saved session cookies");
        Ok(())
    }

    /// Forget every cookie, in memory and on disk.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.jar.lock().map_err(|_| StoreError::Poisoned)?.clear();
        if let Some(path) = &self.path {
            if path.exists() {
                std::fs::remove_file(path)?;
                debug!(path = %path.display(), "Removed session cookies");
            }
        }
        Ok(())
    }

    pub(crate) fn provider(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.jar)
    }
}
