use std::sync::RwLock;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("keychain: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed token file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("malformed cookie jar: {0}")]
    Cookies(String),

    #[error("token store lock poisoned")]
    Poisoned,
}

/// Durable holder of the single bearer token.
///
/// At most one token is stored at a time; `set` overwrites.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<String>, StoreError>;
    fn set(&self, token: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        let guard = self.token.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.clone())
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        let mut guard = self.token.write().map_err(|_| StoreError::Poisoned)?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.token.write().map_err(|_| StoreError::Poisoned)?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get().unwrap(), None);

        store.set("T1").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("T1"));

        store.set("T2").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("T2"));

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);

        // Clearing an empty store is fine
        store.clear().unwrap();
    }
}
