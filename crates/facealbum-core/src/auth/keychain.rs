use keyring::Entry;

use super::{StoreError, TokenStore};

const SERVICE_NAME: &str = "facealbum";

/// Account name under which the access token is kept
const TOKEN_ACCOUNT: &str = "access_token";

/// Token store backed by the OS keychain.
pub struct KeyringTokenStore {
    entry: Entry,
}

impl KeyringTokenStore {
    pub fn new() -> Result<Self, StoreError> {
        let entry = Entry::new(SERVICE_NAME, TOKEN_ACCOUNT)?;
        Ok(Self { entry })
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        self.entry.set_password(token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
