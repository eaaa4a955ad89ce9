//! Authentication module for token storage and login flows.
//!
//! This module provides:
//! - `TokenStore`: the single-bearer-token storage abstraction, with
//!   in-memory, file and OS keychain implementations
//! - `SessionCookies`: the cookie jar holding the server-set refresh
//!   credential, optionally persisted next to the token
//! - Login operations (OTP by email, Google OAuth), logout and account
//!   deletion, implemented on `ApiClient`

pub mod cookies;
pub mod file;
pub mod keychain;
pub mod login;
pub mod store;

pub use cookies::SessionCookies;
pub use file::{FileTokenStore, StoredToken};
pub use keychain::KeyringTokenStore;
pub use login::{GoogleLogin, OtpVerification};
pub use store::{MemoryTokenStore, StoreError, TokenStore};
