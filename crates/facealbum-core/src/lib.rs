//! Core library for the Face Album photo gallery client.
//!
//! - `api`: the authenticated request client with transparent token refresh
//! - `auth`: token storage and login/logout flows
//! - `gallery`: typed photo and face endpoints
//! - `models`: response types and pagination
//! - `config`: persisted client configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod gallery;
pub mod models;

pub use api::{ApiClient, ApiError, ApiRequest, FormData, Payload, RefreshFailure, RefreshOutcome};
pub use auth::{
    FileTokenStore, GoogleLogin, KeyringTokenStore, MemoryTokenStore, OtpVerification, SessionCookies,
    TokenStore,
};
pub use config::{Config, TokenBackend};
pub use gallery::{validate_upload, ALLOWED_EXTENSIONS, MAX_UPLOAD_BYTES};
pub use models::{paginate, Face, LinkedFace, Page, Photo};
