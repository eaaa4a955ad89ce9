//! REST API client module for the Face Album backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend: a generic request operation with transparent token refresh,
//! the refresh exchange itself, and the session check.
//!
//! The API uses bearer token authentication. Tokens are renewed through
//! `/refresh-token` using a server-set session cookie.

pub mod client;
pub mod error;
pub mod request;

pub use client::{ApiClient, RefreshFailure, RefreshOutcome};
pub use error::ApiError;
pub use request::{ApiRequest, FormData, Payload};
