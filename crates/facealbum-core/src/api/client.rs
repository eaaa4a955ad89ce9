//! API client for communicating with the Face Album REST API.
//!
//! `ApiClient` injects the stored bearer token into requests and, when the
//! server answers 401, exchanges the session cookie for a new token and
//! replays the request exactly once.

use std::fmt;
use std::sync::Arc;

use reqwest::{header, Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::request::{ApiRequest, Payload};
use super::ApiError;
use crate::auth::{SessionCookies, TokenStore};

// ============================================================================
// Constants
// ============================================================================

/// Exchanges the session cookie for a new bearer token
const REFRESH_PATH: &str = "/refresh-token";

/// Reports whether the bearer token is still accepted
const AUTH_STATUS_PATH: &str = "/auth-status";

const USER_AGENT: &str = concat!("facealbum/", env!("CARGO_PKG_VERSION"));

/// Why a refresh attempt did not produce a new token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// The session cookie is expired or missing; the stored token was removed
    Expired,
    /// Any other non-success status
    Status(u16),
    /// Success status without a usable `access_token`
    InvalidResponse,
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshFailure::Expired => write!(f, "refresh token expired"),
            RefreshFailure::Status(status) => write!(f, "Error {}: Refresh failed", status),
            RefreshFailure::InvalidResponse => write!(f, "invalid response from server"),
        }
    }
}

/// Result of a refresh attempt that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New token, already written to the token store
    Refreshed(String),
    Rejected(RefreshFailure),
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Answer of one `/auth-status` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStatus {
    NoToken,
    Unauthorized,
    Failed(u16),
    Answered(bool),
}

impl AuthStatus {
    fn is_authenticated(self) -> bool {
        matches!(self, AuthStatus::Answered(true))
    }
}

/// API client for the Face Album backend.
/// Clone is cheap - reqwest::Client, the token store and the cookie jar are
/// all shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    cookies: SessionCookies,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("persistent_cookies", &self.cookies.is_persistent())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client for `base_url` (e.g. `https://example.com/api`)
    /// whose session cookie lives only as long as the process.
    pub fn new(base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        Self::with_cookies(base_url, store, SessionCookies::in_memory())
    }

    /// Create a client that keeps cookies in `cookies`.
    ///
    /// The session cookie set at login is sent with every request, including
    /// the refresh exchange. A jar opened on disk is saved after every
    /// response, so the next process can still refresh.
    pub fn with_cookies(
        base_url: impl Into<String>,
        store: Arc<dyn TokenStore>,
        cookies: SessionCookies,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .cookie_provider(cookies.provider())
            .user_agent(USER_AGENT)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            store,
            cookies,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    /// Persist whatever cookies the last response set. Failures are logged,
    /// never returned.
    fn save_cookies(&self) {
        if let Err(e) = self.cookies.save() {
            warn!(error = %e, "Failed to save session cookies");
        }
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Exchange the session cookie for a new bearer token.
    ///
    /// Server-side refusals come back as `RefreshOutcome::Rejected`; only
    /// transport and token store failures are errors. A refresh is only
    /// attempted while a token is held.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ApiError> {
        if self.store.get()?.is_none() {
            return Err(ApiError::MissingToken);
        }

        let url = format!("{}{}", self.base_url, REFRESH_PATH);
        let response = self.client.post(&url).send().await?;
        self.save_cookies();

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("Refresh token expired, clearing stored access token");
            self.store.clear()?;
            return Ok(RefreshOutcome::Rejected(RefreshFailure::Expired));
        }

        if !status.is_success() {
            warn!(status = status.as_u16(), "Token refresh failed");
            return Ok(RefreshOutcome::Rejected(RefreshFailure::Status(
                status.as_u16(),
            )));
        }

        let body = response.text().await?;
        let token = serde_json::from_str::<RefreshResponse>(&body)
            .ok()
            .and_then(|r| r.access_token)
            .filter(|t| !t.is_empty());

        match token {
            Some(token) => {
                self.store.set(&token)?;
                info!("Access token refreshed");
                Ok(RefreshOutcome::Refreshed(token))
            }
            None => {
                warn!("Refresh response did not contain an access token");
                Ok(RefreshOutcome::Rejected(RefreshFailure::InvalidResponse))
            }
        }
    }

    // ========================================================================
    // Session check
    // ========================================================================

    /// Whether the caller currently holds a valid session.
    ///
    /// Makes at most one refresh attempt: check, refresh on 401, re-check
    /// once. Every failure, including transport errors, reads as `false`.
    pub async fn check_session(&self) -> bool {
        match self.try_check_session().await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                warn!(error = %e, "Authentication check failed");
                false
            }
        }
    }

    async fn try_check_session(&self) -> Result<bool, ApiError> {
        match self.auth_status().await? {
            AuthStatus::Unauthorized => {}
            AuthStatus::Failed(status) => {
                debug!(status, "Auth status check failed");
                return Ok(false);
            }
            status => return Ok(status.is_authenticated()),
        }

        match self.refresh().await? {
            RefreshOutcome::Refreshed(_) => {}
            RefreshOutcome::Rejected(reason) => {
                debug!(%reason, "Session could not be refreshed");
                return Ok(false);
            }
        }

        // Second and last probe; a repeated 401 is simply "not authenticated"
        Ok(self.auth_status().await?.is_authenticated())
    }

    async fn auth_status(&self) -> Result<AuthStatus, ApiError> {
        let Some(token) = self.store.get()? else {
            return Ok(AuthStatus::NoToken);
        };

        let url = format!("{}{}", self.base_url, AUTH_STATUS_PATH);
        let response = self.client.get(&url).bearer_auth(&token).send().await?;
        self.save_cookies();

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(AuthStatus::Unauthorized);
        }
        if !status.is_success() {
            return Ok(AuthStatus::Failed(status.as_u16()));
        }

        let body: Value = serde_json::from_str(&response.text().await?)
            .map_err(|_| ApiError::InvalidJson)?;
        Ok(AuthStatus::Answered(
            body.get("authenticated").is_some_and(is_truthy),
        ))
    }

    // ========================================================================
    // Generic request
    // ========================================================================

    /// Perform one API call and return the parsed JSON body.
    ///
    /// Caller errors (no path, malformed payload, no stored token when one
    /// is required) are raised before anything is sent. A 401 on a
    /// token-bearing request triggers one refresh and one replay.
    pub async fn request(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = request.url(&self.base_url)?;
        let body = request.json_body()?;

        let token = if request.token_required {
            Some(self.store.get()?.ok_or(ApiError::MissingToken)?)
        } else {
            None
        };

        debug!(method = %request.method, path = %request.path, "API request");
        let mut response = self
            .send(request, &url, body.as_deref(), token.as_deref())
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED && request.token_required {
            // The store may have been cleared by a concurrent expired refresh
            let outcome = match self.refresh().await {
                Err(ApiError::MissingToken) => {
                    RefreshOutcome::Rejected(RefreshFailure::Expired)
                }
                result => result?,
            };
            match outcome {
                RefreshOutcome::Refreshed(new_token) => {
                    debug!(path = %request.path, "Retrying request with refreshed token");
                    response = self
                        .send(request, &url, body.as_deref(), Some(&new_token))
                        .await?;
                }
                RefreshOutcome::Rejected(reason) => {
                    warn!(%reason, path = %request.path, "Token refresh failed");
                    return Err(ApiError::RefreshFailed);
                }
            }
        }

        let status = response.status();
        let text = response.text().await?;
        let data: Value = serde_json::from_str(&text).map_err(|_| ApiError::InvalidJson)?;

        if !status.is_success() {
            let err = ApiError::from_status(status, &data);
            debug!(error = %err, path = %request.path, "API request failed");
            return Err(err);
        }

        Ok(data)
    }

    /// Perform one API call and deserialize the body into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ApiError> {
        let data = self.request(request).await?;
        serde_json::from_value(data).map_err(|e| {
            warn!(error = %e, path = %request.path, "Unexpected response shape");
            ApiError::InvalidJson
        })
    }

    async fn send(
        &self,
        request: &ApiRequest,
        url: &Url,
        body: Option<&str>,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut builder = self.client.request(request.method.clone(), url.clone());

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.payload {
            Payload::Form(form) if request.method != Method::GET => {
                builder.multipart(form.to_form())
            }
            _ => {
                let builder = builder.header(header::CONTENT_TYPE, "application/json");
                match body {
                    Some(body) => builder.body(body.to_string()),
                    None => builder,
                }
            }
        };

        let response = builder.send().await?;
        self.save_cookies();
        Ok(response)
    }
}

/// Loose truthiness for flags the server may send as bool, number or string.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
