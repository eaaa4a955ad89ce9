//! Login, logout and account operations.
//!
//! These wrap `ApiClient::request` for the anonymous login endpoints and
//! keep the token store in step with the result: tokens are stored after a
//! successful login and removed on logout or account deletion.

use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::models::Envelope;

/// Accepted email length, in characters
const EMAIL_LENGTH: std::ops::RangeInclusive<usize> = 5..=50;

/// Accepted one-time password length, in characters
const OTP_LENGTH: std::ops::RangeInclusive<usize> = 4..=10;

/// Accepted display name length, in characters
const NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=50;

/// Scheme and host of the companion mobile app's OAuth callback
const APP_CALLBACK_URL: &str = "whatbmphotos://google-auth/callback";

/// OAuth `state` the backend uses for browser logins
const WEB_AUTH_STATE: &str = "web";

/// Result of `verify_otp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpVerification {
    /// The account has no display name yet; call `change_name` next
    pub need_name_update: bool,
}

/// Result of `google_callback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleLogin {
    /// Token stored in this client's token store
    Web,
    /// The login was started by the mobile app; hand the tokens over via
    /// this deep link instead of storing them
    AppRedirect { deep_link: String },
}

#[derive(Debug, Deserialize)]
struct VerifyOtpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    need_name_update: bool,
}

#[derive(Debug, Deserialize)]
struct GoogleAuthUrlResponse {
    #[serde(default)]
    auth_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleCallbackResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    auth_type: Option<String>,
}

pub(crate) fn validate_length(
    field: &str,
    value: &str,
    range: std::ops::RangeInclusive<usize>,
) -> Result<(), ApiError> {
    let len = value.trim().chars().count();
    if range.contains(&len) {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "{} must be between {} and {} characters",
            field,
            range.start(),
            range.end()
        )))
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|_| ApiError::InvalidJson)
}

impl ApiClient {
    /// Ask the backend to email a one-time password.
    pub async fn send_otp(&self, email: &str) -> Result<(), ApiError> {
        let email = email.trim();
        validate_length("email", email, EMAIL_LENGTH)?;

        let req = ApiRequest::post("/send_otp")
            .anonymous()
            .json(json!({ "email": email }));
        Envelope::check(self.request(&req).await?, "Something went wrong")?;
        info!("One-time password requested");
        Ok(())
    }

    /// Exchange email and one-time password for a bearer token.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<OtpVerification, ApiError> {
        let email = email.trim();
        let otp = otp.trim();
        validate_length("email", email, EMAIL_LENGTH)?;
        validate_length("OTP", otp, OTP_LENGTH)?;

        let req = ApiRequest::post("/verify_otp")
            .anonymous()
            .json(json!({ "email": email, "otp": otp }));
        let body = Envelope::check(self.request(&req).await?, "Something went wrong")?;
        let response: VerifyOtpResponse = decode(body)?;

        if let Some(token) = response.access_token.filter(|t| !t.is_empty()) {
            self.token_store().set(&token)?;
            info!("Logged in with one-time password");
        }

        Ok(OtpVerification {
            need_name_update: response.need_name_update,
        })
    }

    /// Set the account's display name.
    pub async fn change_name(&self, name: &str) -> Result<(), ApiError> {
        let name = name.trim();
        validate_length("name", name, NAME_LENGTH)?;

        let req = ApiRequest::post("/change-name").json(json!({ "name": name }));
        Envelope::check(self.request(&req).await?, "Failed to update name")?;
        Ok(())
    }

    /// Get the Google consent URL; Google redirects back to `domain`.
    pub async fn google_auth_url(&self, domain: &str) -> Result<String, ApiError> {
        let req = ApiRequest::get("/google-auth")
            .anonymous()
            .json(json!({ "domain": domain }));
        let body = Envelope::check(self.request(&req).await?, "Failed to get Google auth URL")?;
        let response: GoogleAuthUrlResponse = decode(body)?;

        response
            .auth_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::Rejected("Failed to get Google auth URL".to_string()))
    }

    /// Finish a Google login by exchanging the authorization `code`.
    ///
    /// `state` is the value Google echoed back (`web` when absent).
    pub async fn google_callback(
        &self,
        code: &str,
        state: Option<&str>,
    ) -> Result<GoogleLogin, ApiError> {
        if code.is_empty() {
            return Err(ApiError::InvalidInput(
                "Google login failed: no authorization code".to_string(),
            ));
        }

        let req = ApiRequest::get("/google-auth/callback").anonymous().json(json!({
            "code": code,
            "state": state.unwrap_or(WEB_AUTH_STATE),
        }));
        let body = Envelope::check(self.request(&req).await?, "Google login failed")?;
        let response: GoogleCallbackResponse = decode(body)?;

        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Rejected("Google login failed".to_string()))?;

        if response.auth_type.as_deref() == Some("app") {
            let deep_link = app_deep_link(&access_token, response.refresh_token.as_deref())?;
            info!("Google login handed over to the mobile app");
            return Ok(GoogleLogin::AppRedirect { deep_link });
        }

        self.token_store().set(&access_token)?;
        info!("Logged in with Google");
        Ok(GoogleLogin::Web)
    }

    /// Log out, optionally from every device.
    ///
    /// The stored token and session cookies are removed even when the call
    /// fails.
    pub async fn logout(&self, all_devices: bool) -> Result<(), ApiError> {
        let req = ApiRequest::post("/logout").json(json!({ "allDevices": all_devices }));
        let result = self.request(&req).await;

        if let Err(e) = self.token_store().clear() {
            warn!(error = %e, "Failed to clear stored access token");
        }
        if let Err(e) = self.cookies().clear() {
            warn!(error = %e, "Failed to clear session cookies");
        }

        Envelope::check(result?, "Logout failed")?;
        info!(all_devices, "Logged out");
        Ok(())
    }

    /// Permanently delete the account. The stored token is removed on success.
    pub async fn delete_account(&self) -> Result<String, ApiError> {
        let body = Envelope::check(
            self.request(&ApiRequest::post("/delete_account")).await?,
            "Failed to delete account",
        )?;
        self.token_store().clear()?;
        self.cookies().clear()?;
        info!("Account deleted");

        Ok(body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Account deleted successfully!")
            .to_string())
    }
}

fn app_deep_link(access_token: &str, refresh_token: Option<&str>) -> Result<String, ApiError> {
    let mut url = Url::parse(APP_CALLBACK_URL)
        .map_err(|e| ApiError::InvalidInput(format!("invalid app callback URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("access_token", access_token)
        .append_pair("refresh_token", refresh_token.unwrap_or_default());
    Ok(url.to_string())
}
