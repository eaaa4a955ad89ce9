use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiError;

/// Common `{success, message}` wrapper of every backend response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// Turn a `success: false` body into `ApiError::Rejected`, passing
    /// successful bodies through untouched.
    pub fn check(body: Value, fallback: &str) -> Result<Value, ApiError> {
        let envelope: Envelope = serde_json::from_value(body.clone()).unwrap_or_default();
        if envelope.success {
            return Ok(body);
        }
        // Some endpoints report failures under `error` instead of `message`
        let message = envelope
            .message
            .or_else(|| body.get("error").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        Err(ApiError::Rejected(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check() {
        let ok = Envelope::check(json!({"success": true, "x": 1}), "failed").unwrap();
        assert_eq!(ok["x"], json!(1));

        let err = Envelope::check(json!({"success": false, "message": "No file uploaded."}), "failed")
            .unwrap_err();
        assert_eq!(err.to_string(), "Request rejected: No file uploaded.");

        let err = Envelope::check(json!({"error": "An error occurred while fetching faces."}), "failed")
            .unwrap_err();
        assert_eq!(err.to_string(), "Request rejected: An error occurred while fetching faces.");

        let err = Envelope::check(json!([]), "Failed to fetch faces").unwrap_err();
        assert_eq!(err.to_string(), "Request rejected: Failed to fetch faces");
    }
}
