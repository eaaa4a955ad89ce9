//! Request descriptors for the authenticated API client.
//!
//! An `ApiRequest` describes a single call: target path, method, payload
//! and whether a bearer token must be attached. Descriptors are cheap to
//! clone so the client can replay the exact same call after a token refresh.

use reqwest::multipart::{Form, Part};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// Body of a request.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    /// No caller data. Sent as `{}` on non-GET requests.
    #[default]
    Empty,
    /// Structured data, JSON-encoded (or query-encoded for GET).
    Json(Value),
    /// Multipart form, sent verbatim with its own boundary.
    Form(FormData),
}

/// An owned multipart form that can be rebuilt for every send.
///
/// `reqwest::multipart::Form` is consumed by the request, so the parts are
/// kept here and converted on demand.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    parts: Vec<FormPart>,
}

#[derive(Debug, Clone)]
enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a file field
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
        });
        self
    }

    pub(crate) fn to_form(&self) -> Form {
        self.parts.iter().fold(Form::new(), |form, part| match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File {
                name,
                file_name,
                bytes,
            } => form.part(
                name.clone(),
                Part::bytes(bytes.clone()).file_name(file_name.clone()),
            ),
        })
    }
}

/// Descriptor for one API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) path: String,
    pub(crate) method: Method,
    pub(crate) payload: Payload,
    pub(crate) token_required: bool,
}

impl ApiRequest {
    /// A POST to `path` that requires a bearer token and carries no data.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::POST,
            payload: Payload::Empty,
            token_required: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path).method(Method::GET)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Send without a bearer token and skip refresh-on-401.
    pub fn anonymous(mut self) -> Self {
        self.token_required = false;
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Attach structured data.
    pub fn json(self, value: Value) -> Self {
        self.payload(Payload::Json(value))
    }

    /// Serialize `data` and attach it as structured data.
    pub fn data<T: Serialize>(self, data: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(data)
            .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
        Ok(self.json(value))
    }

    pub fn form(self, form: FormData) -> Self {
        self.payload(Payload::Form(form))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve the full URL, appending query parameters for GET payloads.
    pub(crate) fn url(&self, base: &str) -> Result<Url, ApiError> {
        if self.path.is_empty() {
            return Err(ApiError::MissingEndpoint);
        }

        let mut url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), self.path))
            .map_err(|e| ApiError::InvalidInput(format!("invalid URL for {}: {}", self.path, e)))?;

        if self.method == Method::GET {
            if let Some(pairs) = self.query_pairs()? {
                url.query_pairs_mut()
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            }
        }

        Ok(url)
    }

    /// Query parameters derived from a GET payload, `None` when there are none.
    fn query_pairs(&self) -> Result<Option<Vec<(String, String)>>, ApiError> {
        match &self.payload {
            Payload::Empty => Ok(None),
            Payload::Json(Value::Null) => Ok(None),
            Payload::Json(Value::Object(map)) if map.is_empty() => Ok(None),
            Payload::Json(Value::Object(map)) => Ok(Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), query_value(v)))
                    .collect(),
            )),
            Payload::Json(_) => Err(ApiError::InvalidPayload(
                "expected an object for query parameters".to_string(),
            )),
            Payload::Form(_) => Err(ApiError::InvalidPayload(
                "form payloads cannot be sent with GET".to_string(),
            )),
        }
    }

    /// The JSON body for a non-GET request.
    ///
    /// Only plain objects are accepted; `Empty` becomes `{}`.
    pub(crate) fn json_body(&self) -> Result<Option<String>, ApiError> {
        if self.method == Method::GET {
            return Ok(None);
        }
        match &self.payload {
            Payload::Empty => Ok(Some("{}".to_string())),
            Payload::Json(value @ Value::Object(_)) => Ok(Some(value.to_string())),
            Payload::Json(_) => Err(ApiError::InvalidPayload(
                "expected an object".to_string(),
            )),
            Payload::Form(_) => Ok(None),
        }
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "http://localhost:5000/api";

    #[test]
    fn test_defaults() {
        let req = ApiRequest::new("/logout");
        assert_eq!(req.method, Method::POST);
        assert!(req.token_required);
        assert!(matches!(req.payload, Payload::Empty));
        assert_eq!(req.json_body().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_missing_path() {
        let err = ApiRequest::new("").url(BASE).unwrap_err();
        assert!(matches!(err, ApiError::MissingEndpoint));
    }

    #[test]
    fn test_get_payload_becomes_query() {
        let req = ApiRequest::get("/photo_by_face").json(json!({"face_id": 7, "page": 2}));
        let url = req.url(BASE).unwrap();
        assert_eq!(url.path(), "/api/photo_by_face");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("face_id".to_string(), "7".to_string())));
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
        assert_eq!(req.json_body().unwrap(), None);
    }

    #[test]
    fn test_get_query_merges_with_existing_query() {
        let req = ApiRequest::get("/google-auth?domain=x").json(json!({"state": "web"}));
        let url = req.url(BASE).unwrap();
        assert_eq!(url.query(), Some("domain=x&state=web"));
    }

    #[test]
    fn test_get_without_payload_has_no_query() {
        let url = ApiRequest::get("/faces").url(BASE).unwrap();
        assert_eq!(url.query(), None);
        let url = ApiRequest::get("/faces").json(json!({})).url(BASE).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_query_values_are_encoded() {
        let req = ApiRequest::get("/google-auth").json(json!({"domain": "https://a.b/c d"}));
        let url = req.url(BASE).unwrap();
        assert_eq!(url.query(), Some("domain=https%3A%2F%2Fa.b%2Fc+d"));
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let req = ApiRequest::post("/delete_photo").json(json!([1, 2, 3]));
        assert!(matches!(req.json_body(), Err(ApiError::InvalidPayload(_))));

        let req = ApiRequest::post("/delete_photo").json(json!("photo"));
        assert!(matches!(req.json_body(), Err(ApiError::InvalidPayload(_))));

        let req = ApiRequest::get("/photos").json(json!([1]));
        assert!(matches!(req.url(BASE), Err(ApiError::InvalidPayload(_))));
    }

    #[test]
    fn test_form_payload_has_no_json_body() {
        let form = FormData::new().file("file", "a.jpg", vec![1, 2, 3]);
        let req = ApiRequest::post("/upload").form(form);
        assert!(matches!(req.payload, Payload::Form(_)));
        assert_eq!(req.json_body().unwrap(), None);

        let req = ApiRequest::get("/upload").form(FormData::new());
        assert!(matches!(req.url(BASE), Err(ApiError::InvalidPayload(_))));
    }

    #[test]
    fn test_data_serializes_struct() {
        #[derive(Serialize)]
        struct Body {
            photo_id: i64,
        }
        let req = ApiRequest::post("/delete_photo").data(&Body { photo_id: 3 }).unwrap();
        assert_eq!(req.json_body().unwrap().as_deref(), Some(r#"{"photo_id":3}"#));
    }
}
