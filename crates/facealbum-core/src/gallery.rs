//! Photo and face endpoints.
//!
//! Typed wrappers over `ApiClient::request` for the gallery screens:
//! paginated listings, upload, deletion and face tagging.

use std::path::Path;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, ApiRequest, FormData};
use crate::auth::login::validate_length;
use crate::models::{Envelope, Face, LinkedFace, Page, Photo};

/// Maximum length of a face name, in characters
const FACE_NAME_LENGTH: std::ops::RangeInclusive<usize> = 1..=50;

/// Multipart field the upload endpoint reads the image from
const UPLOAD_FIELD: &str = "file";

/// Largest accepted image
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Accepted image file extensions, compared case-insensitively
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Deserialize)]
struct FaceResponse {
    face: Face,
}

#[derive(Debug, Deserialize)]
struct CapacityResponse {
    #[serde(default)]
    max_photos_reached: bool,
}

fn decode<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|_| ApiError::InvalidJson)
}

fn message_of(body: &serde_json::Value, fallback: &str) -> String {
    body.get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Check an image's name and size against the upload limits.
pub fn validate_upload(file_name: &str, size: u64) -> Result<(), ApiError> {
    if size == 0 {
        return Err(ApiError::InvalidInput(format!("{} is empty", file_name)));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ApiError::InvalidInput(format!(
            "Max size should be {}MB.",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ApiError::InvalidInput(format!(
            "Only {} files are allowed.",
            ALLOWED_EXTENSIONS.join(", ")
        ))),
    }
}

impl ApiClient {
    async fn fetch_page<T: serde::de::DeserializeOwned>(
        &self,
        req: ApiRequest,
        fallback: &str,
    ) -> Result<Page<T>, ApiError> {
        let body = Envelope::check(self.request(&req).await?, fallback)?;
        let page: Page<T> = decode(body)?;
        debug!(path = %req.path(), items = page.items.len(), has_next = page.has_next, "Fetched page");
        Ok(page)
    }

    /// Faces of the current user, most photographed first.
    pub async fn faces(&self, page: u32) -> Result<Page<Face>, ApiError> {
        self.fetch_page(
            ApiRequest::get("/faces").json(json!({ "page": page })),
            "Failed to fetch faces",
        )
        .await
    }

    /// Photos of the current user, newest first.
    pub async fn photos(&self, page: u32) -> Result<Page<Photo>, ApiError> {
        self.fetch_page(
            ApiRequest::get("/photos").json(json!({ "page": page })),
            "Failed to fetch photos",
        )
        .await
    }

    pub async fn face(&self, face_id: i64) -> Result<Face, ApiError> {
        let req = ApiRequest::get(format!("/face/{}", face_id));
        let body = Envelope::check(self.request(&req).await?, "Face not found")?;
        // An unknown id comes back as a failed envelope nested under `face`
        if let Some(inner) = body.get("face").filter(|f| f.get("success").is_some()) {
            Envelope::check(inner.clone(), "Face not found")?;
        }
        Ok(decode::<FaceResponse>(body)?.face)
    }

    pub async fn photos_by_face(&self, face_id: i64, page: u32) -> Result<Page<Photo>, ApiError> {
        self.fetch_page(
            ApiRequest::get("/photo_by_face").json(json!({ "face_id": face_id, "page": page })),
            "Failed to fetch photos",
        )
        .await
    }

    /// Whether the account already holds the maximum number of photos.
    pub async fn upload_capacity(&self) -> Result<bool, ApiError> {
        let body = Envelope::check(
            self.request(&ApiRequest::get("/upload")).await?,
            "Failed to check upload capacity",
        )?;
        Ok(decode::<CapacityResponse>(body)?.max_photos_reached)
    }

    /// Upload one image. Returns the server's confirmation message.
    ///
    /// Names without an image extension and files over `MAX_UPLOAD_BYTES`
    /// are refused before anything is sent.
    pub async fn upload_photo(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
        let size = bytes.len();
        validate_upload(file_name, size as u64)?;

        let form = FormData::new().file(UPLOAD_FIELD, file_name, bytes);
        let body = Envelope::check(
            self.request(&ApiRequest::post("/upload").form(form)).await?,
            "File upload failed.",
        )?;
        info!(file = file_name, bytes = size, "Photo uploaded");
        Ok(message_of(&body, "File uploaded successfully."))
    }

    /// Read `path` and upload it under its file name.
    pub async fn upload_photo_file(&self, path: &Path) -> Result<String, ApiError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ApiError::InvalidInput(format!("not a file: {}", path.display())))?
            .to_string();

        // Check the size before reading the whole file
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ApiError::InvalidInput(format!("cannot read {}: {}", path.display(), e)))?;
        validate_upload(&file_name, metadata.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::InvalidInput(format!("cannot read {}: {}", path.display(), e)))?;
        self.upload_photo(&file_name, bytes).await
    }

    pub async fn delete_photo(&self, photo_id: i64) -> Result<String, ApiError> {
        let req = ApiRequest::post("/delete_photo").json(json!({ "photo_id": photo_id }));
        let body = Envelope::check(self.request(&req).await?, "Failed to delete photo")?;
        Ok(message_of(&body, "Photo deleted successfully"))
    }

    pub async fn delete_face(&self, face_id: i64) -> Result<String, ApiError> {
        let req = ApiRequest::post("/delete_face").json(json!({ "face_id": face_id }));
        let body = Envelope::check(self.request(&req).await?, "Failed to delete face")?;
        Ok(message_of(&body, "Face deleted successfully"))
    }

    pub async fn update_face_name(&self, face_id: i64, name: &str) -> Result<String, ApiError> {
        let name = name.trim();
        validate_length("name", name, FACE_NAME_LENGTH)?;

        let req = ApiRequest::post("/update-face-name")
            .json(json!({ "face_id": face_id, "name": name }));
        let body = Envelope::check(self.request(&req).await?, "Failed to update name")?;
        Ok(message_of(&body, "Face name changed successfully."))
    }

    /// All faces, those already linked to `photo_id` first.
    pub async fn faces_for_photo(
        &self,
        photo_id: i64,
        page: u32,
    ) -> Result<Page<LinkedFace>, ApiError> {
        self.fetch_page(
            ApiRequest::post("/get_faces").json(json!({ "photo_id": photo_id, "page": page })),
            "Failed to fetch faces",
        )
        .await
    }

    /// Tag (`checked == true`) or untag a face on a photo.
    pub async fn link_photo_with_face(
        &self,
        photo_id: i64,
        face_id: i64,
        checked: bool,
    ) -> Result<String, ApiError> {
        let req = ApiRequest::post("/link_unlink_photo_with_face").json(json!({
            "photo_id": photo_id,
            "face_id": face_id,
            "checked": checked,
        }));
        let body = Envelope::check(self.request(&req).await?, "Failed to link face")?;
        Ok(message_of(&body, "Face updated successfully!"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::models::paginate;
    use futures::StreamExt;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use std::sync::Arc;

    fn client_for(server: &Server) -> ApiClient {
        ApiClient::new(
            format!("http://{}", server.addr()),
            Arc::new(MemoryTokenStore::with_token("T1")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_faces_page() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/faces"),
                request::query(url_decoded(contains(("page", "2")))),
            ])
            .respond_with(json_encoded(json!({
                "faces": [{"id": 3, "name": "Bob", "face_url": "u3", "face_count": 7}],
                "current_page": 2,
                "has_next": false,
                "success": true
            }))),
        );
        let client = client_for(&server);

        let page = client.faces(2).await.unwrap();
        assert_eq!(page.items[0].display_name(), "Bob");
        assert_eq!(page.page, Some(2));
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn test_rejected_envelope() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/face/8"))
                .respond_with(json_encoded(json!({"success": false, "message": "Face not found"}))),
        );
        let client = client_for(&server);

        let err = client.face(8).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "Face not found"));
    }

    #[tokio::test]
    async fn test_paginate_all_photos() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/photos"),
                request::query(url_decoded(contains(("page", "1")))),
            ])
            .respond_with(json_encoded(json!({
                "photos": [{"id": 9, "photo_url": "p9"}, {"id": 8, "photo_url": "p8"}],
                "has_next": true,
                "success": true
            }))),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/photos"),
                request::query(url_decoded(contains(("page", "2")))),
            ])
            .respond_with(json_encoded(json!({
                "photos": [{"id": 7, "photo_url": "p7"}],
                "has_next": false,
                "success": true
            }))),
        );
        let client = client_for(&server);

        let ids: Vec<i64> = paginate(1, |page| client.photos(page))
            .map(|p| p.unwrap().id)
            .collect()
            .await;
        assert_eq!(ids, vec![9, 8, 7]);
    }

    #[tokio::test]
    async fn test_upload_capacity_and_upload() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/upload"))
                .respond_with(json_encoded(json!({"success": true, "max_photos_reached": true}))),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/upload"),
                request::body(matches("name=\"file\"; filename=\"beach.jpg\"")),
            ])
            .respond_with(json_encoded(json!({"success": true, "message": "File uploaded successfully."}))),
        );
        let client = client_for(&server);

        assert!(client.upload_capacity().await.unwrap());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beach.jpg");
        std::fs::write(&path, b"\xff\xd8\xff").unwrap();
        let message = client.upload_photo_file(&path).await.unwrap();
        assert_eq!(message, "File uploaded successfully.");
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file_without_network() {
        let server = Server::run();
        let client = client_for(&server);
        assert!(client.upload_photo("a.jpg", Vec::new()).await.unwrap_err().is_caller_error());
    }

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("a.jpg", 1).is_ok());
        assert!(validate_upload("A.JPEG", 1).is_ok());
        assert!(validate_upload("scan.Png", 1).is_ok());
        assert!(validate_upload("b.webp", MAX_UPLOAD_BYTES).is_ok());

        let err = validate_upload("b.webp", MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Max size should be 20MB.");

        for name in ["notes.txt", "archive.jpg.zip", "jpg", "photo."] {
            let err = validate_upload(name, 10).unwrap_err();
            assert_eq!(err.to_string(), "Invalid input: Only jpg, jpeg, png, webp files are allowed.");
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_type_and_oversize_without_network() {
        // No expectations: any request fails the test
        let server = Server::run();
        let client = client_for(&server);

        let err = client.upload_photo("notes.txt", b"hello".to_vec()).await.unwrap_err();
        assert!(err.is_caller_error());

        let err = client
            .upload_photo("huge.jpg", vec![0; MAX_UPLOAD_BYTES as usize + 1])
            .await
            .unwrap_err();
        assert!(err.is_caller_error());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.png");
        std::fs::File::create(&path)
            .unwrap()
            .set_len(MAX_UPLOAD_BYTES + 1)
            .unwrap();
        assert!(client.upload_photo_file(&path).await.unwrap_err().is_caller_error());
    }

    #[tokio::test]
    async fn test_missing_face_nested_in_successful_envelope() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/face/404"))
                .respond_with(json_encoded(json!({
                    "face": {"success": false, "message": "Face not found"},
                    "success": true
                }))),
        );
        let client = client_for(&server);

        let err = client.face(404).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "Face not found"));
    }

    #[tokio::test]
    async fn test_face_tagging() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/get_faces"),
                request::body(json_decoded(eq(json!({"photo_id": 5, "page": 1})))),
            ])
            .respond_with(json_encoded(json!({
                "faces": [
                    {"id": 1, "name": "Ann", "face_url": "u1", "face_count": 4, "linked": true},
                    {"id": 2, "name": null, "face_url": "u2", "face_count": 2, "linked": false}
                ],
                "photo_id": 5,
                "page": 1,
                "has_next": false,
                "success": true
            }))),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/link_unlink_photo_with_face"),
                request::body(json_decoded(eq(json!({"photo_id": 5, "face_id": 2, "checked": true})))),
            ])
            .respond_with(json_encoded(json!({"success": true, "message": "Photo linked to face"}))),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/update-face-name"),
                request::body(json_decoded(eq(json!({"face_id": 2, "name": "Cat"})))),
            ])
            .respond_with(json_encoded(json!({"success": true, "message": "Face name changed successfully."}))),
        );
        let client = client_for(&server);

        let page = client.faces_for_photo(5, 1).await.unwrap();
        assert!(page.items[0].linked);
        assert_eq!(page.items[1].display_name(), "Untitled");

        assert_eq!(
            client.link_photo_with_face(5, 2, true).await.unwrap(),
            "Photo linked to face"
        );
        assert_eq!(
            client.update_face_name(2, " Cat ").await.unwrap(),
            "Face name changed successfully."
        );
        assert!(client.update_face_name(2, "   ").await.unwrap_err().is_caller_error());
    }

    #[tokio::test]
    async fn test_delete_photo_and_face() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/delete_photo"),
                request::body(json_decoded(eq(json!({"photo_id": 11})))),
            ])
            .respond_with(json_encoded(json!({"success": true, "message": "Photo deleted successfully"}))),
        );
        server.expect(
            Expectation::matching(request::method_path("POST", "/delete_face"))
                .respond_with(status_code(404).body(r#"{"success": false, "message": "Face not found"}"#)),
        );
        let client = client_for(&server);

        assert_eq!(client.delete_photo(11).await.unwrap(), "Photo deleted successfully");
        assert_eq!(
            client.delete_face(3).await.unwrap_err().to_string(),
            "Error 404: Face not found"
        );
    }
}
