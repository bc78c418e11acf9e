use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use super::folder::UploadFolder;

/// Intent to upload one file into a folder. Sent as the query of the
/// signed-URL request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub folder: UploadFolder,
    /// Original file name
    #[validate(length(
        min = 1,
        max = 255,
        message = "File name must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    /// Declared content type (MIME type)
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// Declared file size in bytes
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub file_size: u64,
}

impl UploadRequest {
    pub fn new(
        folder: UploadFolder,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            folder,
            file_name: file_name.into(),
            content_type: content_type.into(),
            file_size,
        }
    }
}

/// Raw body of `GET .../get-signed-url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Absent on rejections; required once `success` is true
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub relative_path: Option<String>,
    /// Storage policy fields for form POST uploads, in the order the backend sent them
    #[serde(default)]
    pub fields: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Value>,
}

/// A backend response that does not match the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SchemaMismatch(pub String);

/// Permission to write exactly one object straight to storage.
///
/// `upload_url` and `fields` are opaque and passed through untouched;
/// `relative_path` is the identifier the rest of the system stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUploadGrant {
    pub upload_url: String,
    pub relative_path: String,
    pub public_url: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl SignedUploadGrant {
    /// Grants carrying policy fields must be uploaded as a multipart form POST.
    pub fn has_policy_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

impl TryFrom<SignedUrlResponse> for SignedUploadGrant {
    type Error = SchemaMismatch;

    fn try_from(response: SignedUrlResponse) -> Result<Self, Self::Error> {
        let upload_url = response
            .upload_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SchemaMismatch("uploadUrl is missing".to_string()))?;
        let relative_path = response
            .relative_path
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| SchemaMismatch("relativePath is missing".to_string()))?;

        let fields = response
            .fields
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                other => Err(SchemaMismatch(format!(
                    "policy field '{}' must be a string, got {}",
                    key, other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            upload_url,
            relative_path,
            public_url: response.public_url.filter(|u| !u.is_empty()),
            fields,
        })
    }
}

/// Body of `POST /upload/verify-and-publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPublishRequest {
    pub relative_path: String,
}

/// Raw body returned by verify-and-publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPublishResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub relative_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Value>,
}

/// Normalized verify-and-publish result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub public_url: String,
    /// Relative path echoed back by the backend, when it sends one
    pub relative_path: Option<String>,
}

impl TryFrom<VerifyPublishResponse> for PublishReceipt {
    type Error = SchemaMismatch;

    fn try_from(response: VerifyPublishResponse) -> Result<Self, Self::Error> {
        let public_url = response
            .public_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SchemaMismatch("publicUrl is missing".to_string()))?;

        Ok(Self {
            public_url,
            relative_path: response.relative_path.filter(|p| !p.is_empty()),
        })
    }
}

/// Result of a published upload. `relative_path` is the value callers persist
/// (profile picture, homework submission, receipt, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub folder: UploadFolder,
    pub file_name: String,
    pub file_size: u64,
    pub relative_path: String,
    pub public_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grant_json(fields: Value) -> SignedUrlResponse {
        serde_json::from_value(json!({
            "success": true,
            "message": "Signed URL generated",
            "uploadUrl": "https://storage.example.com/bucket",
            "publicUrl": "https://cdn.example.com/profile-images/abc.png",
            "relativePath": "profile-images/abc.png",
            "fields": fields,
        }))
        .unwrap()
    }

    #[test]
    fn grant_keeps_field_order() {
        let response = grant_json(json!({
            "key": "profile-images/abc.png",
            "policy": "eyJleHBpcmF0aW9uIjoi",
            "x-goog-signature": "deadbeef",
            "Content-Type": "image/png",
        }));
        let grant = SignedUploadGrant::try_from(response).unwrap();
        let keys: Vec<&str> = grant.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["key", "policy", "x-goog-signature", "Content-Type"]
        );
        assert!(grant.has_policy_fields());
    }

    #[test]
    fn grant_without_fields_has_no_policy() {
        let response: SignedUrlResponse = serde_json::from_value(json!({
            "success": true,
            "uploadUrl": "https://storage.example.com/put-here",
            "relativePath": "homework-files/h.pdf",
        }))
        .unwrap();
        let grant = SignedUploadGrant::try_from(response).unwrap();
        assert!(!grant.has_policy_fields());
        assert_eq!(grant.public_url, None);
    }

    #[test]
    fn grant_rejects_non_string_field() {
        let response = grant_json(json!({ "key": "a", "max": 10 }));
        let err = SignedUploadGrant::try_from(response).unwrap_err();
        assert!(err.0.contains("max"));
    }

    #[test]
    fn grant_rejects_empty_relative_path() {
        let mut response = grant_json(json!({}));
        response.relative_path = Some("  ".to_string());
        assert!(SignedUploadGrant::try_from(response).is_err());
    }

    #[test]
    fn grant_requires_upload_url() {
        let response: SignedUrlResponse = serde_json::from_value(json!({
            "success": true,
            "relativePath": "profile-images/abc.png",
        }))
        .unwrap();
        let err = SignedUploadGrant::try_from(response).unwrap_err();
        assert!(err.0.contains("uploadUrl"));
    }

    #[test]
    fn rejection_without_grant_fields_deserializes() {
        let response: SignedUrlResponse = serde_json::from_value(json!({
            "success": false,
            "message": "Quota exceeded",
        }))
        .unwrap();
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Quota exceeded"));
        assert_eq!(response.upload_url, None);
        assert_eq!(response.relative_path, None);
    }

    #[test]
    fn receipt_requires_public_url() {
        let response: VerifyPublishResponse = serde_json::from_value(json!({
            "success": true,
            "relativePath": "profile-images/abc.png",
        }))
        .unwrap();
        assert!(PublishReceipt::try_from(response).is_err());
    }

    #[test]
    fn verify_request_is_camel_case() {
        let body = serde_json::to_value(VerifyPublishRequest {
            relative_path: "id-documents/x.pdf".to_string(),
        })
        .unwrap();
        assert_eq!(body, json!({ "relativePath": "id-documents/x.pdf" }));
    }

    #[test]
    fn upload_request_validation() {
        let ok = UploadRequest::new(UploadFolder::ProfileImages, "me.png", "image/png", 10);
        assert!(ok.validate().is_ok());

        let empty_name = UploadRequest::new(UploadFolder::ProfileImages, "", "image/png", 10);
        assert!(empty_name.validate().is_err());

        let zero = UploadRequest::new(UploadFolder::ProfileImages, "me.png", "image/png", 0);
        assert!(zero.validate().is_err());
    }
}
