//! Pre-flight file checks. Everything here is pure: a file that fails is
//! rejected before any network call is made.

use validator::Validate;

use crate::models::{UploadFolder, UploadRequest};

/// Extensions that are never accepted, wherever they appear in the name.
pub const FORBIDDEN_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "sh", "bash", "php", "phtml", "php3", "php4", "php5", "js", "jar",
    "msi", "vbs", "ps1", "scr", "dll", "py", "pl", "cgi", "asp", "aspx", "jsp", "htm", "html",
    "app", "deb", "rpm",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid upload request: {0}")]
    InvalidRequest(String),

    #[error("Empty file")]
    EmptyFile,

    #[error(
        "File too large: {size} bytes exceeds the {} MB limit for {folder}",
        .max_size_bytes / (1024 * 1024)
    )]
    FileTooLarge {
        folder: UploadFolder,
        size: u64,
        max_size_bytes: u64,
    },

    #[error("Content type '{content_type}' is not allowed for {folder} (allowed: {allowed})")]
    DisallowedContentType {
        folder: UploadFolder,
        content_type: String,
        allowed: String,
    },

    #[error("Files of type '.{extension}' are not allowed")]
    ForbiddenExtension { extension: String },

    #[error("File name '{0}' has more than one extension")]
    DoubleExtension(String),

    #[error("Content type '{content_type}' does not match extension '.{extension}' (expected one of: {expected})")]
    ContentTypeMismatch {
        extension: String,
        content_type: String,
        expected: String,
    },

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Splits a file name into its extension segments, lower-cased.
///
/// Only the last path component counts and leading dots are ignored, so
/// `.profile.png` has one extension and `photo.php.png` has two.
fn extension_segments(file_name: &str) -> Vec<String> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim_start_matches('.');

    base.split('.')
        .skip(1)
        .map(|segment| segment.trim().to_lowercase())
        .collect()
}

fn expected_content_types(extension: &str) -> Option<&'static [&'static str]> {
    let expected: &'static [&'static str] = match extension {
        "jpg" | "jpeg" => &["image/jpeg"],
        "png" => &["image/png"],
        "gif" => &["image/gif"],
        "webp" => &["image/webp"],
        "svg" => &["image/svg+xml"],
        "avif" => &["image/avif"],
        "bmp" => &["image/bmp"],
        "pdf" => &["application/pdf"],
        "doc" => &["application/msword"],
        "docx" => &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
        "txt" => &["text/plain"],
        "csv" => &["text/csv"],
        _ => return None,
    };
    Some(expected)
}

/// MIME type for a file name's extension, when the extension is a known one.
pub fn content_type_for_file_name(file_name: &str) -> Option<&'static str> {
    extension_segments(file_name)
        .last()
        .and_then(|ext| expected_content_types(ext))
        .and_then(|types| types.first().copied())
}

/// Checks the file name and returns its extension, if it has one.
fn validate_file_name(file_name: &str) -> Result<Option<String>, ValidationError> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    if base.trim_matches('.').trim().is_empty() {
        return Err(ValidationError::InvalidFileName(format!(
            "'{}' does not name a file",
            file_name
        )));
    }

    let segments = extension_segments(file_name);

    if let Some(forbidden) = segments
        .iter()
        .find(|s| FORBIDDEN_EXTENSIONS.contains(&s.as_str()))
    {
        return Err(ValidationError::ForbiddenExtension {
            extension: forbidden.clone(),
        });
    }

    if segments.len() > 1 {
        return Err(ValidationError::DoubleExtension(file_name.to_string()));
    }

    Ok(segments.into_iter().next().filter(|ext| !ext.is_empty()))
}

/// Validate an upload against its folder policy.
///
/// Checks run cheapest first: request shape, size ceiling, file name
/// (denylist, double extension), content-type allow-list and finally the
/// extension/content-type agreement.
pub fn validate_upload(request: &UploadRequest) -> Result<(), ValidationError> {
    if request.file_size == 0 {
        return Err(ValidationError::EmptyFile);
    }

    request
        .validate()
        .map_err(|e| ValidationError::InvalidRequest(e.to_string()))?;

    let policy = request.folder.policy();
    if request.file_size > policy.max_size_bytes {
        return Err(ValidationError::FileTooLarge {
            folder: request.folder,
            size: request.file_size,
            max_size_bytes: policy.max_size_bytes,
        });
    }

    let extension = validate_file_name(&request.file_name)?;

    let content_type = normalize_mime_type(&request.content_type);
    if !policy.allows(&content_type) {
        return Err(ValidationError::DisallowedContentType {
            folder: request.folder,
            content_type: request.content_type.clone(),
            allowed: policy.allowed_content_types.join(", "),
        });
    }

    let Some(extension) = extension else {
        tracing::debug!(
            file_name = %request.file_name,
            "No extension, skipping Content-Type/extension cross-validation"
        );
        return Ok(());
    };

    match expected_content_types(&extension) {
        Some(expected) if !expected.contains(&content_type.as_str()) => {
            Err(ValidationError::ContentTypeMismatch {
                extension,
                content_type: request.content_type.clone(),
                expected: expected.join(", "),
            })
        }
        Some(_) => Ok(()),
        None => {
            tracing::debug!(
                extension = %extension,
                content_type = %content_type,
                "Unknown extension, skipping Content-Type/extension cross-validation"
            );
            Ok(())
        }
    }
}
