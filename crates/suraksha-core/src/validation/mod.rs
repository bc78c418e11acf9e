//! Validation modules

pub mod file;

pub use file::{
    content_type_for_file_name, normalize_mime_type, validate_upload, ValidationError,
    FORBIDDEN_EXTENSIONS,
};
