use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MB: u64 = 1024 * 1024;

const JPEG: &str = "image/jpeg";
const PNG: &str = "image/png";
const GIF: &str = "image/gif";
const WEBP: &str = "image/webp";
const SVG: &str = "image/svg+xml";
const PDF: &str = "application/pdf";

const PHOTO_TYPES: &[&str] = &[JPEG, PNG, GIF, WEBP];
const STRICT_PHOTO_TYPES: &[&str] = &[JPEG, PNG, WEBP];
const ARTWORK_TYPES: &[&str] = &[JPEG, PNG, GIF, WEBP, SVG];
const RECEIPT_TYPES: &[&str] = &[PDF, JPEG, PNG, WEBP];
const ID_DOCUMENT_TYPES: &[&str] = &[PDF, JPEG, PNG];
const SUBMISSION_TYPES: &[&str] = &[PDF, JPEG, PNG, GIF, WEBP];

/// Destination category of an upload.
///
/// The backend scopes signed URLs by folder and every folder carries its own
/// size ceiling and content-type allow-list (see [`UploadFolder::policy`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadFolder {
    ProfileImages,
    StudentImages,
    InstituteImages,
    InstituteUserImages,
    SubjectImages,
    HomeworkFiles,
    CorrectionFiles,
    InstitutePaymentReceipts,
    SubjectPaymentReceipts,
    IdDocuments,
    BookhireVehicleImages,
    BookhireOwnerImages,
}

/// Size ceiling and allowed content types for one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FolderPolicy {
    pub folder: UploadFolder,
    pub max_size_bytes: u64,
    pub allowed_content_types: &'static [&'static str],
}

impl FolderPolicy {
    const fn new(
        folder: UploadFolder,
        max_size_mb: u64,
        allowed_content_types: &'static [&'static str],
    ) -> Self {
        Self {
            folder,
            max_size_bytes: max_size_mb * MB,
            allowed_content_types,
        }
    }

    pub fn max_size_mb(&self) -> u64 {
        self.max_size_bytes / MB
    }

    /// Whether a normalized (lower-case, parameter-free) MIME type is allowed.
    pub fn allows(&self, content_type: &str) -> bool {
        self.allowed_content_types.contains(&content_type)
    }
}

static POLICIES: [FolderPolicy; 12] = [
    FolderPolicy::new(UploadFolder::ProfileImages, 5, PHOTO_TYPES),
    FolderPolicy::new(UploadFolder::StudentImages, 5, STRICT_PHOTO_TYPES),
    FolderPolicy::new(UploadFolder::InstituteImages, 10, ARTWORK_TYPES),
    FolderPolicy::new(UploadFolder::InstituteUserImages, 5, STRICT_PHOTO_TYPES),
    FolderPolicy::new(UploadFolder::SubjectImages, 5, ARTWORK_TYPES),
    FolderPolicy::new(UploadFolder::HomeworkFiles, 20, SUBMISSION_TYPES),
    FolderPolicy::new(UploadFolder::CorrectionFiles, 20, SUBMISSION_TYPES),
    FolderPolicy::new(UploadFolder::InstitutePaymentReceipts, 10, RECEIPT_TYPES),
    FolderPolicy::new(UploadFolder::SubjectPaymentReceipts, 10, RECEIPT_TYPES),
    FolderPolicy::new(UploadFolder::IdDocuments, 10, ID_DOCUMENT_TYPES),
    FolderPolicy::new(UploadFolder::BookhireVehicleImages, 10, STRICT_PHOTO_TYPES),
    FolderPolicy::new(UploadFolder::BookhireOwnerImages, 5, STRICT_PHOTO_TYPES),
];

impl UploadFolder {
    pub const ALL: [UploadFolder; 12] = [
        UploadFolder::ProfileImages,
        UploadFolder::StudentImages,
        UploadFolder::InstituteImages,
        UploadFolder::InstituteUserImages,
        UploadFolder::SubjectImages,
        UploadFolder::HomeworkFiles,
        UploadFolder::CorrectionFiles,
        UploadFolder::InstitutePaymentReceipts,
        UploadFolder::SubjectPaymentReceipts,
        UploadFolder::IdDocuments,
        UploadFolder::BookhireVehicleImages,
        UploadFolder::BookhireOwnerImages,
    ];

    /// Path segment used by the backend (`profile-images`, `homework-files`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadFolder::ProfileImages => "profile-images",
            UploadFolder::StudentImages => "student-images",
            UploadFolder::InstituteImages => "institute-images",
            UploadFolder::InstituteUserImages => "institute-user-images",
            UploadFolder::SubjectImages => "subject-images",
            UploadFolder::HomeworkFiles => "homework-files",
            UploadFolder::CorrectionFiles => "correction-files",
            UploadFolder::InstitutePaymentReceipts => "institute-payment-receipts",
            UploadFolder::SubjectPaymentReceipts => "subject-payment-receipts",
            UploadFolder::IdDocuments => "id-documents",
            UploadFolder::BookhireVehicleImages => "bookhire-vehicle-images",
            UploadFolder::BookhireOwnerImages => "bookhire-owner-images",
        }
    }

    pub fn policy(&self) -> &'static FolderPolicy {
        // POLICIES is laid out in declaration order
        &POLICIES[*self as usize]
    }

    pub fn policies() -> &'static [FolderPolicy] {
        &POLICIES
    }
}

impl FromStr for UploadFolder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        UploadFolder::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Invalid upload folder: {}", s))
    }
}

impl Display for UploadFolder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
