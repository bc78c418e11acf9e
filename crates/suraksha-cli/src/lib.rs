//! Helpers shared by the `suraksha` binary.

use anyhow::Context;
use serde::Serialize;
use suraksha_core::{validate_upload, FolderPolicy, UploadFolder, UploadRequest};
use suraksha_upload::UploadFile;

/// One row of the `folders` listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSummary {
    pub folder: UploadFolder,
    pub max_size_mb: u64,
    pub allowed_content_types: &'static [&'static str],
}

impl From<&FolderPolicy> for FolderSummary {
    fn from(policy: &FolderPolicy) -> Self {
        Self {
            folder: policy.folder,
            max_size_mb: policy.max_size_mb(),
            allowed_content_types: policy.allowed_content_types,
        }
    }
}

pub fn folder_summaries() -> Vec<FolderSummary> {
    UploadFolder::policies().iter().map(FolderSummary::from).collect()
}

/// Result of the `validate` command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(flatten)]
    pub request: UploadRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run the pre-flight checks for `file` in `folder` without touching the network.
pub fn validation_report(folder: UploadFolder, file: &UploadFile) -> ValidationReport {
    let request = file.request(folder);
    let error = validate_upload(&request).err().map(|e| e.to_string());
    ValidationReport {
        valid: error.is_none(),
        request,
        error,
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
