//! Suraksha CLI: upload files straight to Suraksha LMS storage.
//!
//! Set SURAKSHA_API_URL (or API_URL) and SURAKSHA_ACCESS_TOKEN or
//! SURAKSHA_TOKEN_FILE. Uses Bearer auth for backend calls only.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use suraksha_cli::{folder_summaries, init_tracing, print_json, validation_report};
use suraksha_core::{ClientConfig, UploadFolder};
use suraksha_upload::{CropRegion, TracingProgress, UploadFile, Uploader};

#[derive(Parser)]
#[command(name = "suraksha", about = "Suraksha LMS upload CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file into a folder and publish it
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Destination folder, e.g. profile-images
        #[arg(long)]
        folder: UploadFolder,
        /// Override the content type derived from the file extension
        #[arg(long)]
        content_type: Option<String>,
        /// Crop the image first: x,y,width,height
        #[arg(long, value_name = "X,Y,W,H")]
        crop: Option<CropRegion>,
    },
    /// Upload several files into one folder
    UploadMany {
        /// Paths of the files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        folder: UploadFolder,
    },
    /// Check a file against a folder policy without uploading it
    Validate {
        file: PathBuf,
        #[arg(long)]
        folder: UploadFolder,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// List upload folders with their size limits and allowed types
    Folders,
}

fn uploader() -> anyhow::Result<Uploader<suraksha_upload::HttpUploadBackend>> {
    let config = ClientConfig::from_env().context(
        "Invalid configuration. Set SURAKSHA_API_URL (or API_URL) and SURAKSHA_ACCESS_TOKEN or SURAKSHA_TOKEN_FILE",
    )?;
    let uploader = Uploader::from_config(&config)?.with_progress(Arc::new(TracingProgress));
    Ok(uploader)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            file,
            folder,
            content_type,
            crop,
        } => {
            let mut upload = UploadFile::from_path(&file, content_type)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if let Some(region) = crop {
                upload = upload.cropped(region)?;
            }

            let outcome = uploader()?.upload_with_retry(folder, &upload).await?;
            print_json(&outcome)?;
        }
        Commands::UploadMany { files, folder } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let upload = UploadFile::from_path(path, None)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                uploads.push(upload);
            }

            let report = uploader()?.upload_many(folder, uploads).await;
            print_json(&serde_json::json!({
                "uploaded": &report.uploaded,
                "failed": report.failure_summaries(),
            }))?;

            if !report.is_success() {
                anyhow::bail!(
                    "{} of {} uploads failed",
                    report.failed.len(),
                    report.total()
                );
            }
        }
        Commands::Validate {
            file,
            folder,
            content_type,
        } => {
            let upload = UploadFile::from_path(&file, content_type)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let report = validation_report(folder, &upload);
            print_json(&report)?;

            if !report.valid {
                anyhow::bail!("{} is not valid for {}", upload.file_name, folder);
            }
        }
        Commands::Folders => {
            print_json(&folder_summaries())?;
        }
    }

    Ok(())
}
