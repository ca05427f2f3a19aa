//! Dataset acquisition and discovery.
//!
//! Each use case ships as a fixed-name zip archive. If the working directory
//! already holds the expected inputs they are reused as-is; otherwise the
//! archive is extracted, downloading it first from the configured dataset
//! source when it is absent locally. Any fetch or extract failure is a fatal
//! `MissingDataset`. Directory creation is idempotent throughout.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::cases::CaseSpec;
use crate::config::Settings;
use crate::error::PipelineError;

use super::files::FileList;

/// Input file lists discovered for one use case.
#[derive(Debug, Clone, Default)]
pub struct CaseInputs {
    /// Segmentation volumes, or meshes for mesh-input cases.
    pub subjects: FileList,
    /// Paired raw images, when the dataset ships a second modality.
    pub images: FileList,
}

/// Ensure the working directory exists and holds the dataset, then discover
/// the input lists. Returns the working directory path.
pub async fn acquire(
    case: &CaseSpec,
    settings: &Settings,
    with_images: bool,
    prepped: bool,
) -> Result<(PathBuf, CaseInputs), PipelineError> {
    let working = settings.output_root.join(case.working_dir);
    tokio::fs::create_dir_all(&working).await?;

    // Reuse a previously extracted tree when it already has the inputs.
    let mut inputs = discover(case, &working, with_images, prepped)?;
    if !inputs.subjects.is_empty() {
        debug!(count = inputs.subjects.len(), "dataset already extracted");
        return Ok((working, inputs));
    }

    let archive = settings.output_root.join(case.archive);
    if !archive.exists() {
        info!(archive = case.archive, "archive not found locally, downloading");
        download(&settings.dataset_url, case.archive, &archive).await?;
    }

    extract(&archive, &working).await?;

    inputs = discover(case, &working, with_images, prepped)?;
    if inputs.subjects.is_empty() {
        return Err(PipelineError::MissingDataset {
            archive: case.archive.to_string(),
            reason: format!("no input files matching '{}' after extraction", case.seg_glob),
        });
    }
    Ok((working, inputs))
}

/// Discover the sorted input lists for a use case.
pub fn discover(
    case: &CaseSpec,
    working: &Path,
    with_images: bool,
    prepped: bool,
) -> Result<CaseInputs, PipelineError> {
    let subject_glob = if prepped { case.prepped_glob } else { case.seg_glob };
    let subjects = FileList::from_glob(&working.join(subject_glob).to_string_lossy())?;

    let images = match case.image_glob {
        Some(pattern) if with_images && !prepped => {
            FileList::from_glob(&working.join(pattern).to_string_lossy())?
        }
        _ => FileList::default(),
    };

    Ok(CaseInputs { subjects, images })
}

/// Download `<base_url>/<archive>` to `dest`, staging through a tempfile so a
/// failed transfer never leaves a truncated archive behind.
async fn download(base_url: &str, archive: &str, dest: &Path) -> Result<(), PipelineError> {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), archive);

    let missing = |reason: String| PipelineError::MissingDataset {
        archive: archive.to_string(),
        reason,
    };

    let response = reqwest::get(&url)
        .await
        .map_err(|e| missing(e.to_string()))?
        .error_for_status()
        .map_err(|e| missing(e.to_string()))?;

    let staging_dir = dest.parent().unwrap_or(Path::new("."));
    let staged = tempfile::NamedTempFile::new_in(staging_dir).map_err(|e| missing(e.to_string()))?;
    let staged_path = staged.path().to_path_buf();

    let mut file = tokio::fs::File::create(&staged_path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| missing(e.to_string()))?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    staged.persist(dest).map_err(|e| missing(e.to_string()))?;
    info!(%url, dest = %dest.display(), "dataset downloaded");
    Ok(())
}

/// Extract a zip archive into the working directory.
async fn extract(archive: &Path, working: &Path) -> Result<(), PipelineError> {
    let archive = archive.to_path_buf();
    let working = working.to_path_buf();
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // zip is a synchronous reader; keep it off the async runtime.
    let extract_dir = working.clone();
    tokio::task::spawn_blocking(move || -> Result<(), PipelineError> {
        let file = std::fs::File::open(&archive).map_err(|e| PipelineError::MissingDataset {
            archive: name.clone(),
            reason: e.to_string(),
        })?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| PipelineError::MissingDataset {
            archive: name.clone(),
            reason: e.to_string(),
        })?;
        zip.extract(&extract_dir).map_err(|e| PipelineError::MissingDataset {
            archive: name.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    })
    .await
    .map_err(|e| PipelineError::MissingDataset {
        archive: String::new(),
        reason: e.to_string(),
    })??;

    info!(working = %working.display(), "archive extracted");
    Ok(())
}
