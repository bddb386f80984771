//! File upload command.

use std::path::PathBuf;

use docdash::{Dashboard, UploadFile, UploadItem, UploadPhase};
use log::info;

use super::CommandError;

pub fn format_item(item: &UploadItem) -> String {
    let mut line = format!(
        "{:<32} {:>10}  {:<9} {:>3}%",
        item.file_name,
        item.display_size(),
        item.phase.to_string(),
        item.progress_percent()
    );
    if let Some(job) = &item.job {
        line.push_str(&format!("  job #{} {}", job.id, job.status));
    }
    if let Some(error) = &item.last_error {
        line.push_str(&format!("  ({})", error));
    }
    line
}

/// Uploads every file and prints progress until all of them are finished.
pub async fn run_upload(dashboard: &Dashboard, paths: &[PathBuf]) -> Result<(), CommandError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(UploadFile::from_path(path).await?);
    }

    let uploads = dashboard.uploads();
    let mut rx = uploads.subscribe();
    let requested = files.len();
    let ids = uploads.add_files(files);
    if ids.is_empty() {
        return Err(CommandError::Unfinished(
            "None of the given files is a supported document type".to_string(),
        ));
    }
    info!("Uploading {} of {} files", ids.len(), requested);

    loop {
        let snapshot = rx.borrow_and_update().clone();
        for item in &snapshot.items {
            println!("{}", format_item(item));
        }
        if snapshot.all_complete {
            break;
        }
        println!();
        if rx.changed().await.is_err() {
            return Err(CommandError::Unfinished(
                "Upload tracking stopped before all files finished".to_string(),
            ));
        }
    }

    let failed = uploads
        .items()
        .iter()
        .filter(|item| item.phase == UploadPhase::Failed)
        .count();
    if failed > 0 {
        return Err(CommandError::Unfinished(format!(
            "{} of {} uploads failed",
            failed,
            ids.len()
        )));
    }
    println!("All uploads processed.");
    Ok(())
}
