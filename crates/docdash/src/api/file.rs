//! File payloads selected for upload.

use std::path::Path;

use crate::error::{ApiError, UploadError};

/// Accepted document types: MIME type and the extensions that go with it.
const ACCEPTED_TYPES: &[(&str, &[&str])] = &[
    ("application/pdf", &["pdf"]),
    ("text/plain", &["txt"]),
    ("application/msword", &["doc", "docx"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &["docx"],
    ),
    ("application/vnd.ms-excel", &["xls", "xlsx"]),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &["xlsx"],
    ),
    ("application/vnd.ms-powerpoint", &["ppt", "pptx"]),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        &["pptx"],
    ),
    ("application/zip", &["zip", "rar", "tar", "gz"]),
    ("text/csv", &["csv"]),
];

/// A file selected by the user: name, size and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl UploadFile {
    /// Builds a payload from in-memory bytes, guessing the MIME type from the name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            name,
            bytes,
            mime_type,
        }
    }

    /// Reads a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ApiError::ReadFile {
                path: path.to_path_buf(),
                reason: "path has no file name".to_string(),
            })?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::ReadFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self::new(name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// True when either the guessed MIME type or the extension is accepted.
    pub fn is_supported(&self) -> bool {
        let by_mime = self
            .mime_type
            .as_deref()
            .is_some_and(|mime| ACCEPTED_TYPES.iter().any(|(accepted, _)| *accepted == mime));
        if by_mime {
            return true;
        }

        let Some(extension) = Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        else {
            return false;
        };
        ACCEPTED_TYPES
            .iter()
            .any(|(_, extensions)| extensions.contains(&extension.as_str()))
    }

    pub fn check_supported(&self) -> Result<(), UploadError> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(UploadError::Unsupported(self.name.clone()))
        }
    }
}

/// Formats a byte count as "0 Bytes", "1.5 KB", "2 MB" and so on.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
