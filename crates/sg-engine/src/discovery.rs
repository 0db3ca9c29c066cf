//! Input discovery

use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};

/// Regular files in `dir` with `extension`, sorted by name, at most `max_files`
pub fn discover(dir: &Path, extension: &str, max_files: usize) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| EngineError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(dir, e))?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if files.len() > max_files {
        tracing::info!("Found {} files, keeping the first {}", files.len(), max_files);
        files.truncate(max_files);
    }
    tracing::info!("Found {} HTML files to process.", files.len());
    Ok(files)
}

/// File name used for the document node of `path`
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
