//! Input discovery: list the PDFs to process and load them.
//!
//! Directory enumeration order differs between platforms and filesystems,
//! so inputs are sorted by file name. Two runs over the same directory then
//! process (and log) documents in the same order.

use crate::error::{ItemError, PipelineError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// List every `*.pdf` file (extension matched case-insensitively) directly
/// inside `dir`, sorted by file name.
///
/// Artifacts are keyed by [`base_name`], so two files with the same stem
/// (`a.pdf`, `a.PDF`) would share them. Only the first in file-name order
/// is kept; the others are logged and left out.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let unreadable = |source| PipelineError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_file() && is_pdf_name(&path) {
            pdfs.push(path);
        }
    }

    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut stems = HashSet::new();
    pdfs.retain(|path| {
        let unique = stems.insert(base_name(path));
        if !unique {
            warn!(
                "Ignoring {}: another input has the same name {:?}",
                path.display(),
                base_name(path)
            );
        }
        unique
    });

    debug!("Found {} PDF(s) in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

fn is_pdf_name(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// The document's base name: the file stem, used to derive artifact paths.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Read a PDF into memory, validating the `%PDF` magic bytes.
pub async fn read_pdf(path: &Path) -> Result<Vec<u8>, ItemError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ItemError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

    if !bytes.starts_with(b"%PDF") {
        return Err(ItemError::NotAPdf {
            path: path.to_path_buf(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}
