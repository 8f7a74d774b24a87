//! Page-level document loading from folders of PDF files.
//!
//! A corrupt or unreadable file is logged and skipped; the batch never
//! aborts because of a single bad document.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::PipelineError;

/// One page of extracted text with its source metadata. Recreated on every
/// run; nothing about it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDocument {
    pub path: PathBuf,
    /// Originating folder category, e.g. "pdf_reports".
    pub folder: String,
    /// 1-based page number within the source file.
    pub page_number: usize,
    pub text: String,
}

/// Enumerate `*.pdf` files directly inside `folder` (non-recursive), sorted
/// by name so repeated runs see the same order.
pub fn discover_pdfs(folder: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        let is_pdf = path.is_file()
            && path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false);
        if is_pdf {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Extract one `PageDocument` per non-empty page of a PDF file.
///
/// pdf-extract returns the whole document as one string; form feed
/// characters (`\x0C`) separate pages when present.
pub fn load_pdf(path: &Path, folder: &str) -> Result<Vec<PageDocument>, PipelineError> {
    let bytes = fs::read(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| PipelineError::Extract {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let pages = text
        .split('\x0C')
        .map(str::trim)
        .enumerate()
        .filter(|(_, page_text)| !page_text.is_empty())
        .map(|(i, page_text)| PageDocument {
            path: path.to_path_buf(),
            folder: folder.to_string(),
            page_number: i + 1,
            text: page_text.to_string(),
        })
        .collect();

    Ok(pages)
}

/// Load every readable PDF across the given folders. Returns the documents
/// plus the number of files discovered per folder for operator logging.
pub fn load_folders(
    folders: &[PathBuf],
) -> Result<(Vec<PageDocument>, BTreeMap<String, usize>), PipelineError> {
    let mut documents = Vec::new();
    let mut files_per_folder = BTreeMap::new();

    for folder in folders {
        let category = folder
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| folder.display().to_string());

        if !folder.is_dir() {
            tracing::warn!("folder {} does not exist, skipping", folder.display());
            files_per_folder.insert(category, 0);
            continue;
        }

        let files = discover_pdfs(folder)?;
        files_per_folder.insert(category.clone(), files.len());

        for path in files {
            match load_pdf(&path, &category) {
                Ok(pages) => documents.extend(pages),
                Err(e) => {
                    tracing::error!("error loading {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok((documents, files_per_folder))
}
