//! PDF text extraction and the content-addressed cache of extracted text.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Extracted text of one uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub filename: String,
    pub content: String,
}

impl LoadedDocument {
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Lowercase hex SHA-256 of the raw file bytes
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Extract text page by page, each page under a `--- Page N ---` header.
///
/// Pages whose text cannot be decoded are skipped with a warning.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| LlmError::input(format!("Could not read PDF: {e}")))?;

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(&format!("\n--- Page {page_number} ---\n{page_text}\n"));
            }
            Err(e) => {
                warn!(page = page_number, error = %e, "could not extract page text");
            }
        }
    }

    Ok(text)
}

/// On-disk cache of extracted text keyed by [`content_hash`]
#[derive(Debug, Clone)]
pub struct DocumentCache {
    dir: PathBuf,
}

impl DocumentCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.json"))
    }

    /// Written to a temp file in the cache directory, then renamed into place,
    /// so readers never see a partial entry
    pub fn store(&self, hash: &str, document: &LoadedDocument) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let encoded = serde_json::to_vec_pretty(document)?;
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(&encoded)?;
        staged.persist(self.entry_path(hash)).map_err(|e| e.error)?;
        debug!(hash, filename = %document.filename, "cached document text");
        Ok(())
    }

    pub fn load(&self, hash: &str) -> Result<Option<LoadedDocument>> {
        let path = self.entry_path(hash);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

/// Turns uploaded bytes into a [`LoadedDocument`], going through the cache
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    cache: DocumentCache,
}

impl DocumentProcessor {
    pub fn new(cache: DocumentCache) -> Self {
        Self { cache }
    }

    /// Returns the document and whether it came from the cache
    pub fn process(&self, filename: &str, bytes: &[u8]) -> Result<(LoadedDocument, bool)> {
        let hash = content_hash(bytes);

        match self.cache.load(&hash) {
            Ok(Some(cached)) => {
                info!(filename, "loaded from cache");
                let document = LoadedDocument {
                    filename: filename.to_string(),
                    content: cached.content,
                };
                return Ok((document, true));
            }
            Ok(None) => {}
            // Unreadable entries are rebuilt and overwritten below
            Err(e) => warn!(hash, error = %e, "unreadable cache entry, extracting again"),
        }

        let content = extract_text(bytes)?;
        if content.trim().is_empty() {
            return Err(LlmError::input(format!(
                "No text could be extracted from {filename}"
            )));
        }

        let document = LoadedDocument {
            filename: filename.to_string(),
            content,
        };
        self.cache.store(&hash, &document)?;
        Ok((document, false))
    }

    pub fn process_file(&self, path: &Path) -> Result<(LoadedDocument, bool)> {
        let bytes = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.process(&filename, &bytes)
    }
}
