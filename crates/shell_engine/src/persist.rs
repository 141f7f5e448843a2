use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use shell_logging::shell_debug;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::RenderedDocument;

pub const HTML_FILENAME: &str = "index.html";
pub const XHTML_FILENAME: &str = "index.xhtml";
pub const SUMMARY_FILENAME: &str = "session.ron";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{0:?} exists and is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to create output directory {dir:?}: {source}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Output directory holding the document the shell ended up showing plus the
/// summary of the session that produced it.
///
/// Only one document is kept. Saving an XHTML page after an HTML one removes
/// the stale `index.html` and vice versa.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Creates `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(PersistError::NotADirectory(dir)),
            Err(_) => fs::create_dir_all(&dir).map_err(|source| PersistError::CreateDir {
                dir: dir.clone(),
                source,
            })?,
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name a document is stored under, picked from its content type.
    pub fn document_filename(document: &RenderedDocument) -> &'static str {
        let essence = document
            .content_type
            .as_deref()
            .and_then(|value| value.split(';').next())
            .map(str::trim);
        match essence {
            Some(mime) if mime.eq_ignore_ascii_case("application/xhtml+xml") => XHTML_FILENAME,
            _ => HTML_FILENAME,
        }
    }

    pub fn save_document(&self, document: &RenderedDocument) -> Result<PathBuf, PersistError> {
        let name = Self::document_filename(document);
        let target = self.replace(name, &document.body)?;

        let stale = if name == HTML_FILENAME {
            XHTML_FILENAME
        } else {
            HTML_FILENAME
        };
        let stale = self.dir.join(stale);
        if stale.exists() {
            shell_debug!("Removing stale document {:?}", stale);
            fs::remove_file(&stale).map_err(|source| PersistError::Write {
                path: stale,
                source,
            })?;
        }
        Ok(target)
    }

    pub fn save_summary(&self, summary: &str) -> Result<PathBuf, PersistError> {
        self.replace(SUMMARY_FILENAME, summary.as_bytes())
    }

    /// Temp file plus rename, so readers never see a half-written file.
    fn replace(&self, name: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(name);
        let write_err = |source: io::Error| PersistError::Write {
            path: target.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(content).map_err(write_err)?;
        tmp.as_file_mut().sync_all().map_err(write_err)?;
        tmp.persist(&target).map_err(|err| write_err(err.error))?;
        Ok(target)
    }
}
