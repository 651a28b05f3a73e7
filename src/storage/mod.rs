
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::{RagError, Result};

/// On-disk staging area for uploaded documents.
///
/// Files are addressed by bare name; names carrying path components are
/// rejected so a caller can never escape the storage root.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open the storage rooted at `root`, creating the directory if needed.
    #[inline]
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        debug!("Using upload directory {}", root.display());
        Ok(Self { root })
    }

    /// Absolute path a stored file would live at.
    #[inline]
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Write `bytes` under `name`, replacing any previous content.
    #[inline]
    pub fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(name)?;
        fs::write(&path, bytes)?;
        info!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    #[inline]
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path(name)?;
        if !path.is_file() {
            return Err(RagError::FileNotFound(path));
        }
        Ok(fs::read(&path)?)
    }

    /// Remove a stored file. Asking for a name that was never stored is an
    /// error, not a no-op.
    #[inline]
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path(name)?;
        if !path.is_file() {
            return Err(RagError::FileNotFound(path));
        }
        fs::remove_file(&path)?;
        info!("Deleted {}", path.display());
        Ok(())
    }

    /// Names of stored PDF files, sorted for stable ordering.
    #[inline]
    pub fn list_pdfs(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.to_ascii_lowercase().ends_with(".pdf") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RagError::InvalidArgument(
            "File name must not be empty".to_string(),
        ));
    }

    let mut components = Path::new(name).components();
    let is_bare_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if !is_bare_name {
        return Err(RagError::InvalidArgument(format!(
            "File name '{}' must not contain path components",
            name
        )));
    }

    Ok(())
}
