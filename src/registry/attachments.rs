use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::layout::RegistryLayout;
use crate::{Error, Result};

/// Resolve a user-supplied attachment path against the invoker's working
/// directory.
///
/// `./key.pem` and `key.pem` both become `<cwd>/key.pem`; absolute paths are
/// returned unchanged.
pub fn resolve_attachment(invoker_cwd: &Path, raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("./") {
        invoker_cwd.join(rest)
    } else if Path::new(raw).is_absolute() {
        PathBuf::from(raw)
    } else {
        invoker_cwd.join(raw)
    }
}

/// Resolve every attachment, keeping their order.
pub fn resolve_attachments<S: AsRef<str>>(invoker_cwd: &Path, raw: &[S]) -> Vec<PathBuf> {
    raw.iter()
        .map(|a| resolve_attachment(invoker_cwd, a.as_ref()))
        .collect()
}

/// Private storage directory of one connection.
pub struct AttachmentStore {
    dir: PathBuf,
    record_file: String,
}

impl AttachmentStore {
    /// Store for the named connection within a registry layout.
    pub fn for_connection(layout: &RegistryLayout, name: &str) -> Self {
        Self {
            dir: layout.connection_dir(name),
            record_file: name.to_string(),
        }
    }

    /// Get the storage directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory. An existing directory is fine.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::StorageCreate {
            path: self.dir.clone(),
            source: e,
        })
    }

    /// Path an attachment is stored under: its base name inside the directory.
    pub fn stored_path(&self, attachment: &Path) -> Result<PathBuf> {
        let file_name = attachment.file_name().ok_or_else(|| Error::AttachmentCopy {
            path: attachment.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        })?;

        if file_name == self.record_file.as_str() {
            return Err(Error::AttachmentCopy {
                path: attachment.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "file name collides with the connection record",
                ),
            });
        }

        Ok(self.dir.join(file_name))
    }

    /// Copy attachments into the storage directory.
    ///
    /// Every source is checked before anything is copied, so a missing file
    /// leaves the directory untouched. Attachments sharing a base name
    /// overwrite each other, last one wins. A source that already is its
    /// stored copy is left in place.
    pub fn store(&self, attachments: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut targets = Vec::with_capacity(attachments.len());
        let mut in_place = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let meta = std::fs::metadata(attachment).map_err(|e| Error::AttachmentCopy {
                path: attachment.clone(),
                source: e,
            })?;
            if !meta.is_file() {
                return Err(Error::AttachmentCopy {
                    path: attachment.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "not a regular file",
                    ),
                });
            }
            let target = self.stored_path(attachment)?;
            in_place.push(is_same_file(attachment, &target)?);
            targets.push(target);
        }

        self.ensure_dir()?;

        for ((source, target), in_place) in attachments.iter().zip(&targets).zip(in_place) {
            if in_place {
                trace!(path = %target.display(), "attachment already stored");
                continue;
            }
            trace!(source = %source.display(), target = %target.display(), "copying attachment");
            std::fs::copy(source, target).map_err(|e| Error::AttachmentCopy {
                path: source.clone(),
                source: e,
            })?;
        }

        debug!(dir = %self.dir.display(), count = targets.len(), "attachments stored");
        Ok(targets)
    }

    /// Stored attachment files, sorted, excluding the connection record.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| Error::FileRead {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_name() == self.record_file.as_str() {
                continue;
            }
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Whether `target` exists and resolves to the same file as `source`.
/// Copying a file onto itself truncates it.
fn is_same_file(source: &Path, target: &Path) -> Result<bool> {
    if !target.exists() {
        return Ok(false);
    }
    let canonical = |path: &Path| {
        std::fs::canonicalize(path).map_err(|e| Error::AttachmentCopy {
            path: path.to_path_buf(),
            source: e,
        })
    };
    Ok(canonical(source)? == canonical(target)?)
}
