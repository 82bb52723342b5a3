use fs2::FileExt;
use rustc_hash::FxHashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use toml_edit::{value, DocumentMut, Item, Table};
use tracing::{debug, instrument, trace};

use super::attachments::AttachmentStore;
use super::record::{
    map_from_toml, record_from_toml, record_to_toml, validate_name, ConnectionDetails,
    ConnectionRecord, ConnectionSpec,
};
use crate::layout::RegistryLayout;
use crate::{Error, Result};

/// The durable name -> connection index plus per-connection storage.
pub struct Registry {
    layout: RegistryLayout,
}

impl Registry {
    /// Create a registry rooted at the given layout. Nothing touches the disk
    /// until the first write.
    pub fn new(layout: RegistryLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    /// Create or replace a connection and store its attachments.
    ///
    /// The record file and the map are each replaced atomically, and the whole
    /// operation runs under the registry lock.
    #[instrument(skip(self, record), fields(name = %record.name))]
    pub fn upsert(&self, record: &ConnectionRecord) -> Result<ConnectionSpec> {
        record.validate()?;
        self.ensure_root()?;
        let _lock = RegistryLock::acquire(self.layout.lock_file())?;

        let store = AttachmentStore::for_connection(&self.layout, &record.name);
        store.store(&record.attachments)?;

        let spec = record.spec();
        let record_path = self.layout.record_file(&spec.name);
        write_atomic(&record_path, record_to_toml(&spec)?.as_bytes())?;
        debug!(path = %record_path.display(), "connection file written");

        let mut doc = self.load_map_document()?;
        doc.insert(spec.name.as_str(), Item::Table(spec_table(&spec)));
        write_atomic(self.layout.map_file(), doc.to_string().as_bytes())?;
        debug!(path = %self.layout.map_file().display(), "connection map updated");

        Ok(spec)
    }

    /// Find a connection in the map. A missing map and a missing entry both
    /// yield `None`.
    pub fn lookup(&self, name: &str) -> Result<Option<ConnectionSpec>> {
        let Some(mut map) = self.load_map()? else {
            trace!("no connection map yet");
            return Ok(None);
        };
        Ok(map.remove(name))
    }

    /// Whether the connection has a storage directory. This does not consult
    /// the map; use [`Registry::lookup`] for that.
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.layout.connection_dir(name).is_dir()
    }

    /// Every connection in the map, sorted by name.
    pub fn list(&self) -> Result<Vec<ConnectionSpec>> {
        let Some(map) = self.load_map()? else {
            return Ok(Vec::new());
        };
        let mut specs: Vec<ConnectionSpec> = map.into_values().collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    }

    /// Delete a connection's storage directory and its map entry.
    ///
    /// Returns whether anything was removed; removing an unknown name is not
    /// an error.
    #[instrument(skip(self))]
    pub fn remove(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        if !self.layout.root().exists() {
            return Ok(false);
        }
        let _lock = RegistryLock::acquire(self.layout.lock_file())?;
        let mut removed = false;

        let dir = self.layout.connection_dir(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| Error::StorageRemove {
                path: dir.clone(),
                source: e,
            })?;
            debug!(path = %dir.display(), "storage removed");
            removed = true;
        }

        if self.layout.map_file().exists() {
            let mut doc = self.load_map_document()?;
            if doc.remove(name).is_some() {
                write_atomic(self.layout.map_file(), doc.to_string().as_bytes())?;
                debug!("map entry removed");
                removed = true;
            }
        }

        Ok(removed)
    }

    /// Read a connection from its own record file, along with its stored
    /// attachments.
    pub fn describe(&self, name: &str) -> Result<Option<ConnectionDetails>> {
        validate_name(name)?;
        let path = self.layout.record_file(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let spec = record_from_toml(&content, &path)?;
        let store = AttachmentStore::for_connection(&self.layout, name);

        Ok(Some(ConnectionDetails {
            spec,
            storage: store.dir().to_path_buf(),
            attachments: store.list()?,
        }))
    }

    fn ensure_root(&self) -> Result<()> {
        let root = self.layout.root();
        std::fs::create_dir_all(root).map_err(|e| Error::StorageCreate {
            path: root.to_path_buf(),
            source: e,
        })
    }

    fn read_map_file(&self) -> Result<Option<String>> {
        let path = self.layout.map_file();
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(path)
            .map(Some)
            .map_err(|e| Error::FileRead {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn load_map(&self) -> Result<Option<FxHashMap<String, ConnectionSpec>>> {
        match self.read_map_file()? {
            Some(content) => map_from_toml(&content, self.layout.map_file()).map(Some),
            None => Ok(None),
        }
    }

    /// The map as an editable document, so comments and layout survive.
    fn load_map_document(&self) -> Result<DocumentMut> {
        let Some(content) = self.read_map_file()? else {
            return Ok(DocumentMut::new());
        };
        content
            .parse()
            .map_err(|e: toml_edit::TomlError| Error::MapParse {
                path: self.layout.map_file().to_path_buf(),
                reason: e.to_string(),
            })
    }
}

fn spec_table(spec: &ConnectionSpec) -> Table {
    let mut table = Table::new();
    table.insert("name", value(spec.name.as_str()));
    table.insert("plugin", value(spec.plugin.as_str()));
    table.insert("command", value(spec.command.as_str()));
    table
}

/// Exclusive lock on the registry, released on drop.
struct RegistryLock {
    file: File,
}

impl RegistryLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::Lock {
                path: path.to_path_buf(),
                source: e,
            })?;
        file.lock_exclusive().map_err(|e| Error::Lock {
            path: path.to_path_buf(),
            source: e,
        })?;
        trace!(path = %path.display(), "registry locked");
        Ok(Self { file })
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Write to a temp file next to `path`, then rename it into place.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let to_write_err = |e: std::io::Error| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    };
    let dir = path.parent().unwrap_or(Path::new("."));

    let mut builder = tempfile::Builder::new();
    builder.prefix(".tmp");
    // Keep the mode of the file being replaced
    if let Ok(meta) = std::fs::metadata(path) {
        builder.permissions(meta.permissions());
    }

    let mut tmp = builder.tempfile_in(dir).map_err(to_write_err)?;
    tmp.write_all(content).map_err(to_write_err)?;
    tmp.as_file().sync_all().map_err(to_write_err)?;
    tmp.persist(path).map_err(|e| to_write_err(e.error))?;
    Ok(())
}
