use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Connection map file name inside the registry root.
pub const MAP_FILENAME: &str = "connections.toml";

/// Lock file guarding registry writes.
pub const LOCK_FILENAME: &str = ".connections.lock";

/// Encapsulates the registry directory structure conventions.
///
/// Provides lazy-cached path accessors for the registry files:
/// - `connections.toml` - map of every connection
/// - `.connections.lock` - exclusive write lock
/// - `<name>/` - storage directory of one connection
/// - `<name>/<name>` - that connection's own record
#[derive(Debug)]
pub struct RegistryLayout {
    root: PathBuf,
    map_file: OnceCell<PathBuf>,
    lock_file: OnceCell<PathBuf>,
}

impl Clone for RegistryLayout {
    fn clone(&self) -> Self {
        Self::new(self.root.clone())
    }
}

impl RegistryLayout {
    /// Create a layout rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            map_file: OnceCell::new(),
            lock_file: OnceCell::new(),
        }
    }

    /// Layout for a program installed in `install_dir`.
    ///
    /// The registry lives in a `lib/connect` directory next to the install
    /// directory, so `/usr/local/bin` maps to `/usr/local/lib/connect`.
    pub fn from_install_dir(install_dir: &Path) -> Result<Self> {
        let prefix = install_dir.parent().ok_or_else(|| {
            Error::PathResolution(format!(
                "{} has no parent directory",
                install_dir.display()
            ))
        })?;
        Ok(Self::new(prefix.join("lib").join("connect")))
    }

    /// Layout derived from the location of the running executable.
    pub fn from_current_exe() -> Result<Self> {
        let exe = std::env::current_exe().map_err(Error::InstallDir)?;
        // Resolve symlinks so a linked binary still finds its real install tree
        let exe = std::fs::canonicalize(&exe).map_err(Error::InstallDir)?;
        let install_dir = exe.parent().ok_or_else(|| {
            Error::PathResolution(format!("{} has no parent directory", exe.display()))
        })?;
        Self::from_install_dir(install_dir)
    }

    /// Returns reference to the registry root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns reference to the connection map path.
    pub fn map_file(&self) -> &Path {
        self.map_file.get_or_init(|| self.root.join(MAP_FILENAME))
    }

    /// Returns reference to the lock file path.
    pub fn lock_file(&self) -> &Path {
        self.lock_file.get_or_init(|| self.root.join(LOCK_FILENAME))
    }

    /// Storage directory of a connection.
    pub fn connection_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Per-connection record file, `<root>/<name>/<name>`.
    pub fn record_file(&self, name: &str) -> PathBuf {
        self.connection_dir(name).join(name)
    }
}

/// Current working directory of the invoking process.
///
/// Relative attachment paths are resolved against this directory.
pub fn invoker_cwd() -> Result<PathBuf> {
    std::env::current_dir()
        .map_err(|e| Error::PathResolution(format!("cannot read working directory: {}", e)))
}
