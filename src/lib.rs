pub mod cli;
pub mod config;
pub mod executor;
pub mod layout;
pub mod plugin;
pub mod registry;

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Path errors
    #[error("cannot locate the registry root: {0}")]
    PathResolution(String),

    #[error("cannot determine the install directory: {0}")]
    InstallDir(#[source] std::io::Error),

    // Config errors
    #[error("failed to parse config {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    // Registry errors
    #[error("invalid connection name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("connection '{0}' does not exist")]
    ConnectionNotFound(String),

    #[error("failed to parse connection map {path}: {reason}")]
    MapParse { path: PathBuf, reason: String },

    #[error("failed to parse connection file {path}: {reason}")]
    RecordParse { path: PathBuf, reason: String },

    #[error("failed to serialize connection: {0}")]
    Serialize(String),

    #[error("failed to lock registry at {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Storage errors
    #[error("failed to create connection storage {path}: {source}")]
    StorageCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove connection storage {path}: {source}")]
    StorageRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to store attachment {path}: {source}")]
    AttachmentCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Plugin errors
    #[error("unknown plugin '{0}'")]
    UnknownPlugin(String),

    // Executor errors
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
