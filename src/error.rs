//! Error type shared by the watcher, its backends, and the error stream.

use std::io;
use std::path::PathBuf;

/// Errors produced by watch registration, traversal, and the primitive backend.
///
/// The same type travels on the watcher's error stream, so every variant is
/// `Send` and owns its data.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The primitive watch service could not be opened
    #[error("watch service unavailable: {0}")]
    ServiceUnavailable(#[source] notify::Error),

    /// Registration target does not exist
    #[error("no such path: {0}")]
    PathNotFound(PathBuf),

    /// Deregistration target is not in the watch set
    #[error("path is not watched: {0}")]
    NotWatched(PathBuf),

    /// Traversal with symlink following re-entered one of its ancestors
    #[error("symlink loop at {path} (ancestor: {ancestor})")]
    SymlinkLoop { path: PathBuf, ancestor: PathBuf },

    /// Any other directory traversal failure
    #[error("cannot walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// I/O failure on a specific path
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error reported by the OS notification facility, passed through as-is
    #[error(transparent)]
    Notify(#[from] notify::Error),

    /// Error raised by a manual backend or injected by its owner
    #[error("{0}")]
    Injected(String),

    /// The watcher (or its backend) has already been closed
    #[error("watcher is closed")]
    Closed,
}

impl WatchError {
    /// Whether this error means "the path does not exist".
    pub fn is_not_found(&self) -> bool {
        match self {
            WatchError::PathNotFound(_) => true,
            WatchError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            WatchError::Walk { source, .. } => source
                .io_error()
                .is_some_and(|e| e.kind() == io::ErrorKind::NotFound),
            WatchError::Notify(e) => match &e.kind {
                notify::ErrorKind::PathNotFound => true,
                notify::ErrorKind::Io(err) => err.kind() == io::ErrorKind::NotFound,
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether this error means "the path was not registered".
    pub fn is_not_watched(&self) -> bool {
        match self {
            WatchError::NotWatched(_) => true,
            WatchError::Notify(e) => matches!(e.kind, notify::ErrorKind::WatchNotFound),
            _ => false,
        }
    }

    /// Convert a walkdir failure, lifting loop detection into its own variant.
    pub(crate) fn from_walk(root: &std::path::Path, err: walkdir::Error) -> Self {
        if let Some(ancestor) = err.loop_ancestor() {
            return WatchError::SymlinkLoop {
                path: err.path().map(PathBuf::from).unwrap_or_else(|| root.to_path_buf()),
                ancestor: ancestor.to_path_buf(),
            };
        }
        WatchError::Walk {
            path: err.path().map(PathBuf::from).unwrap_or_else(|| root.to_path_buf()),
            source: err,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = WatchError> = std::result::Result<T, E>;
