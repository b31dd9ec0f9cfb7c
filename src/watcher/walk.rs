//! Tree walk that registers every directory under a root.

use crate::backend::Backend;
use crate::config::WatcherConfig;
use crate::error::{Result, WatchError};
use std::path::Path;
use tracing::trace;
use walkdir::WalkDir;

/// Register `root` and every directory below it with `backend`.
///
/// Depth-first, parents before children. Files are skipped: watching their
/// directory already reports them. Unless `config.follow_symlinks` is set,
/// symlinks are never entered, the root included. Stops at the first
/// traversal or registration error; directories registered before it stay
/// registered.
///
/// Returns the number of directories registered.
pub(crate) fn watch_recursive<B>(backend: &B, root: &Path, config: &WatcherConfig) -> Result<usize>
where
    B: Backend + ?Sized,
{
    let walker = WalkDir::new(root)
        .follow_links(config.follow_symlinks)
        .follow_root_links(config.follow_symlinks);

    let mut registered = 0;
    for entry in walker {
        let entry = entry.map_err(|e| WatchError::from_walk(root, e))?;
        if entry.file_type().is_dir() {
            backend.add(entry.path())?;
            registered += 1;
        }
    }

    trace!(root = %root.display(), registered, "recursive registration done");
    Ok(registered)
}
