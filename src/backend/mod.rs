//! Non-recursive per-path watch primitives.
//!
//! A [`Backend`] registers individual paths, never their descendants, and
//! reports changes on two streams: one for events, one for errors. The
//! recursive watcher builds directory-tree coverage on top of it.
//!
//! Two implementations ship with the crate:
//!
//! - [`NotifyBackend`]: the platform facility via `notify`
//!   (inotify, FSEvents, kqueue, ReadDirectoryChangesW)
//! - [`ManualBackend`]: an in-process primitive fed by its owner, for tests
//!   and hosts that source events themselves

mod manual;
mod native;

pub use manual::ManualBackend;
pub use native::NotifyBackend;

use crate::error::{Result, WatchError};
use crate::event::Event;
use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};

/// Per-path watch primitive.
///
/// Implementations must allow `add`/`remove` from any thread while events are
/// being delivered; the watcher calls them both from the caller's thread and
/// from its dispatch thread without extra locking.
pub trait Backend: Send + Sync + 'static {
    /// Start watching exactly `path` (non-recursively).
    fn add(&self, path: &Path) -> Result<()>;

    /// Stop watching exactly `path`.
    ///
    /// Returns [`WatchError::NotWatched`] when `path` is not registered.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Sorted snapshot of the registered paths.
    fn watch_list(&self) -> Vec<PathBuf>;

    /// Stream of change events for registered paths.
    fn events(&self) -> Receiver<Event>;

    /// Stream of asynchronous errors from the underlying facility.
    fn errors(&self) -> Receiver<WatchError>;

    /// Release every registration and disconnect both streams.
    ///
    /// Further `add`/`remove` calls fail with [`WatchError::Closed`].
    fn close(&self);
}
