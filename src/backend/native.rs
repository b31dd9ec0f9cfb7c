//! OS-backed primitive built on `notify`.

use super::Backend;
use crate::error::{Result, WatchError};
use crate::event::{Event, Op};
use crossbeam_channel::{self as channel, Receiver};
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Registration state.
///
/// `notify` needs `&mut` access to register paths, so the watcher and the
/// watch set share one lock. The lock is never held while events are delivered.
struct State {
    watcher: Option<RecommendedWatcher>,
    watched: BTreeSet<PathBuf>,
}

/// Platform watch primitive, registering every path with
/// [`RecursiveMode::NonRecursive`].
pub struct NotifyBackend {
    state: Mutex<State>,
    events_rx: Receiver<Event>,
    errors_rx: Receiver<WatchError>,
}

impl NotifyBackend {
    /// Open the platform notification facility.
    ///
    /// # Errors
    /// [`WatchError::ServiceUnavailable`] when the OS refuses a new watcher
    /// instance (e.g. inotify instance limit reached).
    pub fn new() -> Result<Self> {
        // Unbounded: the OS callback must never block
        let (events_tx, events_rx) = channel::unbounded();
        let (errors_tx, errors_rx) = channel::unbounded();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for event in convert_notify_event(event) {
                        if events_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Err(error) => {
                    let _ = errors_tx.send(WatchError::Notify(error));
                }
            }
        })
        .map_err(WatchError::ServiceUnavailable)?;

        debug!("opened notify backend");

        Ok(Self {
            state: Mutex::new(State {
                watcher: Some(watcher),
                watched: BTreeSet::new(),
            }),
            events_rx,
            errors_rx,
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for NotifyBackend {
    fn add(&self, path: &Path) -> Result<()> {
        let path = absolute(path)?;
        let mut state = self.lock();
        let watcher = state.watcher.as_mut().ok_or(WatchError::Closed)?;

        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|e| classify_watch_error(&path, e))?;

        trace!(path = %path.display(), "watch added");
        state.watched.insert(path);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let path = absolute(path)?;
        let mut state = self.lock();
        let State { watcher, watched } = &mut *state;
        let watcher = watcher.as_mut().ok_or(WatchError::Closed)?;

        // The OS may already have dropped the watch (deleted directory), so the
        // set entry goes regardless of what unwatch reports.
        let was_watched = watched.remove(&path);

        match watcher.unwatch(&path) {
            Ok(()) => {
                trace!(path = %path.display(), "watch removed");
                Ok(())
            }
            Err(e) if matches!(e.kind, notify::ErrorKind::WatchNotFound) => {
                if was_watched {
                    trace!(path = %path.display(), "watch already released by the OS");
                }
                Err(WatchError::NotWatched(path))
            }
            Err(e) => Err(WatchError::Notify(e)),
        }
    }

    fn watch_list(&self) -> Vec<PathBuf> {
        self.lock().watched.iter().cloned().collect()
    }

    fn events(&self) -> Receiver<Event> {
        self.events_rx.clone()
    }

    fn errors(&self) -> Receiver<WatchError> {
        self.errors_rx.clone()
    }

    fn close(&self) {
        let mut state = self.lock();
        // Dropping the watcher releases the OS handles and the callback's
        // senders, which disconnects both streams.
        if state.watcher.take().is_some() {
            debug!(watches = state.watched.len(), "closing notify backend");
        }
        state.watched.clear();
    }
}

/// Resolve `path` against the current directory the same way `notify` does,
/// so the watch set lines up with the paths carried by events.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| WatchError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn classify_watch_error(path: &Path, error: notify::Error) -> WatchError {
    match &error.kind {
        notify::ErrorKind::PathNotFound => WatchError::PathNotFound(path.to_path_buf()),
        notify::ErrorKind::Io(err) if err.kind() == io::ErrorKind::NotFound => {
            WatchError::PathNotFound(path.to_path_buf())
        }
        _ => WatchError::Notify(error),
    }
}

/// Map a `notify` event onto one [`Event`] per affected path.
///
/// Rename halves are reported separately by the platform (`From` then `To`);
/// the paired `Both` notification repeats them and is dropped, as are access
/// notifications.
fn convert_notify_event(event: notify::Event) -> Vec<Event> {
    let op = match event.kind {
        EventKind::Create(_) => Op::CREATE,
        EventKind::Modify(ModifyKind::Metadata(_)) => Op::CHMOD,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Op::CREATE,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => return Vec::new(),
        EventKind::Modify(ModifyKind::Name(_)) => Op::RENAME,
        EventKind::Modify(_) => Op::WRITE,
        EventKind::Remove(_) => Op::REMOVE,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .map(|path| Event::new(path, op))
        .collect()
}
