//! In-process primitive driven by its owner.

use super::Backend;
use crate::error::{Result, WatchError};
use crate::event::Event;
use crossbeam_channel::{self as channel, Receiver, Sender};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    watched: BTreeSet<PathBuf>,
    failing: HashSet<PathBuf>,
    add_calls: Vec<PathBuf>,
    remove_calls: Vec<PathBuf>,
    events_tx: Option<Sender<Event>>,
    errors_tx: Option<Sender<WatchError>>,
}

/// Deterministic backend that never talks to the OS notification facility.
///
/// Events and errors are injected with [`push`](Self::push) and
/// [`push_error`](Self::push_error). Registration still checks that the path
/// exists, so watch-set behavior matches [`NotifyBackend`](super::NotifyBackend).
pub struct ManualBackend {
    state: Mutex<State>,
    events_rx: Receiver<Event>,
    errors_rx: Receiver<WatchError>,
}

impl Default for ManualBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualBackend {
    pub fn new() -> Self {
        let (events_tx, events_rx) = channel::unbounded();
        let (errors_tx, errors_rx) = channel::unbounded();
        Self {
            state: Mutex::new(State {
                events_tx: Some(events_tx),
                errors_tx: Some(errors_tx),
                ..State::default()
            }),
            events_rx,
            errors_rx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inject a synthetic event.
    pub fn push(&self, event: Event) -> Result<()> {
        let state = self.lock();
        let tx = state.events_tx.as_ref().ok_or(WatchError::Closed)?;
        tx.send(event).map_err(|_| WatchError::Closed)
    }

    /// Inject an asynchronous error.
    pub fn push_error(&self, error: WatchError) -> Result<()> {
        let state = self.lock();
        let tx = state.errors_tx.as_ref().ok_or(WatchError::Closed)?;
        tx.send(error).map_err(|_| WatchError::Closed)
    }

    /// Make every later `add(path)` fail.
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.lock().failing.insert(path.into());
    }

    /// Paths passed to `add`, in call order.
    pub fn add_calls(&self) -> Vec<PathBuf> {
        self.lock().add_calls.clone()
    }

    /// Paths passed to `remove`, in call order.
    pub fn remove_calls(&self) -> Vec<PathBuf> {
        self.lock().remove_calls.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().events_tx.is_none()
    }
}

impl Backend for ManualBackend {
    fn add(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if state.events_tx.is_none() {
            return Err(WatchError::Closed);
        }
        state.add_calls.push(path.to_path_buf());

        if state.failing.contains(path) {
            return Err(WatchError::Injected(format!(
                "add refused for {}",
                path.display()
            )));
        }

        match fs::metadata(path) {
            Ok(_) => {
                state.watched.insert(path.to_path_buf());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(WatchError::PathNotFound(path.to_path_buf()))
            }
            Err(source) => Err(WatchError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if state.events_tx.is_none() {
            return Err(WatchError::Closed);
        }
        state.remove_calls.push(path.to_path_buf());

        if state.watched.remove(path) {
            Ok(())
        } else {
            Err(WatchError::NotWatched(path.to_path_buf()))
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
        state.events_tx = None;
        state.errors_tx = None;
        state.watched.clear();
    }
}
