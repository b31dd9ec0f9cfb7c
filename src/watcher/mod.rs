//! Recursive watcher on top of a non-recursive [`Backend`].
//!
//! The watcher registers every directory of a tree with the backend and runs
//! a dispatch thread that keeps that registration current: a directory created
//! under a watched one gets its whole subtree registered, a removed path gets
//! unregistered. Every backend event is forwarded unchanged.
//!
//! # Threading Design
//!
//! One dispatch thread per watcher. It waits on three sources with
//! `crossbeam_channel::select!`: backend events, backend errors, and the
//! shutdown signal. The caller's `add`/`add_recursive`/`remove` run on the
//! caller's thread and go straight to the backend, which serializes
//! registration internally.
//!
//! # Backpressure
//!
//! With the default zero capacity, each forward blocks until the caller
//! receives it. While the caller is not draining [`RecursiveWatcher::events`],
//! the dispatch thread processes nothing else, including Create events for new
//! directories. Drain both streams, or configure a capacity.
//!
//! # Known race
//!
//! A file written into a new directory before its Create event is processed
//! is not reported: the directory had no watch yet. Coverage converges once the
//! Create event is handled.

mod dispatch;
mod walk;

use crate::backend::{Backend, NotifyBackend};
use crate::config::WatcherConfig;
use crate::error::{Result, WatchError};
use crate::event::Event;
use crossbeam_channel::{self as channel, Receiver, Sender};
use dispatch::Dispatcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Recursive filesystem watcher.
///
/// Created with [`new`](Self::new) (platform backend) or
/// [`with_backend`](Self::with_backend); released with [`close`](Self::close)
/// or on drop.
pub struct RecursiveWatcher<B: Backend = NotifyBackend> {
    backend: Arc<B>,
    config: WatcherConfig,
    events: Receiver<Event>,
    errors: Receiver<WatchError>,
    /// Dropping the sender is the shutdown signal; `None` once closed
    shutdown: Option<Sender<()>>,
    dispatch_thread: Option<thread::JoinHandle<()>>,
}

impl RecursiveWatcher<NotifyBackend> {
    /// Open a watcher on the platform notification facility.
    ///
    /// # Errors
    /// [`WatchError::ServiceUnavailable`] if the facility cannot be opened.
    pub fn new() -> Result<Self> {
        Self::with_config(WatcherConfig::default())
    }

    pub fn with_config(config: WatcherConfig) -> Result<Self> {
        Self::with_backend(NotifyBackend::new()?, config)
    }
}

impl<B: Backend> RecursiveWatcher<B> {
    /// Build a watcher over any backend and start its dispatch thread.
    pub fn with_backend(backend: B, config: WatcherConfig) -> Result<Self> {
        let backend = Arc::new(backend);
        let (events_tx, events_rx) = channel::bounded(config.event_capacity);
        let (errors_tx, errors_rx) = channel::bounded(config.error_capacity);
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);

        let dispatcher = Dispatcher {
            backend: Arc::clone(&backend),
            config: config.clone(),
            events_out: events_tx,
            errors_out: errors_tx,
            shutdown: shutdown_rx,
        };

        let dispatch_thread = thread::Builder::new()
            .name("rwatch-dispatch".to_string())
            .spawn(move || dispatcher.run())
            .map_err(|e| WatchError::ServiceUnavailable(notify::Error::io(e)))?;

        debug!(?config, "recursive watcher started");

        Ok(Self {
            backend,
            config,
            events: events_rx,
            errors: errors_rx,
            shutdown: Some(shutdown_tx),
            dispatch_thread: Some(dispatch_thread),
        })
    }

    /// Start watching `path` itself (non-recursively).
    pub fn add(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_open()?;
        self.backend.add(path.as_ref())
    }

    /// Start watching `path` and every directory below it.
    ///
    /// Stops at the first error; directories registered before it stay
    /// registered.
    pub fn add_recursive(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_open()?;
        let path = path.as_ref();
        let count = walk::watch_recursive(&*self.backend, path, &self.config)?;
        debug!(path = %path.display(), count, "recursive watch added");
        Ok(())
    }

    /// Stop watching `path` itself. Watches on its descendants are kept.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_open()?;
        self.backend.remove(path.as_ref())
    }

    /// Sorted snapshot of the watched paths.
    pub fn watch_list(&self) -> Vec<PathBuf> {
        self.backend.watch_list()
    }

    /// Stream of events, closed once the watcher is closed.
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Stream of errors, closed once the watcher is closed.
    pub fn errors(&self) -> &Receiver<WatchError> {
        &self.errors
    }

    /// The underlying per-path primitive.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Configuration the watcher was created with.
    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// True once [`close`](Self::close) has run, directly or through `Drop`.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_none()
    }

    /// Stop the dispatch thread, release every watch, and close both streams.
    ///
    /// Blocks until the dispatch thread has exited. Calling it again is a
    /// no-op.
    pub fn close(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        drop(shutdown);

        if let Some(handle) = self.dispatch_thread.take() {
            if handle.join().is_err() {
                warn!("dispatch thread panicked; closing backend directly");
                self.backend.close();
            }
        }
        debug!("recursive watcher closed");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(WatchError::Closed)
        } else {
            Ok(())
        }
    }
}

impl<B: Backend> Drop for RecursiveWatcher<B> {
    fn drop(&mut self) {
        self.close();
    }
}
