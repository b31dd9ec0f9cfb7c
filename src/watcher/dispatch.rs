//! Dispatch loop: keeps the watch set in step with the tree and forwards events.

use super::walk;
use crate::backend::Backend;
use crate::config::WatcherConfig;
use crate::error::WatchError;
use crate::event::Event;
use crossbeam_channel::{never, select, Receiver, Select, Sender, TryRecvError, TrySendError};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// One ready source per loop iteration.
enum Step {
    Event(Event),
    Error(WatchError),
    EventsClosed,
    ErrorsClosed,
    Shutdown,
}

pub(crate) struct Dispatcher<B: Backend> {
    pub(crate) backend: Arc<B>,
    pub(crate) config: WatcherConfig,
    pub(crate) events_out: Sender<Event>,
    pub(crate) errors_out: Sender<WatchError>,
    /// Disconnects when the handle drops its sender
    pub(crate) shutdown: Receiver<()>,
}

impl<B: Backend> Dispatcher<B> {
    /// Run until shutdown is observed, then close the backend.
    ///
    /// Both output senders are dropped on return, which closes the caller's
    /// streams.
    pub(crate) fn run(self) {
        let mut events_in = self.backend.events();
        let mut errors_in = self.backend.errors();

        loop {
            let step = select! {
                recv(self.shutdown) -> _ => Step::Shutdown,
                recv(events_in) -> msg => msg.map_or(Step::EventsClosed, Step::Event),
                recv(errors_in) -> msg => msg.map_or(Step::ErrorsClosed, Step::Error),
            };

            match step {
                Step::Event(event) => {
                    if !self.maintain(&event) || !self.forward(&self.events_out, event) {
                        break;
                    }
                }
                Step::Error(error) => {
                    if !self.forward(&self.errors_out, error) {
                        break;
                    }
                }
                Step::EventsClosed => {
                    debug!("backend event stream disconnected");
                    events_in = never();
                }
                Step::ErrorsClosed => {
                    debug!("backend error stream disconnected");
                    errors_in = never();
                }
                Step::Shutdown => break,
            }
        }

        self.backend.close();
        debug!("dispatch loop stopped");
    }

    /// Update the watch set for `event`. Returns false once shutdown is seen.
    ///
    /// The event's flags say what happened, not what the path is now, so the
    /// path is stat'ed fresh. A path that can no longer be stat'ed, or any
    /// remove, is unwatched unconditionally: a deleted directory cannot be
    /// told apart from a deleted file.
    fn maintain(&self, event: &Event) -> bool {
        let stat = fs::metadata(&event.path);

        if let Ok(meta) = &stat {
            if meta.is_dir() && event.is_create() {
                match walk::watch_recursive(&*self.backend, &event.path, &self.config) {
                    Ok(count) => {
                        debug!(path = %event.path.display(), count, "watching new directory tree");
                    }
                    Err(error) => {
                        warn!(path = %event.path.display(), %error, "cannot watch new directory tree");
                        if !self.forward(&self.errors_out, error) {
                            return false;
                        }
                    }
                }
            }
        }

        if stat.is_err() || event.is_remove() {
            self.unwatch(&event.path);
        }

        true
    }

    /// Best-effort removal; the path is often not watched at all.
    fn unwatch(&self, path: &Path) {
        match self.backend.remove(path) {
            Ok(()) => debug!(path = %path.display(), "watch dropped"),
            Err(error) if error.is_not_watched() => {
                trace!(path = %path.display(), "nothing to unwatch");
            }
            Err(error) => {
                debug!(path = %path.display(), %error, "best-effort unwatch failed");
            }
        }
    }

    /// Hand `item` to the caller, blocking until it is received.
    ///
    /// Returns false if shutdown was requested first; nothing is delivered
    /// after that point. Shutdown is checked before every send attempt, so it
    /// wins whenever both are ready.
    fn forward<T>(&self, out: &Sender<T>, mut item: T) -> bool {
        loop {
            if self.shutdown_requested() {
                return false;
            }
            match out.try_send(item) {
                Ok(()) => return true,
                Err(TrySendError::Disconnected(_)) => return false,
                Err(TrySendError::Full(back)) => item = back,
            }

            // Park until a receiver shows up or shutdown is signalled
            let mut sel = Select::new();
            sel.send(out);
            sel.recv(&self.shutdown);
            sel.ready();
        }
    }

    fn shutdown_requested(&self) -> bool {
        matches!(self.shutdown.try_recv(), Err(TryRecvError::Disconnected))
    }
}
