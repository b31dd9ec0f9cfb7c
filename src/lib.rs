//! rwatch: recursive filesystem watching
//!
//! Platform notification facilities watch single directories. rwatch keeps a
//! whole tree covered: it registers every directory below a root, registers
//! directories created later as their Create events arrive, and drops watches
//! on removed paths. Callers see one merged stream of per-path events, the same
//! shape a non-recursive watcher produces.
//!
//! ```no_run
//! use rwatch::RecursiveWatcher;
//!
//! let mut watcher = RecursiveWatcher::new()?;
//! watcher.add_recursive("/srv/data")?;
//!
//! for event in watcher.events().iter().take(10) {
//!     println!("{}", event);
//! }
//!
//! watcher.close();
//! # Ok::<(), rwatch::WatchError>(())
//! ```
//!
//! # Streams
//!
//! [`RecursiveWatcher::events`] and [`RecursiveWatcher::errors`] are
//! `crossbeam_channel` receivers. By default each forward is a synchronous
//! hand-off, so an undrained stream stalls the watcher; see
//! [`WatcherConfig::event_capacity`] to buffer instead.
//!
//! # Backends
//!
//! [`NotifyBackend`] wraps the platform facility through `notify`.
//! [`ManualBackend`] takes injected events and is meant for tests. Any type
//! implementing [`Backend`] can be plugged in with
//! [`RecursiveWatcher::with_backend`].
//!
//! # Logging
//!
//! Registration and lifecycle are traced through `tracing` at debug/trace
//! level. Installing a subscriber is left to the host.

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod watcher;

pub use backend::{Backend, ManualBackend, NotifyBackend};
pub use config::WatcherConfig;
pub use error::{Result, WatchError};
pub use event::{Event, Op};
pub use watcher::RecursiveWatcher;
