//! Watcher configuration.

/// Recursive watcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Follow symbolic links while walking a tree (default: false)
    ///
    /// Applies to the root of a walk as well: with following disabled, a
    /// symlink root registers nothing. When enabled, a link back into one of
    /// its own ancestors fails the walk with
    /// [`WatchError::SymlinkLoop`](crate::WatchError::SymlinkLoop).
    pub follow_symlinks: bool,
    /// Capacity of the event stream; 0 is a synchronous hand-off
    pub event_capacity: usize,
    /// Capacity of the error stream; 0 is a synchronous hand-off
    pub error_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            event_capacity: 0,
            error_capacity: 0,
        }
    }
}

impl WatcherConfig {
    /// Set whether tree walks follow symbolic links.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Buffer the event stream instead of handing off synchronously.
    ///
    /// Buffering lets the dispatch loop keep maintaining the watch set while
    /// the consumer is busy, at the cost of memory.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Buffer the error stream instead of handing off synchronously.
    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }
}
