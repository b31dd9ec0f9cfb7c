//! Filesystem events as seen by callers.
//!
//! An [`Event`] is a path plus an [`Op`] bitmask. Events are produced by a
//! backend and forwarded to the caller untouched; the watcher only inspects
//! them to keep its watch set in step with the directory tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

bitflags::bitflags! {
    /// Operations observed on a path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Op: u32 {
        /// A new entry appeared (including the destination of a rename)
        const CREATE = 1;
        /// File contents changed
        const WRITE = 1 << 1;
        /// Entry was deleted
        const REMOVE = 1 << 2;
        /// Entry was renamed away from this path
        const RENAME = 1 << 3;
        /// Permissions or other metadata changed
        const CHMOD = 1 << 4;
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[no events]");
        }

        let names = [
            (Op::CREATE, "CREATE"),
            (Op::WRITE, "WRITE"),
            (Op::REMOVE, "REMOVE"),
            (Op::RENAME, "RENAME"),
            (Op::CHMOD, "CHMOD"),
        ];

        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A single change notification for one path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// Path the operation applies to
    pub path: PathBuf,
    /// Operations reported for the path
    pub op: Op,
}

impl Event {
    /// Event for `path` carrying `op`.
    pub fn new(path: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    /// Path the event applies to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the op includes [`Op::CREATE`].
    pub fn is_create(&self) -> bool {
        self.op.contains(Op::CREATE)
    }

    /// True if the op includes [`Op::WRITE`].
    pub fn is_write(&self) -> bool {
        self.op.contains(Op::WRITE)
    }

    /// True if the op includes [`Op::REMOVE`].
    pub fn is_remove(&self) -> bool {
        self.op.contains(Op::REMOVE)
    }

    /// True if the op includes [`Op::RENAME`].
    pub fn is_rename(&self) -> bool {
        self.op.contains(Op::RENAME)
    }

    /// True if the op includes [`Op::CHMOD`].
    pub fn is_chmod(&self) -> bool {
        self.op.contains(Op::CHMOD)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.path, self.op)
    }
}
