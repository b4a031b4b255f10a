//! Directory-level change notifications using the notify crate.
//!
//! The file itself is never watched: its handle goes stale once the file is
//! renamed or replaced. The containing directory is watched instead and
//! events are filtered by basename, so rotation stays observable.

use crate::error::{Error, Result};
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// The directory to watch and the basename whose events matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub directory: PathBuf,
    pub basename: OsString,
}

impl WatchTarget {
    /// Splits `path` into its parent directory and file name.
    ///
    /// A bare file name is watched in the current directory.
    pub fn for_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let basename = path
            .file_name()
            .ok_or_else(|| Error::InvalidPath {
                message: format!("{} has no file name", path.display()),
            })?
            .to_os_string();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self {
            directory,
            basename,
        })
    }

    /// Whether any path of `event` carries the watched basename.
    pub fn is_relevant(&self, event: &Event) -> bool {
        event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(self.basename.as_os_str()))
    }

    /// Relevance filter plus classification in one step.
    pub fn classify(&self, event: &Event) -> Option<Wake> {
        if self.is_relevant(event) {
            classify_kind(&event.kind)
        } else {
            None
        }
    }
}

/// Why the follow loop woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Content or metadata changed: drain now.
    Changed,
    /// The name was created, removed or renamed: drain after a short delay.
    Rotated,
    /// The safety-net timer fired.
    Tick,
}

/// Maps a notify event kind to a wake-up, or `None` for events to ignore.
pub fn classify_kind(kind: &EventKind) -> Option<Wake> {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => Some(Wake::Rotated),
        EventKind::Modify(ModifyKind::Name(_)) => Some(Wake::Rotated),
        EventKind::Modify(_) => Some(Wake::Changed),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(Wake::Changed),
        EventKind::Access(_) => None,
        EventKind::Any | EventKind::Other => Some(Wake::Changed),
    }
}

/// Watches one directory and hands out its raw events.
pub(crate) struct DirWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl DirWatcher {
    /// Starts watching `target.directory` non-recursively.
    pub(crate) fn new(target: &WatchTarget) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&target.directory, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Returns the next file system event, or `None` once the watcher is gone.
    pub(crate) async fn next_event(&mut self) -> Option<notify::Result<Event>> {
        self.receiver.recv().await
    }
}
