//! Run options, follow tuning and the color decision.

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which matching lines of the existing content are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every matching line.
    #[default]
    All,
    /// The first N matching lines; scanning stops once N are found.
    First(NonZeroUsize),
    /// The last N matching lines; the whole file is scanned.
    Last(NonZeroUsize),
}

impl Selection {
    /// Builds a selection from the two optional counts, rejecting both at once.
    pub fn from_counts(first: Option<NonZeroUsize>, last: Option<NonZeroUsize>) -> Result<Self> {
        match (first, last) {
            (Some(_), Some(_)) => Err(Error::ConflictingSelection),
            (Some(n), None) => Ok(Selection::First(n)),
            (None, Some(n)) => Ok(Selection::Last(n)),
            (None, None) => Ok(Selection::All),
        }
    }
}

/// Validated options for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub path: PathBuf,
    pub pattern: Option<String>,
    pub follow: bool,
    pub selection: Selection,
}

impl Options {
    /// Creates options, failing on a conflicting selection before any I/O happens.
    pub fn new<P: Into<PathBuf>>(
        path: P,
        pattern: Option<String>,
        follow: bool,
        first: Option<NonZeroUsize>,
        last: Option<NonZeroUsize>,
    ) -> Result<Self> {
        let selection = Selection::from_counts(first, last)?;
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidPath {
                message: "Please provide a file path".to_string(),
            });
        }

        Ok(Self {
            path,
            pattern: pattern.filter(|p| !p.is_empty()),
            follow,
            selection,
        })
    }

    /// Checks that the path exists and is not a directory.
    pub fn check_path(&self) -> Result<()> {
        check_regular_file(&self.path)
    }
}

pub(crate) fn check_regular_file(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.display().to_string(),
        },
        _ => Error::Io(e),
    })?;
    if metadata.is_dir() {
        return Err(Error::NotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Timing and buffer sizes for the follow engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowConfig {
    /// Interval of the safety-net drain timer.
    pub poll_interval: Duration,
    /// Pause after a rename/remove/create event before draining.
    pub rotate_delay: Duration,
    /// Bytes requested per positional read.
    pub chunk_size: usize,
    /// Use directory notifications; when false only the timer wakes the engine.
    pub notifications: bool,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            rotate_delay: Duration::from_millis(80),
            chunk_size: 64 * 1024,
            notifications: true,
        }
    }
}

impl FollowConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_rotate_delay(mut self, delay: Duration) -> Self {
        self.rotate_delay = delay;
        self
    }

    /// Sets the read chunk size; zero is raised to one byte.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }
}

/// Decides once per run whether output is colored.
///
/// Color is off when `NO_COLOR` is set to a non-empty value or `TERM=dumb`,
/// otherwise on exactly when stdout is a terminal.
pub fn color_enabled() -> bool {
    color_enabled_with(
        std::env::var_os("NO_COLOR").as_deref(),
        std::env::var_os("TERM").as_deref(),
        std::io::stdout().is_terminal(),
    )
}

pub(crate) fn color_enabled_with(
    no_color: Option<&OsStr>,
    term: Option<&OsStr>,
    stdout_is_tty: bool,
) -> bool {
    if no_color.is_some_and(|value| !value.is_empty()) {
        return false;
    }
    if term.is_some_and(|value| value == "dumb") {
        return false;
    }
    stdout_is_tty
}
