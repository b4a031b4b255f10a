//! The follow engine: read newly appended bytes, split them into lines and
//! survive truncation and rotation.

use crate::config::FollowConfig;
use crate::error::{Error, Result};
use crate::source::decode;
use crate::watcher::{DirWatcher, Wake, WatchTarget};
use memchr::memchr;
use notify::Event;
use std::fs::Metadata;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Read position plus the unterminated tail of the last read.
///
/// After a successful [`feed`](FollowState::feed), `carry` holds no `\n`: it
/// is the start of a line whose terminator has not been read yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowState {
    offset: u64,
    carry: Vec<u8>,
}

impl FollowState {
    pub fn new(offset: u64) -> Self {
        Self {
            offset,
            carry: Vec::new(),
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn carry(&self) -> &[u8] {
        &self.carry
    }

    /// Starts over from byte 0, dropping any partial line.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.carry.clear();
    }

    /// Consumes `chunk`, the bytes at `offset..offset + chunk.len()`, and
    /// passes every completed line to `emit`. Returns the number of lines emitted.
    ///
    /// If `emit` fails, feeding stops; lines after the failing one remain in `carry`.
    pub fn feed<F>(&mut self, chunk: &[u8], emit: &mut F) -> Result<usize>
    where
        F: FnMut(String) -> Result<()>,
    {
        let scan_from = self.carry.len();
        self.carry.extend_from_slice(chunk);
        self.offset += chunk.len() as u64;

        let mut consumed = 0;
        let mut emitted = 0;
        let mut search = scan_from;
        let mut outcome = Ok(());
        while let Some(i) = memchr(b'\n', &self.carry[search..]) {
            let end = search + i;
            let line = decode(&self.carry[consumed..end]);
            consumed = end + 1;
            search = consumed;
            if let Err(e) = emit(line) {
                outcome = Err(e);
                break;
            }
            emitted += 1;
        }
        self.carry.drain(..consumed);
        outcome.map(|_| emitted)
    }
}

fn detect_file_truncation(current_size: u64, last_position: u64) -> bool {
    current_size < last_position
}

fn calculate_bytes_to_read(current_size: u64, last_position: u64) -> Option<u64> {
    if current_size <= last_position {
        None
    } else {
        Some(current_size - last_position)
    }
}

#[cfg(unix)]
fn file_identity(metadata: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn file_identity(_metadata: &Metadata) -> Option<(u64, u64)> {
    None
}

/// Reads into `buf` starting at absolute position `pos`.
async fn read_at(file: &mut File, pos: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    file.seek(SeekFrom::Start(pos)).await?;
    file.read(buf).await
}

/// What a single drain did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// The file shrank or was replaced and reading restarted at byte 0.
    pub reset: bool,
    pub bytes: u64,
    pub lines: usize,
}

impl DrainReport {
    pub fn is_idle(&self) -> bool {
        !self.reset && self.bytes == 0
    }
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Waiting,
    Draining,
    Stopped,
}

/// Follows one file from a starting offset until cancelled.
pub struct Follower {
    path: PathBuf,
    target: WatchTarget,
    state: FollowState,
    identity: Option<(u64, u64)>,
    /// The file was missing on an earlier drain; whatever appears next is new.
    vanished: bool,
    config: FollowConfig,
    phase: Phase,
}

impl Follower {
    /// Creates an engine that will resume at `offset`.
    pub fn new<P: AsRef<Path>>(path: P, offset: u64, config: FollowConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let target = WatchTarget::for_path(&path)?;
        let identity = std::fs::metadata(&path)
            .ok()
            .as_ref()
            .and_then(file_identity);
        Ok(Self {
            path,
            target,
            state: FollowState::new(offset),
            identity,
            vanished: false,
            config,
            phase: Phase::Idle,
        })
    }

    pub fn state(&self) -> &FollowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// Reads everything appended since the last drain and emits complete lines.
    ///
    /// A drain with nothing new is a no-op. File errors come back as
    /// [`Error::Io`] with the state still consistent, so the next drain
    /// resumes from the same offset. A file that went missing and came back
    /// is read from the start. Errors from `emit` are passed through.
    pub async fn drain<F>(&mut self, emit: &mut F) -> Result<DrainReport>
    where
        F: FnMut(String) -> Result<()>,
    {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.vanished = true;
                }
                return Err(e.into());
            }
        };
        let current_size = metadata.len();
        let identity = file_identity(&metadata);
        let mut report = DrainReport::default();

        // Inode numbers can be reused, so a reappearance counts as replacement.
        let replaced = self.vanished || (self.identity.is_some() && identity != self.identity);
        self.vanished = false;
        if replaced || detect_file_truncation(current_size, self.state.offset()) {
            debug!(
                path = %self.path.display(),
                offset = self.state.offset(),
                size = current_size,
                replaced,
                "file truncated or rotated"
            );
            self.state.reset();
            report.reset = true;
        }
        self.identity = identity;

        let Some(pending) = calculate_bytes_to_read(current_size, self.state.offset()) else {
            return Ok(report);
        };

        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.vanished = true;
                }
                return Err(e.into());
            }
        };
        let capacity = self.config.chunk_size.min(pending as usize).max(1);
        let mut buf = vec![0u8; capacity];
        let mut pos = self.state.offset();

        while pos < current_size {
            let want = (current_size - pos).min(buf.len() as u64) as usize;
            let n = read_at(&mut file, pos, &mut buf[..want]).await?;
            if n == 0 {
                // Shrunk while reading; the next drain sorts it out.
                break;
            }
            report.lines += self.state.feed(&buf[..n], emit)?;
            report.bytes += n as u64;
            pos += n as u64;
        }

        trace!(
            bytes = report.bytes,
            lines = report.lines,
            offset = self.state.offset(),
            "drained"
        );
        Ok(report)
    }

    /// Drains on every wake-up until `cancel` fires.
    ///
    /// Wake-ups come from directory events filtered to the file's basename
    /// and from a fixed-interval timer. File errors are logged and retried
    /// on the next wake-up; only errors from `emit` end the loop early.
    pub async fn run<F>(&mut self, cancel: &CancellationToken, mut emit: F) -> Result<()>
    where
        F: FnMut(String) -> Result<()>,
    {
        let result = self.watch_loop(cancel, &mut emit).await;
        self.phase = Phase::Stopped;
        result
    }

    async fn watch_loop<F>(&mut self, cancel: &CancellationToken, emit: &mut F) -> Result<()>
    where
        F: FnMut(String) -> Result<()>,
    {
        let mut watcher = if self.config.notifications {
            match DirWatcher::new(&self.target) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    warn!(error = %e, "file notifications unavailable, polling only");
                    None
                }
            }
        } else {
            debug!("file notifications disabled, polling only");
            None
        };
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Catch bytes appended before the watcher was registered.
        self.step(emit).await?;

        loop {
            self.phase = Phase::Waiting;
            let wake = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = next_event(&mut watcher) => match event {
                    Some(Ok(event)) => match self.target.classify(&event) {
                        Some(wake) => wake,
                        None => continue,
                    },
                    Some(Err(e)) => {
                        warn!(error = %e, "file watcher error");
                        continue;
                    }
                    None => {
                        warn!("file watcher stopped, polling only");
                        watcher = None;
                        continue;
                    }
                },
                _ = ticker.tick() => Wake::Tick,
            };

            if wake == Wake::Rotated {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = sleep(self.config.rotate_delay) => {}
                }
            }
            self.step(emit).await?;
        }
        Ok(())
    }

    async fn step<F>(&mut self, emit: &mut F) -> Result<()>
    where
        F: FnMut(String) -> Result<()>,
    {
        self.phase = Phase::Draining;
        match self.drain(emit).await {
            Ok(report) => {
                if report.reset {
                    info!(path = %self.path.display(), "file truncated or rotated, reading from start");
                }
                Ok(())
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "file missing, waiting for it to reappear");
                Ok(())
            }
            Err(Error::Io(e)) => {
                warn!(path = %self.path.display(), error = %e, "read failed, retrying on next wake-up");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

async fn next_event(watcher: &mut Option<DirWatcher>) -> Option<notify::Result<Event>> {
    match watcher {
        Some(watcher) => watcher.next_event().await,
        None => std::future::pending().await,
    }
}
