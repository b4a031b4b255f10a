//! An async stream of matching lines from a followed file.

use crate::config::FollowConfig;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::follow::Follower;
use futures::Stream;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Yields every matching line of a file, existing content first, then
/// lines as they are appended.
///
/// The follow engine runs on a background task that stops when the stream
/// is dropped.
pub struct FollowStream {
    receiver: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    _task_handle: JoinHandle<()>,
}

impl FollowStream {
    /// Starts following `path` from byte `offset` with the given filter pattern.
    pub fn new<P: AsRef<Path>>(
        path: P,
        pattern: Option<&str>,
        offset: u64,
        config: FollowConfig,
    ) -> Result<Self> {
        let filter = Filter::new(pattern)?;
        let mut follower = Follower::new(path, offset, config)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task_handle = tokio::spawn(async move {
            let emit = |line: String| -> Result<()> {
                if filter.matches(&line) {
                    tx.send(line).map_err(|_| Error::StreamClosed)?;
                }
                Ok(())
            };
            match follower.run(&task_cancel, emit).await {
                Ok(()) | Err(Error::StreamClosed) => {}
                Err(e) => warn!(error = %e, "follow task stopped"),
            }
        });

        Ok(FollowStream {
            receiver: rx,
            cancel,
            _task_handle: task_handle,
        })
    }

    /// Check if the stream has been closed/dropped
    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl Drop for FollowStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Stream for FollowStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}
