//! A quick cat/grep/tail for text and log files.
//!
//! `see` prints the lines of a file (all of them, the first N or the last N),
//! optionally filtered by a regular expression, highlights timestamps, levels,
//! URLs, paths and other structure, and can keep following the file as it
//! grows, is truncated or is rotated away.
//!
//! # Example
//!
//! ```rust,no_run
//! use see::{Options, Session};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = Options::new("app.log", Some("(?i)error".into()), true, None, None)?;
//!     let session = Session::new(options, see::color_enabled())?;
//!
//!     let cancel = CancellationToken::new();
//!     session.run(&mut std::io::stdout(), &cancel).await?;
//!     Ok(())
//! }
//! ```

// Internal modules - not part of public API
mod config;
mod error;
mod filter;
mod follow;
mod render;
mod select;
mod session;
mod source;
mod stream;
mod watcher;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use config::{FollowConfig, Options, Selection, color_enabled};
pub use error::{Error, Result};
pub use filter::{Filter, MatchSpan};
pub use follow::{DrainReport, FollowState, Follower, Phase};
pub use render::{Highlight, RenderedLine, Segment, Severity, colorize_generic, render_line};
pub use select::{RingBuffer, Selected, first_n, last_n, scan_all};
pub use session::{Session, Summary};
pub use source::{LineSource, MAX_LINE_LEN};
pub use stream::FollowStream;
pub use watcher::{Wake, WatchTarget, classify_kind};

use std::path::Path;

/// Creates a stream of the lines of `path` that match `pattern`, starting
/// with the existing content and continuing with appended lines.
///
/// # Example
///
/// ```rust,no_run
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut lines = see::follow("app.log", Some("ERROR"))?;
///
///     while let Some(line) = lines.next().await {
///         println!("{}", line);
///     }
///
///     Ok(())
/// }
/// ```
pub fn follow<P: AsRef<Path>>(path: P, pattern: Option<&str>) -> Result<FollowStream> {
    FollowStream::new(path, pattern, 0, FollowConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TempLogFile;
    use std::time::Duration;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_follow_yields_existing_matches() {
        let temp_file = TempLogFile::with_content("INFO a\nERROR b").unwrap();
        let mut lines = follow(temp_file.path(), Some("ERROR")).unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), lines.next())
            .await
            .unwrap();
        assert_eq!(first.as_deref(), Some("ERROR b"));
    }

    #[test]
    fn test_follow_rejects_path_without_file_name() {
        // Fails before any task is spawned, so no runtime is needed.
        assert!(matches!(follow("/", None), Err(Error::InvalidPath { .. })));
    }
}
