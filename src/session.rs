//! Sequences one run: initial selection, then optionally follow mode.

use crate::config::{FollowConfig, Options, Selection};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::follow::Follower;
use crate::render::render_line;
use crate::select::{first_n, last_n, scan_all};
use crate::source::LineSource;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const READING_BANNER: &str = "Reading existing lines...";
const FOLLOW_BANNER: &str = "Entering follow mode (Ctrl+C to stop)...";
const SHUTDOWN_BANNER: &str = "Shutting down";

/// Outcome of the initial read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Matching lines seen. For a last-N selection this counts every match,
    /// not only the printed ones.
    pub matched: usize,
    /// Offset following started from (or would have started from).
    pub offset: u64,
}

/// One configured run over one file.
#[derive(Debug)]
pub struct Session {
    options: Options,
    filter: Filter,
    color: bool,
    follow: FollowConfig,
}

impl Session {
    /// Compiles the filter; an invalid pattern fails here, before any I/O.
    pub fn new(options: Options, color: bool) -> Result<Self> {
        let filter = Filter::new(options.pattern.as_deref())?;
        Ok(Self {
            options,
            filter,
            color,
            follow: FollowConfig::default(),
        })
    }

    pub fn with_follow_config(mut self, follow: FollowConfig) -> Self {
        self.follow = follow;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Runs the whole session, writing banners and rendered lines to `out`.
    ///
    /// Everything up to entering follow mode is fatal on error. Once
    /// following, only output failures end the run; otherwise it lasts until
    /// `cancel` fires. Cancelling during the initial read stops it after the
    /// current line and skips the summary.
    pub async fn run<W: Write>(&self, out: &mut W, cancel: &CancellationToken) -> Result<Summary> {
        self.options.check_path()?;
        let path = &self.options.path;
        let mut source = LineSource::open(path)
            .await?
            .with_cancellation(cancel.clone());

        banner(out, READING_BANNER)?;
        let (matched, offset) = match self.options.selection {
            Selection::All => {
                let matched = scan_all(&mut source, &self.filter, |line| self.emit(out, &line)).await?;
                (matched, source.offset())
            }
            Selection::First(n) => {
                let selected = first_n(&mut source, &self.filter, n).await?;
                self.emit_all(out, &selected.lines)?;
                (selected.matched, self.end_of_file(source.offset()).await)
            }
            Selection::Last(n) => {
                let selected = last_n(&mut source, &self.filter, n).await?;
                self.emit_all(out, &selected.lines)?;
                (selected.matched, self.end_of_file(source.offset()).await)
            }
        };
        drop(source);
        let summary = Summary { matched, offset };
        debug!(matched, offset, "initial read finished");

        if cancel.is_cancelled() {
            banner(out, SHUTDOWN_BANNER)?;
            return Ok(summary);
        }

        if !self.options.follow {
            match matched {
                0 => banner(out, "No lines matched")?,
                1 => banner(out, "Matched 1 line")?,
                n => banner(out, &format!("Matched {} lines", n))?,
            }
            return Ok(summary);
        }

        banner(out, FOLLOW_BANNER)?;
        let mut follower = Follower::new(path, offset, self.follow.clone())?;
        follower
            .run(cancel, |line| {
                if self.filter.matches(&line) {
                    self.emit(out, &line)?;
                }
                Ok(())
            })
            .await?;
        banner(out, SHUTDOWN_BANNER)?;
        Ok(summary)
    }

    fn emit<W: Write>(&self, out: &mut W, line: &str) -> Result<()> {
        writeln!(out, "{}", render_line(line, &self.filter, self.color)).map_err(Error::Output)
    }

    fn emit_all<W: Write>(&self, out: &mut W, lines: &[String]) -> Result<()> {
        lines.iter().try_for_each(|line| self.emit(out, line))
    }

    /// Current size of the file; follow mode resumes there after a
    /// first-N or last-N selection.
    async fn end_of_file(&self, fallback: u64) -> u64 {
        match tokio::fs::metadata(&self.options.path).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!(error = %e, "cannot stat file after selection");
                fallback
            }
        }
    }
}

fn banner<W: Write>(out: &mut W, text: &str) -> Result<()> {
    writeln!(out, "{}", text).map_err(Error::Output)?;
    out.flush().map_err(Error::Output)
}
