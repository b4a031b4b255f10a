use anyhow::Result;
use clap::Parser;
use see::{Options, Session};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Quick cat/grep/tail for text and log files.
///
/// Prints all lines of FILE (or the first/last N), filtered by an optional
/// regex, with timestamps, levels, URLs, IPs, paths and numbers highlighted
/// on a terminal. With --follow, keeps printing appended lines and survives
/// truncation and rotation. Color is off when NO_COLOR is set, TERM=dumb, or
/// output is not a terminal.
#[derive(Parser, Debug)]
#[command(name = "see", version, about, long_about)]
struct Cli {
    /// Path to the file to read
    file: PathBuf,

    /// Optional regex filter; use (?i) for case-insensitive matching
    filter: Option<String>,

    /// Regex filter, as an alternative to the positional FILTER
    #[arg(short = 'f', long = "filter", value_name = "REGEX")]
    filter_flag: Option<String>,

    /// Follow appended lines, like tail -f
    #[arg(short = 't', long)]
    follow: bool,

    /// Print the first N matching lines
    #[arg(long, visible_alias = "ns", value_name = "N")]
    first: Option<NonZeroUsize>,

    /// Print the last N matching lines
    #[arg(long, visible_alias = "ne", value_name = "N")]
    last: Option<NonZeroUsize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pattern = cli.filter_flag.or(cli.filter);
    let options = Options::new(cli.file, pattern, cli.follow, cli.first, cli.last)?;
    let session = Session::new(options, see::color_enabled())?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    session.run(&mut stdout, &cancel).await?;
    Ok(())
}
