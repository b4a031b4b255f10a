//! Line-by-line reading of a file's existing content with exact offset tracking.

use crate::error::Result;
use memchr::memchr;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Longest line the source will hand out; longer lines are skipped.
pub const MAX_LINE_LEN: usize = 1024 * 1024;

const READ_BUFFER: usize = 64 * 1024;

/// A lazy, single-pass sequence of newline-terminated lines.
///
/// [`offset`](LineSource::offset) always reports the byte position just past
/// the last byte consumed, whether iteration ran to the end or stopped early.
pub struct LineSource<R> {
    reader: BufReader<R>,
    offset: u64,
    max_line_len: usize,
    line: Vec<u8>,
    skipped: usize,
    cancel: Option<CancellationToken>,
}

impl LineSource<File> {
    /// Opens `path` for reading from the beginning.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(file))
    }
}

impl<R: AsyncRead + Unpin> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER, reader),
            offset: 0,
            max_line_len: MAX_LINE_LEN,
            line: Vec::new(),
            skipped: 0,
            cancel: None,
        }
    }

    /// Overrides the line-length ceiling.
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    /// Ends the sequence early once `cancel` fires, as if input had run out.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Bytes consumed so far, terminators included.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of oversized lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Returns the next line with its terminator (`\n` or `\r\n`) stripped,
    /// or `None` at end of input. A final line without terminator is still
    /// returned. Lines over the ceiling are logged and skipped.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                debug!(offset = self.offset, "read cancelled");
                return Ok(None);
            }
            let start = self.offset;
            match read_capped(
                &mut self.reader,
                &mut self.line,
                self.max_line_len,
                &mut self.offset,
            )
            .await?
            {
                ReadLine::Eof => return Ok(None),
                ReadLine::Line => return Ok(Some(decode(&self.line))),
                ReadLine::TooLong => {
                    self.skipped += 1;
                    warn!(
                        offset = start,
                        length = self.offset - start,
                        limit = self.max_line_len,
                        "skipping oversized line"
                    );
                }
            }
        }
    }
}

enum ReadLine {
    Eof,
    Line,
    TooLong,
}

/// Reads one line into `line`, stopping at `\n` or end of input.
///
/// Once the accumulated line exceeds `limit` the rest of it is consumed
/// without being buffered.
async fn read_capped<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    line: &mut Vec<u8>,
    limit: usize,
    offset: &mut u64,
) -> std::io::Result<ReadLine> {
    line.clear();
    let mut consumed_any = false;
    let mut overflow = false;

    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            let (piece, used, done) = match memchr(b'\n', available) {
                Some(i) => (&available[..i], i + 1, true),
                None => (available, available.len(), false),
            };
            if !overflow {
                if line.len() + piece.len() > limit {
                    overflow = true;
                    line.clear();
                } else {
                    line.extend_from_slice(piece);
                }
            }
            (used, done)
        };
        reader.consume(used);
        *offset += used as u64;
        consumed_any = true;
        if done {
            break;
        }
    }

    Ok(match (consumed_any, overflow) {
        (false, _) => ReadLine::Eof,
        (true, true) => ReadLine::TooLong,
        (true, false) => ReadLine::Line,
    })
}

/// Decodes a raw line, dropping a trailing carriage return.
pub(crate) fn decode(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TempLogFile;
    use std::io::{Error as IoError, ErrorKind};

    async fn collect<R: AsyncRead + Unpin>(source: &mut LineSource<R>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_reads_all_lines_and_reports_offset() {
        let content = "2023-01-01 10:00:00 INFO Starting application\n\
                       2023-01-01 10:00:01 INFO Loading configuration\n\
                       2023-01-01 10:00:02 ERROR Failed to process request: timeout\n";
        let temp_file = TempLogFile::with_raw(content.as_bytes()).unwrap();

        let mut source = LineSource::open(temp_file.path()).await.unwrap();
        let lines = collect(&mut source).await;

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "2023-01-01 10:00:00 INFO Starting application");
        assert_eq!(
            lines[2],
            "2023-01-01 10:00:02 ERROR Failed to process request: timeout"
        );
        assert_eq!(source.offset(), temp_file.size());
    }

    #[tokio::test]
    async fn test_offset_after_early_stop() {
        let mut source = LineSource::new(&b"first\nsecond\nthird\n"[..]);

        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(source.offset(), 6);
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(source.offset(), 13);
    }

    #[tokio::test]
    async fn test_unterminated_last_line() {
        let mut source = LineSource::new(&b"one\ntwo"[..]);
        let lines = collect(&mut source).await;

        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(source.offset(), 7);
    }

    #[tokio::test]
    async fn test_empty_lines_are_kept() {
        let mut source = LineSource::new(&b"a\n\n\nb\n"[..]);
        assert_eq!(collect(&mut source).await, vec!["a", "", "", "b"]);
    }

    #[tokio::test]
    async fn test_crlf_terminators_are_stripped() {
        let mut source = LineSource::new(&b"alpha\r\nbeta\r\n"[..]);
        assert_eq!(collect(&mut source).await, vec!["alpha", "beta"]);
        assert_eq!(source.offset(), 13);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let mut source = LineSource::new(&b""[..]);
        assert_eq!(source.next_line().await.unwrap(), None);
        assert_eq!(source.offset(), 0);
    }

    #[tokio::test]
    async fn test_oversized_line_is_skipped_not_fatal() {
        let long_line = "A".repeat(100);
        let content = format!("short\n{}\nafter\n", long_line);
        let mut source = LineSource::new(content.as_bytes()).with_max_line_len(32);

        let lines = collect(&mut source).await;

        assert_eq!(lines, vec!["short", "after"]);
        assert_eq!(source.skipped(), 1);
        assert_eq!(source.offset(), content.len() as u64);
    }

    #[tokio::test]
    async fn test_line_exactly_at_limit_is_kept() {
        let mut source = LineSource::new(&b"abcd\nabcde\n"[..]).with_max_line_len(4);
        assert_eq!(collect(&mut source).await, vec!["abcd"]);
        assert_eq!(source.skipped(), 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decoded_lossily() {
        let mut source = LineSource::new(&b"ok\nbad \xff byte\n"[..]);
        let lines = collect(&mut source).await;
        assert_eq!(lines[1], "bad \u{FFFD} byte");
    }

    #[tokio::test]
    async fn test_cancellation_stops_reading() {
        let cancel = CancellationToken::new();
        let mut source =
            LineSource::new(&b"one\ntwo\nthree\n"[..]).with_cancellation(cancel.clone());

        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("one"));
        cancel.cancel();

        assert_eq!(source.next_line().await.unwrap(), None);
        assert_eq!(source.offset(), 4);
    }

    #[tokio::test]
    async fn test_read_failure_is_an_io_error() {
        let reader = tokio_test::io::Builder::new()
            .read(b"first\nsec")
            .read_error(IoError::new(ErrorKind::Other, "disk gone"))
            .build();
        let mut source = LineSource::new(reader);

        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("first"));
        let err = source.next_line().await.unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
        assert!(err.to_string().contains("disk gone"));
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let result = LineSource::open("fixtures/nonexistent.log").await;
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode(b"plain"), "plain");
        assert_eq!(decode(b"windows\r"), "windows");
        assert_eq!(decode(b"inner\rcr"), "inner\rcr");
        assert_eq!(decode(b""), "");
    }
}
