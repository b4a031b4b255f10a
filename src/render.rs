//! Cosmetic highlighting of log lines with a filter-match overlay.
//!
//! Every highlight pass scans the raw text of a segment and claims byte
//! ranges; a range that overlaps an earlier claim is dropped whole. Markers
//! are only composited once all passes ran, so a tagged span is never split
//! or re-colored by a later pass.

use crate::filter::Filter;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const BOLD_CYAN: &str = "\x1b[1;36m";

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:\d{4}-\d{2}-\d{2}[T\s]\d{2}:\d{2}:\d{2}(?:\.\d+)?Z?|[A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\b",
    )
    .expect("timestamp regex")
});
static LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:debug|info|warn|warning|error|err|crit|fatal|fail)\b")
        .expect("level regex")
});
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhttps?://[^\s]+").expect("url regex"));
static IP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("ip regex"));
static PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|[\s"'])(/[\w./\-+@%~]+)"#).expect("path regex"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").expect("number regex"));
static JSON_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[\{\[]").expect("json start regex"));
static JSON_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:[^"\\]|\\.)*"\s*:"#).expect("json key regex"));
static YAML_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)([A-Za-z0-9_.-]+)\s*:").expect("yaml key regex"));

/// Log severity recognized by the level pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Maps a level keyword, ignoring case.
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "debug" => Some(Severity::Debug),
            "info" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warn),
            "error" | "err" | "crit" | "fatal" | "fail" => Some(Severity::Error),
            _ => None,
        }
    }
}

/// Highlight class of a rendered segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Timestamp,
    Level(Severity),
    Url,
    Ip,
    Path,
    Number,
    JsonKey,
    YamlKey,
    Punctuation,
    /// A filter match; always wins over structural classes.
    Match,
}

impl Highlight {
    /// ANSI SGR sequence that opens this class.
    pub fn ansi(self) -> &'static str {
        match self {
            Highlight::Timestamp | Highlight::Punctuation => DIM,
            Highlight::Url | Highlight::Path => MAGENTA,
            Highlight::Ip => CYAN,
            Highlight::Number => BOLD,
            Highlight::JsonKey => GREEN,
            Highlight::YamlKey => BLUE,
            Highlight::Level(Severity::Debug) => BLUE,
            Highlight::Level(Severity::Info) => GREEN,
            Highlight::Level(Severity::Warn) => YELLOW,
            Highlight::Level(Severity::Error) => RED,
            Highlight::Match => BOLD_CYAN,
        }
    }
}

/// A run of text that is either plain or tagged with one highlight class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub highlight: Option<Highlight>,
}

/// A line split into display segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedLine {
    segments: Vec<Segment>,
}

impl RenderedLine {
    pub fn plain(text: &str) -> Self {
        let mut line = Self::default();
        line.push(text, None);
        line
    }

    /// Appends a segment, merging adjacent plain text.
    fn push(&mut self, text: &str, highlight: Option<Highlight>) {
        if text.is_empty() {
            return;
        }
        if highlight.is_none() {
            if let Some(last) = self.segments.last_mut() {
                if last.highlight.is_none() {
                    last.text.push_str(text);
                    return;
                }
            }
        }
        self.segments.push(Segment {
            text: text.to_string(),
            highlight,
        });
    }

    fn extend(&mut self, other: RenderedLine) {
        for segment in other.segments {
            self.push(&segment.text, segment.highlight);
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The underlying text without any markers.
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// The line with ANSI escape sequences around tagged segments.
    pub fn to_ansi(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RenderedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment.highlight {
                Some(highlight) => write!(f, "{}{}{}", highlight.ansi(), segment.text, RESET)?,
                None => f.write_str(&segment.text)?,
            }
        }
        Ok(())
    }
}

/// Non-overlapping claims on byte ranges of one segment, keyed by start.
#[derive(Default)]
struct Claims {
    spans: BTreeMap<usize, (usize, Highlight)>,
}

impl Claims {
    fn claim(&mut self, range: Range<usize>, highlight: Highlight) {
        if range.is_empty() {
            return;
        }
        // Claims are disjoint, so only the last one starting before `range.end` can overlap.
        if let Some((_, &(end, _))) = self.spans.range(..range.end).next_back() {
            if end > range.start {
                return;
            }
        }
        self.spans.insert(range.start, (range.end, highlight));
    }

    fn claim_all(&mut self, regex: &Regex, text: &str, highlight: Highlight) {
        for m in regex.find_iter(text) {
            self.claim(m.range(), highlight);
        }
    }

    fn composite(self, text: &str) -> RenderedLine {
        let mut line = RenderedLine::default();
        let mut last = 0;
        for (start, (end, highlight)) in self.spans {
            line.push(&text[last..start], None);
            line.push(&text[start..end], Some(highlight));
            last = end;
        }
        line.push(&text[last..], None);
        line
    }
}

fn claim_structured(claims: &mut Claims, text: &str) {
    for m in JSON_KEY.find_iter(text) {
        let key = m.as_str();
        if let (Some(open), Some(close)) = (key.find('"'), key.rfind('"')) {
            if close > open {
                claims.claim(m.start() + open + 1..m.start() + close, Highlight::JsonKey);
            }
        }
    }
    if let Some(key) = YAML_KEY.captures(text).and_then(|c| c.get(2)) {
        claims.claim(key.range(), Highlight::YamlKey);
    }
    for (i, c) in text.char_indices() {
        if matches!(c, '{' | '}' | '[' | ']' | ',') {
            claims.claim(i..i + 1, Highlight::Punctuation);
        }
    }
    for (i, _) in text.match_indices(": ") {
        claims.claim(i..i + 2, Highlight::Punctuation);
    }
}

/// Applies structural highlighting to a segment that contains no filter match.
///
/// With `enabled` false the segment is returned as one plain run.
pub fn colorize_generic(segment: &str, enabled: bool) -> RenderedLine {
    if !enabled {
        return RenderedLine::plain(segment);
    }

    let mut claims = Claims::default();
    if JSON_START.is_match(segment) || YAML_KEY.is_match(segment) {
        claim_structured(&mut claims, segment);
    }
    claims.claim_all(&TIMESTAMP, segment, Highlight::Timestamp);
    claims.claim_all(&URL, segment, Highlight::Url);
    claims.claim_all(&IP, segment, Highlight::Ip);
    for caps in PATH.captures_iter(segment) {
        if let Some(path) = caps.get(1) {
            claims.claim(path.range(), Highlight::Path);
        }
    }
    for m in LEVEL.find_iter(segment) {
        if let Some(severity) = Severity::from_word(m.as_str()) {
            claims.claim(m.range(), Highlight::Level(severity));
        }
    }
    claims.claim_all(&NUMBER, segment, Highlight::Number);
    claims.composite(segment)
}

/// Renders one raw line: filter matches become single [`Highlight::Match`]
/// segments and only the text between matches gets structural highlighting.
pub fn render_line(raw: &str, filter: &Filter, enabled: bool) -> RenderedLine {
    if !enabled || !filter.is_active() {
        return colorize_generic(raw, enabled);
    }
    let spans = filter.find_all(raw);
    if spans.is_empty() {
        return colorize_generic(raw, enabled);
    }

    let mut line = RenderedLine::default();
    let mut last = 0;
    for span in spans {
        if span.start > last {
            line.extend(colorize_generic(&raw[last..span.start], enabled));
        }
        line.push(&raw[span.start..span.end], Some(Highlight::Match));
        last = span.end;
    }
    if last < raw.len() {
        line.extend(colorize_generic(&raw[last..], enabled));
    }
    line
}
