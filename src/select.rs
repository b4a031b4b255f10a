//! Initial selection of matching lines: all, first N or last N.

use crate::error::Result;
use crate::filter::Filter;
use crate::source::LineSource;
use std::num::NonZeroUsize;
use tokio::io::AsyncRead;

/// Fixed-capacity circular buffer that keeps the most recent `capacity` items.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    cursor: usize,
    count: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let mut slots = Vec::with_capacity(capacity.get());
        slots.resize_with(capacity.get(), || None);
        Self {
            slots,
            cursor: 0,
            count: 0,
        }
    }

    /// Stores `item`, overwriting the oldest entry once full.
    pub fn push(&mut self, item: T) {
        self.slots[self.cursor] = Some(item);
        self.cursor = (self.cursor + 1) % self.slots.len();
        if self.count < self.slots.len() {
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index of the oldest retained entry.
    fn oldest(&self) -> usize {
        if self.count == self.slots.len() {
            self.cursor
        } else {
            0
        }
    }

    /// Iterates from the oldest retained entry to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let start = self.oldest();
        (0..self.count).filter_map(move |i| self.slots[(start + i) % self.slots.len()].as_ref())
    }

    /// Consumes the buffer, returning entries oldest first.
    pub fn into_vec(mut self) -> Vec<T> {
        let start = self.oldest();
        let len = self.slots.len();
        (0..self.count)
            .filter_map(|i| self.slots[(start + i) % len].take())
            .collect()
    }
}

/// Lines retained by a first-N or last-N selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selected {
    /// Retained lines in original order.
    pub lines: Vec<String>,
    /// Matching lines seen. For last-N this may exceed `lines.len()`.
    pub matched: usize,
}

/// Keeps the first `n` matching lines and stops reading as soon as it has them.
pub async fn first_n<R: AsyncRead + Unpin>(
    source: &mut LineSource<R>,
    filter: &Filter,
    n: NonZeroUsize,
) -> Result<Selected> {
    let mut lines = Vec::new();
    while lines.len() < n.get() {
        match source.next_line().await? {
            Some(line) if filter.matches(&line) => lines.push(line),
            Some(_) => {}
            None => break,
        }
    }
    let matched = lines.len();
    Ok(Selected { lines, matched })
}

/// Keeps the last `n` matching lines. The whole input is read.
pub async fn last_n<R: AsyncRead + Unpin>(
    source: &mut LineSource<R>,
    filter: &Filter,
    n: NonZeroUsize,
) -> Result<Selected> {
    let mut ring = RingBuffer::new(n);
    let mut matched = 0;
    while let Some(line) = source.next_line().await? {
        if filter.matches(&line) {
            ring.push(line);
            matched += 1;
        }
    }
    Ok(Selected {
        lines: ring.into_vec(),
        matched,
    })
}

/// Passes every matching line to `emit` as it is read; returns the match count.
pub async fn scan_all<R, F>(source: &mut LineSource<R>, filter: &Filter, mut emit: F) -> Result<usize>
where
    R: AsyncRead + Unpin,
    F: FnMut(String) -> Result<()>,
{
    let mut matched = 0;
    while let Some(line) = source.next_line().await? {
        if filter.matches(&line) {
            emit(line)?;
            matched += 1;
        }
    }
    Ok(matched)
}
