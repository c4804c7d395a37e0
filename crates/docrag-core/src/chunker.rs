//! Paragraph-aware word chunking with overlap.
//!
//! Paragraphs are packed into a buffer until the next one would overflow
//! `max_words`; oversized buffers are cut into `max_words` pieces. Each cut
//! keeps the last `overlap` words so consecutive chunks share context.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::types::TextChunk;

#[allow(clippy::unwrap_used)]
static BLANK_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_words: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_words: 180, overlap: 40 }
    }
}

impl ChunkingConfig {
    pub fn new(max_words: usize, overlap: usize) -> Result<Self> {
        if max_words == 0 {
            return Err(Error::InvalidConfig("max_words must be greater than 0".into()));
        }
        Ok(Self { max_words, overlap })
    }

    /// Overlap actually applied; never reaches `max_words` so each flush advances.
    fn effective_overlap(&self) -> usize {
        self.overlap.min(self.max_words.saturating_sub(1))
    }
}

/// Split cleaned text on blank lines, trimming and dropping empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    BLANK_LINE_RE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Lazily chunk `paragraphs`. Calling this again restarts from the first paragraph.
pub fn chunk_paragraphs<'a, I>(paragraphs: I, config: ChunkingConfig) -> Chunks<'a, I::IntoIter>
where
    I: IntoIterator<Item = &'a str>,
{
    Chunks {
        paragraphs: paragraphs.into_iter(),
        max_words: config.max_words.max(1),
        overlap: config.effective_overlap(),
        buffer: Vec::new(),
        ready: VecDeque::new(),
        done: false,
    }
}

pub struct Chunks<'a, I> {
    paragraphs: I,
    max_words: usize,
    overlap: usize,
    buffer: Vec<&'a str>,
    ready: VecDeque<TextChunk>,
    done: bool,
}

impl<'a, I> Chunks<'a, I>
where
    I: Iterator<Item = &'a str>,
{
    fn flush(&mut self) {
        let take = self.max_words.min(self.buffer.len());
        if take == 0 {
            return;
        }
        let emitted: Vec<&'a str> = self.buffer.drain(..take).collect();
        self.ready.push_back(TextChunk {
            text: emitted.join(" "),
            word_count: emitted.len(),
        });
        let keep = self.overlap.min(emitted.len());
        let mut rest = emitted[emitted.len() - keep..].to_vec();
        rest.append(&mut self.buffer);
        self.buffer = rest;
    }

    fn push_paragraph(&mut self, paragraph: &'a str) {
        let words: Vec<&'a str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            return;
        }
        if !self.buffer.is_empty() && self.buffer.len() + words.len() > self.max_words {
            self.flush();
        }
        self.buffer.extend(words);
        while self.buffer.len() > self.max_words {
            self.flush();
        }
    }
}

impl<'a, I> Iterator for Chunks<'a, I>
where
    I: Iterator<Item = &'a str>,
{
    type Item = TextChunk;

    fn next(&mut self) -> Option<TextChunk> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Some(chunk);
            }
            if self.done {
                return None;
            }
            match self.paragraphs.next() {
                Some(paragraph) => self.push_paragraph(paragraph),
                None => {
                    self.done = true;
                    if !self.buffer.is_empty() {
                        let words = std::mem::take(&mut self.buffer);
                        self.ready.push_back(TextChunk {
                            text: words.join(" "),
                            word_count: words.len(),
                        });
                    }
                }
            }
        }
    }
}
