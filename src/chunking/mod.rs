//! Text chunking for long scripts.
//!
//! Generative-model calls have a per-call input budget; long timed scripts
//! are split into overlapping chunks at sentence or timestamp boundaries and
//! the processed outputs stitched back together.

use crate::config::ChunkingSettings;
use crate::error::{Result, SzinkronError};
use regex::Regex;
use std::sync::OnceLock;

/// How far back from a chunk's end the boundary search looks.
const BOUNDARY_WINDOW: usize = 300;
/// Minimum chunk length; prevents degenerate boundaries near the start.
const MIN_CHUNK: usize = 100;

fn sentence_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?…]+\s").expect("Invalid regex"))
}

fn timestamp_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\[\d{1,2}:\d{2}:\d{2}\]").expect("Invalid regex"))
}

/// Sentence-boundary chunker with overlap.
pub struct TranscriptChunker {
    chunk_size: usize,
    overlap: usize,
    max_chunks: usize,
    single_pass_limit: usize,
}

impl TranscriptChunker {
    pub fn new(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            overlap: settings.chunk_overlap,
            max_chunks: settings.max_chunks,
            single_pass_limit: settings.single_pass_limit,
        }
    }

    /// Construct with explicit limits.
    pub fn with_limits(chunk_size: usize, overlap: usize, max_chunks: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            max_chunks,
            single_pass_limit: chunk_size,
        }
    }

    /// Whether the text exceeds the single-pass budget.
    pub fn needs_chunking(&self, text: &str) -> bool {
        text.len() > self.single_pass_limit
    }

    /// Split text into chunks of at most `chunk_size` bytes, each ending at a
    /// sentence or timestamp boundary where one exists, with a trailing
    /// overlap carried into the next chunk.
    ///
    /// Fails with `InputTooLarge` when the text would need more than
    /// `max_chunks` chunks.
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        if text.len() <= self.chunk_size {
            return Ok(vec![text.to_string()]);
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < text.len() {
            if chunks.len() == self.max_chunks {
                return Err(SzinkronError::InputTooLarge(format!(
                    "Text of {} chars needs more than {} chunks of {}",
                    text.len(),
                    self.max_chunks,
                    self.chunk_size
                )));
            }

            let hard_end = floor_char_boundary(text, (start + self.chunk_size).min(text.len()));
            let end = if hard_end < text.len() {
                self.find_boundary(text, start, hard_end)
            } else {
                hard_end
            };

            chunks.push(text[start..end].to_string());

            if end >= text.len() {
                break;
            }

            start = self.next_start(text, start, end);
        }

        Ok(chunks)
    }

    /// Start of the next chunk: `overlap` bytes before the previous end,
    /// snapped forward to a timestamp line start when the overlap window
    /// contains one, so chunks of a timed script always open on a timestamp.
    fn next_start(&self, text: &str, prev_start: usize, end: usize) -> usize {
        let mut tentative =
            floor_char_boundary(text, end.saturating_sub(self.overlap).max(prev_start + 1));
        // flooring must not stall the scan
        while tentative <= prev_start {
            tentative += 1;
            while !text.is_char_boundary(tentative) {
                tentative += 1;
            }
        }

        // Look a little past `end` so a timestamp sitting exactly on the cut
        // is still seen; candidates are clamped back to `end`.
        let search_end = (end + 12).min(text.len());
        if let Some(m) = timestamp_line_re().find(&text[tentative..search_end]) {
            let candidate = tentative + m.start() + 1;
            if candidate <= end {
                return candidate;
            }
        }

        tentative
    }

    /// Find the best split point in `[start, hard_end)`, preferring a
    /// timestamp line start, then a sentence ending, falling back to the hard
    /// cut when neither exists in the window.
    fn find_boundary(&self, text: &str, start: usize, hard_end: usize) -> usize {
        let window_start =
            floor_char_boundary(text, hard_end.saturating_sub(BOUNDARY_WINDOW).max(start + MIN_CHUNK.min(hard_end - start - 1)));
        let window = &text[window_start..hard_end];

        // A chunk of a timed script should start at a timestamp line.
        if let Some(m) = timestamp_line_re().find_iter(window).last() {
            // split before the newline so the timestamp opens the next chunk
            return window_start + m.start() + 1;
        }

        if let Some(m) = sentence_end_re().find_iter(window).last() {
            return window_start + m.end();
        }

        hard_end
    }

    /// Stitch processed chunk outputs back into one text.
    ///
    /// The overlap prefix of every chunk after the first is removed by
    /// longest-common-suffix matching against the tail of the text merged so
    /// far.
    pub fn merge(&self, outputs: &[String]) -> String {
        let mut merged = match outputs.first() {
            Some(first) => first.clone(),
            None => return String::new(),
        };

        for chunk in &outputs[1..] {
            let dup = longest_suffix_prefix(&merged, chunk, self.overlap * 2);
            merged.push_str(&chunk[dup..]);
        }

        merged
    }
}

/// Length of the longest suffix of `prior` that is also a prefix of `next`,
/// searching up to `max_len` bytes.
fn longest_suffix_prefix(prior: &str, next: &str, max_len: usize) -> usize {
    let limit = max_len.min(prior.len()).min(next.len());
    let mut best = 0;
    for k in 1..=limit {
        if !next.is_char_boundary(k) {
            continue;
        }
        if prior.ends_with(&next[..k]) {
            best = k;
        }
    }
    best
}

/// Largest char boundary at or below `idx`.
fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize, max: usize) -> TranscriptChunker {
        TranscriptChunker::with_limits(size, overlap, max)
    }

    #[test]
    fn test_short_text_single_chunk() {
        let c = chunker(100, 10, 5);
        let chunks = c.split("Hello world.").unwrap();
        assert_eq!(chunks, vec!["Hello world.".to_string()]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let c = chunker(200, 20, 50);
        let text = "Egy mondat itt. ".repeat(100);
        let chunks = c.split(&text).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 200, "chunk of {} bytes", chunk.len());
        }
    }

    #[test]
    fn test_chunks_end_at_sentence_boundaries() {
        let c = chunker(200, 20, 50);
        let text = "Egy mondat itt. ".repeat(100);
        let chunks = c.split(&text).unwrap();
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.trim_end().ends_with('.'),
                "chunk ends mid-sentence: {:?}",
                &chunk[chunk.len().saturating_sub(20)..]
            );
        }
    }

    #[test]
    fn test_round_trip_identity() {
        let c = chunker(150, 30, 100);
        let text = "Az első mondat. A második mondat! Harmadik kérdés? ".repeat(40);
        let chunks = c.split(&text).unwrap();
        assert!(chunks.len() > 2);
        let merged = c.merge(&chunks);
        assert_eq!(merged, text);
    }

    #[test]
    fn test_timestamps_never_split() {
        let c = chunker(120, 20, 100);
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!("[0:00:{:02}] Ez itt egy sor szoveggel.\n", i));
        }
        let chunks = c.split(&text).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks[1..] {
            assert!(
                chunk.starts_with('['),
                "chunk does not start at a timestamp: {:?}",
                &chunk[..20.min(chunk.len())]
            );
        }
    }

    #[test]
    fn test_max_chunks_exceeded() {
        let c = chunker(50, 10, 1);
        let text = "Sok mondat. ".repeat(50);
        let err = c.split(&text).unwrap_err();
        assert!(matches!(err, SzinkronError::InputTooLarge(_)));
    }

    #[test]
    fn test_no_boundary_falls_back_to_hard_cut() {
        let c = chunker(100, 10, 50);
        let text = "the quick brown fox jumps over the lazy dog while the band plays on and \
                    the river runs down to the sea past the old mill and the stone bridge \
                    near the town where nobody waits for the morning train anymore because \
                    the line closed years ago and the rails rusted quietly under the weeds \
                    beside the empty platform";
        assert!(text.len() > 300);
        let chunks = c.split(text).unwrap();
        assert!(chunks.iter().all(|ch| ch.len() <= 100));
        assert_eq!(c.merge(&chunks), text);
    }

    #[test]
    fn test_merge_empty() {
        let c = chunker(100, 10, 5);
        assert_eq!(c.merge(&[]), "");
    }

    #[test]
    fn test_multibyte_boundary_safety() {
        let c = chunker(80, 16, 100);
        let text = "Árvíztűrő tükörfúrógép mondat vége. ".repeat(30);
        let chunks = c.split(&text).unwrap();
        assert_eq!(c.merge(&chunks), text);
    }
}
