//! Timed script model: parsing and rendering.
//!
//! A script artifact is UTF-8 text with a `key: value` header block, a blank
//! line, then body lines of the form `[h:mm:ss] words…` with inline pause
//! markers and blank lines as paragraph breaks. Parsing then re-rendering a
//! canonical script yields an identical byte sequence.

use crate::error::{Result, SzinkronError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Inline short-breath marker.
pub const SHORT_BREATH: &str = "•";
/// Inline long-breath marker.
pub const LONG_BREATH: &str = "••";

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[(\d{1,2}):(\d{2}):(\d{2})\]\s*(.*)$").expect("Invalid regex")
    })
}

/// A single timed line of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds; never precedes the start.
    pub end_seconds: f64,
    /// Line text, including any inline pause markers.
    pub text: String,
    /// Mean recognizer confidence for the line, when known.
    pub confidence: Option<f64>,
    /// Whether a paragraph break precedes this line.
    pub paragraph_before: bool,
}

impl TimedSegment {
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds: end_seconds.max(start_seconds),
            text,
            confidence: None,
            paragraph_before: false,
        }
    }

    /// Text with inline pause markers stripped, for synthesis input.
    pub fn clean_text(&self) -> String {
        self.text
            .split_whitespace()
            .filter(|tok| *tok != SHORT_BREATH && *tok != LONG_BREATH)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Start timestamp truncated to whole seconds.
    pub fn start_whole_seconds(&self) -> u32 {
        self.start_seconds.max(0.0) as u32
    }
}

/// Script header metadata, rendered as `key: value` lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptHeader {
    pub title: String,
    pub processed_at: String,
    /// Post-editor model tag (`model@region`), when post-editing ran.
    pub post_editor: Option<String>,
    /// Translator model tag (`model@region`), when translation ran.
    pub translator: Option<String>,
}

/// An ordered timed script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub header: ScriptHeader,
    pub segments: Vec<TimedSegment>,
}

impl Script {
    pub fn new(header: ScriptHeader, segments: Vec<TimedSegment>) -> Self {
        Self { header, segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All line timestamps in order (whole seconds, duplicates preserved).
    pub fn timestamps(&self) -> Vec<u32> {
        self.segments.iter().map(|s| s.start_whole_seconds()).collect()
    }

    /// Character count of the rendered body.
    pub fn char_count(&self) -> usize {
        self.render_body().chars().count()
    }

    /// Total span covered by the script, in seconds.
    pub fn total_span_seconds(&self) -> f64 {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => (last.end_seconds - first.start_seconds).max(0.0),
            _ => 0.0,
        }
    }

    /// Render the body only (no header).
    pub fn render_body(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('\n');
                if seg.paragraph_before {
                    out.push('\n');
                }
            }
            out.push_str(&format!(
                "[{}] {}",
                format_timestamp(seg.start_whole_seconds()),
                seg.text
            ));
        }
        out
    }

    /// Render the full artifact: header block, blank line, body.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("title: {}\n", self.header.title));
        out.push_str(&format!("processed_at: {}\n", self.header.processed_at));
        if let Some(tag) = &self.header.post_editor {
            out.push_str(&format!("post_editor: {}\n", tag));
        }
        if let Some(tag) = &self.header.translator {
            out.push_str(&format!("translator: {}\n", tag));
        }
        out.push('\n');
        out.push_str(&self.render_body());
        out.push('\n');
        out
    }

    /// Parse a full artifact (header + body).
    pub fn parse(raw: &str) -> Result<Script> {
        let mut header = ScriptHeader::default();
        let mut lines = raw.lines().peekable();

        // header block runs to the first blank line
        for line in lines.by_ref() {
            if line.trim().is_empty() {
                break;
            }
            match line.split_once(':') {
                Some(("title", v)) => header.title = v.trim().to_string(),
                Some(("processed_at", v)) => header.processed_at = v.trim().to_string(),
                Some(("post_editor", v)) => header.post_editor = Some(v.trim().to_string()),
                Some(("translator", v)) => header.translator = Some(v.trim().to_string()),
                _ => {
                    return Err(SzinkronError::Internal(format!(
                        "Unrecognized script header line: {}",
                        line
                    )));
                }
            }
        }

        let body: Vec<&str> = lines.collect();
        let segments = parse_body_lines(&body)?;

        Ok(Script { header, segments })
    }

    /// Parse body text only, with an empty header.
    pub fn parse_body(raw: &str) -> Result<Script> {
        let lines: Vec<&str> = raw.lines().collect();
        let segments = parse_body_lines(&lines)?;
        Ok(Script {
            header: ScriptHeader::default(),
            segments,
        })
    }

    /// Check segment ordering invariants: starts non-decreasing and no
    /// segment overlapping the next.
    pub fn check_ordering(&self) -> bool {
        self.segments.windows(2).all(|w| {
            w[0].start_seconds <= w[1].start_seconds && w[0].end_seconds <= w[1].start_seconds
        })
    }
}

fn parse_body_lines(lines: &[&str]) -> Result<Vec<TimedSegment>> {
    let mut segments: Vec<TimedSegment> = Vec::new();
    let mut pending_paragraph = false;

    for line in lines {
        if line.trim().is_empty() {
            if !segments.is_empty() {
                pending_paragraph = true;
            }
            continue;
        }

        let caps = timestamp_re().captures(line).ok_or_else(|| {
            SzinkronError::Internal(format!("Script line without timestamp: {}", line))
        })?;

        let hours: u32 = caps[1].parse().unwrap_or(0);
        let minutes: u32 = caps[2].parse().unwrap_or(0);
        let seconds: u32 = caps[3].parse().unwrap_or(0);
        let start = (hours * 3600 + minutes * 60 + seconds) as f64;
        let text = caps[4].trim().to_string();

        if text.is_empty() {
            continue;
        }

        // close the previous line's span now that the next start is known
        if let Some(prev) = segments.last_mut() {
            if prev.end_seconds <= prev.start_seconds {
                prev.end_seconds = start.max(prev.start_seconds);
            }
        }

        let mut seg = TimedSegment::new(start, start, text);
        seg.paragraph_before = pending_paragraph;
        pending_paragraph = false;
        segments.push(seg);
    }

    Ok(segments)
}

/// Format whole seconds as `h:mm:ss` (hours not zero-padded).
pub fn format_timestamp(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{}:{:02}:{:02}", hours, minutes, secs)
}

/// Parse a `[h:mm:ss]` timestamp token to whole seconds.
pub fn parse_timestamp(token: &str) -> Option<u32> {
    let caps = timestamp_re().captures(token)?;
    let hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    let seconds: u32 = caps[3].parse().ok()?;
    Some(hours * 3600 + minutes * 60 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_script() -> Script {
        let mut s1 = TimedSegment::new(0.0, 2.0, "Sziasztok, üdvözöllek benneteket. •".into());
        s1.confidence = Some(0.93);
        let mut s2 = TimedSegment::new(3.0, 6.0, "Ma egy izgalmas témáról beszélek.".into());
        s2.paragraph_before = true;
        Script::new(
            ScriptHeader {
                title: "Teszt videó".into(),
                processed_at: "2026-08-02 10:00".into(),
                post_editor: Some("gemini-2.0-flash@us-central1".into()),
                translator: None,
            },
            vec![s1, s2],
        )
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "0:00:00");
        assert_eq!(format_timestamp(62), "0:01:02");
        assert_eq!(format_timestamp(3723), "1:02:03");
    }

    #[test]
    fn test_render_parse_render_is_identity() {
        let rendered = sample_script().render();
        let reparsed = Script::parse(&rendered).unwrap();
        assert_eq!(reparsed.render(), rendered);
    }

    #[test]
    fn test_parse_recovers_structure() {
        let parsed = Script::parse(&sample_script().render()).unwrap();
        assert_eq!(parsed.header.title, "Teszt videó");
        assert_eq!(
            parsed.header.post_editor.as_deref(),
            Some("gemini-2.0-flash@us-central1")
        );
        assert_eq!(parsed.segments.len(), 2);
        assert!(parsed.segments[1].paragraph_before);
        assert_eq!(parsed.timestamps(), vec![0, 3]);
    }

    #[test]
    fn test_clean_text_strips_markers() {
        let seg = TimedSegment::new(0.0, 1.0, "Hello • world ••".into());
        assert_eq!(seg.clean_text(), "Hello world");
    }

    #[test]
    fn test_ordering_check() {
        let good = Script::parse_body("[0:00:00] a\n[0:00:02] b").unwrap();
        assert!(good.check_ordering());

        let mut bad = good.clone();
        bad.segments[0].end_seconds = 5.0;
        assert!(!bad.check_ordering());
    }

    #[test]
    fn test_parse_body_derives_end_times() {
        let s = Script::parse_body("[0:00:00] a\n[0:00:04] b").unwrap();
        assert_eq!(s.segments[0].end_seconds, 4.0);
    }

    #[test]
    fn test_end_never_precedes_start() {
        let seg = TimedSegment::new(5.0, 3.0, "x".into());
        assert_eq!(seg.end_seconds, 5.0);
    }

    #[test]
    fn test_empty_body() {
        let s = Script::parse_body("").unwrap();
        assert!(s.is_empty());
        assert_eq!(s.total_span_seconds(), 0.0);
    }
}
