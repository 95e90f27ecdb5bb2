//! Pause detection and timed script formatting.
//!
//! Turns recognizer word hits into a timestamped, pause-annotated script:
//! inter-word gaps are categorized against configured thresholds, inline
//! breath markers are inserted, and new timestamped lines open on sentence
//! ends, paragraph breaks, or when a line outgrows the soft length limit.

mod script;

pub use script::{
    format_timestamp, parse_timestamp, Script, ScriptHeader, TimedSegment, LONG_BREATH,
    SHORT_BREATH,
};

use crate::config::PauseSettings;
use crate::recognizer::RecognizerHit;
use tracing::debug;

/// Category of the pause following a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKind {
    None,
    /// Inline `•`.
    ShortBreath,
    /// Inline `••`.
    LongBreath,
    /// Sentence end: break to a new timestamped line.
    SentenceEnd,
    /// Paragraph break: blank line before the next segment.
    Paragraph,
}

/// Speech statistics accumulated while formatting.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct ScriptStats {
    pub total_words: usize,
    pub mean_confidence: f64,
    pub short_pauses: usize,
    pub long_pauses: usize,
    pub paragraphs: usize,
    pub words_per_minute: f64,
    /// Fraction of the total span spent in measured pauses.
    pub pause_fraction: f64,
}

/// Pause categorizer.
pub struct PauseSegmenter {
    settings: PauseSettings,
}

impl PauseSegmenter {
    pub fn new(settings: PauseSettings) -> Self {
        Self { settings }
    }

    /// Categorize the gap after `word`.
    ///
    /// Paragraph wins at its threshold; the sentence-end rule covers
    /// terminal-punctuated gaps below it.
    pub fn categorize(&self, gap: f64, word: &str) -> PauseKind {
        if gap < self.settings.min {
            return PauseKind::None;
        }
        if gap >= self.settings.paragraph {
            return PauseKind::Paragraph;
        }
        if gap >= self.settings.sentence_end && ends_sentence(word) {
            return PauseKind::SentenceEnd;
        }
        if gap >= self.settings.long {
            return PauseKind::LongBreath;
        }
        if gap >= self.settings.short {
            return PauseKind::ShortBreath;
        }
        PauseKind::None
    }
}

fn ends_sentence(word: &str) -> bool {
    word.trim_end()
        .chars()
        .last()
        .is_some_and(|c| matches!(c, '.' | '!' | '?' | '…'))
}

/// Formats recognizer hits into a `Script` plus statistics.
pub struct ScriptFormatter {
    segmenter: PauseSegmenter,
    line_soft_limit: usize,
}

impl ScriptFormatter {
    pub fn new(settings: PauseSettings) -> Self {
        let line_soft_limit = settings.line_soft_limit;
        Self {
            segmenter: PauseSegmenter::new(settings),
            line_soft_limit,
        }
    }

    /// Build a timed script from ordered recognizer hits.
    ///
    /// With `breath_marking` disabled, line structure is kept but no inline
    /// markers are emitted.
    pub fn format(
        &self,
        hits: &[RecognizerHit],
        header: ScriptHeader,
        breath_marking: bool,
    ) -> (Script, ScriptStats) {
        if hits.is_empty() {
            return (Script::new(header, Vec::new()), ScriptStats::default());
        }

        let mut stats = ScriptStats {
            total_words: hits.len(),
            ..Default::default()
        };

        let mut segments: Vec<TimedSegment> = Vec::new();
        let mut line = LineBuilder::new(&hits[0]);
        let mut paragraph_pending = false;
        let mut speaking_time = 0.0;
        let mut pause_time = 0.0;
        let mut confidence_sum = 0.0;

        for (i, hit) in hits.iter().enumerate() {
            speaking_time += (hit.end_seconds - hit.start_seconds).max(0.0);
            confidence_sum += hit.confidence;

            if line.is_empty() {
                line.reset_to(hit);
                line.paragraph_before = paragraph_pending;
                paragraph_pending = false;
            }
            line.push_word(&hit.word, hit.end_seconds, hit.confidence);

            let pause = match hits.get(i + 1) {
                Some(next) => {
                    let gap = (next.start_seconds - hit.end_seconds).max(0.0);
                    let kind = self.segmenter.categorize(gap, &hit.word);
                    if kind != PauseKind::None {
                        pause_time += gap;
                    }
                    kind
                }
                None => PauseKind::None,
            };

            match pause {
                PauseKind::ShortBreath => {
                    stats.short_pauses += 1;
                    if breath_marking {
                        line.push_marker(SHORT_BREATH);
                    }
                }
                PauseKind::LongBreath => {
                    stats.long_pauses += 1;
                    if breath_marking {
                        line.push_marker(LONG_BREATH);
                    }
                }
                PauseKind::SentenceEnd => {
                    segments.push(line.take());
                }
                PauseKind::Paragraph => {
                    stats.paragraphs += 1;
                    segments.push(line.take());
                    paragraph_pending = true;
                }
                PauseKind::None => {}
            }

            if !line.is_empty() && line.char_count() > self.line_soft_limit {
                segments.push(line.take());
            }
        }

        if !line.is_empty() {
            segments.push(line.take());
        }

        clamp_overlaps(&mut segments);

        stats.mean_confidence = confidence_sum / hits.len() as f64;
        if speaking_time > 0.0 {
            stats.words_per_minute = hits.len() as f64 / speaking_time * 60.0;
        }
        if speaking_time + pause_time > 0.0 {
            stats.pause_fraction = pause_time / (speaking_time + pause_time);
        }

        debug!(
            words = stats.total_words,
            lines = segments.len(),
            short = stats.short_pauses,
            long = stats.long_pauses,
            paragraphs = stats.paragraphs,
            "Formatted script"
        );

        (Script::new(header, segments), stats)
    }
}

/// Enforce `end[i] <= start[i+1]` across consecutive lines.
fn clamp_overlaps(segments: &mut [TimedSegment]) {
    for i in 1..segments.len() {
        let next_start = segments[i].start_seconds;
        let prev = &mut segments[i - 1];
        if prev.end_seconds > next_start {
            prev.end_seconds = next_start.max(prev.start_seconds);
        }
    }
}

/// Accumulates one output line.
struct LineBuilder {
    start_seconds: f64,
    end_seconds: f64,
    words: Vec<String>,
    confidences: Vec<f64>,
    paragraph_before: bool,
}

impl LineBuilder {
    fn new(first: &RecognizerHit) -> Self {
        Self {
            start_seconds: first.start_seconds,
            end_seconds: first.start_seconds,
            words: Vec::new(),
            confidences: Vec::new(),
            paragraph_before: false,
        }
    }

    fn reset_to(&mut self, hit: &RecognizerHit) {
        self.start_seconds = hit.start_seconds;
        self.end_seconds = hit.start_seconds;
    }

    fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn push_word(&mut self, word: &str, end_seconds: f64, confidence: f64) {
        self.words.push(word.trim().to_string());
        self.confidences.push(confidence);
        self.end_seconds = end_seconds.max(self.end_seconds);
    }

    fn push_marker(&mut self, marker: &str) {
        self.words.push(marker.to_string());
    }

    fn char_count(&self) -> usize {
        self.words.iter().map(|w| w.chars().count() + 1).sum()
    }

    fn take(&mut self) -> TimedSegment {
        let text = self.words.join(" ");
        let confidence = if self.confidences.is_empty() {
            None
        } else {
            Some(self.confidences.iter().sum::<f64>() / self.confidences.len() as f64)
        };
        let mut seg = TimedSegment::new(self.start_seconds, self.end_seconds, text);
        seg.confidence = confidence;
        seg.paragraph_before = self.paragraph_before;

        self.words.clear();
        self.confidences.clear();
        self.paragraph_before = false;
        seg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::RecognizerHit;

    fn hit(word: &str, start: f64, end: f64) -> RecognizerHit {
        RecognizerHit {
            word: word.to_string(),
            start_seconds: start,
            end_seconds: end,
            confidence: 0.9,
        }
    }

    fn formatter() -> ScriptFormatter {
        ScriptFormatter::new(PauseSettings::default())
    }

    #[test]
    fn test_categorize_thresholds() {
        let seg = PauseSegmenter::new(PauseSettings::default());
        assert_eq!(seg.categorize(0.2, "szó"), PauseKind::None);
        assert_eq!(seg.categorize(0.5, "szó"), PauseKind::None);
        assert_eq!(seg.categorize(0.6, "szó"), PauseKind::ShortBreath);
        assert_eq!(seg.categorize(1.4, "szó"), PauseKind::ShortBreath);
        assert_eq!(seg.categorize(1.5, "szó"), PauseKind::LongBreath);
        assert_eq!(seg.categorize(2.9, "szó"), PauseKind::LongBreath);
        assert_eq!(seg.categorize(3.0, "szó"), PauseKind::Paragraph);
        assert_eq!(seg.categorize(5.0, "vége."), PauseKind::Paragraph);
    }

    #[test]
    fn test_sentence_end_needs_punctuation_and_gap() {
        let seg = PauseSegmenter::new(PauseSettings::default());
        assert_eq!(seg.categorize(1.2, "vége."), PauseKind::SentenceEnd);
        assert_eq!(seg.categorize(1.2, "vége!"), PauseKind::SentenceEnd);
        assert_eq!(seg.categorize(0.8, "vége."), PauseKind::ShortBreath);
        assert_eq!(seg.categorize(1.2, "szó"), PauseKind::ShortBreath);
    }

    #[test]
    fn test_short_breath_marker_inline() {
        // 0.05s gap: nothing; 1.30s gap: inline short-breath marker
        let hits = vec![
            hit("w1", 0.0, 0.40),
            hit("w2", 0.45, 0.80),
            hit("w3", 2.10, 2.50),
        ];
        let (script, stats) = formatter().format(&hits, ScriptHeader::default(), true);
        assert_eq!(script.segments.len(), 1);
        assert_eq!(script.segments[0].text, "w1 w2 • w3");
        assert_eq!(script.render_body(), "[0:00:00] w1 w2 • w3");
        assert_eq!(stats.short_pauses, 1);
        assert_eq!(stats.total_words, 3);
    }

    #[test]
    fn test_paragraph_break_renders_blank_line() {
        let hits = vec![hit("első", 0.0, 0.5), hit("második", 4.0, 4.5)];
        let (script, stats) = formatter().format(&hits, ScriptHeader::default(), true);
        assert_eq!(script.segments.len(), 2);
        assert!(script.segments[1].paragraph_before);
        assert_eq!(
            script.render_body(),
            "[0:00:00] első\n\n[0:00:04] második"
        );
        assert_eq!(stats.paragraphs, 1);
    }

    #[test]
    fn test_sentence_end_starts_new_line() {
        let hits = vec![hit("vége.", 0.0, 0.5), hit("új", 1.8, 2.2)];
        let (script, _) = formatter().format(&hits, ScriptHeader::default(), true);
        assert_eq!(script.segments.len(), 2);
        assert_eq!(script.render_body(), "[0:00:00] vége.\n[0:00:01] új");
    }

    #[test]
    fn test_breath_marking_disabled_keeps_structure() {
        let hits = vec![
            hit("w1", 0.0, 0.40),
            hit("w2", 1.2, 1.6),
            hit("w3", 6.0, 6.4),
        ];
        let (script, stats) = formatter().format(&hits, ScriptHeader::default(), false);
        assert_eq!(script.segments.len(), 2);
        assert_eq!(script.segments[0].text, "w1 w2");
        // pauses are still counted, just not rendered
        assert_eq!(stats.short_pauses, 1);
        assert_eq!(stats.paragraphs, 1);
    }

    #[test]
    fn test_soft_line_limit_breaks_line() {
        let mut hits = Vec::new();
        for i in 0..40 {
            let t = i as f64 * 0.5;
            hits.push(hit("hosszúszó", t, t + 0.4));
        }
        let (script, _) = formatter().format(&hits, ScriptHeader::default(), true);
        assert!(script.segments.len() > 1);
        for seg in &script.segments {
            assert!(seg.text.chars().count() <= 120);
        }
    }

    #[test]
    fn test_zero_duration_hit() {
        let hits = vec![hit("egy", 1.0, 1.0)];
        let (script, _) = formatter().format(&hits, ScriptHeader::default(), true);
        assert_eq!(script.segments.len(), 1);
        assert_eq!(script.segments[0].start_seconds, 1.0);
        assert_eq!(script.segments[0].end_seconds, 1.0);
    }

    #[test]
    fn test_empty_hits_empty_script() {
        let (script, stats) = formatter().format(&[], ScriptHeader::default(), true);
        assert!(script.is_empty());
        assert_eq!(stats, ScriptStats::default());
    }

    #[test]
    fn test_segment_ordering_invariant() {
        let hits = vec![
            hit("a.", 0.0, 2.0),
            hit("b", 3.1, 3.4),
            hit("c.", 3.5, 4.0),
            hit("d", 8.0, 8.5),
        ];
        let (script, _) = formatter().format(&hits, ScriptHeader::default(), true);
        assert!(script.check_ordering());
    }

    #[test]
    fn test_stats_words_per_minute() {
        // 4 words over 2.0s of speech -> 120 wpm
        let hits = vec![
            hit("a", 0.0, 0.5),
            hit("b", 0.5, 1.0),
            hit("c", 1.0, 1.5),
            hit("d", 1.5, 2.0),
        ];
        let (_, stats) = formatter().format(&hits, ScriptHeader::default(), true);
        assert!((stats.words_per_minute - 120.0).abs() < 1e-9);
        assert!((stats.mean_confidence - 0.9).abs() < 1e-9);
    }
}
