//! SSML generation for timed scripts.

use crate::segmenter::TimedSegment;

/// Convert a script (or a slice of its segments) to an SSML document.
///
/// Each segment becomes a prosody-wrapped text fragment followed by an
/// explicit break equal to the gap to the next segment's start, clamped to
/// the provider's maximum break length. Inline pause markers are stripped;
/// punctuation is preserved.
pub fn script_to_ssml(segments: &[TimedSegment], max_break_seconds: f64) -> String {
    let mut out = String::from("<speak>");

    for (i, seg) in segments.iter().enumerate() {
        let text = escape_xml(&seg.clean_text());
        if text.is_empty() {
            continue;
        }
        out.push_str(&format!("<prosody rate=\"medium\">{}</prosody>", text));

        if let Some(next) = segments.get(i + 1) {
            let gap = (next.start_seconds - seg.end_seconds).max(0.0);
            if gap >= 0.5 {
                let clamped = gap.min(max_break_seconds);
                out.push_str(&format!("<break time=\"{:.1}s\"/>", clamped));
            }
        }
    }

    out.push_str("</speak>");
    out
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::TimedSegment;

    fn seg(start: f64, end: f64, text: &str) -> TimedSegment {
        TimedSegment::new(start, end, text.to_string())
    }

    #[test]
    fn test_breaks_match_gaps() {
        let segments = vec![seg(0.0, 2.0, "Hello."), seg(4.5, 6.0, "World.")];
        let ssml = script_to_ssml(&segments, 10.0);
        assert!(ssml.starts_with("<speak>"));
        assert!(ssml.contains("<break time=\"2.5s\"/>"));
        assert!(ssml.ends_with("</speak>"));
    }

    #[test]
    fn test_break_clamped_to_provider_max() {
        let segments = vec![seg(0.0, 1.0, "a"), seg(60.0, 61.0, "b")];
        let ssml = script_to_ssml(&segments, 10.0);
        assert!(ssml.contains("<break time=\"10.0s\"/>"));
    }

    #[test]
    fn test_small_gaps_get_no_break() {
        let segments = vec![seg(0.0, 1.0, "a"), seg(1.2, 2.0, "b")];
        let ssml = script_to_ssml(&segments, 10.0);
        assert!(!ssml.contains("<break"));
    }

    #[test]
    fn test_markers_stripped_and_text_escaped() {
        let segments = vec![seg(0.0, 1.0, "Tom & Jerry • <friends>")];
        let ssml = script_to_ssml(&segments, 10.0);
        assert!(ssml.contains("Tom &amp; Jerry &lt;friends&gt;"));
        assert!(!ssml.contains('•'));
    }

    #[test]
    fn test_empty_segments_skipped() {
        let segments = vec![seg(0.0, 1.0, "•")];
        assert_eq!(script_to_ssml(&segments, 10.0), "<speak></speak>");
    }
}
