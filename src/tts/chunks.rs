//! Chunked parallel synthesis.
//!
//! Scripts longer than a provider's per-call character cap are split on
//! segment boundaries (never mid-line), synthesized with a bounded worker
//! pool, and stitched by byte concatenation of the same-format streams.

use crate::error::{Result, SzinkronError};
use crate::jobs::CancelToken;
use crate::segmenter::TimedSegment;
use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, info};

/// Group segments into chunks whose synthesizable text stays under
/// `max_chars`. A single oversized segment still forms its own chunk.
pub fn group_segments(segments: &[TimedSegment], max_chars: usize) -> Vec<Vec<TimedSegment>> {
    let mut chunks: Vec<Vec<TimedSegment>> = Vec::new();
    let mut current: Vec<TimedSegment> = Vec::new();
    let mut current_chars = 0usize;

    for seg in segments {
        let len = seg.clean_text().chars().count();
        if len == 0 {
            continue;
        }
        if !current.is_empty() && current_chars + len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push(seg.clone());
        current_chars += len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Synthesize chunks in parallel with at most `workers` in flight, then
/// concatenate the audio streams in order.
///
/// The per-chunk closure must return audio in a container that concatenates
/// cleanly (the adapters request MP3 for chunked runs and re-encode once at
/// the end when the caller asked for something else).
pub async fn synthesize_chunks<F, Fut>(
    chunks: Vec<Vec<TimedSegment>>,
    workers: usize,
    cancel: &CancelToken,
    synth: F,
) -> Result<Vec<u8>>
where
    F: Fn(usize, Vec<TimedSegment>) -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
{
    let total = chunks.len();
    info!("Synthesizing {} chunks with {} workers", total, workers);

    let mut results: Vec<Option<Vec<u8>>> = vec![None; total];

    let mut in_flight = stream::iter(chunks.into_iter().enumerate())
        .map(|(idx, chunk)| {
            let synth = &synth;
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return (idx, Err(SzinkronError::Cancelled));
                }
                let result = synth(idx, chunk).await;
                (idx, result)
            }
        })
        .buffer_unordered(workers.max(1));

    while let Some((idx, result)) = in_flight.next().await {
        match result {
            Ok(bytes) => {
                debug!("Chunk {}/{} synthesized ({} bytes)", idx + 1, total, bytes.len());
                results[idx] = Some(bytes);
            }
            Err(e) => return Err(e),
        }
    }

    let mut combined = Vec::new();
    for (idx, slot) in results.into_iter().enumerate() {
        match slot {
            Some(bytes) => combined.extend_from_slice(&bytes),
            None => {
                return Err(SzinkronError::Internal(format!(
                    "Chunk {} produced no audio",
                    idx
                )));
            }
        }
    }

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, text: &str) -> TimedSegment {
        TimedSegment::new(start, start + 1.0, text.to_string())
    }

    #[test]
    fn test_grouping_respects_cap() {
        let segments: Vec<TimedSegment> = (0..12)
            .map(|i| seg(i as f64 * 8.0, "tizenkét karakter itt van"))
            .collect();
        let chunks = group_segments(&segments, 80);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            let chars: usize = chunk.iter().map(|s| s.clean_text().chars().count()).sum();
            assert!(chars <= 80);
        }
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, 12);
    }

    #[test]
    fn test_never_splits_a_segment() {
        let segments = vec![seg(0.0, &"hosszú ".repeat(50))];
        let chunks = group_segments(&segments, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 1);
    }

    #[test]
    fn test_marker_only_segments_skipped() {
        let segments = vec![seg(0.0, "•"), seg(1.0, "valódi szöveg")];
        let chunks = group_segments(&segments, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 1);
    }

    #[tokio::test]
    async fn test_parallel_synthesis_preserves_order() {
        let chunks: Vec<Vec<TimedSegment>> =
            (0..5).map(|i| vec![seg(i as f64, "x")]).collect();
        let cancel = CancelToken::new();

        let combined = synthesize_chunks(chunks, 3, &cancel, |idx, _| async move {
            // later chunks finish first; stitching must stay ordered
            tokio::time::sleep(std::time::Duration::from_millis((5 - idx as u64) * 10)).await;
            Ok(vec![idx as u8; 2])
        })
        .await
        .unwrap();

        assert_eq!(combined, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[tokio::test]
    async fn test_chunk_failure_propagates() {
        let chunks: Vec<Vec<TimedSegment>> = (0..3).map(|i| vec![seg(i as f64, "x")]).collect();
        let cancel = CancelToken::new();

        let result = synthesize_chunks(chunks, 2, &cancel, |idx, _| async move {
            if idx == 1 {
                Err(SzinkronError::QuotaExceeded("spent".into()))
            } else {
                Ok(vec![0u8])
            }
        })
        .await;

        assert!(matches!(result, Err(SzinkronError::QuotaExceeded(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let chunks = vec![vec![seg(0.0, "x")]];
        let result =
            synthesize_chunks(chunks, 1, &cancel, |_, _| async move { Ok(vec![0u8]) }).await;
        assert!(matches!(result, Err(SzinkronError::Cancelled)));
    }
}
