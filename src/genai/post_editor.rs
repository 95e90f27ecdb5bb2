//! Script post-editing via the generative model.
//!
//! Cleans punctuation, capitalization, and line breaks while preserving
//! every timestamp and the segment order. Model output is re-validated by
//! the script parser; anything that drops or reorders timestamps is treated
//! as a transient failure so the fallback policy keeps going.

use super::client::{GenAiClient, GenerationConfig};
use super::fallback::{CallFailure, FallbackPolicy, WinningPair};
use crate::chunking::TranscriptChunker;
use crate::error::Result;
use crate::jobs::CancelToken;
use crate::segmenter::Script;
use tracing::{info, instrument};

const POST_EDIT_CONFIG: GenerationConfig = GenerationConfig {
    temperature: 0.3,
    top_p: 0.8,
    max_output_tokens: 8192,
};

/// Generative script post-editor.
pub struct PostEditor {
    client: GenAiClient,
    chunker: TranscriptChunker,
}

impl PostEditor {
    pub fn new(client: GenAiClient, chunker: TranscriptChunker) -> Self {
        Self { client, chunker }
    }

    /// Estimated cost of post-editing this script.
    pub fn quote(&self, script: &Script) -> f64 {
        self.client.quote_chars(script.char_count())
    }

    /// Post-edit a timed script, returning the cleaned script and the
    /// winning (model, region) pair.
    #[instrument(skip_all, fields(lines = script.segments.len()))]
    pub async fn edit(
        &self,
        script: &Script,
        desired_model: &str,
        cancel: &CancelToken,
    ) -> Result<(Script, WinningPair)> {
        let policy = FallbackPolicy::resolve(
            desired_model,
            &self.client.settings().regions,
            self.client.settings().max_attempts,
        );

        let body = script.render_body();
        let (text, pair) = if self.chunker.needs_chunking(&body) {
            self.edit_chunked(&body, &policy, cancel).await?
        } else {
            self.edit_single(&body, &policy, cancel).await?
        };

        Ok((self.rebuild(script, &text, &pair)?, pair))
    }

    async fn edit_single(
        &self,
        body: &str,
        policy: &FallbackPolicy,
        cancel: &CancelToken,
    ) -> Result<(String, WinningPair)> {
        let prompt = build_prompt(body);
        policy
            .run(cancel, |model, region| {
                let prompt = prompt.clone();
                let body = body.to_string();
                async move {
                    let output = self
                        .client
                        .generate(&model, &region, &prompt, POST_EDIT_CONFIG)
                        .await?;
                    validate_edit(&body, &output)?;
                    Ok(output)
                }
            })
            .await
    }

    async fn edit_chunked(
        &self,
        body: &str,
        policy: &FallbackPolicy,
        cancel: &CancelToken,
    ) -> Result<(String, WinningPair)> {
        let chunks = self.chunker.split(body)?;
        info!("Post-editing in {} chunks", chunks.len());

        let mut outputs = Vec::with_capacity(chunks.len());
        let mut winner: Option<WinningPair> = None;

        for chunk in &chunks {
            let (output, pair) = self.edit_single(chunk, policy, cancel).await?;
            outputs.push(output);
            winner.get_or_insert(pair);
        }

        let merged = self.chunker.merge(&outputs);
        let pair = winner.expect("at least one chunk was processed");
        Ok((merged, pair))
    }

    /// Re-parse the edited body and stamp the header with the winner.
    fn rebuild(&self, original: &Script, edited_body: &str, pair: &WinningPair) -> Result<Script> {
        let mut edited = Script::parse_body(edited_body)?;
        edited.header = original.header.clone();
        edited.header.post_editor = Some(pair.tag());
        Ok(edited)
    }
}

fn build_prompt(body: &str) -> String {
    format!(
        "Rewrite this timed transcript into a clean, professional script.\n\
         \n\
         RULES:\n\
         1. Keep EVERY timestamp [h:mm:ss] exactly as it appears, in the same order.\n\
         2. Never merge, drop, or reorder timestamped lines.\n\
         3. Fix punctuation and capitalization; keep the original wording and language.\n\
         4. Keep the inline pause markers \u{2022} and \u{2022}\u{2022} where they stand.\n\
         5. Keep blank lines as paragraph breaks.\n\
         6. Output only the script lines, no commentary.\n\
         \n\
         TRANSCRIPT:\n\
         {}\n\
         \n\
         CLEANED SCRIPT:",
        body
    )
}

/// Accept the model output only if it parses and preserves the timestamp
/// sequence of the input.
fn validate_edit(original_body: &str, output: &str) -> std::result::Result<(), CallFailure> {
    let original = Script::parse_body(original_body).map_err(|e| {
        CallFailure::Fatal(crate::error::SzinkronError::Internal(format!(
            "Post-edit input failed to parse: {}",
            e
        )))
    })?;

    let edited = Script::parse_body(output).map_err(|e| {
        CallFailure::Transient(crate::error::SzinkronError::TransientRemote(format!(
            "Post-edit output failed to parse: {}",
            e
        )))
    })?;

    if edited.timestamps() != original.timestamps() {
        return Err(CallFailure::Transient(
            crate::error::SzinkronError::TransientRemote(
                "Post-edit output altered the timestamp sequence".into(),
            ),
        ));
    }

    if !edited.check_ordering() {
        return Err(CallFailure::Transient(
            crate::error::SzinkronError::TransientRemote(
                "Post-edit output has out-of-order segments".into(),
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_preserving_edit() {
        let original = "[0:00:00] szia mindenki •\n[0:00:03] ma erről beszélünk";
        let edited = "[0:00:00] Szia mindenki! •\n[0:00:03] Ma erről beszélünk.";
        assert!(validate_edit(original, edited).is_ok());
    }

    #[test]
    fn test_validate_rejects_dropped_timestamp() {
        let original = "[0:00:00] a\n[0:00:03] b";
        let edited = "[0:00:00] a b";
        assert!(matches!(
            validate_edit(original, edited),
            Err(CallFailure::Transient(_))
        ));
    }

    #[test]
    fn test_validate_rejects_reordered_timestamps() {
        let original = "[0:00:00] a\n[0:00:03] b";
        let edited = "[0:00:03] b\n[0:00:00] a";
        assert!(matches!(
            validate_edit(original, edited),
            Err(CallFailure::Transient(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unparseable_output() {
        let original = "[0:00:00] a";
        assert!(matches!(
            validate_edit(original, "just prose with no timestamps"),
            Err(CallFailure::Transient(_))
        ));
    }

    #[test]
    fn test_prompt_contains_rules_and_body() {
        let prompt = build_prompt("[0:00:00] szöveg");
        assert!(prompt.contains("[0:00:00] szöveg"));
        assert!(prompt.contains("EVERY timestamp"));
    }
}
