//! Context-aware translation with timing preservation.

use super::client::{GenAiClient, GenerationConfig};
use super::fallback::{CallFailure, FallbackPolicy, WinningPair};
use crate::chunking::TranscriptChunker;
use crate::config::TranslationContext;
use crate::error::{Result, SzinkronError};
use crate::jobs::CancelToken;
use crate::segmenter::Script;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, instrument};

/// Translation quality levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationQuality {
    /// Quick translation, may sacrifice some accuracy.
    Fast,
    /// Balance between speed and quality.
    #[default]
    Balanced,
    /// High quality, slower processing.
    High,
}

impl std::str::FromStr for TranslationQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(TranslationQuality::Fast),
            "balanced" => Ok(TranslationQuality::Balanced),
            "high" => Ok(TranslationQuality::High),
            _ => Err(format!("Unknown translation quality: {}", s)),
        }
    }
}

impl TranslationQuality {
    fn generation_config(&self) -> GenerationConfig {
        match self {
            TranslationQuality::Fast => GenerationConfig {
                temperature: 0.1,
                top_p: 0.8,
                max_output_tokens: 8192,
            },
            TranslationQuality::Balanced => GenerationConfig {
                temperature: 0.2,
                top_p: 0.85,
                max_output_tokens: 8192,
            },
            TranslationQuality::High => GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                max_output_tokens: 8192,
            },
        }
    }
}

/// Parameters of one translation run.
#[derive(Debug, Clone)]
pub struct TranslationParams {
    pub target_language: String,
    pub context: TranslationContext,
    pub audience: String,
    pub tone: String,
    pub quality: TranslationQuality,
}

/// Generative translator for timed scripts.
pub struct Translator {
    client: GenAiClient,
    chunker: TranscriptChunker,
}

impl Translator {
    pub fn new(client: GenAiClient, chunker: TranscriptChunker) -> Self {
        Self { client, chunker }
    }

    /// Estimated cost of translating this script.
    pub fn quote(&self, script: &Script) -> f64 {
        self.client.quote_chars(script.char_count())
    }

    /// Translate a timed script into the target language.
    #[instrument(skip_all, fields(target = %params.target_language, context = %params.context))]
    pub async fn translate(
        &self,
        script: &Script,
        params: &TranslationParams,
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
            self.translate_chunked(&body, params, &policy, cancel).await?
        } else {
            self.translate_single(&body, params, &policy, cancel).await?
        };

        let mut translated = Script::parse_body(&text)?;
        translated.header = script.header.clone();
        translated.header.translator = Some(pair.tag());
        Ok((translated, pair))
    }

    async fn translate_single(
        &self,
        body: &str,
        params: &TranslationParams,
        policy: &FallbackPolicy,
        cancel: &CancelToken,
    ) -> Result<(String, WinningPair)> {
        let prompt = build_prompt(body, params);
        let config = params.quality.generation_config();

        policy
            .run(cancel, |model, region| {
                let prompt = prompt.clone();
                let body = body.to_string();
                async move {
                    let output = self.client.generate(&model, &region, &prompt, config).await?;
                    validate_translation(&body, &output)?;
                    Ok(output)
                }
            })
            .await
    }

    async fn translate_chunked(
        &self,
        body: &str,
        params: &TranslationParams,
        policy: &FallbackPolicy,
        cancel: &CancelToken,
    ) -> Result<(String, WinningPair)> {
        let chunks = self.chunker.split(body)?;
        info!("Translating in {} chunks", chunks.len());

        let mut outputs = Vec::with_capacity(chunks.len());
        let mut winner: Option<WinningPair> = None;

        for chunk in &chunks {
            let (output, pair) = self.translate_single(chunk, params, policy, cancel).await?;
            outputs.push(output);
            winner.get_or_insert(pair);
        }

        let merged = self.chunker.merge(&outputs);
        let pair = winner.expect("at least one chunk was processed");
        Ok((merged, pair))
    }
}

fn build_prompt(body: &str, params: &TranslationParams) -> String {
    let info = params.context.instructions();
    format!(
        "Translate this timed script into {target}.\n\
         \n\
         CRITICAL: this is a TIMED SCRIPT for audio synthesis. Timing is sacred.\n\
         \n\
         TRANSLATION CONTEXT:\n\
         - Content type: {context}\n\
         - Target audience: {audience}\n\
         - Desired tone: {tone}\n\
         - Special instruction: {instruction}\n\
         - Terminology: {terminology}\n\
         - Mood: {mood}\n\
         \n\
         TIMING PRESERVATION RULES:\n\
         1. Keep every [h:mm:ss] timestamp EXACTLY as written.\n\
         2. The translated text must fit the same time slots.\n\
         3. If a translation runs long, split the line into several lines that all \
         carry the source line's timestamp.\n\
         4. Merge adjacent lines only when the translation would otherwise overflow \
         its slot badly; the merged line keeps the earlier timestamp.\n\
         5. Pass the pause markers \u{2022} and \u{2022}\u{2022} through untranslated.\n\
         \n\
         QUALITY: {quality:?}\n\
         \n\
         SOURCE SCRIPT:\n\
         {body}\n\
         \n\
         TRANSLATED SCRIPT:",
        target = params.target_language,
        context = params.context,
        audience = params.audience,
        tone = params.tone,
        instruction = info.instruction,
        terminology = info.terminology,
        mood = info.tone,
        quality = params.quality,
        body = body,
    )
}

/// Accept a translation only when its timestamps are a non-decreasing
/// sequence drawn from the source timestamps and the length ratio is sane.
/// Anything else is a transient failure so the next fallback pair runs.
fn validate_translation(original_body: &str, output: &str) -> std::result::Result<(), CallFailure> {
    let transient = |msg: &str| {
        CallFailure::Transient(SzinkronError::TransientRemote(msg.to_string()))
    };

    if output.trim().is_empty() {
        return Err(transient("Translator returned empty output"));
    }
    if output.trim() == original_body.trim() {
        return Err(transient("Translator returned the source text unchanged"));
    }

    let original =
        Script::parse_body(original_body).map_err(|_| transient("Source body unparseable"))?;
    let translated =
        Script::parse_body(output).map_err(|_| transient("Translation output unparseable"))?;

    let source_times: HashSet<u32> = original.timestamps().into_iter().collect();
    let out_times = translated.timestamps();

    if out_times.is_empty() {
        return Err(transient("Translation lost all timestamps"));
    }
    if out_times.windows(2).any(|w| w[0] > w[1]) {
        return Err(transient("Translation timestamps are not non-decreasing"));
    }
    if out_times.iter().any(|t| !source_times.contains(t)) {
        return Err(transient("Translation invented timestamps"));
    }
    let covered: HashSet<u32> = out_times.iter().copied().collect();
    if covered.len() * 2 < source_times.len() {
        return Err(transient("Translation dropped most timestamps"));
    }

    let src_chars = original_body.chars().count().max(1);
    let out_chars = output.chars().count();
    let ratio = out_chars as f64 / src_chars as f64;
    if !(0.5..=2.0).contains(&ratio) {
        return Err(transient("Translation length out of bounds"));
    }

    Ok(())
}

/// Supported target languages for the interactive picker and the API.
pub fn supported_languages() -> Vec<(&'static str, &'static str)> {
    vec![
        ("en-US", "English (US)"),
        ("en-GB", "English (UK)"),
        ("de-DE", "German"),
        ("fr-FR", "French"),
        ("es-ES", "Spanish"),
        ("it-IT", "Italian"),
        ("pt-PT", "Portuguese"),
        ("ru-RU", "Russian"),
        ("zh-CN", "Chinese (Simplified)"),
        ("ja-JP", "Japanese"),
        ("ko-KR", "Korean"),
        ("ar-SA", "Arabic"),
        ("hi-IN", "Hindi"),
        ("tr-TR", "Turkish"),
        ("pl-PL", "Polish"),
        ("nl-NL", "Dutch"),
        ("sv-SE", "Swedish"),
        ("da-DK", "Danish"),
        ("no-NO", "Norwegian"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "[0:00:01] Sziasztok, üdvözöllek benneteket! •\n[0:00:03] Ma egy izgalmas témáról beszélek.";

    #[test]
    fn test_validate_accepts_good_translation() {
        let output =
            "[0:00:01] Hello, welcome everyone! •\n[0:00:03] Today I am talking about an exciting topic.";
        assert!(validate_translation(SOURCE, output).is_ok());
    }

    #[test]
    fn test_validate_accepts_split_lines_with_repeated_timestamp() {
        let output = "[0:00:01] Hello, welcome everyone! •\n[0:00:03] Today I am talking\n[0:00:03] about an exciting topic.";
        assert!(validate_translation(SOURCE, output).is_ok());
    }

    #[test]
    fn test_validate_rejects_unchanged_output() {
        assert!(validate_translation(SOURCE, SOURCE).is_err());
    }

    #[test]
    fn test_validate_rejects_decreasing_timestamps() {
        let output = "[0:00:03] Today.\n[0:00:01] Hello.";
        assert!(validate_translation(SOURCE, output).is_err());
    }

    #[test]
    fn test_validate_rejects_invented_timestamps() {
        let output = "[0:00:01] Hello!\n[0:05:00] Something else.";
        assert!(validate_translation(SOURCE, output).is_err());
    }

    #[test]
    fn test_validate_rejects_length_blowup() {
        let long = "word ".repeat(200);
        let output = format!("[0:00:01] {}\n[0:00:03] ok.", long);
        assert!(validate_translation(SOURCE, &output).is_err());
    }

    #[test]
    fn test_prompt_reflects_context_family() {
        let params = TranslationParams {
            target_language: "en-US".into(),
            context: TranslationContext::Spiritual,
            audience: "general public".into(),
            tone: "uplifting".into(),
            quality: TranslationQuality::High,
        };
        let prompt = build_prompt("[0:00:00] szöveg", &params);
        assert!(prompt.contains("spiritual"));
        assert!(prompt.contains("uplifting"));
        assert!(prompt.contains("reverent"));
        assert!(prompt.contains("[0:00:00] szöveg"));
    }

    #[test]
    fn test_supported_languages_contains_default_target() {
        assert!(supported_languages().iter().any(|(code, _)| *code == "en-US"));
    }
}
