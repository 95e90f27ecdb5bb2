//! Generative-model clients: script post-editing and translation.
//!
//! Both components share one fallback policy over (region, model, attempt)
//! and differ only in their prompt and output validation.

mod client;
mod fallback;
mod post_editor;
mod translator;

pub use client::{GenAiClient, GenerationConfig};
pub use fallback::{CallFailure, FallbackPolicy, WinningPair};
pub use post_editor::PostEditor;
pub use translator::{supported_languages, TranslationParams, TranslationQuality, Translator};
