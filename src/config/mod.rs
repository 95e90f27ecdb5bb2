//! Configuration management for Szinkron.

mod contexts;
mod models;
mod settings;

pub use contexts::{ContextInstructions, TranslationContext};
pub use models::{auto_detect_order, model_description, GenAiModels};
pub use settings::{
    ChunkingSettings, GeneralSettings, GenAiSettings, JobSettings, PauseSettings,
    RecognizerSettings, ServerSettings, Settings, TranslationSettings, TtsSettings,
    VideoSettings,
};
