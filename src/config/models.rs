//! Generative model catalog and auto-detection ordering.

/// Known generative model ids for the post-editor and translator.
pub struct GenAiModels;

impl GenAiModels {
    // Current generation models (recommended)
    pub const FLASH_2_0: &'static str = "gemini-2.0-flash";
    pub const FLASH_2_5: &'static str = "gemini-2.5-flash";
    pub const PRO_2_5: &'static str = "gemini-2.5-pro";

    // Legacy models (fallback)
    pub const PRO_1_5: &'static str = "gemini-1.5-pro";
    pub const FLASH_1_5: &'static str = "gemini-1.5-flash";
    pub const PRO_LEGACY: &'static str = "gemini-pro";

    /// Sentinel selecting automatic model detection.
    pub const AUTO: &'static str = "auto";

    /// All selectable models, in presentation order.
    pub fn all() -> Vec<&'static str> {
        vec![
            Self::FLASH_2_0,
            Self::FLASH_2_5,
            Self::PRO_2_5,
            Self::PRO_1_5,
            Self::FLASH_1_5,
            Self::AUTO,
        ]
    }
}

/// Candidate order used when the configured model is `auto`:
/// recommended-fast, latest-fast, recommended-detailed, legacy fallbacks.
pub fn auto_detect_order() -> Vec<String> {
    vec![
        GenAiModels::FLASH_2_0.to_string(),
        GenAiModels::FLASH_2_5.to_string(),
        GenAiModels::PRO_1_5.to_string(),
        GenAiModels::FLASH_1_5.to_string(),
        GenAiModels::PRO_LEGACY.to_string(),
    ]
}

/// Human-readable description shown in the interactive model picker.
pub fn model_description(model: &str) -> &'static str {
    match model {
        GenAiModels::FLASH_2_0 => "Fast and efficient (recommended)",
        GenAiModels::FLASH_2_5 => "Latest fast model",
        GenAiModels::PRO_2_5 => "Latest detailed model",
        GenAiModels::PRO_1_5 => "Detailed analysis",
        GenAiModels::FLASH_1_5 => "Classic fast",
        GenAiModels::AUTO => "Automatic selection",
        _ => "Unknown model",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_order_starts_with_recommended_fast() {
        let order = auto_detect_order();
        assert_eq!(order[0], GenAiModels::FLASH_2_0);
        assert!(order.contains(&GenAiModels::PRO_LEGACY.to_string()));
    }
}
