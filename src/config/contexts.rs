//! Canned translation-context instruction sets.
//!
//! Each context tag selects a fixed instruction family so any rewrite of the
//! translation prompt reproduces the same guidance.

use serde::{Deserialize, Serialize};

/// Supported translation contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationContext {
    Legal,
    Spiritual,
    Marketing,
    Scientific,
    Educational,
    News,
    #[default]
    Casual,
}

impl TranslationContext {
    /// All contexts, in presentation order.
    pub fn all() -> &'static [TranslationContext] {
        &[
            TranslationContext::Legal,
            TranslationContext::Spiritual,
            TranslationContext::Marketing,
            TranslationContext::Scientific,
            TranslationContext::Educational,
            TranslationContext::News,
            TranslationContext::Casual,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationContext::Legal => "legal",
            TranslationContext::Spiritual => "spiritual",
            TranslationContext::Marketing => "marketing",
            TranslationContext::Scientific => "scientific",
            TranslationContext::Educational => "educational",
            TranslationContext::News => "news",
            TranslationContext::Casual => "casual",
        }
    }

    /// Instruction set baked into the translation prompt for this context.
    pub fn instructions(&self) -> ContextInstructions {
        match self {
            TranslationContext::Spiritual => ContextInstructions {
                instruction: "Preserve the spiritual, uplifting, and compassionate tone. \
                    Maintain motivational language and keep religious/spiritual terminology \
                    accurate. Focus on emotional resonance.",
                terminology: "Use respectful spiritual language, preserve metaphors and \
                    inspirational phrases",
                tone: "Warm, encouraging, and reverent",
            },
            TranslationContext::Legal => ContextInstructions {
                instruction: "Keep the formal legal register and ensure precise terminology. \
                    Maintain professional tone and accuracy of legal concepts. Avoid ambiguity.",
                terminology: "Use exact legal terminology, preserve technical precision",
                tone: "Formal, precise, and authoritative",
            },
            TranslationContext::Marketing => ContextInstructions {
                instruction: "Adapt for marketing purposes: make it persuasive, engaging, and \
                    action-oriented. Preserve selling points and emotional appeals.",
                terminology: "Use compelling marketing language, maintain call-to-action elements",
                tone: "Persuasive, engaging, and dynamic",
            },
            TranslationContext::Scientific => ContextInstructions {
                instruction: "Maintain scientific accuracy and technical precision. Keep \
                    technical terms consistent and preserve logical flow.",
                terminology: "Use precise scientific vocabulary, maintain technical accuracy",
                tone: "Objective, precise, and analytical",
            },
            TranslationContext::Educational => ContextInstructions {
                instruction: "Make it clear and educational. Ensure concepts are well-explained \
                    and accessible to the learning audience.",
                terminology: "Use clear educational language, define complex terms",
                tone: "Clear, instructive, and supportive",
            },
            TranslationContext::News => ContextInstructions {
                instruction: "Maintain journalistic objectivity and factual accuracy. Keep the \
                    informational tone and news-style structure.",
                terminology: "Use professional news language, maintain factual precision",
                tone: "Objective, informative, and professional",
            },
            TranslationContext::Casual => ContextInstructions {
                instruction: "Maintain natural conversational tone. Keep it friendly and \
                    accessible while preserving the speaker's personality.",
                terminology: "Use natural conversational language, maintain personal style",
                tone: "Natural, friendly, and conversational",
            },
        }
    }
}

impl std::str::FromStr for TranslationContext {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legal" => Ok(TranslationContext::Legal),
            "spiritual" => Ok(TranslationContext::Spiritual),
            "marketing" => Ok(TranslationContext::Marketing),
            "scientific" => Ok(TranslationContext::Scientific),
            "educational" => Ok(TranslationContext::Educational),
            "news" => Ok(TranslationContext::News),
            "casual" => Ok(TranslationContext::Casual),
            _ => Err(format!("Unknown translation context: {}", s)),
        }
    }
}

impl std::fmt::Display for TranslationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One context's prompt building blocks.
#[derive(Debug, Clone, Copy)]
pub struct ContextInstructions {
    pub instruction: &'static str,
    pub terminology: &'static str,
    pub tone: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for ctx in TranslationContext::all() {
            let parsed: TranslationContext = ctx.as_str().parse().unwrap();
            assert_eq!(parsed, *ctx);
        }
    }

    #[test]
    fn test_unknown_context_rejected() {
        assert!("poetry".parse::<TranslationContext>().is_err());
    }
}
