//! Text post-processing for recognised spans

use zhconv::{zhconv, Variant};

/// Rewrites recognised text into the script the annotator displays
pub trait ScriptNormalizer: Send + Sync {
    fn normalize(&self, text: &str) -> String;
}

/// Traditional (Hong Kong / Taiwan) to simplified Chinese
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifiedChinese;

impl ScriptNormalizer for SimplifiedChinese {
    fn normalize(&self, text: &str) -> String {
        zhconv(text, Variant::ZhCN)
    }
}

/// Leaves text untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ScriptNormalizer for Passthrough {
    fn normalize(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Purely Latin-alphanumeric spans are treated as noise, not content
pub fn is_alphanumeric_noise(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric())
}
