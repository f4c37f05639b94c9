//! Free-text variant: the model is asked to answer with a JSON object in prose
//! instead of calling `addReceipt`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const TEXT_PROMPT: &str = "Parse this receipt and answer with a single JSON object \
with the keys date (ISO8601, eg. 2024-02-17), amount (total as a string), shop, \
description (brief description of the purchased articles) and confidence \
(a number between 0 and 1).";

/// Receipt as produced by the free-text variant. `amount` stays a string and
/// the model reports its own confidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegacyExpense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub date: String,
    pub amount: String,
    pub shop: String,
    pub description: String,
    pub confidence: f64,
}

impl LegacyExpense {
    pub fn from_text(text: &str) -> Result<Self, ValidationError> {
        Ok(serde_json::from_str(strip_code_fence(text))?)
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Remove a Markdown ```` ```json ```` wrapper. Prefix and suffix are
/// stripped independently; anything else is returned untouched.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.strip_prefix("```json\n").unwrap_or(text);
    text.strip_suffix("\n```").unwrap_or(text)
}
