//! Extracted claims - the unit of work for the fact-check dispatcher

use serde::{Deserialize, Serialize};

/// A discrete factual statement extracted from user input
///
/// Extractor output order is preserved for display. Claims are not
/// deduplicated; the same statement appearing twice is checked twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedClaim {
    /// The claim text, independently verifiable
    pub text: String,

    /// Speaker attribution, when the extractor identified one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl ExtractedClaim {
    /// Create a claim without speaker attribution
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker: None,
        }
    }

    /// Attach a speaker to the claim
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Validate that the claim is checkable
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("claim text is empty".to_string());
        }
        Ok(())
    }
}
