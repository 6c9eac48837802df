//! Verdicts - the classification and assessment returned for a claim

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Classification assigned to a checked claim
///
/// The provider returns free-form classification strings; the known set is
/// mapped onto closed variants and anything else is preserved verbatim in
/// `Other` rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rating {
    /// The claim is supported by the sources
    True,
    /// The claim is contradicted by the sources
    False,
    /// Parts of the claim hold, parts do not
    PartiallyTrue,
    /// Technically accurate but presented misleadingly
    Misleading,
    /// The sources do not settle the claim either way
    Unverifiable,
    /// A provider classification outside the known set
    Other(String),
}

impl Rating {
    /// Map a provider classification string onto a rating
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "true" => Rating::True,
            "false" => Rating::False,
            "partially true" | "partly true" | "half true" => Rating::PartiallyTrue,
            "misleading" => Rating::Misleading,
            "unverifiable" | "inconclusive" => Rating::Unverifiable,
            _ => Rating::Other(raw.trim().to_string()),
        }
    }

    /// Canonical display form
    pub fn as_str(&self) -> &str {
        match self {
            Rating::True => "True",
            Rating::False => "False",
            Rating::PartiallyTrue => "Partially True",
            Rating::Misleading => "Misleading",
            Rating::Unverifiable => "Unverifiable",
            Rating::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Rating::parse(&raw))
    }
}

/// The decoded outcome of a verification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Classification of the claim
    pub rating: Rating,

    /// Narrative assessment from the provider
    pub assessment: String,

    /// Source URLs backing the assessment, in provider order
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Verdict {
    /// Create a verdict without sources
    pub fn new(rating: Rating, assessment: impl Into<String>) -> Self {
        Self {
            rating,
            assessment: assessment.into(),
            sources: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ratings() {
        assert_eq!(Rating::parse("True"), Rating::True);
        assert_eq!(Rating::parse("FALSE"), Rating::False);
        assert_eq!(Rating::parse("partially true"), Rating::PartiallyTrue);
        assert_eq!(Rating::parse("Misleading"), Rating::Misleading);
        assert_eq!(Rating::parse("inconclusive"), Rating::Unverifiable);
    }

    #[test]
    fn test_unknown_rating_preserved() {
        let rating = Rating::parse("Satire");
        assert_eq!(rating, Rating::Other("Satire".to_string()));
        assert_eq!(rating.as_str(), "Satire");
    }

    #[test]
    fn test_rating_serde_round_trip() {
        let json = serde_json::to_string(&Rating::PartiallyTrue).unwrap();
        assert_eq!(json, "\"Partially True\"");
        let parsed: Rating = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Rating::PartiallyTrue);
    }

    #[test]
    fn test_verdict_sources_default() {
        let json = r#"{"rating": "True", "assessment": "Well supported."}"#;
        let verdict: Verdict = serde_json::from_str(json).unwrap();
        assert_eq!(verdict.rating, Rating::True);
        assert!(verdict.sources.is_empty());
    }
}
