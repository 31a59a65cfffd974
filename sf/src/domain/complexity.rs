//! Complexity analysis types

use serde::{Deserialize, Serialize};

use super::Story;

/// Complexity verdict for a story
///
/// Wire values are the Portuguese labels the prompts ask for; English
/// aliases are accepted defensively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityLevel {
    #[serde(rename = "Baixa", alias = "Low")]
    Low,
    #[serde(rename = "Média", alias = "Medium")]
    Medium,
    #[serde(rename = "Alta", alias = "High")]
    High,
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComplexityLevel::Low => "Baixa",
            ComplexityLevel::Medium => "Média",
            ComplexityLevel::High => "Alta",
        };
        write!(f, "{}", s)
    }
}

/// Result of a complexity analysis call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    pub complexity: ComplexityLevel,
    pub justification: String,

    /// Suggested child stories; present by prompt contract only when the
    /// verdict is High
    #[serde(default, rename = "suggestedStories")]
    pub suggested_stories: Vec<Story>,
}

impl ComplexityAnalysis {
    /// Child stories eligible for splitting
    ///
    /// Non-High verdicts report no candidates even when a malformed reply
    /// carried stories anyway.
    pub fn split_candidates(&self) -> &[Story] {
        match self.complexity {
            ComplexityLevel::High => &self.suggested_stories,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portuguese_wire_names() {
        let level: ComplexityLevel = serde_json::from_str("\"Alta\"").unwrap();
        assert_eq!(level, ComplexityLevel::High);
        let level: ComplexityLevel = serde_json::from_str("\"Baixa\"").unwrap();
        assert_eq!(level, ComplexityLevel::Low);
        assert_eq!(serde_json::to_string(&ComplexityLevel::Medium).unwrap(), "\"Média\"");
    }

    #[test]
    fn test_english_aliases_accepted() {
        let level: ComplexityLevel = serde_json::from_str("\"High\"").unwrap();
        assert_eq!(level, ComplexityLevel::High);
    }

    #[test]
    fn test_non_high_hides_suggested_stories() {
        // Malformed reply: stories present despite a Baixa verdict
        let analysis = ComplexityAnalysis {
            complexity: ComplexityLevel::Low,
            justification: "simple".to_string(),
            suggested_stories: vec![Story::new("S1", "d1")],
        };
        assert!(analysis.split_candidates().is_empty());

        let analysis = ComplexityAnalysis {
            complexity: ComplexityLevel::High,
            justification: "large".to_string(),
            suggested_stories: vec![Story::new("S1", "d1"), Story::new("S2", "d2")],
        };
        assert_eq!(analysis.split_candidates().len(), 2);
    }

    #[test]
    fn test_missing_suggested_stories_defaults_empty() {
        let json = r#"{"complexity": "Alta", "justification": "big"}"#;
        let analysis: ComplexityAnalysis = serde_json::from_str(json).unwrap();
        // Treated as "no split available" rather than a crash
        assert!(analysis.split_candidates().is_empty());
    }
}
