//! Gateway operations: one variant per distinct prompt
//!
//! Each operation binds a template name to an output shape. Structured
//! operations declare a JSON schema (required keys, enum value sets,
//! array-of-object nesting); the gateway's guarantee is structural only,
//! content stays the model's responsibility.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::Story;
use crate::llm::ResponseSchema;

/// A distinct prompt operation the gateway can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// One opening question per active persona, keyed by persona
    QuestionBatch,
    /// Next question for one persona from full story history
    FollowUpQuestion,
    /// Next question for a scenario or scenario group
    ScenarioQuestion,
    /// "Does this persona have open questions left?"
    SatisfactionCheck,
    /// Story rewrite from skip-filtered history
    StoryRewrite,
    /// Raw requirement into a well-formed story
    StoryRefinement,
    /// Complexity verdict with optional split suggestions
    ComplexityAnalysis,
    /// Test scenario list from story text
    TestScenarios,
    /// Scenario titles for a feature
    ScenarioTitles,
    /// Meeting transcript into user stories
    TranscriptStories,
    /// Gherkin for a single scenario
    GherkinSingle,
    /// Gherkin for a scenario group, matched back by exact title
    GherkinGroup,
    /// Scenario-outline template with ordered placeholder headers
    OutlineSkeleton,
    /// HTML prototype from story text
    PrototypeFromStory,
    /// HTML prototype from an assembled feature file
    PrototypeFromFeature,
    /// Step definitions for a feature file and target technology
    StepDefinitions,
    /// PO readiness checklist
    Checklist,
    /// Meeting transcript analysis with fixed headings
    TranscriptAnalysis,
    /// Example-table column extraction from an outline
    TableColumns,
}

impl Operation {
    /// Template name for this operation
    pub fn template(&self) -> &'static str {
        match self {
            Operation::QuestionBatch => "question-batch",
            Operation::FollowUpQuestion => "follow-up-question",
            Operation::ScenarioQuestion => "scenario-question",
            Operation::SatisfactionCheck => "satisfaction-check",
            Operation::StoryRewrite => "story-rewrite",
            Operation::StoryRefinement => "story-refinement",
            Operation::ComplexityAnalysis => "complexity-analysis",
            Operation::TestScenarios => "test-scenarios",
            Operation::ScenarioTitles => "scenario-titles",
            Operation::TranscriptStories => "transcript-stories",
            Operation::GherkinSingle => "gherkin-single",
            Operation::GherkinGroup => "gherkin-group",
            Operation::OutlineSkeleton => "outline-skeleton",
            Operation::PrototypeFromStory => "prototype-story",
            Operation::PrototypeFromFeature => "prototype-feature",
            Operation::StepDefinitions => "step-definitions",
            Operation::Checklist => "checklist",
            Operation::TranscriptAnalysis => "transcript-analysis",
            Operation::TableColumns => "table-columns",
        }
    }

    /// Structured-output schema, None for free-text operations
    pub fn schema(&self) -> Option<ResponseSchema> {
        let schema = match self {
            Operation::QuestionBatch => json!({
                "type": "object",
                "properties": {
                    "questions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "persona": { "type": "string" },
                                "question": { "type": "string" }
                            },
                            "required": ["persona", "question"]
                        }
                    }
                },
                "required": ["questions"]
            }),
            Operation::SatisfactionCheck => json!({
                "type": "object",
                "properties": {
                    "satisfied": { "type": "boolean" },
                    "reason": { "type": "string" }
                },
                "required": ["satisfied", "reason"]
            }),
            Operation::StoryRefinement => json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" }
                },
                "required": ["title", "description"]
            }),
            Operation::ComplexityAnalysis => json!({
                "type": "object",
                "properties": {
                    "complexity": { "type": "string", "enum": ["Baixa", "Média", "Alta"] },
                    "justification": { "type": "string" },
                    "suggestedStories": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "description": { "type": "string" }
                            },
                            "required": ["title", "description"]
                        }
                    }
                },
                "required": ["complexity", "justification"]
            }),
            Operation::ScenarioTitles => json!({
                "type": "object",
                "properties": {
                    "scenarios": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "type": { "type": "string", "enum": ["scenario", "outline"] }
                            },
                            "required": ["title", "type"]
                        }
                    }
                },
                "required": ["scenarios"]
            }),
            Operation::TranscriptStories => json!({
                "type": "object",
                "properties": {
                    "stories": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "description": { "type": "string" }
                            },
                            "required": ["title", "description"]
                        }
                    }
                },
                "required": ["stories"]
            }),
            Operation::GherkinGroup => json!({
                "type": "object",
                "properties": {
                    "scenarios": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "gherkin": { "type": "string" }
                            },
                            "required": ["title", "gherkin"]
                        }
                    }
                },
                "required": ["scenarios"]
            }),
            Operation::OutlineSkeleton => json!({
                "type": "object",
                "properties": {
                    "template": { "type": "string" },
                    "headers": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["template", "headers"]
            }),
            Operation::TableColumns => json!({
                "type": "object",
                "properties": {
                    "columns": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["columns"]
            }),
            // Free-text operations
            Operation::FollowUpQuestion
            | Operation::ScenarioQuestion
            | Operation::StoryRewrite
            | Operation::TestScenarios
            | Operation::GherkinSingle
            | Operation::PrototypeFromStory
            | Operation::PrototypeFromFeature
            | Operation::StepDefinitions
            | Operation::Checklist
            | Operation::TranscriptAnalysis => return None,
        };

        Some(ResponseSchema::new(self.template().replace('-', "_"), schema))
    }

    /// Whether this operation expects a structured JSON reply
    pub fn is_structured(&self) -> bool {
        self.schema().is_some()
    }
}

// Typed payloads for the structured operations

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBatchPayload {
    pub questions: Vec<PersonaQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaQuestion {
    pub persona: String,
    pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SatisfactionPayload {
    pub satisfied: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTitlesPayload {
    pub scenarios: Vec<ScenarioTitleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTitleEntry {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: crate::domain::ScenarioKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptStoriesPayload {
    pub stories: Vec<Story>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GherkinGroupPayload {
    pub scenarios: Vec<GherkinEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GherkinEntry {
    pub title: String,
    pub gherkin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutlineSkeletonPayload {
    pub template: String,
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableColumnsPayload {
    pub columns: Vec<String>,
}
