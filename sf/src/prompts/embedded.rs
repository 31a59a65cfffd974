//! Embedded prompts
//!
//! Compiled into the binary from .pmt files; one template per gateway
//! operation. User overrides in `.storyforge/prompts/` take precedence at
//! load time.

/// Template names paired with their embedded sources
pub const TEMPLATES: &[(&str, &str)] = &[
    ("question-batch", include_str!("../../prompts/question-batch.pmt")),
    ("follow-up-question", include_str!("../../prompts/follow-up-question.pmt")),
    ("scenario-question", include_str!("../../prompts/scenario-question.pmt")),
    ("satisfaction-check", include_str!("../../prompts/satisfaction-check.pmt")),
    ("story-rewrite", include_str!("../../prompts/story-rewrite.pmt")),
    ("story-refinement", include_str!("../../prompts/story-refinement.pmt")),
    ("complexity-analysis", include_str!("../../prompts/complexity-analysis.pmt")),
    ("test-scenarios", include_str!("../../prompts/test-scenarios.pmt")),
    ("scenario-titles", include_str!("../../prompts/scenario-titles.pmt")),
    ("transcript-stories", include_str!("../../prompts/transcript-stories.pmt")),
    ("gherkin-single", include_str!("../../prompts/gherkin-single.pmt")),
    ("gherkin-group", include_str!("../../prompts/gherkin-group.pmt")),
    ("outline-skeleton", include_str!("../../prompts/outline-skeleton.pmt")),
    ("prototype-story", include_str!("../../prompts/prototype-story.pmt")),
    ("prototype-feature", include_str!("../../prompts/prototype-feature.pmt")),
    ("step-definitions", include_str!("../../prompts/step-definitions.pmt")),
    ("checklist", include_str!("../../prompts/checklist.pmt")),
    ("transcript-analysis", include_str!("../../prompts/transcript-analysis.pmt")),
    ("table-columns", include_str!("../../prompts/table-columns.pmt")),
];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    TEMPLATES.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
}
