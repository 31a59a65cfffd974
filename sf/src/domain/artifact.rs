//! Derived artifact slots and request status tracking
//!
//! Each artifact kind has an independent slot: one derivation failing never
//! clears or invalidates another already-computed artifact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kinds of derived artifacts stored on the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    TestScenarios,
    Prototype,
    Checklist,
    StepDefinitions,
    TranscriptAnalysis,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::TestScenarios,
        ArtifactKind::Prototype,
        ArtifactKind::Checklist,
        ArtifactKind::StepDefinitions,
        ArtifactKind::TranscriptAnalysis,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::TestScenarios => "test scenarios",
            ArtifactKind::Prototype => "prototype",
            ArtifactKind::Checklist => "PO checklist",
            ArtifactKind::StepDefinitions => "step definitions",
            ArtifactKind::TranscriptAnalysis => "transcript analysis",
        }
    }
}

/// Status of one artifact derivation request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Idle,
    InFlight,
    Done,
    Failed(String),
}

/// One artifact slot: the stored value plus its request status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSlot {
    pub value: Option<String>,
    pub status: RequestStatus,
}

/// All artifact slots for a session, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSlots {
    slots: BTreeMap<ArtifactKind, ArtifactSlot>,
}

impl ArtifactSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for a kind (default Idle/empty when never touched)
    pub fn get(&self, kind: ArtifactKind) -> ArtifactSlot {
        self.slots.get(&kind).cloned().unwrap_or_default()
    }

    /// Stored value for a kind, if the derivation completed
    pub fn value(&self, kind: ArtifactKind) -> Option<&str> {
        self.slots.get(&kind).and_then(|s| s.value.as_deref())
    }

    /// Mark a derivation as started
    pub fn mark_in_flight(&mut self, kind: ArtifactKind) {
        let slot = self.slots.entry(kind).or_default();
        slot.status = RequestStatus::InFlight;
    }

    /// Store a completed derivation (last-writer-wins per slot)
    pub fn record(&mut self, kind: ArtifactKind, value: impl Into<String>) {
        self.slots.insert(
            kind,
            ArtifactSlot {
                value: Some(value.into()),
                status: RequestStatus::Done,
            },
        );
    }

    /// Record a failure without touching the previously stored value
    pub fn record_failure(&mut self, kind: ArtifactKind, message: impl Into<String>) {
        let slot = self.slots.entry(kind).or_default();
        slot.status = RequestStatus::Failed(message.into());
    }

    /// Clear every slot (round reset)
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Target technology for step-definition generation
///
/// Selects the fixed framework-convention block injected into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepTechnology {
    CypressJs,
    PlaywrightTs,
    CucumberJava,
    BehavePython,
}

impl StepTechnology {
    pub fn name(&self) -> &'static str {
        match self {
            StepTechnology::CypressJs => "Cypress (JavaScript)",
            StepTechnology::PlaywrightTs => "Playwright (TypeScript)",
            StepTechnology::CucumberJava => "Cucumber (Java)",
            StepTechnology::BehavePython => "Behave (Python)",
        }
    }

    /// Framework conventions injected verbatim into the prompt
    pub fn conventions(&self) -> &'static str {
        match self {
            StepTechnology::CypressJs => {
                "Use @badeball/cypress-cucumber-preprocessor step syntax. Select \
                 elements exclusively via [data-testid] attributes with cy.get(). \
                 One step definition file per feature."
            }
            StepTechnology::PlaywrightTs => {
                "Use playwright-bdd createBdd() bindings with async steps and the \
                 page fixture. Select elements via page.getByTestId(). Type every \
                 step argument explicitly."
            }
            StepTechnology::CucumberJava => {
                "Use cucumber-java annotations (@Given/@When/@Then) on methods of a \
                 single steps class. Drive the browser through a Selenium WebDriver \
                 field selected by data-testid CSS selectors."
            }
            StepTechnology::BehavePython => {
                "Use behave @given/@when/@then decorators with context-based state. \
                 Select elements via CSS [data-testid] selectors on context.browser."
            }
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cypress" | "cypress-js" => Some(StepTechnology::CypressJs),
            "playwright" | "playwright-ts" => Some(StepTechnology::PlaywrightTs),
            "cucumber" | "cucumber-java" | "java" => Some(StepTechnology::CucumberJava),
            "behave" | "behave-python" | "python" => Some(StepTechnology::BehavePython),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_independent() {
        let mut slots = ArtifactSlots::new();
        slots.record(ArtifactKind::Prototype, "<html></html>");
        slots.record_failure(ArtifactKind::Checklist, "network down");

        // The prototype slot is untouched by the checklist failure
        assert_eq!(slots.value(ArtifactKind::Prototype), Some("<html></html>"));
        assert_eq!(slots.get(ArtifactKind::Prototype).status, RequestStatus::Done);
        assert!(matches!(slots.get(ArtifactKind::Checklist).status, RequestStatus::Failed(_)));
        assert!(slots.value(ArtifactKind::Checklist).is_none());
    }

    #[test]
    fn test_failure_keeps_previous_value() {
        let mut slots = ArtifactSlots::new();
        slots.record(ArtifactKind::Checklist, "old checklist");
        slots.record_failure(ArtifactKind::Checklist, "timeout");

        // A retry failure leaves the previously computed artifact available
        assert_eq!(slots.value(ArtifactKind::Checklist), Some("old checklist"));
    }

    #[test]
    fn test_last_writer_wins() {
        let mut slots = ArtifactSlots::new();
        slots.record(ArtifactKind::TestScenarios, "v1");
        slots.record(ArtifactKind::TestScenarios, "v2");
        assert_eq!(slots.value(ArtifactKind::TestScenarios), Some("v2"));
    }

    #[test]
    fn test_untouched_slot_is_idle() {
        let slots = ArtifactSlots::new();
        assert_eq!(slots.get(ArtifactKind::StepDefinitions).status, RequestStatus::Idle);
    }

    #[test]
    fn test_technology_parse() {
        assert_eq!(StepTechnology::parse("cypress"), Some(StepTechnology::CypressJs));
        assert_eq!(StepTechnology::parse("Playwright"), Some(StepTechnology::PlaywrightTs));
        assert_eq!(StepTechnology::parse("cobol"), None);
    }
}
