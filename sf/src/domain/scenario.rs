//! BDD scenario types and the scenario-outline placeholder contract

use serde::{Deserialize, Serialize};

/// Kind of BDD scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Scenario,
    Outline,
}

/// A BDD scenario tracked by the session
///
/// `gherkin` stays None until the derivation pipeline fills it; `completed`
/// is set once gherkin is accepted into the feature file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BddScenario {
    pub id: u64,
    pub title: String,
    pub gherkin: Option<String>,
    pub completed: bool,
    pub kind: ScenarioKind,
}

impl BddScenario {
    pub fn new(id: u64, title: impl Into<String>, kind: ScenarioKind) -> Self {
        Self {
            id,
            title: title.into(),
            gherkin: None,
            completed: false,
            kind,
        }
    }
}

/// A scenario-outline skeleton: a Gherkin template with `<placeholder>`
/// tokens plus the ordered header list for the example table
///
/// Header order must match the order placeholders first appear in the
/// template; the table-entry UI consumes that ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSkeleton {
    pub template: String,
    pub headers: Vec<String>,
}

impl OutlineSkeleton {
    /// Build a skeleton, normalizing headers to template placeholder order
    ///
    /// Headers not present in the template are dropped; placeholders missing
    /// from the given headers are still included so the table stays usable.
    pub fn normalized(template: String, _headers: Vec<String>) -> Self {
        let headers = placeholder_order(&template);
        Self { template, headers }
    }

    /// Whether the header list matches the template placeholder order
    pub fn headers_in_template_order(&self) -> bool {
        self.headers == placeholder_order(&self.template)
    }
}

/// Extract `<placeholder>` tokens from a Gherkin template in order of first
/// appearance, duplicates dropped
pub fn placeholder_order(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else { break };
        let token = after[..end].trim();
        if !token.is_empty() && !token.contains('\n') && !seen.iter().any(|s| s == token) {
            seen.push(token.to_string());
        }
        rest = &after[end + 1..];
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "Scenario Outline: Login\n\
                            Given a user \"<username>\"\n\
                            When they enter \"<password>\"\n\
                            Then they see \"<message>\"\n\
                            And \"<username>\" is logged";

    #[test]
    fn test_placeholder_order_first_appearance() {
        let order = placeholder_order(TEMPLATE);
        assert_eq!(order, vec!["username", "password", "message"]);
    }

    #[test]
    fn test_placeholder_order_empty_template() {
        assert!(placeholder_order("Given nothing").is_empty());
    }

    #[test]
    fn test_normalized_reorders_headers() {
        // Model returned headers out of order; contract demands template order
        let skeleton = OutlineSkeleton::normalized(
            TEMPLATE.to_string(),
            vec!["message".to_string(), "username".to_string(), "password".to_string()],
        );
        assert_eq!(skeleton.headers, vec!["username", "password", "message"]);
        assert!(skeleton.headers_in_template_order());
    }

    #[test]
    fn test_new_scenario_is_incomplete() {
        let scenario = BddScenario::new(1, "Login works", ScenarioKind::Scenario);
        assert!(scenario.gherkin.is_none());
        assert!(!scenario.completed);
    }
}
