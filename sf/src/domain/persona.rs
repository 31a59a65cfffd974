//! Personas - fixed viewpoints used to frame generated questions

use serde::{Deserialize, Serialize};

/// A fixed viewpoint used to frame generated questions
///
/// ProductOwner never asks questions; it only produces story rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Developer,
    Qa,
    Architect,
    Ux,
    DevOps,
    ProductOwner,
}

impl Persona {
    /// All personas, in display order
    pub const ALL: [Persona; 6] = [
        Persona::Developer,
        Persona::Qa,
        Persona::Architect,
        Persona::Ux,
        Persona::DevOps,
        Persona::ProductOwner,
    ];

    /// Personas eligible for question rounds
    pub fn questioners() -> impl Iterator<Item = Persona> {
        Self::ALL.into_iter().filter(|p| p.asks_questions())
    }

    /// Whether this persona participates in question rounds
    pub fn asks_questions(&self) -> bool {
        !matches!(self, Persona::ProductOwner)
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Persona::Developer => "Developer",
            Persona::Qa => "QA",
            Persona::Architect => "Architect",
            Persona::Ux => "UX",
            Persona::DevOps => "DevOps",
            Persona::ProductOwner => "Product Owner",
        }
    }

    /// Stable wire key, matching the serde representation
    pub fn key(&self) -> &'static str {
        match self {
            Persona::Developer => "developer",
            Persona::Qa => "qa",
            Persona::Architect => "architect",
            Persona::Ux => "ux",
            Persona::DevOps => "dev_ops",
            Persona::ProductOwner => "product_owner",
        }
    }

    /// Question-generation guideline injected verbatim into prompts
    pub fn guideline(&self) -> &'static str {
        match self {
            Persona::Developer => {
                "Ask about implementation details, data handling, integration points, \
                 and technical constraints the story leaves unstated."
            }
            Persona::Qa => {
                "Ask about acceptance criteria, edge cases, failure modes, and how \
                 success of the story can be verified."
            }
            Persona::Architect => {
                "Ask about system boundaries, scalability, dependencies on other \
                 components, and long-term maintainability implications."
            }
            Persona::Ux => {
                "Ask about user flows, error feedback, accessibility, and what the \
                 user sees at each step of the interaction."
            }
            Persona::DevOps => {
                "Ask about deployment, configuration, monitoring, and operational \
                 concerns the story implies."
            }
            Persona::ProductOwner => {
                "Do not ask questions. Rewrite the story so it captures everything \
                 learned in the conversation, keeping the user-story format."
            }
        }
    }

    /// Parse from a user-supplied label (config file, CLI)
    pub fn parse(s: &str) -> Option<Persona> {
        match s.trim().to_lowercase().as_str() {
            "developer" | "dev" => Some(Persona::Developer),
            "qa" | "tester" => Some(Persona::Qa),
            "architect" | "arch" => Some(Persona::Architect),
            "ux" | "designer" => Some(Persona::Ux),
            "devops" | "dev_ops" | "ops" => Some(Persona::DevOps),
            "product_owner" | "po" | "product owner" => Some(Persona::ProductOwner),
            _ => None,
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
