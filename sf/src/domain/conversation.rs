//! Conversation transcript with invariant-preserving mutations
//!
//! The transcript is append-only except for the single mutation that
//! attaches an answer to the last open question. The type enforces the
//! core invariant: at most the last turn may lack an answer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Persona;

/// Sentinel answer marking a deliberately skipped question
///
/// Skipped turns stay in the visible transcript but are excluded from
/// rewrite/derivation context.
pub const SKIP_ANSWER: &str = "[skipped]";

/// Errors from conversation mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("No open question to answer")]
    NoOpenQuestion,

    #[error("Cannot append a question while one is awaiting an answer")]
    QuestionPending,

    #[error("Answer must not be empty")]
    EmptyAnswer,
}

/// One entry in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnEntry {
    /// A persona question, possibly answered
    Question {
        persona: Persona,
        question: String,
        answer: Option<String>,
    },
    /// Narrative marker (e.g. "round completed"); carries no persona
    /// semantics and is skipped by rotation logic
    Marker { text: String },
}

/// A transcript turn with its monotonic id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: u64,
    pub entry: TurnEntry,
}

/// A question/answer pair from the transcript, skip-filtered views use this
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnsweredPair<'a> {
    pub persona: Persona,
    pub question: &'a str,
    pub answer: &'a str,
}

/// Ordered, append-only conversation transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// All turns in order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Whether the final turn is an unanswered question
    pub fn awaiting_answer(&self) -> bool {
        matches!(
            self.turns.last(),
            Some(Turn {
                entry: TurnEntry::Question { answer: None, .. },
                ..
            })
        )
    }

    /// The currently open question, if any
    pub fn open_question(&self) -> Option<(Persona, &str)> {
        match self.turns.last() {
            Some(Turn {
                entry:
                    TurnEntry::Question {
                        persona,
                        question,
                        answer: None,
                    },
                ..
            }) => Some((*persona, question.as_str())),
            _ => None,
        }
    }

    /// Persona of the most recent question turn, markers skipped
    pub fn last_question_persona(&self) -> Option<Persona> {
        self.turns.iter().rev().find_map(|t| match &t.entry {
            TurnEntry::Question { persona, .. } => Some(*persona),
            TurnEntry::Marker { .. } => None,
        })
    }

    /// Append a new unanswered question turn
    ///
    /// Rejected while an earlier question is still awaiting its answer; the
    /// invariant is that at most the last turn lacks an answer.
    pub fn push_question(&mut self, persona: Persona, question: impl Into<String>) -> Result<u64, ConversationError> {
        if self.awaiting_answer() {
            return Err(ConversationError::QuestionPending);
        }
        let id = self.allocate_id();
        self.turns.push(Turn {
            id,
            entry: TurnEntry::Question {
                persona,
                question: question.into(),
                answer: None,
            },
        });
        Ok(id)
    }

    /// Append a narrative marker turn
    ///
    /// Rejected while a question is awaiting its answer, same as
    /// `push_question`; a marker after an open question would bury it as a
    /// non-last unanswered turn that can never be answered.
    pub fn push_marker(&mut self, text: impl Into<String>) -> Result<u64, ConversationError> {
        if self.awaiting_answer() {
            return Err(ConversationError::QuestionPending);
        }
        let id = self.allocate_id();
        self.turns.push(Turn {
            id,
            entry: TurnEntry::Marker { text: text.into() },
        });
        Ok(id)
    }

    /// Attach an answer to the open question
    ///
    /// `text` must be non-empty; use [`SKIP_ANSWER`] to skip explicitly.
    pub fn answer_last(&mut self, text: impl Into<String>) -> Result<(), ConversationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyAnswer);
        }
        match self.turns.last_mut() {
            Some(Turn {
                entry: TurnEntry::Question { answer: answer @ None, .. },
                ..
            }) => {
                *answer = Some(text);
                Ok(())
            }
            _ => Err(ConversationError::NoOpenQuestion),
        }
    }

    /// Answered question/answer pairs, excluding skipped turns and markers
    ///
    /// This is the context view used for rewrites and derivations: skipped
    /// turns must not pollute those prompts.
    pub fn answered_pairs(&self) -> impl Iterator<Item = AnsweredPair<'_>> {
        self.turns.iter().filter_map(|t| match &t.entry {
            TurnEntry::Question {
                persona,
                question,
                answer: Some(answer),
            } if answer != SKIP_ANSWER => Some(AnsweredPair {
                persona: *persona,
                question,
                answer,
            }),
            _ => None,
        })
    }

    /// Count of answered, non-skipped turns
    pub fn answered_count(&self) -> usize {
        self.answered_pairs().count()
    }

    /// Render the full transcript (markers and skips included) for display
    pub fn render_transcript(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            match &turn.entry {
                TurnEntry::Question {
                    persona,
                    question,
                    answer,
                } => {
                    out.push_str(&format!("[{}] {}\n", persona, question));
                    match answer.as_deref() {
                        Some(SKIP_ANSWER) => out.push_str("  (skipped)\n"),
                        Some(a) => out.push_str(&format!("  > {}\n", a)),
                        None => out.push_str("  (awaiting answer)\n"),
                    }
                }
                TurnEntry::Marker { text } => {
                    out.push_str(&format!("--- {} ---\n", text));
                }
            }
        }
        out
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
