//! Question ledger row types.

use serde::{Deserialize, Serialize};

/// A question recorded in the ledger. Created pending (`answer` absent);
/// the only lifecycle transition is pending → answered, performed by an
/// operator. `id` is immutable and is the sole handle for that transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Auto-increment row id.
    pub id: i64,
    /// The verbatim question text.
    pub question: String,
    /// The official answer, absent while pending.
    pub answer: Option<String>,
}

impl Question {
    /// Whether this question has been answered.
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// Outcome of recording an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStatus {
    /// The answer was recorded (or was already recorded identically).
    Recorded,
    /// No question with that id exists. Non-fatal.
    NotFound,
}
