//! In-process tool backend facade over the question ledger.
//!
//! Exposes the ledger through the same capability contract as the external
//! graph and similarity backends, so the policy invokes every memory write
//! through one gateway shape. Payloads are plain text, matching the
//! operator-facing views.

use crate::store::{render_answered, render_unanswered, QuestionLedger};
use async_trait::async_trait;
use tracing::debug;
use twinmem_types::error::TwinResult;
use twinmem_types::question::AnswerStatus;
use twinmem_types::tool::{ToolBackend, ToolDescriptor, ToolResponse};

/// Operation name for recording a new unanswered question.
pub const OP_RECORD_QUESTION: &str = "record_question_with_no_answer";
/// Operation name for listing pending questions.
pub const OP_LIST_UNANSWERED: &str = "get_questions_with_no_answer";
/// Operation name for listing answered questions.
pub const OP_LIST_ANSWERED: &str = "get_questions_with_answer";
/// Operation name for recording an official answer.
pub const OP_RECORD_ANSWER: &str = "record_answer_to_question";

/// The ledger as a tool backend.
#[derive(Clone)]
pub struct LedgerBackend {
    ledger: QuestionLedger,
}

impl LedgerBackend {
    /// Wrap a ledger store.
    pub fn new(ledger: QuestionLedger) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl ToolBackend for LedgerBackend {
    fn name(&self) -> &str {
        "ledger"
    }

    async fn capabilities(&self) -> TwinResult<Vec<ToolDescriptor>> {
        Ok(vec![
            ToolDescriptor {
                name: OP_RECORD_QUESTION.to_string(),
                description:
                    "Record a question to the database that currently has no answer.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "question": { "type": "string", "description": "The string content of the question." }
                    },
                    "required": ["question"]
                }),
            },
            ToolDescriptor {
                name: OP_LIST_UNANSWERED.to_string(),
                description:
                    "Retrieve all the recorded questions where there is no official answer."
                        .to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            },
            ToolDescriptor {
                name: OP_LIST_ANSWERED.to_string(),
                description:
                    "Retrieve all the recorded questions that have been provided with an official answer."
                        .to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            },
            ToolDescriptor {
                name: OP_RECORD_ANSWER.to_string(),
                description: "Update a question in the database with an official answer."
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "description": "The integer ID of the question." },
                        "answer": { "type": "string", "description": "The string content of the answer." }
                    },
                    "required": ["id", "answer"]
                }),
            },
        ])
    }

    async fn invoke(&self, op: &str, args: serde_json::Value) -> TwinResult<ToolResponse> {
        debug!(op, "Ledger backend invocation");
        match op {
            OP_RECORD_QUESTION => {
                let Some(question) = args.get("question").and_then(|q| q.as_str()) else {
                    return Ok(ToolResponse::fail("missing required argument 'question'"));
                };
                match self.ledger.record_unanswered(question) {
                    Ok(_) => Ok(ToolResponse::ok(serde_json::json!(
                        "Recorded question with no answer"
                    ))),
                    Err(e) => Ok(ToolResponse::fail(e.to_string())),
                }
            }
            OP_LIST_UNANSWERED => match self.ledger.list_unanswered() {
                Ok(rows) => Ok(ToolResponse::ok(serde_json::json!(render_unanswered(
                    &rows
                )))),
                Err(e) => Ok(ToolResponse::fail(e.to_string())),
            },
            OP_LIST_ANSWERED => match self.ledger.list_answered() {
                Ok(rows) => Ok(ToolResponse::ok(serde_json::json!(render_answered(&rows)))),
                Err(e) => Ok(ToolResponse::fail(e.to_string())),
            },
            OP_RECORD_ANSWER => {
                let Some(id) = args.get("id").and_then(|i| i.as_i64()) else {
                    return Ok(ToolResponse::fail("missing required argument 'id'"));
                };
                let Some(answer) = args.get("answer").and_then(|a| a.as_str()) else {
                    return Ok(ToolResponse::fail("missing required argument 'answer'"));
                };
                match self.ledger.record_answer(id, answer) {
                    Ok(AnswerStatus::Recorded) => Ok(ToolResponse::ok(serde_json::json!(
                        "Recorded answer to question"
                    ))),
                    Ok(AnswerStatus::NotFound) => Ok(ToolResponse::fail(format!(
                        "no question with id {id}"
                    ))),
                    Err(e) => Ok(ToolResponse::fail(e.to_string())),
                }
            }
            other => Ok(ToolResponse::fail(format!(
                "unknown ledger operation '{other}'"
            ))),
        }
    }
}
