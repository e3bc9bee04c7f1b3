//! The policy proper: one utterance in, one response out, at most one
//! memory mutation in between.

use crate::classify::classify;
use crate::respond;
use crate::turn::{decide, SearchStatus, TurnAction, TurnContext, TurnPhase};
use tracing::{info, warn};
use twinmem_gateway::{Gateway, GraphMemory, SimilarityMemory, ADAPTER_LEDGER};
use twinmem_types::error::TwinError;
use twinmem_types::memory::FactTriple;
use twinmem_types::session::SessionId;

/// What the turn ultimately did to memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTaken {
    /// Entities/relation were created in the graph.
    GraphWrite,
    /// A note was stored in the similarity store.
    SimilarityWrite,
    /// A question was recorded in the ledger.
    LedgerWrite,
    /// No memory mutation.
    NoOp,
    /// An authorized write was attempted and failed.
    WriteFailed {
        /// The operation that failed.
        operation: String,
    },
}

/// Outcome of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The composed response, bound by the disclosure rules.
    pub response: String,
    /// The memory action taken.
    pub action: ActionTaken,
    /// Adapters whose search failed this turn.
    pub degraded: Vec<String>,
}

/// The memory orchestration policy for one session.
///
/// Holds the gateway session explicitly; turns are serialized by the
/// caller, so no locking is needed across them.
pub struct Policy {
    gateway: Gateway,
    operator_name: String,
    session_id: SessionId,
}

impl Policy {
    /// Create a policy over an established gateway session.
    pub fn new(gateway: Gateway, operator_name: impl Into<String>) -> Self {
        Self {
            gateway,
            operator_name: operator_name.into(),
            session_id: SessionId::new(),
        }
    }

    /// The gateway this policy drives.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Process one utterance: search, decide, write at most once, respond.
    ///
    /// Never fails the turn outright — backend trouble is folded into the
    /// response per the error taxonomy, and the session continues.
    pub async fn handle_turn(&self, utterance: &str) -> TurnOutcome {
        let mut ctx = TurnContext::new(utterance, classify(utterance));
        info!(
            session = %self.session_id,
            question = ctx.shape.is_question,
            preference = ctx.shape.is_preference,
            triple = ctx.shape.triple.is_some(),
            "Turn started"
        );

        self.search_phase(&mut ctx).await;
        ctx.advance(TurnPhase::Searched);

        let action = decide(&ctx);
        ctx.advance(TurnPhase::Decided);

        let outcome = self.execute_and_respond(&mut ctx, action).await;
        ctx.advance(TurnPhase::Responded);
        info!(session = %self.session_id, action = ?outcome.action, "Turn finished");
        outcome
    }

    /// Mandatory search phase: similarity always, graph when the utterance
    /// mentions a complete triple. Both complete (or explicitly fail)
    /// before any write decision.
    async fn search_phase(&self, ctx: &mut TurnContext) {
        let similarity = SimilarityMemory::new(&self.gateway);
        ctx.similarity = match similarity.find(&ctx.utterance).await {
            Ok(hits) => SearchStatus::Completed(hits),
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "Similarity search failed");
                SearchStatus::Failed(search_reason(e))
            }
        };

        if let Some(triple) = ctx.shape.triple.clone() {
            let graph = GraphMemory::new(&self.gateway);
            ctx.graph = match graph.search(&triple.person).await {
                Ok(snapshot) => SearchStatus::Completed(snapshot),
                Err(e) => {
                    warn!(session = %self.session_id, error = %e, "Graph search failed");
                    SearchStatus::Failed(search_reason(e))
                }
            };
        }
    }

    async fn execute_and_respond(&self, ctx: &mut TurnContext, action: TurnAction) -> TurnOutcome {
        let degraded: Vec<String> = ctx.degraded().iter().map(|(a, _)| a.to_string()).collect();

        let mut outcome = match action {
            TurnAction::GraphWrite(triple) => self.execute_graph_write(ctx, &triple).await,
            TurnAction::SimilarityWrite(text) => self.execute_similarity_write(ctx, &text).await,
            TurnAction::LedgerWrite(question) => self.execute_ledger_write(ctx, &question).await,
            TurnAction::NoOp => TurnOutcome {
                response: self.compose_noop(ctx),
                action: ActionTaken::NoOp,
                degraded: vec![],
            },
        };

        for (adapter, reason) in ctx.degraded() {
            outcome
                .response
                .push_str(&format!(" {}", respond::degraded_notice(adapter, &reason)));
        }
        outcome.degraded = degraded;
        outcome
    }

    /// Create the missing entities, then the relation. Entities already
    /// returned by the search are not recreated.
    async fn execute_graph_write(&self, ctx: &mut TurnContext, triple: &FactTriple) -> TurnOutcome {
        let graph = GraphMemory::new(&self.gateway);
        let empty = twinmem_types::memory::GraphSnapshot::default();
        let snapshot = ctx.graph.completed().unwrap_or(&empty);

        let missing: Vec<_> = triple
            .entities()
            .into_iter()
            .filter(|e| !snapshot.contains_entity(e))
            .collect();

        if !missing.is_empty() {
            if let Err(e) = graph.create_entities(&missing).await {
                return self.write_failed(ctx, e);
            }
        }

        if let Err(e) = graph.create_relations(&[triple.relation()]).await {
            return self.write_failed(ctx, e);
        }

        ctx.graph_write_confirmed = true;
        ctx.advance(TurnPhase::Executed);
        TurnOutcome {
            response: respond::graph_ack(triple),
            action: ActionTaken::GraphWrite,
            degraded: vec![],
        }
    }

    async fn execute_similarity_write(&self, ctx: &mut TurnContext, text: &str) -> TurnOutcome {
        let similarity = SimilarityMemory::new(&self.gateway);
        if let Err(e) = similarity.store(text).await {
            return self.write_failed(ctx, e);
        }
        ctx.similarity_write_confirmed = true;
        ctx.advance(TurnPhase::Executed);
        TurnOutcome {
            response: respond::similarity_ack(),
            action: ActionTaken::SimilarityWrite,
            degraded: vec![],
        }
    }

    /// Record the verbatim question through the gateway, like every other
    /// memory write.
    async fn execute_ledger_write(&self, ctx: &mut TurnContext, question: &str) -> TurnOutcome {
        let op = self
            .gateway
            .resolve_op(ADAPTER_LEDGER, "record_question")
            .await;
        let result = self
            .gateway
            .invoke(
                ADAPTER_LEDGER,
                &op,
                serde_json::json!({ "question": question }),
            )
            .await;

        let failure = match result {
            Ok(response) if response.is_success() => None,
            Ok(response) => Some(TwinError::WriteBackend {
                operation: op.clone(),
                reason: response
                    .error_message()
                    .unwrap_or("unknown failure")
                    .to_string(),
            }),
            Err(e) => Some(TwinError::WriteBackend {
                operation: op.clone(),
                reason: e.to_string(),
            }),
        };

        if let Some(e) = failure {
            return self.write_failed(ctx, e);
        }

        ctx.ledger_write_confirmed = true;
        ctx.advance(TurnPhase::Executed);
        TurnOutcome {
            response: respond::ledger_ack(question, &self.operator_name),
            action: ActionTaken::LedgerWrite,
            degraded: vec![],
        }
    }

    fn write_failed(&self, ctx: &mut TurnContext, error: TwinError) -> TurnOutcome {
        let (operation, reason) = match error {
            TwinError::WriteBackend { operation, reason } => (operation, reason),
            other => ("write".to_string(), other.to_string()),
        };
        warn!(session = %self.session_id, operation, reason, "Write failed");
        ctx.advance(TurnPhase::Executed);
        TurnOutcome {
            response: respond::write_failure(&operation, &reason),
            action: ActionTaken::WriteFailed { operation },
            degraded: vec![],
        }
    }

    /// Compose a no-op response from retrieved content only.
    fn compose_noop(&self, ctx: &TurnContext) -> String {
        if ctx.graph_has_fact() {
            if let Some(snapshot) = ctx.graph.completed() {
                return respond::answer_from_graph(snapshot);
            }
        }
        if ctx.similarity_has_hits() {
            if let Some(hits) = ctx.similarity.completed() {
                return respond::answer_from_similarity(hits);
            }
        }
        respond::neutral()
    }
}

fn search_reason(error: TwinError) -> String {
    match error {
        TwinError::SearchFailure { reason, .. } => reason,
        other => other.to_string(),
    }
}
