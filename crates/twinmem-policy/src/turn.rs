//! Per-turn state: the search results gathered this turn, the phase
//! progression, and the pure decision function.
//!
//! A turn moves Start → Searched → Decided → Executed → Responded (writes)
//! or Start → Searched → Decided → Responded (no-op). Searching is
//! mandatory and precedes any candidate write.

use crate::classify::UtteranceShape;
use tracing::trace;
use twinmem_types::memory::{GraphSnapshot, SimilarityHit};

/// Phase of the turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TurnPhase {
    /// Nothing has happened yet.
    Start,
    /// Both searches completed or explicitly failed.
    Searched,
    /// The action has been classified.
    Decided,
    /// The single permitted write was attempted.
    Executed,
    /// The response has been composed. Terminal.
    Responded,
}

/// Result of one search against one adapter.
#[derive(Debug, Clone)]
pub enum SearchStatus<T> {
    /// The adapter was not queried this turn.
    NotQueried,
    /// The search completed, possibly with an empty result.
    Completed(T),
    /// The search failed; treated as "not found" for the decision, but
    /// the failure is disclosed rather than upgraded to a verified
    /// negative.
    Failed(String),
}

impl<T> SearchStatus<T> {
    /// The completed value, if any.
    pub fn completed(&self) -> Option<&T> {
        match self {
            SearchStatus::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// The failure reason, if the search failed.
    pub fn failure(&self) -> Option<&str> {
        match self {
            SearchStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Ephemeral state scoped to one utterance. Never persisted.
#[derive(Debug)]
pub struct TurnContext {
    /// The incoming utterance, verbatim.
    pub utterance: String,
    /// What the classifier saw.
    pub shape: UtteranceShape,
    /// Graph search result (queried only when a triple is mentioned).
    pub graph: SearchStatus<GraphSnapshot>,
    /// Similarity search result (always queried).
    pub similarity: SearchStatus<Vec<SimilarityHit>>,
    /// Current phase.
    pub phase: TurnPhase,
    /// Set only when the graph write returned success this turn.
    pub graph_write_confirmed: bool,
    /// Set only when the similarity write returned success this turn.
    pub similarity_write_confirmed: bool,
    /// Set only when the ledger write returned success this turn.
    pub ledger_write_confirmed: bool,
}

impl TurnContext {
    /// Start a turn for one utterance.
    pub fn new(utterance: impl Into<String>, shape: UtteranceShape) -> Self {
        Self {
            utterance: utterance.into(),
            shape,
            graph: SearchStatus::NotQueried,
            similarity: SearchStatus::NotQueried,
            phase: TurnPhase::Start,
            graph_write_confirmed: false,
            similarity_write_confirmed: false,
            ledger_write_confirmed: false,
        }
    }

    /// Advance the phase. Phases only move forward.
    pub fn advance(&mut self, phase: TurnPhase) {
        debug_assert!(phase > self.phase, "turn phases only move forward");
        trace!(from = ?self.phase, to = ?phase, "Turn phase");
        self.phase = phase;
    }

    /// Adapters whose search failed this turn, with reasons.
    pub fn degraded(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(reason) = self.graph.failure() {
            out.push(("graph", reason.to_string()));
        }
        if let Some(reason) = self.similarity.failure() {
            out.push(("similarity", reason.to_string()));
        }
        out
    }

    /// Whether the graph search produced anything usable for answering.
    pub fn graph_has_fact(&self) -> bool {
        self.graph.completed().is_some_and(|s| !s.is_empty())
    }

    /// Whether the similarity search produced hits.
    pub fn similarity_has_hits(&self) -> bool {
        self.similarity.completed().is_some_and(|h| !h.is_empty())
    }
}

/// The single action a turn may take.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnAction {
    /// Create the missing entities, then the relation, for this triple.
    GraphWrite(twinmem_types::memory::FactTriple),
    /// Store this text in the similarity store.
    SimilarityWrite(String),
    /// Record this verbatim question in the ledger.
    LedgerWrite(String),
    /// No memory action; answer from retrieved content only.
    NoOp,
}

/// Classify the searched turn into exactly one action.
///
/// The graph precondition is evaluated before similarity eligibility: an
/// utterance satisfying both the triple condition and a preference reading
/// routes to the graph, never both.
pub fn decide(ctx: &TurnContext) -> TurnAction {
    if let Some(triple) = &ctx.shape.triple {
        let relation = triple.relation();
        let already_known = ctx
            .graph
            .completed()
            .is_some_and(|snapshot| snapshot.contains_relation(&relation));
        if already_known {
            return TurnAction::NoOp;
        }
        return TurnAction::GraphWrite(triple.clone());
    }

    if ctx.shape.is_question {
        if ctx.graph_has_fact() || ctx.similarity_has_hits() {
            return TurnAction::NoOp;
        }
        return TurnAction::LedgerWrite(ctx.utterance.clone());
    }

    if ctx.shape.is_preference {
        let already_stored = ctx.similarity.completed().is_some_and(|hits| {
            let utterance = ctx.utterance.trim().to_lowercase();
            hits.iter().any(|hit| {
                let text = hit.text.trim().to_lowercase();
                text.contains(&utterance) || utterance.contains(&text)
            })
        });
        if already_stored {
            return TurnAction::NoOp;
        }
        return TurnAction::SimilarityWrite(ctx.utterance.clone());
    }

    TurnAction::NoOp
}
