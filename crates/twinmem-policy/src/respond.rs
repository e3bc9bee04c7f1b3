//! Response composition under the acknowledgement gate and evidence rule.
//!
//! Every phrase asserting that something was recorded lives here, behind
//! constructors that callers may only reach after a confirmed write. Facts
//! answered from memory carry a fixed per-source attribution phrase.
//! Internal reasoning and policy text never appear in a response.

use twinmem_types::memory::{FactTriple, GraphSnapshot, MemoryOrigin, SimilarityHit};

/// Fixed attribution for facts retrieved from the graph.
pub const GRAPH_SOURCE: &str = "This comes from my knowledge graph.";
/// Fixed attribution for facts retrieved from the similarity store.
pub const SIMILARITY_SOURCE: &str = "I found this in my long-term memory.";

/// Fixed attribution for the question ledger.
pub fn ledger_source(operator: &str) -> String {
    format!("I recorded your question for {operator}.")
}

/// The attribution phrase for a memory origin.
pub fn source_phrase(origin: MemoryOrigin, operator: &str) -> String {
    match origin {
        MemoryOrigin::Graph => GRAPH_SOURCE.to_string(),
        MemoryOrigin::Similarity => SIMILARITY_SOURCE.to_string(),
        MemoryOrigin::Ledger => ledger_source(operator),
    }
}

/// Acknowledge a successful graph write. Only called after both create
/// operations returned success this turn.
pub fn graph_ack(triple: &FactTriple) -> String {
    format!(
        "I've recorded that {} is the {} {}. {}",
        triple.person, triple.role, triple.place, GRAPH_SOURCE
    )
}

/// Acknowledge a successful similarity write.
pub fn similarity_ack() -> String {
    "I've noted that.".to_string()
}

/// Acknowledge a successful ledger write, restating the question and using
/// the fixed ledger disclosure phrase.
pub fn ledger_ack(question: &str, operator: &str) -> String {
    format!(
        "I don't have an answer to \"{question}\" yet. {}",
        ledger_source(operator)
    )
}

/// Answer from retrieved graph content.
pub fn answer_from_graph(snapshot: &GraphSnapshot) -> String {
    format!("{}. {}", snapshot.describe().join("; "), GRAPH_SOURCE)
}

/// Answer from retrieved similarity content: restate the best hit.
pub fn answer_from_similarity(hits: &[SimilarityHit]) -> String {
    match hits.first() {
        Some(hit) => format!("{} {}", hit.text, SIMILARITY_SOURCE),
        None => SIMILARITY_SOURCE.to_string(),
    }
}

/// Diagnostic for a failed write: names the operation, claims nothing.
pub fn write_failure(operation: &str, reason: &str) -> String {
    format!(
        "I tried to record this, but the '{operation}' operation failed: {reason}. Nothing was saved."
    )
}

/// Disclosure for a failed search: the negative result was not verified.
pub fn degraded_notice(adapter: &str, reason: &str) -> String {
    format!(
        "Note: the {adapter} memory search failed ({reason}), so I could not verify existing records."
    )
}

/// Neutral response when no memory action is needed and nothing was
/// retrieved.
pub fn neutral() -> String {
    "Okay.".to_string()
}

/// Whether a response asserts that something was recorded, logged, saved,
/// or noted. Used to verify the acknowledgement gate: such phrasing is
/// permitted only on turns where the corresponding write succeeded.
pub fn claims_persistence(response: &str) -> bool {
    const ASSERTIVE: &[&str] = &[
        "i've recorded",
        "i have recorded",
        "i recorded",
        "i've logged",
        "i have logged",
        "i logged",
        "i've saved",
        "i have saved",
        "i saved",
        "i've noted",
        "i have noted",
        "i noted",
    ];
    let lower = response.to_lowercase();
    ASSERTIVE.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinmem_types::memory::Relation;

    #[test]
    fn graph_ack_restates_the_triple() {
        let triple = FactTriple {
            person: "Jack Montana".into(),
            place: "Texas".into(),
            role: "governor of".into(),
        };
        let ack = graph_ack(&triple);
        assert!(ack.contains("Jack Montana is the governor of Texas"));
        assert!(ack.contains(GRAPH_SOURCE));
        assert!(claims_persistence(&ack));
    }

    #[test]
    fn ledger_ack_uses_fixed_disclosure_phrase() {
        let ack = ledger_ack("What is the capital of Mars?", "Oscar");
        assert!(ack.contains("I recorded your question for Oscar."));
        assert!(ack.contains("What is the capital of Mars?"));
    }

    #[test]
    fn failure_diagnostics_claim_nothing() {
        let diag = write_failure("create_entities", "backend unreachable");
        assert!(diag.contains("create_entities"));
        assert!(!claims_persistence(&diag));

        let notice = degraded_notice("similarity", "timed out");
        assert!(!claims_persistence(&notice));
        assert!(!claims_persistence(&neutral()));
    }

    #[test]
    fn answers_carry_their_source_phrase() {
        let snapshot = GraphSnapshot {
            entities: vec![],
            relations: vec![Relation::new("Jack Montana", "governor of", "Texas")],
            raw: vec![],
        };
        assert!(answer_from_graph(&snapshot).contains(GRAPH_SOURCE));

        let hits = vec![SimilarityHit {
            text: "My favorite programming language is Rust.".to_string(),
            score: None,
        }];
        let answer = answer_from_similarity(&hits);
        assert!(answer.contains("Rust"));
        assert!(answer.contains(SIMILARITY_SOURCE));
        // Restating retrieved content is not a persistence claim
        assert!(!claims_persistence(&answer));
    }
}
