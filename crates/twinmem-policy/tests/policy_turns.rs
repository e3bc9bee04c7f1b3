//! End-to-end turn tests against scripted in-memory backends.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use twinmem_gateway::{Gateway, ADAPTER_GRAPH, ADAPTER_LEDGER, ADAPTER_SIMILARITY};
use twinmem_policy::respond::{claims_persistence, GRAPH_SOURCE, SIMILARITY_SOURCE};
use twinmem_policy::{ActionTaken, Policy};
use twinmem_types::error::TwinResult;
use twinmem_types::tool::{ToolBackend, ToolDescriptor, ToolResponse};

/// A backend that replays scripted responses and records every invocation.
struct ScriptedBackend {
    name: String,
    ops: Vec<String>,
    responses: HashMap<String, ToolResponse>,
    calls: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl ScriptedBackend {
    fn new(name: &str, ops: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            ops: ops.iter().map(|s| s.to_string()).collect(),
            responses: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn respond_with(mut self, op: &str, response: ToolResponse) -> Self {
        self.responses.insert(op.to_string(), response);
        self
    }

    fn calls(&self) -> Arc<Mutex<Vec<(String, serde_json::Value)>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ToolBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn capabilities(&self) -> TwinResult<Vec<ToolDescriptor>> {
        Ok(self
            .ops
            .iter()
            .map(|op| ToolDescriptor {
                name: op.clone(),
                description: String::new(),
                input_schema: serde_json::json!({"type": "object"}),
            })
            .collect())
    }

    async fn invoke(&self, op: &str, args: serde_json::Value) -> TwinResult<ToolResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((op.to_string(), args));
        Ok(self
            .responses
            .get(op)
            .cloned()
            .unwrap_or_else(|| ToolResponse::ok(serde_json::json!(""))))
    }
}

struct Fixture {
    policy: Policy,
    graph_calls: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    similarity_calls: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    ledger_calls: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

fn fixture(graph: ScriptedBackend, similarity: ScriptedBackend, ledger: ScriptedBackend) -> Fixture {
    let graph_calls = graph.calls();
    let similarity_calls = similarity.calls();
    let ledger_calls = ledger.calls();

    let mut gateway = Gateway::new();
    gateway.register(Box::new(graph));
    gateway.register(Box::new(similarity));
    gateway.register(Box::new(ledger));

    Fixture {
        policy: Policy::new(gateway, "Oscar"),
        graph_calls,
        similarity_calls,
        ledger_calls,
    }
}

fn default_graph() -> ScriptedBackend {
    ScriptedBackend::new(
        ADAPTER_GRAPH,
        &["search_nodes", "create_entities", "create_relations"],
    )
    .respond_with(
        "search_nodes",
        ToolResponse::ok(serde_json::json!({"entities": [], "relations": []})),
    )
}

fn default_similarity() -> ScriptedBackend {
    ScriptedBackend::new(ADAPTER_SIMILARITY, &["qdrant-find", "qdrant-store"])
        .respond_with("qdrant-find", ToolResponse::ok(serde_json::json!([])))
}

fn default_ledger() -> ScriptedBackend {
    ScriptedBackend::new(
        ADAPTER_LEDGER,
        &[
            "record_question_with_no_answer",
            "get_questions_with_no_answer",
            "get_questions_with_answer",
            "record_answer_to_question",
        ],
    )
    .respond_with(
        "record_question_with_no_answer",
        ToolResponse::ok(serde_json::json!("Recorded question with no answer")),
    )
}

fn calls_named(calls: &Arc<Mutex<Vec<(String, serde_json::Value)>>>, op: &str) -> Vec<serde_json::Value> {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter(|(name, _)| name == op)
        .map(|(_, args)| args.clone())
        .collect()
}

#[tokio::test]
async fn governor_fact_is_written_to_an_empty_graph() {
    let fx = fixture(default_graph(), default_similarity(), default_ledger());
    let outcome = fx
        .policy
        .handle_turn("Hello. My name is Jack Montana. I am the governor of Texas.")
        .await;

    assert_eq!(outcome.action, ActionTaken::GraphWrite);

    // Search preceded the write
    let all_calls = fx.graph_calls.lock().unwrap().clone();
    assert_eq!(all_calls[0].0, "search_nodes");

    // One create_entities call carrying both entities
    let entity_calls = calls_named(&fx.graph_calls, "create_entities");
    assert_eq!(entity_calls.len(), 1);
    let entities = entity_calls[0]["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["name"], "Jack Montana");
    assert_eq!(entities[0]["entityType"], "Person");
    assert_eq!(entities[1]["name"], "Texas");
    assert_eq!(entities[1]["entityType"], "Place");

    // One create_relations call linking them
    let relation_calls = calls_named(&fx.graph_calls, "create_relations");
    assert_eq!(relation_calls.len(), 1);
    let relations = relation_calls[0]["relations"].as_array().unwrap();
    assert_eq!(relations[0]["from"], "Jack Montana");
    assert_eq!(relations[0]["to"], "Texas");
    assert_eq!(relations[0]["relationType"], "governor of");

    // Response acknowledges and discloses the graph source
    assert!(outcome.response.contains("Jack Montana is the governor of Texas"));
    assert!(outcome.response.contains(GRAPH_SOURCE));
    assert!(claims_persistence(&outcome.response));

    // Nothing went to the other stores
    assert!(calls_named(&fx.similarity_calls, "qdrant-store").is_empty());
    assert!(calls_named(&fx.ledger_calls, "record_question_with_no_answer").is_empty());
}

#[tokio::test]
async fn known_fact_repeated_produces_zero_writes() {
    let graph = default_graph().respond_with(
        "search_nodes",
        ToolResponse::ok(serde_json::json!({
            "entities": [
                {"name": "Jack Montana", "entityType": "Person"},
                {"name": "Texas", "entityType": "Place"}
            ],
            "relations": [
                {"from": "Jack Montana", "to": "Texas", "relationType": "governor of"}
            ]
        })),
    );
    let fx = fixture(graph, default_similarity(), default_ledger());
    let outcome = fx
        .policy
        .handle_turn("Hello. My name is Jack Montana. I am the governor of Texas.")
        .await;

    assert_eq!(outcome.action, ActionTaken::NoOp);
    assert!(calls_named(&fx.graph_calls, "create_entities").is_empty());
    assert!(calls_named(&fx.graph_calls, "create_relations").is_empty());
    assert!(outcome.response.contains("governor of"));
    assert!(outcome.response.contains(GRAPH_SOURCE));
}

#[tokio::test]
async fn unanswerable_question_is_recorded_verbatim() {
    let fx = fixture(default_graph(), default_similarity(), default_ledger());
    let outcome = fx.policy.handle_turn("What is the capital of Mars?").await;

    assert_eq!(outcome.action, ActionTaken::LedgerWrite);
    let calls = calls_named(&fx.ledger_calls, "record_question_with_no_answer");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["question"], "What is the capital of Mars?");
    assert!(outcome.response.contains("I recorded your question for Oscar."));
}

#[tokio::test]
async fn answered_question_is_served_from_memory_without_writes() {
    let similarity = default_similarity().respond_with(
        "qdrant-find",
        ToolResponse::ok(serde_json::json!([
            {"text": "My favorite programming language is Rust.", "score": 0.93}
        ])),
    );
    let fx = fixture(default_graph(), similarity, default_ledger());
    let outcome = fx
        .policy
        .handle_turn("Do you remember what my favorite programming language is?")
        .await;

    assert_eq!(outcome.action, ActionTaken::NoOp);
    assert!(calls_named(&fx.ledger_calls, "record_question_with_no_answer").is_empty());
    assert!(outcome.response.contains("Rust"));
    assert!(outcome.response.contains(SIMILARITY_SOURCE));
}

#[tokio::test]
async fn new_preference_is_stored_once() {
    let fx = fixture(default_graph(), default_similarity(), default_ledger());
    let outcome = fx
        .policy
        .handle_turn("My favorite programming language is Rust.")
        .await;

    assert_eq!(outcome.action, ActionTaken::SimilarityWrite);
    let stores = calls_named(&fx.similarity_calls, "qdrant-store");
    assert_eq!(stores.len(), 1);
    assert_eq!(
        stores[0]["information"],
        "My favorite programming language is Rust."
    );
    assert!(claims_persistence(&outcome.response));
}

#[tokio::test]
async fn duplicate_preference_is_not_restored() {
    let similarity = default_similarity().respond_with(
        "qdrant-find",
        ToolResponse::ok(serde_json::json!([
            {"text": "My favorite programming language is Rust.", "score": 0.99}
        ])),
    );
    let fx = fixture(default_graph(), similarity, default_ledger());
    let outcome = fx
        .policy
        .handle_turn("My favorite programming language is Rust.")
        .await;

    assert_eq!(outcome.action, ActionTaken::NoOp);
    assert!(calls_named(&fx.similarity_calls, "qdrant-store").is_empty());
    assert!(outcome.response.contains(SIMILARITY_SOURCE));
}

#[tokio::test]
async fn failed_write_never_claims_persistence() {
    let graph = default_graph().respond_with(
        "create_entities",
        ToolResponse::fail("database is locked"),
    );
    let fx = fixture(graph, default_similarity(), default_ledger());
    let outcome = fx
        .policy
        .handle_turn("Hello. My name is Jack Montana. I am the governor of Texas.")
        .await;

    assert_eq!(
        outcome.action,
        ActionTaken::WriteFailed {
            operation: "create_entities".to_string()
        }
    );
    assert!(outcome.response.contains("create_entities"));
    assert!(outcome.response.contains("database is locked"));
    assert!(!claims_persistence(&outcome.response));
}

#[tokio::test]
async fn failed_ledger_write_never_claims_persistence() {
    let ledger = default_ledger().respond_with(
        "record_question_with_no_answer",
        ToolResponse::fail("disk full"),
    );
    let fx = fixture(default_graph(), default_similarity(), ledger);
    let outcome = fx.policy.handle_turn("What is the capital of Mars?").await;

    assert!(matches!(outcome.action, ActionTaken::WriteFailed { .. }));
    assert!(!claims_persistence(&outcome.response));
}

#[tokio::test]
async fn incomplete_triples_never_reach_the_graph() {
    let utterances = [
        "My name is Jack Montana.",
        "I am the governor of Texas.",
        "Hello, I'm a potential customer.",
        "I have a dog that is a dalmation named Pongo.",
        "What is the capital of Mars?",
        "Texas is a big state.",
        "My favorite programming language is Rust.",
        "Good morning!",
    ];

    for utterance in utterances {
        let fx = fixture(default_graph(), default_similarity(), default_ledger());
        fx.policy.handle_turn(utterance).await;
        assert!(
            calls_named(&fx.graph_calls, "create_entities").is_empty(),
            "graph entity write for: {utterance}"
        );
        assert!(
            calls_named(&fx.graph_calls, "create_relations").is_empty(),
            "graph relation write for: {utterance}"
        );
    }
}

#[tokio::test]
async fn triple_and_preference_routes_to_graph_only() {
    let fx = fixture(default_graph(), default_similarity(), default_ledger());
    let outcome = fx
        .policy
        .handle_turn("My name is Jack Montana. I am the governor of Texas. I have a ranch I love.")
        .await;

    assert_eq!(outcome.action, ActionTaken::GraphWrite);
    assert!(calls_named(&fx.similarity_calls, "qdrant-store").is_empty());
}

#[tokio::test]
async fn failed_search_degrades_but_is_disclosed() {
    let similarity = default_similarity()
        .respond_with("qdrant-find", ToolResponse::fail("Backend request timed out"));
    let fx = fixture(default_graph(), similarity, default_ledger());
    let outcome = fx.policy.handle_turn("What is the capital of Mars?").await;

    // Treated as not-found: the question still reaches the ledger
    assert_eq!(outcome.action, ActionTaken::LedgerWrite);
    // But the degradation is disclosed, not hidden
    assert_eq!(outcome.degraded, vec!["similarity".to_string()]);
    assert!(outcome.response.contains("similarity memory search failed"));
}

#[tokio::test]
async fn existing_entity_is_not_recreated() {
    let graph = default_graph().respond_with(
        "search_nodes",
        ToolResponse::ok(serde_json::json!({
            "entities": [{"name": "Texas", "entityType": "Place"}],
            "relations": []
        })),
    );
    let fx = fixture(graph, default_similarity(), default_ledger());
    let outcome = fx
        .policy
        .handle_turn("Hello. My name is Jack Montana. I am the governor of Texas.")
        .await;

    assert_eq!(outcome.action, ActionTaken::GraphWrite);
    let entity_calls = calls_named(&fx.graph_calls, "create_entities");
    assert_eq!(entity_calls.len(), 1);
    let entities = entity_calls[0]["entities"].as_array().unwrap();
    // Only the missing person entity is created; Texas already exists
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0]["name"], "Jack Montana");
    // The relation is still created
    assert_eq!(calls_named(&fx.graph_calls, "create_relations").len(), 1);
}
