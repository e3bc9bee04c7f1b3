//! Typed adapter for the fact graph backend.
//!
//! The policy depends only on the backend exposing search/create operations
//! with documented argument shapes, not on its storage format. Payload
//! parsing is lenient: backends spell fields differently
//! (`entityType`/`entity_type`, `from`/`source`), and an unparseable payload
//! degrades to raw text lines retained for answering.

use crate::gateway::{Gateway, ADAPTER_GRAPH};
use tracing::debug;
use twinmem_types::error::{TwinError, TwinResult};
use twinmem_types::memory::{Entity, EntityType, GraphSnapshot, Relation};

/// Graph memory operations over the gateway.
pub struct GraphMemory<'g> {
    gateway: &'g Gateway,
}

impl<'g> GraphMemory<'g> {
    /// Bind to a gateway session.
    pub fn new(gateway: &'g Gateway) -> Self {
        Self { gateway }
    }

    /// Search the graph for entities and relations matching the query.
    pub async fn search(&self, query: &str) -> TwinResult<GraphSnapshot> {
        let op = self.gateway.resolve_op(ADAPTER_GRAPH, "search").await;
        let response = self
            .gateway
            .invoke(ADAPTER_GRAPH, &op, serde_json::json!({ "query": query }))
            .await
            .map_err(|e| TwinError::SearchFailure {
                adapter: ADAPTER_GRAPH.to_string(),
                reason: e.to_string(),
            })?;

        match response {
            twinmem_types::tool::ToolResponse::Success { payload } => {
                let snapshot = parse_snapshot(&payload);
                debug!(
                    entities = snapshot.entities.len(),
                    relations = snapshot.relations.len(),
                    "Graph search completed"
                );
                Ok(snapshot)
            }
            twinmem_types::tool::ToolResponse::Failure { message } => {
                Err(TwinError::SearchFailure {
                    adapter: ADAPTER_GRAPH.to_string(),
                    reason: message,
                })
            }
        }
    }

    /// Create entities. Callers ensure both endpoints of a relation exist
    /// before relating them.
    pub async fn create_entities(&self, entities: &[Entity]) -> TwinResult<()> {
        let op = self
            .gateway
            .resolve_op(ADAPTER_GRAPH, "create_entities")
            .await;
        let payload = serde_json::json!({
            "entities": entities
                .iter()
                .map(|e| serde_json::json!({
                    "name": e.name,
                    "entityType": e.entity_type.to_string(),
                }))
                .collect::<Vec<_>>(),
        });
        self.write(&op, payload).await
    }

    /// Create relations between already-existing entities.
    pub async fn create_relations(&self, relations: &[Relation]) -> TwinResult<()> {
        let op = self
            .gateway
            .resolve_op(ADAPTER_GRAPH, "create_relations")
            .await;
        let payload = serde_json::json!({
            "relations": relations
                .iter()
                .map(|r| serde_json::json!({
                    "from": r.source,
                    "to": r.target,
                    "relationType": r.relation_type,
                }))
                .collect::<Vec<_>>(),
        });
        self.write(&op, payload).await
    }

    async fn write(&self, op: &str, args: serde_json::Value) -> TwinResult<()> {
        let response = self
            .gateway
            .invoke(ADAPTER_GRAPH, op, args)
            .await
            .map_err(|e| TwinError::WriteBackend {
                operation: op.to_string(),
                reason: e.to_string(),
            })?;
        match response {
            twinmem_types::tool::ToolResponse::Success { .. } => Ok(()),
            twinmem_types::tool::ToolResponse::Failure { message } => {
                Err(TwinError::WriteBackend {
                    operation: op.to_string(),
                    reason: message,
                })
            }
        }
    }
}

/// Parse a search payload into a snapshot.
///
/// Accepts a JSON object with `entities`/`nodes` and `relations` arrays,
/// a JSON string wrapping such an object, or arbitrary text (kept as raw
/// lines).
pub fn parse_snapshot(payload: &serde_json::Value) -> GraphSnapshot {
    // Unwrap string payloads that themselves contain JSON
    if let Some(text) = payload.as_str() {
        if let Ok(inner) = serde_json::from_str::<serde_json::Value>(text) {
            return parse_snapshot(&inner);
        }
        return GraphSnapshot {
            entities: vec![],
            relations: vec![],
            raw: text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        };
    }

    let mut snapshot = GraphSnapshot::default();
    let Some(obj) = payload.as_object() else {
        return snapshot;
    };

    let entity_items = obj
        .get("entities")
        .or_else(|| obj.get("nodes"))
        .and_then(|v| v.as_array());
    if let Some(items) = entity_items {
        for item in items {
            if let Some(entity) = parse_entity(item) {
                snapshot.entities.push(entity);
            }
        }
    }

    if let Some(items) = obj.get("relations").and_then(|v| v.as_array()) {
        for item in items {
            if let Some(relation) = parse_relation(item) {
                snapshot.relations.push(relation);
            }
        }
    }

    snapshot
}

fn parse_entity(item: &serde_json::Value) -> Option<Entity> {
    let name = item.get("name")?.as_str()?;
    let type_str = item
        .get("entityType")
        .or_else(|| item.get("entity_type"))
        .or_else(|| item.get("type"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    Some(Entity::new(name, parse_entity_type(type_str)))
}

fn parse_entity_type(raw: &str) -> EntityType {
    match raw.to_ascii_lowercase().as_str() {
        "person" => EntityType::Person,
        "place" | "location" => EntityType::Place,
        "organization" | "org" => EntityType::Organization,
        other => EntityType::Custom(other.to_string()),
    }
}

fn parse_relation(item: &serde_json::Value) -> Option<Relation> {
    let source = item
        .get("from")
        .or_else(|| item.get("source"))?
        .as_str()?;
    let target = item.get("to").or_else(|| item.get("target"))?.as_str()?;
    let relation_type = item
        .get("relationType")
        .or_else(|| item.get("relation_type"))
        .and_then(|v| v.as_str())
        .unwrap_or("related to");
    Some(Relation::new(source, relation_type, target))
}
