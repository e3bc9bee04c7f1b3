//! Memory data model: graph entities and relations, similarity hits, and the
//! person+place+role triple that gates graph writes.

use serde::{Deserialize, Serialize};

/// Types of entities in the fact graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A person.
    Person,
    /// A place.
    Place,
    /// An organization.
    Organization,
    /// A custom type reported by the backend.
    Custom(String),
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Person => write!(f, "Person"),
            EntityType::Place => write!(f, "Place"),
            EntityType::Organization => write!(f, "Organization"),
            EntityType::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// An entity in the fact graph. Identity is the (name, type) pair; the graph
/// forbids duplicate entities for the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Display name.
    pub name: String,
    /// Entity type.
    pub entity_type: EntityType,
}

impl Entity {
    /// Create a new entity.
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
        }
    }

    /// Identity comparison. Names compare case-insensitively so that a
    /// backend echoing "texas" still matches "Texas".
    pub fn same_identity(&self, other: &Entity) -> bool {
        self.entity_type == other.entity_type && self.name.eq_ignore_ascii_case(&other.name)
    }
}

/// A typed relation between two entities, referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Source entity name.
    pub source: String,
    /// Relation type, e.g. "governor of".
    pub relation_type: String,
    /// Target entity name.
    pub target: String,
}

impl Relation {
    /// Create a new relation.
    pub fn new(
        source: impl Into<String>,
        relation_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relation_type: relation_type.into(),
            target: target.into(),
        }
    }

    /// Duplicate check: same source, type, and target (case-insensitive).
    pub fn same_edge(&self, other: &Relation) -> bool {
        self.source.eq_ignore_ascii_case(&other.source)
            && self.relation_type.eq_ignore_ascii_case(&other.relation_type)
            && self.target.eq_ignore_ascii_case(&other.target)
    }
}

/// The complete person+place+role triple required before any graph write.
///
/// `role` carries its connective ("governor of", "Lead Developer at") so it
/// can be stored verbatim as the relation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactTriple {
    /// The named person.
    pub person: String,
    /// The named place.
    pub place: String,
    /// The role or professional relationship linking them.
    pub role: String,
}

impl FactTriple {
    /// The two entities this triple implies, person first.
    /// Entities are created before the relation that links them.
    pub fn entities(&self) -> [Entity; 2] {
        [
            Entity::new(self.person.clone(), EntityType::Person),
            Entity::new(self.place.clone(), EntityType::Place),
        ]
    }

    /// The relation this triple implies.
    pub fn relation(&self) -> Relation {
        Relation::new(self.person.clone(), self.role.clone(), self.place.clone())
    }
}

/// What a graph search returned: parsed entities and relations, plus the raw
/// payload lines retained for answering when parsing was partial.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Entities found by the search.
    pub entities: Vec<Entity>,
    /// Relations found by the search.
    pub relations: Vec<Relation>,
    /// Raw textual payload, one line per fragment.
    pub raw: Vec<String>,
}

impl GraphSnapshot {
    /// True when the search found nothing at all.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty() && self.raw.is_empty()
    }

    /// Whether an entity with the same identity is already present.
    pub fn contains_entity(&self, entity: &Entity) -> bool {
        self.entities.iter().any(|e| e.same_identity(entity))
    }

    /// Whether an equivalent relation edge is already present.
    pub fn contains_relation(&self, relation: &Relation) -> bool {
        self.relations.iter().any(|r| r.same_edge(relation))
    }

    /// Human-readable lines describing the snapshot.
    pub fn describe(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .relations
            .iter()
            .map(|r| format!("{} --[{}]--> {}", r.source, r.relation_type, r.target))
            .collect();
        if lines.is_empty() {
            lines.extend(
                self.entities
                    .iter()
                    .map(|e| format!("{} ({})", e.name, e.entity_type)),
            );
        }
        if lines.is_empty() {
            lines.extend(self.raw.iter().cloned());
        }
        lines
    }
}

/// A ranked text snippet returned by the similarity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityHit {
    /// The stored text.
    pub text: String,
    /// Relevance score when the backend reports one.
    pub score: Option<f64>,
}

/// Which memory subsystem a retrieved fact came from. Drives the fixed
/// disclosure phrase attached to every answer sourced from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOrigin {
    /// The fact graph.
    Graph,
    /// The semantic similarity store.
    Similarity,
    /// The question ledger.
    Ledger,
}
