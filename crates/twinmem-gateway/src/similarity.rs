//! Typed adapter for the similarity store backend.
//!
//! Exposes `find(query)` → ranked text snippets and `store(text)`. Note
//! identity and any deduplication are the backend's responsibility; the
//! policy enforces no uniqueness here.

use crate::gateway::{Gateway, ADAPTER_SIMILARITY};
use tracing::debug;
use twinmem_types::error::{TwinError, TwinResult};
use twinmem_types::memory::SimilarityHit;
use twinmem_types::tool::ToolResponse;

/// Similarity memory operations over the gateway.
pub struct SimilarityMemory<'g> {
    gateway: &'g Gateway,
}

impl<'g> SimilarityMemory<'g> {
    /// Bind to a gateway session.
    pub fn new(gateway: &'g Gateway) -> Self {
        Self { gateway }
    }

    /// Search for snippets semantically near the query.
    pub async fn find(&self, query: &str) -> TwinResult<Vec<SimilarityHit>> {
        let op = self.gateway.resolve_op(ADAPTER_SIMILARITY, "find").await;
        let response = self
            .gateway
            .invoke(ADAPTER_SIMILARITY, &op, serde_json::json!({ "query": query }))
            .await
            .map_err(|e| TwinError::SearchFailure {
                adapter: ADAPTER_SIMILARITY.to_string(),
                reason: e.to_string(),
            })?;

        match response {
            ToolResponse::Success { payload } => {
                let hits = parse_hits(&payload);
                debug!(hits = hits.len(), "Similarity search completed");
                Ok(hits)
            }
            ToolResponse::Failure { message } => Err(TwinError::SearchFailure {
                adapter: ADAPTER_SIMILARITY.to_string(),
                reason: message,
            }),
        }
    }

    /// Store a free-text note.
    pub async fn store(&self, text: &str) -> TwinResult<()> {
        let op = self.gateway.resolve_op(ADAPTER_SIMILARITY, "store").await;
        let response = self
            .gateway
            .invoke(
                ADAPTER_SIMILARITY,
                &op,
                serde_json::json!({ "information": text }),
            )
            .await
            .map_err(|e| TwinError::WriteBackend {
                operation: op.clone(),
                reason: e.to_string(),
            })?;

        match response {
            ToolResponse::Success { .. } => Ok(()),
            ToolResponse::Failure { message } => Err(TwinError::WriteBackend {
                operation: op,
                reason: message,
            }),
        }
    }
}

/// Parse a find payload into ranked hits.
///
/// Accepts an array of `{text|content|information, score}` objects, an
/// object wrapping such an array under `results`, or plain text (one hit
/// per non-empty line).
pub fn parse_hits(payload: &serde_json::Value) -> Vec<SimilarityHit> {
    if let Some(text) = payload.as_str() {
        if let Ok(inner) = serde_json::from_str::<serde_json::Value>(text) {
            return parse_hits(&inner);
        }
        return text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !is_preamble(l))
            .map(|l| SimilarityHit {
                text: l.to_string(),
                score: None,
            })
            .collect();
    }

    let items = payload
        .as_array()
        .or_else(|| payload.get("results").and_then(|r| r.as_array()));
    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            if let Some(text) = item.as_str() {
                return Some(SimilarityHit {
                    text: text.to_string(),
                    score: None,
                });
            }
            let text = item
                .get("text")
                .or_else(|| item.get("content"))
                .or_else(|| item.get("information"))?
                .as_str()?;
            Some(SimilarityHit {
                text: text.to_string(),
                score: item.get("score").and_then(|s| s.as_f64()),
            })
        })
        .collect()
}

/// Some backends prefix results with a human preamble line. Skip the known
/// ones so a preamble is never treated as a stored note.
fn is_preamble(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("results for") || lower.starts_with("no information found")
}
