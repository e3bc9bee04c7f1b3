//! The gateway proper: adapter registry with uniform discovery and
//! invocation.

use std::collections::HashMap;
use tracing::debug;
use twinmem_types::error::{TwinError, TwinResult};
use twinmem_types::tool::{ToolBackend, ToolDescriptor, ToolResponse};

/// Adapter name for the fact graph backend.
pub const ADAPTER_GRAPH: &str = "graph";
/// Adapter name for the similarity store backend.
pub const ADAPTER_SIMILARITY: &str = "similarity";
/// Adapter name for the question ledger backend.
pub const ADAPTER_LEDGER: &str = "ledger";

/// Uniform interface over the registered memory backends.
///
/// Side effects of an invocation are confined to the named backend. The
/// gateway performs no retries of its own.
#[derive(Default)]
pub struct Gateway {
    backends: HashMap<String, Box<dyn ToolBackend>>,
}

impl Gateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own name. A later registration under
    /// the same name replaces the earlier one.
    pub fn register(&mut self, backend: Box<dyn ToolBackend>) {
        debug!(adapter = backend.name(), "Registered backend");
        self.backends.insert(backend.name().to_string(), backend);
    }

    /// Whether an adapter with this name is registered.
    pub fn has_adapter(&self, adapter: &str) -> bool {
        self.backends.contains_key(adapter)
    }

    /// Names of all registered adapters, sorted for deterministic display.
    pub fn adapter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Discover the operations an adapter exposes.
    pub async fn list_capabilities(&self, adapter: &str) -> TwinResult<Vec<ToolDescriptor>> {
        let backend = self
            .backends
            .get(adapter)
            .ok_or_else(|| TwinError::UnknownAdapter(adapter.to_string()))?;
        backend.capabilities().await
    }

    /// Invoke an operation on a named adapter.
    pub async fn invoke(
        &self,
        adapter: &str,
        op: &str,
        args: serde_json::Value,
    ) -> TwinResult<ToolResponse> {
        let backend = self
            .backends
            .get(adapter)
            .ok_or_else(|| TwinError::UnknownAdapter(adapter.to_string()))?;
        debug!(adapter, op, "Gateway invocation");
        backend.invoke(op, args).await
    }

    /// Resolve a concrete operation name from discovery: the first
    /// capability whose name equals or contains `keyword`. Backends differ
    /// in naming (`search_nodes` vs `search_entities`, `qdrant-find` vs
    /// `find`), so adapters resolve by keyword and fall back to the keyword
    /// itself when discovery is unavailable.
    pub async fn resolve_op(&self, adapter: &str, keyword: &str) -> String {
        match self.list_capabilities(adapter).await {
            Ok(caps) => {
                if let Some(exact) = caps.iter().find(|c| c.name == keyword) {
                    return exact.name.clone();
                }
                caps.iter()
                    .find(|c| c.name.contains(keyword))
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| keyword.to_string())
            }
            Err(_) => keyword.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoBackend {
        name: String,
        ops: Vec<String>,
    }

    #[async_trait]
    impl ToolBackend for EchoBackend {
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
            Ok(ToolResponse::ok(serde_json::json!({
                "op": op,
                "args": args,
            })))
        }
    }

    fn gateway_with(name: &str, ops: &[&str]) -> Gateway {
        let mut gateway = Gateway::new();
        gateway.register(Box::new(EchoBackend {
            name: name.to_string(),
            ops: ops.iter().map(|s| s.to_string()).collect(),
        }));
        gateway
    }

    #[tokio::test]
    async fn invoke_routes_to_named_adapter() {
        let gateway = gateway_with(ADAPTER_GRAPH, &["search_nodes"]);
        let response = gateway
            .invoke(ADAPTER_GRAPH, "search_nodes", serde_json::json!({"query": "x"}))
            .await
            .unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn unknown_adapter_is_an_error() {
        let gateway = gateway_with(ADAPTER_GRAPH, &["search_nodes"]);
        let err = gateway
            .invoke("vector", "find", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TwinError::UnknownAdapter(name) if name == "vector"));
    }

    #[tokio::test]
    async fn resolve_op_prefers_exact_then_substring() {
        let gateway = gateway_with(ADAPTER_SIMILARITY, &["qdrant-find", "qdrant-store"]);
        assert_eq!(
            gateway.resolve_op(ADAPTER_SIMILARITY, "find").await,
            "qdrant-find"
        );
        assert_eq!(
            gateway.resolve_op(ADAPTER_SIMILARITY, "store").await,
            "qdrant-store"
        );
        // No match: fall back to the keyword itself
        assert_eq!(
            gateway.resolve_op(ADAPTER_SIMILARITY, "delete").await,
            "delete"
        );
    }

    #[tokio::test]
    async fn adapter_names_are_sorted() {
        let mut gateway = gateway_with(ADAPTER_SIMILARITY, &[]);
        gateway.register(Box::new(EchoBackend {
            name: ADAPTER_GRAPH.to_string(),
            ops: vec![],
        }));
        assert_eq!(gateway.adapter_names(), vec![ADAPTER_GRAPH, ADAPTER_SIMILARITY]);
    }
}
