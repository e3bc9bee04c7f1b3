//! Tool gateway: uniform discovery and invocation across the heterogeneous
//! memory backends, plus typed adapters for the graph and similarity stores.
//!
//! External backends speak JSON-RPC 2.0 over stdio (one request/response
//! exchange per call). The gateway performs no retries; retry policy belongs
//! to the orchestration layer above it.

pub mod gateway;
pub mod graph;
pub mod rpc;
pub mod similarity;

pub use gateway::{Gateway, ADAPTER_GRAPH, ADAPTER_LEDGER, ADAPTER_SIMILARITY};
pub use graph::GraphMemory;
pub use rpc::{BackendConfig, RpcBackend};
pub use similarity::SimilarityMemory;
