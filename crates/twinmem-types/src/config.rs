//! Configuration types for a twinmem session.
//!
//! Defaults mirror a local deployment: graph memory over `mcp-memory-libsql`
//! and similarity memory over `mcp-server-qdrant`, both launched as stdio
//! subprocesses.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How to launch one external memory backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendLaunch {
    /// Executable to spawn.
    pub command: String,
    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variable names forwarded to the subprocess. Everything
    /// else is cleared; PATH is always forwarded.
    #[serde(default)]
    pub env: Vec<String>,
}

/// Session configuration, loaded from TOML with per-field defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinConfig {
    /// Display name used in ledger disclosure phrases.
    #[serde(default = "default_operator")]
    pub operator_name: String,

    /// Question ledger database path. Resolved under the data directory
    /// when absent.
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,

    /// Bounded wait applied to every gateway call, in seconds.
    #[serde(default = "default_timeout")]
    pub call_timeout_secs: u64,

    /// Graph memory backend launch parameters.
    #[serde(default = "default_graph_backend")]
    pub graph: BackendLaunch,

    /// Similarity memory backend launch parameters.
    #[serde(default = "default_similarity_backend")]
    pub similarity: BackendLaunch,
}

fn default_operator() -> String {
    "Oscar".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_graph_backend() -> BackendLaunch {
    BackendLaunch {
        command: "npx".to_string(),
        args: vec!["-y".to_string(), "mcp-memory-libsql".to_string()],
        env: vec!["LIBSQL_URL".to_string()],
    }
}

fn default_similarity_backend() -> BackendLaunch {
    BackendLaunch {
        command: "uvx".to_string(),
        args: vec!["mcp-server-qdrant".to_string()],
        env: vec![
            "QDRANT_LOCAL_PATH".to_string(),
            "COLLECTION_NAME".to_string(),
            "EMBEDDING_MODEL".to_string(),
        ],
    }
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            operator_name: default_operator(),
            ledger_path: None,
            call_timeout_secs: default_timeout(),
            graph: default_graph_backend(),
            similarity: default_similarity_backend(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_missing_fields() {
        let config: TwinConfig = toml::from_str("").unwrap();
        assert_eq!(config.operator_name, "Oscar");
        assert_eq!(config.call_timeout_secs, 30);
        assert_eq!(config.graph.command, "npx");
        assert_eq!(config.similarity.command, "uvx");
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config: TwinConfig = toml::from_str(
            r#"
            operator_name = "Ada"

            [graph]
            command = "node"
            args = ["graph-server.js"]
            "#,
        )
        .unwrap();
        assert_eq!(config.operator_name, "Ada");
        assert_eq!(config.graph.command, "node");
        assert!(config.graph.env.is_empty());
        // Untouched section keeps its default
        assert_eq!(config.similarity.command, "uvx");
    }
}
