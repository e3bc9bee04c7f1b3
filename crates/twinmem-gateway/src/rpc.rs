//! JSON-RPC 2.0 stdio client for external memory backends.
//!
//! Each backend is a subprocess speaking newline-delimited JSON-RPC on
//! stdin/stdout. The session is established once (initialize handshake,
//! capability discovery) and held for the session's lifetime. Every call
//! carries a bounded wait; on timeout the call reports a failure payload
//! rather than retrying.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info};
use twinmem_types::config::BackendLaunch;
use twinmem_types::error::TwinResult;
use twinmem_types::tool::{ToolBackend, ToolDescriptor, ToolResponse};

/// Configuration for one backend subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Adapter name the backend is registered under.
    pub name: String,
    /// Executable to spawn.
    pub command: String,
    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Environment variables to pass through to the subprocess (sandboxed).
    #[serde(default)]
    pub env: Vec<String>,
}

fn default_timeout() -> u64 {
    30
}

impl BackendConfig {
    /// Build a config from launch parameters in the session configuration.
    pub fn from_launch(name: impl Into<String>, launch: &BackendLaunch, timeout_secs: u64) -> Self {
        Self {
            name: name.into(),
            command: launch.command.clone(),
            args: launch.args.clone(),
            timeout_secs,
            env: launch.env.clone(),
        }
    }
}

/// JSON-RPC 2.0 request.
#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: Option<u64>,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[allow(dead_code)]
    pub data: Option<serde_json::Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// The stdio session with a spawned backend.
struct StdioSession {
    child: Box<tokio::process::Child>,
    stdin: tokio::process::ChildStdin,
    stdout: BufReader<tokio::process::ChildStdout>,
}

/// An external memory backend reached over JSON-RPC stdio.
pub struct RpcBackend {
    config: BackendConfig,
    tools: Vec<ToolDescriptor>,
    session: Mutex<StdioSession>,
    next_id: AtomicU64,
}

impl RpcBackend {
    /// Spawn the backend subprocess, perform the initialize handshake, and
    /// discover its operations.
    pub async fn connect(config: BackendConfig) -> Result<Self, String> {
        let session = spawn_session(&config.command, &config.args, &config.env)?;

        let backend = Self {
            config,
            tools: Vec::new(),
            session: Mutex::new(session),
            next_id: AtomicU64::new(1),
        };

        backend.initialize().await?;
        let mut backend = backend;
        backend.discover_tools().await?;

        info!(
            backend = %backend.config.name,
            tools = backend.tools.len(),
            "Memory backend connected"
        );

        Ok(backend)
    }

    /// Send the `initialize` handshake followed by the initialized
    /// notification.
    async fn initialize(&self) -> Result<(), String> {
        let params = serde_json::json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "twinmem",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let response = self.send_request("initialize", Some(params)).await?;
        if let Some(result) = response {
            debug!(
                backend = %self.config.name,
                server_info = %result,
                "Backend initialize response"
            );
        }

        self.send_notification("notifications/initialized", None)
            .await
    }

    /// Discover available operations via `tools/list`.
    async fn discover_tools(&mut self) -> Result<(), String> {
        let response = self.send_request("tools/list", None).await?;

        if let Some(result) = response {
            if let Some(tools_array) = result.get("tools").and_then(|t| t.as_array()) {
                for tool in tools_array {
                    let name = tool["name"].as_str().unwrap_or("unnamed");
                    let description = tool["description"].as_str().unwrap_or("");
                    let input_schema = tool
                        .get("inputSchema")
                        .cloned()
                        .unwrap_or(serde_json::json!({"type": "object"}));

                    self.tools.push(ToolDescriptor {
                        name: name.to_string(),
                        description: description.to_string(),
                        input_schema,
                    });
                }
            }
        }

        Ok(())
    }

    /// One JSON-RPC request/response exchange, under the configured timeout.
    async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, String> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method: method.to_string(),
            params,
        };

        let request_json = serde_json::to_string(&request)
            .map_err(|e| format!("Failed to serialize request: {e}"))?;

        debug!(method, id, backend = %self.config.name, "Backend request");

        let mut session = self.session.lock().await;

        session
            .stdin
            .write_all(request_json.as_bytes())
            .await
            .map_err(|e| format!("Failed to write to backend stdin: {e}"))?;
        session
            .stdin
            .write_all(b"\n")
            .await
            .map_err(|e| format!("Failed to write newline: {e}"))?;
        session
            .stdin
            .flush()
            .await
            .map_err(|e| format!("Failed to flush stdin: {e}"))?;

        let mut line = String::new();
        let timeout = tokio::time::Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(timeout, session.stdout.read_line(&mut line)).await {
            Ok(Ok(0)) => return Err("Backend closed connection".to_string()),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(format!("Failed to read backend response: {e}")),
            Err(_) => return Err("Backend request timed out".to_string()),
        }

        let response: JsonRpcResponse = serde_json::from_str(line.trim())
            .map_err(|e| format!("Invalid JSON-RPC response: {e}"))?;

        if let Some(err) = response.error {
            return Err(format!("{err}"));
        }

        Ok(response.result)
    }

    /// Fire-and-forget notification (no response expected).
    async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), String> {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.unwrap_or(serde_json::json!({})),
        });

        let json = serde_json::to_string(&notification)
            .map_err(|e| format!("Failed to serialize notification: {e}"))?;

        let mut session = self.session.lock().await;
        session
            .stdin
            .write_all(json.as_bytes())
            .await
            .map_err(|e| format!("Write notification: {e}"))?;
        session
            .stdin
            .write_all(b"\n")
            .await
            .map_err(|e| format!("Write newline: {e}"))?;
        session
            .stdin
            .flush()
            .await
            .map_err(|e| format!("Flush: {e}"))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ToolBackend for RpcBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn capabilities(&self) -> TwinResult<Vec<ToolDescriptor>> {
        Ok(self.tools.clone())
    }

    async fn invoke(&self, op: &str, args: serde_json::Value) -> TwinResult<ToolResponse> {
        let params = serde_json::json!({
            "name": op,
            "arguments": args,
        });

        match self.send_request("tools/call", Some(params)).await {
            Ok(Some(result)) => Ok(translate_call_result(result)),
            Ok(None) => Ok(ToolResponse::fail("No result from tools/call")),
            Err(message) => Ok(ToolResponse::fail(message)),
        }
    }
}

/// Translate a `tools/call` result into the common response shape: joined
/// text content on success, or a failure payload when the backend flags the
/// call as errored.
fn translate_call_result(result: serde_json::Value) -> ToolResponse {
    let is_error = result
        .get("isError")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let text = result
        .get("content")
        .and_then(|c| c.as_array())
        .map(|content| {
            content
                .iter()
                .filter_map(|item| {
                    if item["type"].as_str() == Some("text") {
                        item["text"].as_str()
                    } else {
                        None
                    }
                })
                .collect::<Vec<&str>>()
                .join("\n")
        });

    if is_error {
        return ToolResponse::fail(text.unwrap_or_else(|| "backend reported an error".to_string()));
    }

    match text {
        Some(joined) => ToolResponse::ok(serde_json::Value::String(joined)),
        None => ToolResponse::ok(result),
    }
}

fn spawn_session(
    command: &str,
    args: &[String],
    env_allowlist: &[String],
) -> Result<StdioSession, String> {
    // Reject path traversal in the configured command
    if command.contains("..") {
        return Err("Backend command path contains '..': rejected".to_string());
    }

    let mut cmd = tokio::process::Command::new(command);
    cmd.args(args);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    // Sandbox: clear environment, only pass allowlisted vars
    cmd.env_clear();
    for var_name in env_allowlist {
        if let Ok(val) = std::env::var(var_name) {
            cmd.env(var_name, val);
        }
    }
    // Always pass PATH for binary resolution
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("Failed to spawn backend '{command}': {e}"))?;

    let stdin = child
        .stdin
        .take()
        .ok_or("Failed to capture backend stdin")?;
    let stdout = child
        .stdout
        .take()
        .ok_or("Failed to capture backend stdout")?;

    Ok(StdioSession {
        child: Box::new(child),
        stdin,
        stdout: BufReader::new(stdout),
    })
}

impl Drop for RpcBackend {
    fn drop(&mut self) {
        // Best-effort kill of the subprocess
        if let Ok(mut session) = self.session.try_lock() {
            let _ = session.child.start_kill();
        }
    }
}
