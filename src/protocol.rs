//! Wire constants and the `initialize` request sent to open an MCP session.

use serde::{Deserialize, Serialize};

/// Protocol revision announced in the `initialize` request
pub const LATEST_PROTOCOL_VERSION: &str = "2024-11-05";
pub const JSONRPC_VERSION: &str = "2.0";
pub const INITIALIZE_METHOD: &str = "initialize";
pub const INITIALIZE_REQUEST_ID: u64 = 1;

/// Response header carrying the session id, echoed back on later requests
pub const SESSION_ID_HEADER: &str = "mcp-session-id";
pub const AGENT_ID_HEADER: &str = "X-Agent-ID";
pub const AGENT_TYPE_HEADER: &str = "X-Agent-Type";

pub const MIME_JSON: &str = "application/json";
pub const MIME_EVENT_STREAM: &str = "text/event-stream";
/// `Accept` value for the initialize POST; the proxy may answer with either body type
pub const ACCEPT_JSON_OR_EVENT_STREAM: &str = "application/json, text/event-stream";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "test-client".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootsCapability {
    pub list_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    pub roots: RootsCapability,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self {
            roots: RootsCapability { list_changed: true },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: ClientInfo,
}

/// The JSON-RPC envelope posted once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: InitializeParams,
    pub id: u64,
}

impl InitializeRequest {
    pub fn new(protocol_version: impl Into<String>, client_info: ClientInfo) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: INITIALIZE_METHOD.to_string(),
            params: InitializeParams {
                protocol_version: protocol_version.into(),
                capabilities: ClientCapabilities::default(),
                client_info,
            },
            id: INITIALIZE_REQUEST_ID,
        }
    }
}

impl Default for InitializeRequest {
    fn default() -> Self {
        Self::new(LATEST_PROTOCOL_VERSION, ClientInfo::default())
    }
}
