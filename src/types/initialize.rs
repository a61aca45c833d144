//! COP Initialization Types
//!
//! This module defines the handshake payloads: the parameters a client sends
//! with `initialize` and the server identity it receives back, including the
//! capability flags that decide which catalogs the client may list.

use schemars::JsonSchema;
use serde::{ Deserialize, Serialize };

/// Protocol revision spoken by this crate
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Information about an implementation (client or server)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct Implementation {
    /// Name of the implementation
    pub name: String,
    /// Version of the implementation
    pub version: String,
}

/// Parameters for the initialize request
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "clientInfo")]
    pub client_info: Implementation,
}

/// Tool capabilities
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct ToolCapabilities {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Resource capabilities
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct ResourceCapabilities {
    #[serde(default)]
    pub subscribe: bool,
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Prompt capabilities
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct PromptCapabilities {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Logging capabilities
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct LoggingCapabilities {}

/// Capability flags advertised by a server; an absent entry means "not exposed"
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceCapabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptCapabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapabilities>,
}

impl ServerCapabilities {
    /// Every capability switched on
    pub fn all() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
            resources: Some(ResourceCapabilities::default()),
            prompts: Some(PromptCapabilities::default()),
            logging: Some(LoggingCapabilities::default()),
        }
    }

    pub fn with_tools(mut self, enabled: bool) -> Self {
        self.tools = enabled.then(ToolCapabilities::default);
        self
    }

    pub fn with_resources(mut self, enabled: bool) -> Self {
        self.resources = enabled.then(ResourceCapabilities::default);
        self
    }

    pub fn with_prompts(mut self, enabled: bool) -> Self {
        self.prompts = enabled.then(PromptCapabilities::default);
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled.then(LoggingCapabilities::default);
        self
    }

    pub fn supports_tools(&self) -> bool {
        self.tools.is_some()
    }

    pub fn supports_resources(&self) -> bool {
        self.resources.is_some()
    }

    pub fn supports_prompts(&self) -> bool {
        self.prompts.is_some()
    }

    pub fn supports_logging(&self) -> bool {
        self.logging.is_some()
    }
}

/// Result of `initialize`; read-only for the lifetime of a connection
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct ServerIdentity {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl ServerIdentity {
    pub fn name(&self) -> &str {
        &self.server_info.name
    }

    pub fn version(&self) -> &str {
        &self.server_info.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_capabilities_are_not_advertised() {
        let caps: ServerCapabilities = serde_json
            ::from_value(json!({ "tools": {}, "resources": { "subscribe": false } }))
            .unwrap();
        assert!(caps.supports_tools());
        assert!(caps.supports_resources());
        assert!(!caps.supports_prompts());

        let wire = serde_json::to_value(ServerCapabilities::all().with_prompts(false)).unwrap();
        assert!(wire.get("prompts").is_none());
        assert!(wire.get("logging").is_some());
    }
}
