//! Server and client configuration
//!
//! Both configs have builder-style `with_*` setters. `ServerConfig` can also be
//! read from `COP_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::Error;
use crate::types::{ Implementation, PROTOCOL_VERSION, ServerCapabilities };

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Default shell execution timeout in seconds
const DEFAULT_SHELL_TIMEOUT: u64 = 60;

/// Default timeout for outbound HTTP made by executors
const DEFAULT_HTTP_TIMEOUT: u64 = 20;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8090";
const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Configuration for a `Server`
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub instructions: Option<String>,
    /// Root directory the file and shell executors work in
    pub workspace_root: PathBuf,
    pub shell_timeout: Duration,
    pub http_timeout: Duration,
    pub search_endpoint: String,
    pub bind_address: String,
    /// Bearer token required by the HTTP listener, if any
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "cop-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::all(),
            instructions: None,
            workspace_root: PathBuf::from("."),
            shell_timeout: Duration::from_secs(DEFAULT_SHELL_TIMEOUT),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            auth_token: None,
        }
    }
}

impl ServerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error> where F: Fn(&str) -> Option<String> {
        let mut config = Self::default();

        if let Some(name) = lookup("COP_SERVER_NAME") {
            config.name = name;
        }
        if let Some(root) = lookup("COP_WORKSPACE") {
            config.workspace_root = PathBuf::from(root);
        }
        if let Some(bind) = lookup("COP_BIND") {
            config.bind_address = bind;
        }
        if let Some(token) = lookup("COP_AUTH_TOKEN").filter(|t| !t.is_empty()) {
            config.auth_token = Some(token);
        }
        if let Some(secs) = lookup("COP_SHELL_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| {
                    Error::Other(format!("COP_SHELL_TIMEOUT_SECS is not a number: {}", secs))
                })?;
            config.shell_timeout = Duration::from_secs(secs);
        }
        if let Some(endpoint) = lookup("COP_SEARCH_ENDPOINT") {
            url::Url
                ::parse(&endpoint)
                .map_err(|e| Error::Other(format!("COP_SEARCH_ENDPOINT is not a URL: {}", e)))?;
            config.search_endpoint = endpoint;
        }

        Ok(config)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn with_shell_timeout(mut self, timeout: Duration) -> Self {
        self.shell_timeout = timeout;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.search_endpoint = endpoint.into();
        self
    }

    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn server_info(&self) -> Implementation {
        Implementation {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

/// Which client-side adapter to construct
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// In-process server, no boundary crossed
    Local,
    /// Remote server reached over HTTP
    Http(String),
}

/// Configuration for the orchestration client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// Bearer credential sent to remote servers
    pub bearer_token: Option<String>,
    /// Remote endpoint; `None` selects the local adapter
    pub endpoint: Option<String>,
    pub client_info: Implementation,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            bearer_token: None,
            endpoint: None,
            client_info: Implementation {
                name: "cop-rs".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

impl ClientConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = Implementation {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    pub fn transport_kind(&self) -> TransportKind {
        match &self.endpoint {
            Some(endpoint) => TransportKind::Http(endpoint.clone()),
            None => TransportKind::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.shell_timeout, Duration::from_secs(60));
        assert_eq!(config.protocol_version, "2024-11-05");
        assert_eq!(config.bind_address, "127.0.0.1:8090");
        assert!(config.capabilities.supports_prompts());
        assert_eq!(ClientConfig::default().request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn environment_overrides() {
        let config = ServerConfig::from_lookup(
            lookup_from(
                &[
                    ("COP_SERVER_NAME", "ops"),
                    ("COP_WORKSPACE", "/srv/work"),
                    ("COP_AUTH_TOKEN", "secret"),
                    ("COP_SHELL_TIMEOUT_SECS", "5"),
                ]
            )
        ).unwrap();

        assert_eq!(config.name, "ops");
        assert_eq!(config.workspace_root, PathBuf::from("/srv/work"));
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.shell_timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let result = ServerConfig::from_lookup(lookup_from(&[("COP_SHELL_TIMEOUT_SECS", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn endpoint_selects_transport() {
        assert_eq!(ClientConfig::default().transport_kind(), TransportKind::Local);
        let remote = ClientConfig::default().with_endpoint("http://localhost:8090/rpc");
        assert_eq!(
            remote.transport_kind(),
            TransportKind::Http("http://localhost:8090/rpc".to_string())
        );
    }
}
