//! Orchestration client
//!
//! `connect()` performs `initialize`, then lists only the catalogs the server
//! advertises, and caches the results in the session. Calls made before a
//! successful connect fail with `NotConnected`. `call_tool` also fails fast
//! with `ToolNotFound` for names missing from the cached tool list; the server
//! still answers soft errors for tools it no longer has.

use serde::de::DeserializeOwned;
use serde_json::{ Map, Value };
use std::sync::Arc;
use std::sync::atomic::{ AtomicI64, Ordering };
use std::time::Duration;
use tokio::sync::{ Mutex, RwLock };
use tracing::{ debug, error, info };

use crate::client::session::{ ConnectionState, Session };
use crate::config::{ ClientConfig, TransportKind };
use crate::errors::Error;
use crate::messages::{ Method, Request, RequestId };
use crate::server::Server;
use crate::transport::{ HttpTransport, LocalTransport, Transport };
use crate::types::{
    CallToolParams,
    CallToolResult,
    GetPromptParams,
    GetPromptResult,
    InitializeParams,
    ListPromptsResult,
    ListResourcesResult,
    ListToolsResult,
    PROTOCOL_VERSION,
    Prompt,
    ReadResourceParams,
    Resource,
    ServerIdentity,
    Tool,
};

/// Builder for creating Client instances with custom configuration
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    local_server: Option<Arc<Server>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            transport: None,
            local_server: None,
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.bearer_token = Some(token.into());
        self
    }

    /// Talk to a remote server over HTTP
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    /// Server used when no endpoint is configured
    pub fn with_local_server(mut self, server: Arc<Server>) -> Self {
        self.local_server = Some(server);
        self
    }

    /// Use a ready-made transport, ignoring endpoint and local server
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None =>
                match self.config.transport_kind() {
                    TransportKind::Http(endpoint) => {
                        let mut http = HttpTransport::new(&endpoint, self.config.request_timeout)?;
                        if let Some(token) = &self.config.bearer_token {
                            http = http.with_bearer_token(token.clone());
                        }
                        Arc::new(http)
                    }
                    TransportKind::Local => {
                        let server = self.local_server.ok_or_else(||
                            Error::Other(
                                "no endpoint configured and no local server supplied".to_string()
                            )
                        )?;
                        Arc::new(LocalTransport::new(server, self.config.request_timeout))
                    }
                }
        };
        Ok(Client::new(transport, self.config))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Client {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    session: RwLock<Session>,
    next_id: AtomicI64,
    /// Serializes connect and disconnect
    lifecycle: Mutex<()>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            session: RwLock::new(Session::new()),
            next_id: AtomicI64::new(1),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request<T: DeserializeOwned>(&self, method: Method, params: Option<Value>) -> Result<T, Error> {
        let request = Request::new(self.next_request_id(), method.as_str(), params);
        debug!("Sending {} (id {})", method, request.id);
        let result = self.transport.call(request).await?;
        serde_json
            ::from_value(result)
            .map_err(|e| Error::Transport(format!("Malformed {} result: {}", method, e)))
    }

    async fn handshake(&self) -> Result<(ServerIdentity, Vec<Tool>, Vec<Resource>, Vec<Prompt>), Error> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            client_info: self.config.client_info.clone(),
        };
        let identity: ServerIdentity = self.request(
            Method::Initialize,
            Some(serde_json::to_value(params)?)
        ).await?;

        let capabilities = &identity.capabilities;
        let tools = if capabilities.supports_tools() {
            self.request::<ListToolsResult>(Method::ListTools, None).await?.tools
        } else {
            Vec::new()
        };
        let resources = if capabilities.supports_resources() {
            self.request::<ListResourcesResult>(Method::ListResources, None).await?.resources
        } else {
            Vec::new()
        };
        let prompts = if capabilities.supports_prompts() {
            self.request::<ListPromptsResult>(Method::ListPrompts, None).await?.prompts
        } else {
            Vec::new()
        };

        Ok((identity, tools, resources, prompts))
    }

    /// Perform the handshake and cache the server's catalogs.
    ///
    /// Connecting an already connected client returns the cached identity.
    /// On failure the session is left empty and disconnected.
    pub async fn connect(&self) -> Result<ServerIdentity, Error> {
        let _lifecycle = self.lifecycle.lock().await;
        {
            let mut session = self.session.write().await;
            if let (ConnectionState::Connected, Some(identity)) = (session.state, &session.identity) {
                return Ok(identity.clone());
            }
            session.state = ConnectionState::Connecting;
        }

        match self.handshake().await {
            Ok((identity, tools, resources, prompts)) => {
                info!(
                    "Connected to {} {} ({} tools, {} resources, {} prompts)",
                    identity.name(),
                    identity.version(),
                    tools.len(),
                    resources.len(),
                    prompts.len()
                );
                self.session.write().await.populate(identity.clone(), tools, resources, prompts);
                Ok(identity)
            }
            Err(e) => {
                error!("Connect failed: {}", e);
                self.session.write().await.clear();
                Err(e)
            }
        }
    }

    /// Drop the session and every cached catalog. Always succeeds.
    pub async fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.session.write().await.clear();
        info!("Disconnected");
    }

    /// Disconnect and release the transport
    pub async fn close(&self) -> Result<(), Error> {
        self.disconnect().await;
        self.transport.close().await
    }

    async fn ensure_connected(&self) -> Result<(), Error> {
        if self.session.read().await.is_connected() { Ok(()) } else { Err(Error::NotConnected) }
    }

    /// Invoke a tool. A result with `is_error` set is still `Ok`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, Error> {
        {
            let session = self.session.read().await;
            if !session.is_connected() {
                return Err(Error::NotConnected);
            }
            if !session.tools.contains_key(name) {
                return Err(Error::ToolNotFound(name.to_string()));
            }
        }

        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(
                    Error::InvalidParams(format!("tool arguments must be an object, got {}", other))
                );
            }
        };
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        self.request(Method::CallTool, Some(serde_json::to_value(params)?)).await
    }

    /// Read a resource. A missing resource is a soft error result.
    pub async fn read_resource(&self, uri: &str) -> Result<CallToolResult, Error> {
        self.ensure_connected().await?;
        let params = ReadResourceParams { uri: uri.to_string() };
        self.request(Method::ReadResource, Some(serde_json::to_value(params)?)).await
    }

    /// Render a prompt. A missing prompt is a protocol error.
    pub async fn get_prompt(&self, name: &str, arguments: Map<String, Value>) -> Result<GetPromptResult, Error> {
        self.ensure_connected().await?;
        let params = GetPromptParams {
            name: name.to_string(),
            arguments,
        };
        self.request(Method::GetPrompt, Some(serde_json::to_value(params)?)).await
    }

    pub async fn state(&self) -> ConnectionState {
        self.session.read().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_connected()
    }

    pub async fn server_identity(&self) -> Option<ServerIdentity> {
        self.session.read().await.identity.clone()
    }

    pub async fn tools(&self) -> Vec<Tool> {
        self.session.read().await.tools.values().cloned().collect()
    }

    pub async fn resources(&self) -> Vec<Resource> {
        self.session.read().await.resources.values().cloned().collect()
    }

    pub async fn prompts(&self) -> Vec<Prompt> {
        self.session.read().await.prompts.values().cloned().collect()
    }

    pub async fn tool(&self, name: &str) -> Option<Tool> {
        self.session.read().await.tools.get(name).cloned()
    }
}
